//! Intensity histogram and histogram equalization.
//!
//! Intensity here is the RGB mean rounded to the nearest integer, which
//! differs from the floored mean used by grayscale and binarize.

use image::Rgba;
use serde::Serialize;

use crate::matrix::{self, rounded_intensity};
use crate::types::{PipelineError, PixelMatrix};

/// Number of intensity buckets.
pub const BUCKETS: usize = 256;

/// Pixel counts per intensity bucket (alpha is ignored).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    /// Count of each of the 256 intensity values.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of pixels counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Running sum: `cdf[i] = Σ_{k ≤ i} counts[k]`.
    #[must_use]
    pub fn cumulative(&self) -> Vec<u64> {
        self.counts
            .iter()
            .scan(0u64, |acc, &c| {
                *acc += c;
                Some(*acc)
            })
            .collect()
    }
}

/// Count pixels by `round((R + G + B) / 3)`.
#[must_use]
pub fn histogram(image: &PixelMatrix) -> Histogram {
    let mut counts = vec![0u64; BUCKETS];
    for pixel in image.pixels() {
        counts[usize::from(rounded_intensity(*pixel))] += 1;
    }
    Histogram { counts }
}

/// Build the equalization lookup table, or `None` when every pixel falls
/// in one bucket and the remap would divide by zero.
fn remap_table(hist: &Histogram) -> Option<Vec<u8>> {
    let cdf = hist.cumulative();
    let total = hist.total();
    let cdf_min = cdf.iter().copied().find(|&c| c > 0)?;
    if total == cdf_min {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let span = (total - cdf_min) as f64;
    Some(
        cdf.iter()
            .map(|&c| {
                #[allow(clippy::cast_precision_loss)]
                let above = c as f64 - cdf_min as f64;
                matrix::round_channel(above / span * 255.0)
            })
            .collect(),
    )
}

/// Spread intensities over the full `[0, 255]` range.
///
/// Each pixel's R, G and B all become `map[intensity]`; alpha is kept.
/// A single-intensity image has nothing to spread and comes back as an
/// unchanged copy.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn equalize(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "equalize")?;

    let Some(map) = remap_table(&histogram(image)) else {
        tracing::debug!("flat histogram, equalization leaves image unchanged");
        return Ok(image.clone());
    };

    Ok(PixelMatrix::from_fn(image.width(), image.height(), |x, y| {
        let pixel = *image.get_pixel(x, y);
        let v = map[usize::from(rounded_intensity(pixel))];
        Rgba([v, v, v, pixel.0[3]])
    }))
}
