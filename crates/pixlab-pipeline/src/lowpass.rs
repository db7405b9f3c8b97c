//! Low-pass (smoothing) neighborhood filters.
//!
//! Every filter works on R, G, B independently. Alpha handling differs
//! per filter and is part of each filter's contract:
//!
//! | filter                  | window | border                  | alpha          |
//! |-------------------------|--------|-------------------------|----------------|
//! | min / max / mean        | 3×3    | skip missing neighbors  | forced to 255  |
//! | order                   | n×n    | skip missing neighbors  | kept           |
//! | median                  | 3×3    | 1-pixel band untouched  | kept           |
//! | conservative smoothing  | 3×3    | 1-pixel band untouched  | kept           |
//! | gaussian                | 5×5    | 2-pixel band untouched  | filtered       |

use image::Rgba;

use crate::matrix;
use crate::neighborhood::{BorderPolicy, Neighborhood, map_neighborhoods};
use crate::types::{LowPassFilter, OrderFilterParams, PipelineError, PixelMatrix};

/// 5×5 Gaussian weights (outer product of `1 4 6 4 1`).
const GAUSSIAN_5X5: [[i32; 5]; 5] = [
    [1, 4, 6, 4, 1],
    [4, 16, 24, 16, 4],
    [6, 24, 36, 24, 6],
    [4, 16, 24, 16, 4],
    [1, 4, 6, 4, 1],
];

/// Normalization divisor applied to [`GAUSSIAN_5X5`].
///
/// The weights sum to 256, so a uniform region comes out slightly
/// darker (by a factor of 256/273).
const GAUSSIAN_DIVISOR: f64 = 273.0;

impl LowPassFilter {
    /// Border handling of this filter, or `None` for [`LowPassFilter::None`].
    #[must_use]
    pub const fn border_policy(self) -> Option<BorderPolicy> {
        match self {
            Self::None => None,
            Self::Min | Self::Max | Self::Mean | Self::Order => {
                Some(BorderPolicy::SkipMissingNeighbors)
            }
            Self::Median | Self::ConservativeSmoothing => Some(BorderPolicy::LeaveUnprocessed(1)),
            Self::Gaussian => Some(BorderPolicy::LeaveUnprocessed(2)),
        }
    }

    /// Apply this filter, or return `None` for [`LowPassFilter::None`].
    ///
    /// # Errors
    ///
    /// Propagates the selected filter's errors.
    pub fn apply(
        self,
        image: &PixelMatrix,
        order: OrderFilterParams,
    ) -> Result<Option<PixelMatrix>, PipelineError> {
        let filtered = match self {
            Self::None => return Ok(None),
            Self::Min => min_filter(image)?,
            Self::Max => max_filter(image)?,
            Self::Mean => mean_filter(image)?,
            Self::Median => median_filter(image)?,
            Self::Order => order_filter(image, order)?,
            Self::ConservativeSmoothing => conservative_smoothing(image)?,
            Self::Gaussian => gaussian_filter(image)?,
        };
        Ok(Some(filtered))
    }
}

/// Reduce each color channel of a 3×3 window with `reduce`; alpha is 255.
fn reduce_rgb<F>(image: &PixelMatrix, reduce: F) -> PixelMatrix
where
    F: Fn(&Neighborhood<'_>, usize) -> u8,
{
    map_neighborhoods(image, 1, BorderPolicy::SkipMissingNeighbors, |n| {
        Rgba([reduce(n, 0), reduce(n, 1), reduce(n, 2), u8::MAX])
    })
}

/// Per-channel minimum over the in-bounds 3×3 window.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn min_filter(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "min filter")?;
    Ok(reduce_rgb(image, |n, c| n.channel(c).min().unwrap_or(0)))
}

/// Per-channel maximum over the in-bounds 3×3 window.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn max_filter(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "max filter")?;
    Ok(reduce_rgb(image, |n, c| n.channel(c).max().unwrap_or(0)))
}

/// Per-channel rounded mean over the in-bounds 3×3 window.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn mean_filter(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "mean filter")?;
    Ok(reduce_rgb(image, |n, c| {
        let count = u32::try_from(n.samples.len()).unwrap_or(u32::MAX).max(1);
        let sum: u32 = n.channel(c).map(u32::from).sum();
        // round(sum / count), ties up
        u8::try_from((2 * sum + count) / (2 * count)).unwrap_or(u8::MAX)
    }))
}

/// Middle value of a sorted slice; even lengths average the two middle
/// values (ties rounded up).
fn median_of(sorted: &[u8]) -> u8 {
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => 0,
        len if len % 2 == 1 => sorted[mid],
        _ => {
            let pair = u16::from(sorted[mid - 1]) + u16::from(sorted[mid]);
            u8::try_from(pair.div_ceil(2)).unwrap_or(u8::MAX)
        }
    }
}

/// Sorted values of one color channel of the window.
fn sorted_channel(n: &Neighborhood<'_>, c: usize) -> Vec<u8> {
    let mut values: Vec<u8> = n.channel(c).collect();
    values.sort_unstable();
    values
}

/// 3×3 per-channel median. The 1-pixel border is copied unchanged and
/// alpha is kept.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn median_filter(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "median filter")?;
    let policy = BorderPolicy::LeaveUnprocessed(1);
    Ok(map_neighborhoods(image, 1, policy, |n| {
        let [r, g, b] = std::array::from_fn(|c| median_of(&sorted_channel(n, c)));
        Rgba([r, g, b, n.center.0[3]])
    }))
}

/// Rank (order-statistic) filter.
///
/// Sorts each color channel of the in-bounds `neighborhood_size`² window
/// ascending and picks index `min(rank, len - 1)`. `rank` is an absolute
/// index, not a percentile. Alpha is kept.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidOperand`] if `neighborhood_size` is
/// zero or even, and [`PipelineError::EmptyMatrix`] if `image` has no
/// pixels.
pub fn order_filter(
    image: &PixelMatrix,
    params: OrderFilterParams,
) -> Result<PixelMatrix, PipelineError> {
    let size = params.neighborhood_size;
    if size == 0 || size % 2 == 0 {
        return Err(PipelineError::InvalidOperand(format!(
            "order filter neighborhood size must be odd and positive, got {size}"
        )));
    }
    matrix::ensure_non_empty(image, "order filter")?;

    let policy = BorderPolicy::SkipMissingNeighbors;
    Ok(map_neighborhoods(image, size / 2, policy, |n| {
        let [r, g, b] = std::array::from_fn(|c| {
            let values = sorted_channel(n, c);
            let index = params.rank.min(values.len().saturating_sub(1));
            values.get(index).copied().unwrap_or(0)
        });
        Rgba([r, g, b, n.center.0[3]])
    }))
}

/// Clamp each color channel of the center into the `[min, max]` range of
/// its 8 neighbors. The 1-pixel border is copied unchanged and alpha is
/// kept.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn conservative_smoothing(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "conservative smoothing")?;
    let policy = BorderPolicy::LeaveUnprocessed(1);
    Ok(map_neighborhoods(image, 1, policy, |n| {
        let [r, g, b] = std::array::from_fn(|c| {
            let (lo, hi) = n
                .neighbors()
                .map(|s| s.pixel.0[c])
                .fold((u8::MAX, u8::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
            n.center.0[c].clamp(lo.min(hi), hi)
        });
        Rgba([r, g, b, n.center.0[3]])
    }))
}

/// Fixed 5×5 Gaussian (σ ≈ 1) on all four channels. The 2-pixel border
/// is copied unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn gaussian_filter(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "gaussian filter")?;
    let policy = BorderPolicy::LeaveUnprocessed(2);
    Ok(map_neighborhoods(image, 2, policy, |n| {
        let channels: [u8; 4] = std::array::from_fn(|c| {
            let sum = n.weighted_sum(&GAUSSIAN_5X5, c);
            matrix::round_channel(f64::from(sum) / GAUSSIAN_DIVISOR)
        });
        Rgba(channels)
    }))
}
