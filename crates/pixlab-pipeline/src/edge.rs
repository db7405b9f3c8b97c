//! High-pass (edge detection) filters.
//!
//! All three filters read channel 0 only and assume the input has
//! already been grayscaled. Output pixels are opaque gray
//! `(m, m, m, 255)`. A 1-pixel border is copied from the source
//! unchanged, source alpha included.

use image::Rgba;

use crate::matrix::{self, Pixel};
use crate::neighborhood::{BorderPolicy, Neighborhood, map_neighborhoods};
use crate::types::{HighPassFilter, PipelineError, PixelMatrix};

const PREWITT_X: [[i32; 3]; 3] = [[-1, 0, 1], [-1, 0, 1], [-1, 0, 1]];
const PREWITT_Y: [[i32; 3]; 3] = [[-1, -1, -1], [0, 0, 0], [1, 1, 1]];

const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

const LAPLACIAN: [[i32; 3]; 3] = [[0, -1, 0], [-1, 4, -1], [0, -1, 0]];

const BORDER: BorderPolicy = BorderPolicy::LeaveUnprocessed(1);

impl HighPassFilter {
    /// Border handling of this filter, or `None` for [`HighPassFilter::None`].
    #[must_use]
    pub const fn border_policy(self) -> Option<BorderPolicy> {
        match self {
            Self::None => None,
            Self::Prewitt | Self::Sobel | Self::Laplacian => Some(BORDER),
        }
    }

    /// Apply this filter, or return `None` for [`HighPassFilter::None`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
    pub fn apply(self, image: &PixelMatrix) -> Result<Option<PixelMatrix>, PipelineError> {
        let filtered = match self {
            Self::None => return Ok(None),
            Self::Prewitt => prewitt(image)?,
            Self::Sobel => sobel(image)?,
            Self::Laplacian => laplacian(image)?,
        };
        Ok(Some(filtered))
    }
}

fn opaque_gray(v: u8) -> Pixel {
    Rgba([v, v, v, u8::MAX])
}

/// `round(sqrt(gx² + gy²))` over channel 0, clamped.
fn gradient(
    image: &PixelMatrix,
    kx: &[[i32; 3]; 3],
    ky: &[[i32; 3]; 3],
) -> PixelMatrix {
    map_neighborhoods(image, 1, BORDER, |n: &Neighborhood<'_>| {
        let gx = n.weighted_sum(kx, 0);
        let gy = n.weighted_sum(ky, 0);
        opaque_gray(matrix::round_channel(f64::from(gx).hypot(f64::from(gy))))
    })
}

/// Prewitt gradient magnitude.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn prewitt(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "prewitt")?;
    Ok(gradient(image, &PREWITT_X, &PREWITT_Y))
}

/// Sobel gradient magnitude.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn sobel(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "sobel")?;
    Ok(gradient(image, &SOBEL_X, &SOBEL_Y))
}

/// 4-neighbor Laplacian, clamped (negative responses become 0).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn laplacian(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "laplacian")?;
    Ok(map_neighborhoods(image, 1, BORDER, |n| {
        opaque_gray(matrix::clamp_channel(n.weighted_sum(&LAPLACIAN, 0)))
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// 4x3 image, black for x < 2 and gray 50 for x >= 2, alpha 77.
    fn step_edge() -> PixelMatrix {
        PixelMatrix::from_fn(4, 3, |x, _| {
            let v = if x < 2 { 0 } else { 50 };
            Rgba([v, v, v, 77])
        })
    }

    #[test]
    fn prewitt_responds_to_vertical_edge() {
        let out = prewitt(&step_edge()).unwrap();
        // Three rows of (+50) on the right column.
        assert_eq!(out.get_pixel(1, 1).0, [150, 150, 150, 255]);
        assert_eq!(out.get_pixel(2, 1).0, [150, 150, 150, 255]);
    }

    #[test]
    fn sobel_weights_center_row() {
        let out = sobel(&step_edge()).unwrap();
        assert_eq!(out.get_pixel(1, 1).0, [200, 200, 200, 255]);
        assert_eq!(out.get_pixel(2, 1).0, [200, 200, 200, 255]);
    }

    #[test]
    fn sobel_magnitude_saturates() {
        let img = PixelMatrix::from_fn(3, 3, |x, _| {
            let v = if x == 0 { 0 } else { 255 };
            Rgba([v, v, v, 255])
        });
        assert_eq!(sobel(&img).unwrap().get_pixel(1, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn gradient_combines_both_directions() {
        let img = PixelMatrix::from_fn(3, 3, |x, y| {
            let v = u8::try_from(x * 5 + y * 20 / 3).unwrap();
            Rgba([v, 0, 0, 255])
        });
        // Columns differ by 5 per step: gx = 3 * (10 - 0) = 30.
        // Rows are 0, 6, 13: gy = 3 * (13 - 0) = 39.
        // sqrt(30² + 39²) = 49.2 -> 49
        assert_eq!(prewitt(&img).unwrap().get_pixel(1, 1).0, [49, 49, 49, 255]);
    }

    #[test]
    fn laplacian_clamps_negative_response() {
        let out = laplacian(&step_edge()).unwrap();
        // Dark side of the edge: 0 * 4 - 50 < 0.
        assert_eq!(out.get_pixel(1, 1).0, [0, 0, 0, 255]);
        // Bright side: 4 * 50 - (50 + 50 + 0 + 50) = 50.
        assert_eq!(out.get_pixel(2, 1).0, [50, 50, 50, 255]);
    }

    #[test]
    fn uniform_interior_has_no_edges() {
        let img = PixelMatrix::from_pixel(5, 5, Rgba([90, 90, 90, 10]));
        for out in [
            prewitt(&img).unwrap(),
            sobel(&img).unwrap(),
            laplacian(&img).unwrap(),
        ] {
            for y in 1..4 {
                for x in 1..4 {
                    assert_eq!(out.get_pixel(x, y).0, [0, 0, 0, 255]);
                }
            }
        }
    }

    #[test]
    fn border_is_copied_from_source() {
        let img = step_edge();
        for out in [
            prewitt(&img).unwrap(),
            sobel(&img).unwrap(),
            laplacian(&img).unwrap(),
        ] {
            for (x, y, p) in out.enumerate_pixels() {
                if x == 0 || y == 0 || x == 3 || y == 2 {
                    assert_eq!(p, img.get_pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn reads_channel_zero_only() {
        let mut img = PixelMatrix::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        // Strong edge in green and blue only.
        img.put_pixel(2, 1, Rgba([0, 255, 255, 255]));
        assert_eq!(sobel(&img).unwrap().get_pixel(1, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn border_policies() {
        assert_eq!(HighPassFilter::None.border_policy(), None);
        assert_eq!(
            HighPassFilter::Sobel.border_policy(),
            Some(BorderPolicy::LeaveUnprocessed(1))
        );
        assert!(HighPassFilter::None.apply(&step_edge()).unwrap().is_none());
    }

    #[test]
    fn rejects_empty() {
        let empty = PixelMatrix::new(0, 0);
        assert!(prewitt(&empty).is_err());
        assert!(sobel(&empty).is_err());
        assert!(laplacian(&empty).is_err());
    }
}
