//! Binary morphology over a 3×3 square structuring element.
//!
//! The color image is first reduced to a mask where a pixel is
//! foreground when `floor((R + G + B) / 3) >= threshold`. The mask is
//! processed with [`imageproc::morphology`] using the L∞ norm at
//! radius 1, which is exactly a 3×3 square. The result is written back
//! as black/white with the source alpha.

use image::{Luma, Rgba};
use imageproc::distance_transform::Norm;

use crate::matrix;
use crate::types::{GrayImage, MorphologicOperation, PipelineError, PixelMatrix};

/// Radius of the square structuring element.
const RADIUS: u8 = 1;

/// Foreground mask: 255 where the floored intensity reaches `threshold`.
#[must_use]
pub fn mask(image: &PixelMatrix, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let on = matrix::mean_intensity(*image.get_pixel(x, y)) >= threshold;
        Luma([if on { u8::MAX } else { 0 }])
    })
}

/// Write a mask back as black/white pixels, keeping the
/// alpha of `source`.
fn from_mask(mask: &GrayImage, source: &PixelMatrix) -> PixelMatrix {
    PixelMatrix::from_fn(source.width(), source.height(), |x, y| {
        let v = mask.get_pixel(x, y).0[0];
        Rgba([v, v, v, source.get_pixel(x, y).0[3]])
    })
}

/// Inner boundary: foreground pixels removed by one erosion step.
fn outline_mask(m: &GrayImage) -> GrayImage {
    let eroded = imageproc::morphology::erode(m, Norm::LInf, RADIUS);
    GrayImage::from_fn(m.width(), m.height(), |x, y| {
        let on = m.get_pixel(x, y).0[0] > 0 && eroded.get_pixel(x, y).0[0] == 0;
        Luma([if on { u8::MAX } else { 0 }])
    })
}

fn morph(
    image: &PixelMatrix,
    threshold: u8,
    stage: &'static str,
    op: impl Fn(&GrayImage) -> GrayImage,
) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, stage)?;
    Ok(from_mask(&op(&mask(image, threshold)), image))
}

/// Grow the foreground by one pixel in every direction.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn dilate(image: &PixelMatrix, threshold: u8) -> Result<PixelMatrix, PipelineError> {
    morph(image, threshold, "dilation", |m| {
        imageproc::morphology::dilate(m, Norm::LInf, RADIUS)
    })
}

/// Shrink the foreground by one pixel in every direction.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn erode(image: &PixelMatrix, threshold: u8) -> Result<PixelMatrix, PipelineError> {
    morph(image, threshold, "erosion", |m| {
        imageproc::morphology::erode(m, Norm::LInf, RADIUS)
    })
}

/// Erosion followed by dilation; removes specks smaller than the
/// structuring element.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn open(image: &PixelMatrix, threshold: u8) -> Result<PixelMatrix, PipelineError> {
    morph(image, threshold, "opening", |m| {
        imageproc::morphology::open(m, Norm::LInf, RADIUS)
    })
}

/// Dilation followed by erosion; fills holes smaller than the
/// structuring element.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn close(image: &PixelMatrix, threshold: u8) -> Result<PixelMatrix, PipelineError> {
    morph(image, threshold, "closing", |m| {
        imageproc::morphology::close(m, Norm::LInf, RADIUS)
    })
}

/// Foreground pixels that touch the background (mask minus its erosion).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn outline(image: &PixelMatrix, threshold: u8) -> Result<PixelMatrix, PipelineError> {
    morph(image, threshold, "outline", outline_mask)
}

impl MorphologicOperation {
    /// Apply this operation, or return `None` for
    /// [`MorphologicOperation::None`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
    pub fn apply(
        self,
        image: &PixelMatrix,
        threshold: u8,
    ) -> Result<Option<PixelMatrix>, PipelineError> {
        let out = match self {
            Self::None => return Ok(None),
            Self::Dilation => dilate(image, threshold)?,
            Self::Erosion => erode(image, threshold)?,
            Self::Opening => open(image, threshold)?,
            Self::Closing => close(image, threshold)?,
            Self::Outline => outline(image, threshold)?,
        };
        Ok(Some(out))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const T: u8 = 128;

    /// `size`×`size` black image with white pixels where `on(x, y)`.
    fn shape(size: u32, on: impl Fn(u32, u32) -> bool) -> PixelMatrix {
        PixelMatrix::from_fn(size, size, |x, y| {
            let v = if on(x, y) { 255 } else { 0 };
            Rgba([v, v, v, 200])
        })
    }

    fn white(image: &PixelMatrix) -> Vec<(u32, u32)> {
        image
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] == 255)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    fn square(x0: u32, x1: u32) -> impl Fn(u32, u32) -> bool {
        move |x, y| (x0..x1).contains(&x) && (x0..x1).contains(&y)
    }

    #[test]
    fn mask_thresholds_floor_intensity() {
        let m = matrix::from_rows(&[vec![[127, 128, 129, 0], [127, 127, 128, 0]]]).unwrap();
        let bits = mask(&m, 128);
        assert_eq!(bits.get_pixel(0, 0).0[0], 255);
        assert_eq!(bits.get_pixel(1, 0).0[0], 0);
    }

    #[test]
    fn dilate_grows_point_to_square() {
        let img = shape(5, |x, y| (x, y) == (2, 2));
        let out = dilate(&img, T).unwrap();
        assert_eq!(white(&out), white(&shape(5, square(1, 4))));
    }

    #[test]
    fn erode_shrinks_square_to_point() {
        let img = shape(7, square(2, 5));
        assert_eq!(white(&erode(&img, T).unwrap()), vec![(3, 3)]);
    }

    #[test]
    fn open_removes_speck() {
        let img = shape(9, |x, y| square(2, 7)(x, y) || (x, y) == (8, 0));
        let out = open(&img, T).unwrap();
        assert_eq!(out.get_pixel(8, 0).0[0], 0);
        assert_eq!(white(&out), white(&shape(9, square(2, 7))));
    }

    #[test]
    fn close_fills_hole() {
        let img = shape(9, |x, y| square(2, 7)(x, y) && (x, y) != (4, 4));
        let out = close(&img, T).unwrap();
        assert_eq!(white(&out), white(&shape(9, square(2, 7))));
    }

    #[test]
    fn outline_keeps_ring() {
        let img = shape(7, square(2, 5));
        let ring = white(&outline(&img, T).unwrap());
        assert_eq!(ring.len(), 8);
        assert!(!ring.contains(&(3, 3)));
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn output_is_binary_with_source_alpha() {
        let img = PixelMatrix::from_fn(6, 6, |x, y| Rgba([(x * 40) as u8, (y * 40) as u8, 90, 33]));
        for op in [
            MorphologicOperation::Dilation,
            MorphologicOperation::Erosion,
            MorphologicOperation::Opening,
            MorphologicOperation::Closing,
            MorphologicOperation::Outline,
        ] {
            let out = op.apply(&img, T).unwrap().unwrap();
            assert_eq!(out.dimensions(), img.dimensions());
            for p in out.pixels() {
                assert!(p.0[0] == 0 || p.0[0] == 255);
                assert_eq!(p.0[0], p.0[1]);
                assert_eq!(p.0[3], 33);
            }
        }
    }

    #[test]
    fn none_is_noop_and_empty_fails() {
        let img = shape(3, |_, _| true);
        assert!(MorphologicOperation::None.apply(&img, T).unwrap().is_none());
        assert!(matches!(
            dilate(&PixelMatrix::new(0, 0), T),
            Err(PipelineError::EmptyMatrix { .. })
        ));
    }
}
