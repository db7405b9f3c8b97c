//! Pixel matrix helpers shared by every stage.
//!
//! Stages never mutate their inputs: each helper here either inspects a
//! matrix or builds a fresh one.

use image::Rgba;
use imageproc::definitions::Clamp;

use crate::types::{Dimensions, PipelineError, PixelMatrix};

/// A single RGBA pixel.
pub type Pixel = Rgba<u8>;

/// Clamp an intermediate channel value into `[0, 255]`.
#[must_use]
pub fn clamp_channel(value: i32) -> u8 {
    <u8 as Clamp<i32>>::clamp(value)
}

/// Round a floating-point channel value and clamp it into `[0, 255]`.
///
/// `NaN` maps to 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    // Saturating float-to-int cast, then the usual clamp.
    clamp_channel(value.round() as i32)
}

/// Intensity as the floor of the RGB mean.
#[must_use]
pub fn mean_intensity(pixel: Pixel) -> u8 {
    let [r, g, b, _] = pixel.0;
    let sum = u16::from(r) + u16::from(g) + u16::from(b);
    // sum <= 765, so sum / 3 <= 255.
    u8::try_from(sum / 3).unwrap_or(u8::MAX)
}

/// Intensity as the RGB mean rounded to the nearest integer.
#[must_use]
pub fn rounded_intensity(pixel: Pixel) -> u8 {
    let [r, g, b, _] = pixel.0;
    let sum = u16::from(r) + u16::from(g) + u16::from(b);
    u8::try_from((sum + 1) / 3).unwrap_or(u8::MAX)
}

/// Top-left aligned overlap of two matrices.
#[must_use]
pub fn common_area(a: &PixelMatrix, b: &PixelMatrix) -> Dimensions {
    Dimensions {
        width: a.width().min(b.width()),
        height: a.height().min(b.height()),
    }
}

/// Fail with [`PipelineError::EmptyMatrix`] if `matrix` has no pixels.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] naming `stage` when the matrix
/// has zero rows or zero columns.
pub fn ensure_non_empty(matrix: &PixelMatrix, stage: &'static str) -> Result<(), PipelineError> {
    if Dimensions::of(matrix).is_empty() {
        return Err(PipelineError::EmptyMatrix { stage });
    }
    Ok(())
}

/// Build a matrix from nested rows of `[R, G, B, A]` pixels.
///
/// An empty row list (or rows of length zero) yields an empty matrix.
///
/// # Errors
///
/// Returns [`PipelineError::JaggedRows`] if any row differs in length
/// from the first, and [`PipelineError::InvalidOperand`] if a dimension
/// does not fit in `u32`.
pub fn from_rows(rows: &[Vec<[u8; 4]>]) -> Result<PixelMatrix, PipelineError> {
    let expected = rows.first().map_or(0, Vec::len);
    if let Some((row, found)) = rows
        .iter()
        .map(Vec::len)
        .enumerate()
        .find(|&(_, len)| len != expected)
    {
        return Err(PipelineError::JaggedRows {
            row,
            expected,
            found,
        });
    }

    let width = u32::try_from(expected)
        .map_err(|_| PipelineError::InvalidOperand(format!("width {expected} exceeds u32")))?;
    let height = u32::try_from(rows.len())
        .map_err(|_| PipelineError::InvalidOperand(format!("height {} exceeds u32", rows.len())))?;
    if width == 0 {
        return Ok(PixelMatrix::new(0, 0));
    }

    let raw: Vec<u8> = rows.iter().flatten().flatten().copied().collect();
    PixelMatrix::from_raw(width, height, raw).ok_or_else(|| {
        PipelineError::InvalidOperand(format!("buffer does not match {width}x{height}"))
    })
}

/// Convert a matrix into nested rows of `[R, G, B, A]` pixels.
#[must_use]
pub fn to_rows(matrix: &PixelMatrix) -> Vec<Vec<[u8; 4]>> {
    matrix
        .rows()
        .map(|row| row.map(|pixel| pixel.0).collect())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clamp_channel_bounds() {
        assert_eq!(clamp_channel(-20), 0);
        assert_eq!(clamp_channel(0), 0);
        assert_eq!(clamp_channel(128), 128);
        assert_eq!(clamp_channel(255), 255);
        assert_eq!(clamp_channel(510), 255);
    }

    #[test]
    fn round_channel_rounds_and_clamps() {
        assert_eq!(round_channel(12.5), 13);
        assert_eq!(round_channel(12.49), 12);
        assert_eq!(round_channel(-3.0), 0);
        assert_eq!(round_channel(300.0), 255);
        assert_eq!(round_channel(f64::INFINITY), 255);
        assert_eq!(round_channel(f64::NAN), 0);
    }

    #[test]
    fn intensities() {
        let p = Rgba([10, 20, 32, 0]);
        // 62 / 3 = 20.67
        assert_eq!(mean_intensity(p), 20);
        assert_eq!(rounded_intensity(p), 21);
        let white = Rgba([255, 255, 255, 255]);
        assert_eq!(mean_intensity(white), 255);
        assert_eq!(rounded_intensity(white), 255);
    }

    #[test]
    fn common_area_is_min_of_each_side() {
        let a = PixelMatrix::new(5, 2);
        let b = PixelMatrix::new(3, 4);
        assert_eq!(
            common_area(&a, &b),
            Dimensions {
                width: 3,
                height: 2
            }
        );
    }

    #[test]
    fn ensure_non_empty_rejects_zero_sides() {
        assert!(ensure_non_empty(&PixelMatrix::new(1, 1), "x").is_ok());
        assert!(matches!(
            ensure_non_empty(&PixelMatrix::new(0, 3), "mean"),
            Err(PipelineError::EmptyMatrix { stage: "mean" })
        ));
        assert!(matches!(
            ensure_non_empty(&PixelMatrix::new(3, 0), "mean"),
            Err(PipelineError::EmptyMatrix { .. })
        ));
    }

    #[test]
    fn rows_round_trip() {
        let rows = vec![
            vec![[10, 20, 30, 255], [40, 50, 60, 255]],
            vec![[70, 80, 90, 255], [100, 110, 120, 255]],
        ];
        let m = from_rows(&rows).unwrap();
        assert_eq!(m.dimensions(), (2, 2));
        assert_eq!(m.get_pixel(1, 0).0, [40, 50, 60, 255]);
        assert_eq!(m.get_pixel(0, 1).0, [70, 80, 90, 255]);
        assert_eq!(to_rows(&m), rows);
    }

    #[test]
    fn jagged_rows_rejected() {
        let rows = vec![vec![[0; 4], [0; 4]], vec![[0; 4]]];
        assert!(matches!(
            from_rows(&rows),
            Err(PipelineError::JaggedRows {
                row: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn empty_rows_give_empty_matrix() {
        let m = from_rows(&[]).unwrap();
        assert_eq!(m.dimensions(), (0, 0));
        let m = from_rows(&[vec![], vec![]]).unwrap();
        assert_eq!(m.dimensions(), (0, 0));
    }
}
