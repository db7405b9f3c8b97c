//! Per-pixel transforms: grayscale, binarization, flips, and scalar
//! arithmetic.

use image::Rgba;

use crate::matrix::{self, round_channel};
use crate::types::{Operation, OperationKind, PipelineError, PixelMatrix};

/// Replace R, G, B with `floor((R + G + B) / 3)`, keeping alpha.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn grayscale(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "grayscale")?;
    Ok(PixelMatrix::from_fn(image.width(), image.height(), |x, y| {
        let pixel = *image.get_pixel(x, y);
        let v = matrix::mean_intensity(pixel);
        Rgba([v, v, v, pixel.0[3]])
    }))
}

/// Threshold the mean intensity to black (0) or white (255).
///
/// Pixels with `floor((R + G + B) / 3) >= threshold` become white.
/// Alpha is kept.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn binarize(image: &PixelMatrix, threshold: u8) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "binarize")?;
    Ok(PixelMatrix::from_fn(image.width(), image.height(), |x, y| {
        let pixel = *image.get_pixel(x, y);
        let v = if matrix::mean_intensity(pixel) >= threshold {
            u8::MAX
        } else {
            0
        };
        Rgba([v, v, v, pixel.0[3]])
    }))
}

/// Mirror every row.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn flip_horizontal(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "flip horizontal")?;
    Ok(image::imageops::flip_horizontal(image))
}

/// Reverse the row order.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn flip_vertical(image: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(image, "flip vertical")?;
    Ok(image::imageops::flip_vertical(image))
}

/// Apply a scalar [`Operation`] to R, G, B, rounding and clamping each
/// result. Alpha is kept.
///
/// Division by zero does not fail: it saturates like any other
/// out-of-range result, so a non-zero channel becomes 255 and a zero
/// channel stays 0.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidOperand`] if the operand is `NaN` or
/// infinite, and [`PipelineError::EmptyMatrix`] if `image` has no pixels.
pub fn apply_operation(
    image: &PixelMatrix,
    operation: Operation,
) -> Result<PixelMatrix, PipelineError> {
    if !operation.operand.is_finite() {
        return Err(PipelineError::InvalidOperand(format!(
            "{:?} operand must be finite, got {}",
            operation.kind, operation.operand
        )));
    }
    matrix::ensure_non_empty(image, "point operation")?;

    let operand = operation.operand;
    let apply = |value: u8| -> u8 {
        let v = f64::from(value);
        match operation.kind {
            OperationKind::Add => round_channel(v + operand),
            OperationKind::Subtract => round_channel(v - operand),
            OperationKind::Multiply => round_channel(v * operand),
            OperationKind::Divide if operand == 0.0 => {
                if value == 0 {
                    0
                } else {
                    u8::MAX
                }
            }
            OperationKind::Divide => round_channel(v / operand),
        }
    };

    Ok(PixelMatrix::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        Rgba([apply(r), apply(g), apply(b), a])
    }))
}
