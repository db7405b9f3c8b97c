//! Two-input arithmetic and bitwise image combination.
//!
//! Every two-input operator works on the **common area** of its inputs:
//! the top-left aligned overlap `min(W_A, W_B) × min(H_A, H_B)`. Pixels
//! outside the overlap are dropped. Neither input is modified.
//!
//! Two channel quirks are kept on purpose because hosts rely on them:
//!
//! - [`subtract`] **adds** the alpha channels (clamped) instead of
//!   subtracting them, so the result stays opaque.
//! - [`xor`] takes the **minimum** of the alpha channels instead of
//!   XOR-ing them, for the same reason.

use image::Rgba;

use crate::matrix::{self, Pixel, clamp_channel, round_channel};
use crate::types::{Dimensions, PipelineError, PixelMatrix};

/// Index of the alpha channel within a pixel.
pub const ALPHA: usize = 3;

/// Apply `f` to every pixel pair in the common area of `a` and `b`.
fn zip_common_area<F>(a: &PixelMatrix, b: &PixelMatrix, f: F) -> Result<PixelMatrix, PipelineError>
where
    F: Fn(Pixel, Pixel) -> Pixel,
{
    let area = matrix::common_area(a, b);
    if area.is_empty() {
        return Err(PipelineError::ShapeMismatch {
            left: Dimensions::of(a),
            right: Dimensions::of(b),
        });
    }
    Ok(PixelMatrix::from_fn(area.width, area.height, |x, y| {
        f(*a.get_pixel(x, y), *b.get_pixel(x, y))
    }))
}

/// Apply `f` channel by channel (including alpha) to a pixel pair.
fn per_channel<F>(pa: Pixel, pb: Pixel, f: F) -> Pixel
where
    F: Fn(usize, u8, u8) -> u8,
{
    Rgba(std::array::from_fn(|c| f(c, pa.0[c], pb.0[c])))
}

/// Saturating per-channel sum, alpha included.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] if the inputs do not overlap.
pub fn add(a: &PixelMatrix, b: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    zip_common_area(a, b, |pa, pb| {
        per_channel(pa, pb, |_, x, y| clamp_channel(i32::from(x) + i32::from(y)))
    })
}

/// Saturating per-channel difference `a - b` on R, G, B.
///
/// The alpha channel is `a + b`, clamped.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] if the inputs do not overlap.
pub fn subtract(a: &PixelMatrix, b: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    zip_common_area(a, b, |pa, pb| {
        per_channel(pa, pb, |c, x, y| {
            if c == ALPHA {
                clamp_channel(i32::from(x) + i32::from(y))
            } else {
                clamp_channel(i32::from(x) - i32::from(y))
            }
        })
    })
}

/// Absolute difference, computed as `add(subtract(A, B), subtract(B, A))`.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] if the inputs do not overlap.
pub fn difference(a: &PixelMatrix, b: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    let forward = subtract(a, b)?;
    let backward = subtract(b, a)?;
    add(&forward, &backward)
}

/// Linear blend `round((1 - alpha)·a + alpha·b)` on all four channels.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidOperand`] if `alpha` is not a finite
/// number in `[0, 1]`, and [`PipelineError::ShapeMismatch`] if the inputs
/// do not overlap.
pub fn blend(a: &PixelMatrix, b: &PixelMatrix, alpha: f64) -> Result<PixelMatrix, PipelineError> {
    if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
        return Err(PipelineError::InvalidOperand(format!(
            "blend alpha must be within [0, 1], got {alpha}"
        )));
    }
    zip_common_area(a, b, |pa, pb| {
        per_channel(pa, pb, |_, x, y| {
            round_channel((1.0 - alpha).mul_add(f64::from(x), alpha * f64::from(y)))
        })
    })
}

/// Per-channel mean of the two inputs, ties rounded up.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] if the inputs do not overlap.
pub fn average(a: &PixelMatrix, b: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    zip_common_area(a, b, |pa, pb| {
        per_channel(pa, pb, |_, x, y| {
            let mean = (u16::from(x) + u16::from(y) + 1) / 2;
            u8::try_from(mean).unwrap_or(u8::MAX)
        })
    })
}

/// Bitwise AND on every channel.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] if the inputs do not overlap.
pub fn and(a: &PixelMatrix, b: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    zip_common_area(a, b, |pa, pb| per_channel(pa, pb, |_, x, y| x & y))
}

/// Bitwise OR on every channel.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] if the inputs do not overlap.
pub fn or(a: &PixelMatrix, b: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    zip_common_area(a, b, |pa, pb| per_channel(pa, pb, |_, x, y| x | y))
}

/// Bitwise XOR on R, G, B; alpha is the minimum of both alphas.
///
/// # Errors
///
/// Returns [`PipelineError::ShapeMismatch`] if the inputs do not overlap.
pub fn xor(a: &PixelMatrix, b: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    zip_common_area(a, b, |pa, pb| {
        per_channel(pa, pb, |c, x, y| if c == ALPHA { x.min(y) } else { x ^ y })
    })
}

/// 8-bit complement `255 - value` on R, G, B; alpha passes through.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyMatrix`] if `a` has no pixels.
pub fn not(a: &PixelMatrix) -> Result<PixelMatrix, PipelineError> {
    matrix::ensure_non_empty(a, "not")?;
    Ok(PixelMatrix::from_fn(a.width(), a.height(), |x, y| {
        let [r, g, b, alpha] = a.get_pixel(x, y).0;
        Rgba([!r, !g, !b, alpha])
    }))
}
