//! Boundary between encoded image bytes and pixel matrices.
//!
//! Decoding accepts whatever the `image` crate can read (PNG, JPEG, BMP,
//! WebP) and always yields 8-bit RGBA. Encoding always produces PNG.

use image::ImageEncoder;
use image::codecs::png::PngEncoder;

use crate::matrix;
use crate::types::{Dimensions, EncodeError, PipelineError, PixelMatrix};

/// Decode raw image bytes into an RGBA pixel matrix.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::Decode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<PixelMatrix, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    let rgba = img.to_rgba8();
    tracing::debug!(
        input_bytes = bytes.len(),
        dimensions = %Dimensions::of(&rgba),
        "decoded image"
    );
    Ok(rgba)
}

/// Encode a pixel matrix as PNG.
///
/// # Errors
///
/// Returns [`EncodeError::EmptyMatrix`] (wrapped in
/// [`PipelineError::Encode`]) if the matrix has no pixels, or
/// [`EncodeError::Image`] if the PNG encoder fails.
pub fn encode(matrix: &PixelMatrix) -> Result<Vec<u8>, PipelineError> {
    if Dimensions::of(matrix).is_empty() {
        return Err(EncodeError::EmptyMatrix.into());
    }

    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            matrix.as_raw(),
            matrix.width(),
            matrix.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(EncodeError::from)?;
    Ok(buf)
}

/// Encode nested `[R, G, B, A]` rows as PNG.
///
/// # Errors
///
/// Returns [`EncodeError::Jagged`] if the rows differ in length, and
/// otherwise the same errors as [`encode`].
pub fn encode_rows(rows: &[Vec<[u8; 4]>]) -> Result<Vec<u8>, PipelineError> {
    let matrix = matrix::from_rows(rows).map_err(|e| match e {
        PipelineError::JaggedRows {
            row,
            expected,
            found,
        } => PipelineError::Encode(EncodeError::Jagged {
            row,
            expected,
            found,
        }),
        other => other,
    })?;
    encode(&matrix)
}
