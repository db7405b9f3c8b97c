//! pixlab-pipeline: pure RGBA image transformation engine (sans-IO).
//!
//! Combines, filters and remaps in-memory pixel matrices:
//! two-input composite -> not -> point operation -> grayscale ->
//! binarize -> equalize -> low-pass -> high-pass -> morphology ->
//! orientation.
//!
//! This crate has **no I/O dependencies**. It decodes from and encodes
//! to in-memory byte slices; reading and writing files is left to the
//! host (see the `pixlab` CLI).
//!
//! ```rust
//! # use pixlab_pipeline::{LowPassFilter, PipelineConfig, PipelineError, PixelMatrix};
//! # fn run(a: &PixelMatrix) -> Result<(), PipelineError> {
//! let config = PipelineConfig {
//!     to_grayscale: true,
//!     low_pass_filter: LowPassFilter::Median,
//!     ..PipelineConfig::default()
//! };
//! let result = pixlab_pipeline::apply(Some(a), None, &config)?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod composite;
pub mod diagnostics;
pub mod edge;
pub mod histogram;
pub mod lowpass;
pub mod matrix;
pub mod morphology;
pub mod neighborhood;
pub mod pipeline;
pub mod point;
pub mod types;

pub use codec::{decode, encode};
pub use diagnostics::{PipelineDiagnostics, StageDiagnostics};
pub use histogram::{Histogram, equalize, histogram};
pub use neighborhood::BorderPolicy;
pub use pipeline::{Applied, Stage, apply, apply_with_diagnostics, plan};
pub use types::{
    ArithmeticOperation, Dimensions, EncodeError, HighPassFilter, LogicalOperation, LowPassFilter,
    MorphologicOperation, Operation, OperationKind, OrderFilterParams, Orientation,
    PipelineConfig, PipelineError, PixelMatrix,
};

/// Decode an image, run the pipeline, and encode the result as PNG.
///
/// `secondary` may be `None`. Returns `Ok(None)` when the primary image
/// has no pixels.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] or [`PipelineError::Decode`] if
/// either input cannot be decoded, any stage error, and
/// [`PipelineError::Encode`] if the result cannot be encoded.
pub fn process(
    primary: &[u8],
    secondary: Option<&[u8]>,
    config: &PipelineConfig,
) -> Result<Option<Vec<u8>>, PipelineError> {
    let a = decode(primary)?;
    let b = secondary.map(decode).transpose()?;
    apply(Some(&a), b.as_ref(), config)?
        .map(|result| encode(&result))
        .transpose()
}
