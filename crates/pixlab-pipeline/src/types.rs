//! Shared types for the pixlab transformation engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference pixel
/// matrices without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage` for the single-channel masks used by morphology.
pub use image::GrayImage;

/// The in-memory image every stage reads and writes.
///
/// `H` rows by `W` columns of `(R, G, B, A)` pixels, 8 bits per channel.
/// The buffer is rectangular by construction and channel values are
/// `u8`, so the `[0, 255]` invariant holds at the type level; stages
/// clamp their intermediate arithmetic before writing back.
pub type PixelMatrix = RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels (columns).
    pub width: u32,
    /// Height in pixels (rows).
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing matrix.
    #[must_use]
    pub fn of(matrix: &PixelMatrix) -> Self {
        Self {
            width: matrix.width(),
            height: matrix.height(),
        }
    }

    /// Number of pixels covered.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ───────────────────────── Configuration ─────────────────────────────

/// Two-input arithmetic combination.
///
/// Unknown strings deserialize to [`None`](Self::None).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArithmeticOperation {
    /// Saturating per-channel sum.
    Add,
    /// Saturating per-channel difference (alpha is summed).
    Subtract,
    /// `subtract(A, B) + subtract(B, A)`.
    Difference,
    /// Linear blend `(1 - α)·A + α·B`.
    #[serde(alias = "blend")]
    Blending,
    /// Per-channel average of the two inputs.
    #[serde(alias = "average")]
    LinearCombination,
    /// No arithmetic combination.
    #[default]
    #[serde(other)]
    None,
}

/// Bitwise combination. `Not` is the single-input complement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogicalOperation {
    /// Bitwise AND of both inputs.
    And,
    /// Bitwise OR of both inputs.
    Or,
    /// Bitwise XOR of both inputs (alpha takes the minimum).
    Xor,
    /// Complement of the current result.
    Not,
    /// No logical operation.
    #[default]
    #[serde(other)]
    None,
}

impl LogicalOperation {
    /// Whether this operation combines two inputs.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor)
    }
}

/// Binary morphology over a 3×3 square structuring element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MorphologicOperation {
    /// Grow foreground regions.
    Dilation,
    /// Shrink foreground regions.
    Erosion,
    /// Erosion followed by dilation.
    Opening,
    /// Dilation followed by erosion.
    Closing,
    /// Foreground minus its erosion.
    Outline,
    /// No morphology.
    #[default]
    #[serde(other)]
    None,
}

/// Final orientation change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    /// Mirror each row.
    FlipHorizontal,
    /// Reverse row order.
    FlipVertical,
    /// Leave orientation unchanged.
    #[default]
    #[serde(other)]
    Normal,
}

/// Neighborhood-based smoothing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LowPassFilter {
    /// Neighborhood minimum.
    Min,
    /// Neighborhood maximum.
    Max,
    /// Neighborhood mean.
    Mean,
    /// 3×3 median.
    Median,
    /// Rank (order-statistic) filter.
    Order,
    /// Clamp the center into the range of its neighbors.
    ConservativeSmoothing,
    /// Fixed 5×5 Gaussian kernel.
    Gaussian,
    /// No low-pass filter.
    #[default]
    #[serde(other)]
    None,
}

/// Gradient-based edge detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighPassFilter {
    /// Prewitt gradient magnitude.
    Prewitt,
    /// Sobel gradient magnitude.
    Sobel,
    /// 4-neighbor Laplacian.
    Laplacian,
    /// No edge detection.
    #[default]
    #[serde(other)]
    None,
}

/// Scalar arithmetic applied to every color channel of a single matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    /// `value + operand`
    Add,
    /// `value - operand`
    Subtract,
    /// `value * operand`
    Multiply,
    /// `value / operand`
    Divide,
}

/// A point-wise arithmetic operation descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Which arithmetic to apply.
    pub kind: OperationKind,
    /// The scalar right-hand side.
    pub operand: f64,
}

impl Operation {
    /// Create a new operation descriptor.
    #[must_use]
    pub const fn new(kind: OperationKind, operand: f64) -> Self {
        Self { kind, operand }
    }
}

/// Parameters for [`crate::lowpass::order_filter`].
///
/// `rank` is an absolute index into the ascending-sorted neighborhood,
/// not a percentile. Indices past the end of a neighborhood select its
/// last element, so the default rank of 50 picks the maximum of a 3×3
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderFilterParams {
    /// Index into the sorted neighborhood.
    pub rank: usize,
    /// Side length of the square window. Must be odd.
    pub neighborhood_size: u32,
}

impl OrderFilterParams {
    /// Default rank index.
    pub const DEFAULT_RANK: usize = 50;
    /// Default window side length.
    pub const DEFAULT_NEIGHBORHOOD_SIZE: u32 = 3;
}

impl Default for OrderFilterParams {
    fn default() -> Self {
        Self {
            rank: Self::DEFAULT_RANK,
            neighborhood_size: Self::DEFAULT_NEIGHBORHOOD_SIZE,
        }
    }
}

/// Configuration for one pipeline invocation.
///
/// An immutable value handed to [`crate::apply`] per call. Each category
/// names at most one variant; the composer applies them in the fixed
/// order documented on [`crate::pipeline::plan`]. Mutual exclusion
/// between categories (for example arithmetic vs logical) is a host
/// concern: the engine accepts any combination.
///
/// Keys use the host's camelCase names and every field is optional in
/// JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Two-input arithmetic combination.
    pub arithmetic_operation: ArithmeticOperation,

    /// Two-input bitwise combination, or single-input `not`.
    /// A two-input logical operation takes precedence over
    /// `arithmetic_operation`.
    pub logical_operation: LogicalOperation,

    /// Binary morphology applied after the edge detector.
    pub morphologic_operation: MorphologicOperation,

    /// Orientation flip, applied last.
    pub orientation: Orientation,

    /// Smoothing filter.
    pub low_pass_filter: LowPassFilter,

    /// Edge detector. Expects grayscale input.
    pub high_pass_filter: HighPassFilter,

    /// Threshold the intensity to black/white.
    pub to_binary: bool,

    /// Average the color channels.
    #[serde(rename = "toGrayScale", alias = "toGrayscale")]
    pub to_grayscale: bool,

    /// Equalize the intensity histogram.
    pub histogram_equalization: bool,

    /// Weight of the second input for [`ArithmeticOperation::Blending`].
    pub blend_alpha: f64,

    /// Intensity threshold used by binarization and morphology.
    pub binary_threshold: u8,

    /// Parameters for [`LowPassFilter::Order`].
    pub order_filter: OrderFilterParams,

    /// Optional scalar arithmetic on the current result.
    pub point_operation: Option<Operation>,
}

impl PipelineConfig {
    /// Default blend weight of the second input.
    pub const DEFAULT_BLEND_ALPHA: f64 = 0.3;
    /// Default binarization threshold (midpoint of the intensity range).
    pub const DEFAULT_BINARY_THRESHOLD: u8 = 128;
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            arithmetic_operation: ArithmeticOperation::default(),
            logical_operation: LogicalOperation::default(),
            morphologic_operation: MorphologicOperation::default(),
            orientation: Orientation::default(),
            low_pass_filter: LowPassFilter::default(),
            high_pass_filter: HighPassFilter::default(),
            to_binary: false,
            to_grayscale: false,
            histogram_equalization: false,
            blend_alpha: Self::DEFAULT_BLEND_ALPHA,
            binary_threshold: Self::DEFAULT_BINARY_THRESHOLD,
            order_filter: OrderFilterParams::default(),
            point_operation: None,
        }
    }
}

// ───────────────────────────── Names ─────────────────────────────────
//
// `as_str` returns the same string the variant serializes to.

impl ArithmeticOperation {
    /// Configuration name of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Difference => "difference",
            Self::Blending => "blending",
            Self::LinearCombination => "linearCombination",
        }
    }
}

impl LogicalOperation {
    /// Configuration name of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Not => "not",
        }
    }
}

impl MorphologicOperation {
    /// Configuration name of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Dilation => "dilation",
            Self::Erosion => "erosion",
            Self::Opening => "opening",
            Self::Closing => "closing",
            Self::Outline => "outline",
        }
    }
}

impl Orientation {
    /// Configuration name of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::FlipHorizontal => "flip-horizontal",
            Self::FlipVertical => "flip-vertical",
        }
    }
}

impl LowPassFilter {
    /// Configuration name of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Min => "min",
            Self::Max => "max",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Order => "order",
            Self::ConservativeSmoothing => "conservative-smoothing",
            Self::Gaussian => "gaussian",
        }
    }
}

impl HighPassFilter {
    /// Configuration name of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Prewitt => "prewitt",
            Self::Sobel => "sobel",
            Self::Laplacian => "laplacian",
        }
    }
}

impl OperationKind {
    /// Configuration name of this variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }
}

// ───────────────────────────── Errors ────────────────────────────────

/// Errors raised while encoding a matrix.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The matrix has zero rows or zero columns.
    #[error("cannot encode an empty matrix")]
    EmptyMatrix,

    /// A row-form matrix has rows of different lengths.
    #[error("cannot encode jagged rows: row {row} has {found} pixels, expected {expected}")]
    Jagged {
        /// Index of the first offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// The underlying encoder failed.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Errors that can occur while running the engine.
///
/// A pipeline invocation surfaces the first stage error and never a
/// partial result.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A two-input operator found no overlapping area.
    #[error("inputs {left} and {right} have no common area")]
    ShapeMismatch {
        /// Shape of the first input.
        left: Dimensions,
        /// Shape of the second input.
        right: Dimensions,
    },

    /// A single-input stage received a matrix with no pixels.
    #[error("{stage} requires a non-empty matrix")]
    EmptyMatrix {
        /// Name of the stage that rejected the input.
        stage: &'static str,
    },

    /// A scalar operand or filter parameter is out of range.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// Row-form input has rows of different lengths.
    #[error("row {row} has {found} pixels, expected {expected}")]
    JaggedRows {
        /// Index of the first offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Failed to encode the result.
    #[error("failed to encode image: {0}")]
    Encode(#[from] EncodeError),
}
