//! pixlab: command-line host for the pixlab transformation pipeline.
//!
//! Reads one or two image files, runs the configured stages, and writes
//! the result as PNG. Optionally prints the result's intensity histogram
//! and a per-stage diagnostics report.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pixlab -- [OPTIONS] <IMAGE_A>
//! ```
//!
//! Set `RUST_LOG=debug` to log every stage.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use pixlab_pipeline::{
    ArithmeticOperation, HighPassFilter, LogicalOperation, LowPassFilter, MorphologicOperation,
    Operation, OperationKind, OrderFilterParams, Orientation, PipelineConfig,
};

/// Combine, filter and remap images with a fixed-order pipeline.
#[derive(Parser)]
#[command(name = "pixlab", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to the primary image (PNG, JPEG, BMP, WebP).
    image_a: PathBuf,

    /// Path to the secondary image for two-input operations.
    #[arg(long)]
    image_b: Option<PathBuf>,

    /// Write the result as PNG to this path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Two-input arithmetic combination.
    #[arg(long, value_enum)]
    arithmetic: Option<Arithmetic>,

    /// Two-input bitwise combination, or `not` on the current result.
    /// Takes precedence over `--arithmetic`.
    #[arg(long, value_enum)]
    logical: Option<Logical>,

    /// Binary morphology on the thresholded result.
    #[arg(long, value_enum)]
    morphology: Option<Morphology>,

    /// Smoothing filter.
    #[arg(long, value_enum)]
    low_pass: Option<LowPass>,

    /// Edge detector (expects grayscale input; combine with `--grayscale`).
    #[arg(long, value_enum)]
    high_pass: Option<HighPass>,

    /// Final flip.
    #[arg(long, value_enum)]
    orientation: Option<Flip>,

    /// Convert to grayscale.
    #[arg(long)]
    grayscale: bool,

    /// Threshold to black/white.
    #[arg(long)]
    binary: bool,

    /// Equalize the intensity histogram.
    #[arg(long)]
    equalize: bool,

    /// Weight of the secondary image for `--arithmetic blend` (0.0-1.0).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLEND_ALPHA)]
    blend_alpha: f64,

    /// Intensity threshold for `--binary` and `--morphology`.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BINARY_THRESHOLD)]
    threshold: u8,

    /// Rank index for `--low-pass order` (clamped to the window).
    #[arg(long, default_value_t = OrderFilterParams::DEFAULT_RANK)]
    rank: usize,

    /// Window side length for `--low-pass order` (odd).
    #[arg(long, default_value_t = OrderFilterParams::DEFAULT_NEIGHBORHOOD_SIZE)]
    neighborhood_size: u32,

    /// Scalar arithmetic applied to every color channel.
    #[arg(long, value_enum, requires = "operand")]
    operation: Option<PointOp>,

    /// Right-hand side of `--operation`.
    #[arg(long, requires = "operation", allow_negative_numbers = true)]
    operand: Option<f64>,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Keys follow the host configuration (`lowPassFilter`, `toGrayScale`, ...).
    #[arg(long)]
    config_json: Option<String>,

    /// Print the result's 256-bucket intensity histogram as JSON.
    #[arg(long)]
    histogram: bool,

    /// Print per-stage timing.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long, requires = "diagnostics")]
    json: bool,
}

/// Two-input arithmetic selection.
#[derive(Clone, Copy, ValueEnum)]
enum Arithmetic {
    /// Saturating sum.
    Add,
    /// Saturating difference.
    Subtract,
    /// Absolute difference.
    Difference,
    /// Weighted blend (see `--blend-alpha`).
    Blend,
    /// Per-channel average.
    Average,
}

/// Bitwise operation selection.
#[derive(Clone, Copy, ValueEnum)]
enum Logical {
    And,
    Or,
    Xor,
    Not,
}

/// Morphology selection.
#[derive(Clone, Copy, ValueEnum)]
enum Morphology {
    Dilation,
    Erosion,
    Opening,
    Closing,
    Outline,
}

/// Low-pass filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum LowPass {
    Min,
    Max,
    Mean,
    Median,
    /// Rank filter (see `--rank`, `--neighborhood-size`).
    Order,
    ConservativeSmoothing,
    /// Fixed 5×5 kernel.
    Gaussian,
}

/// High-pass filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum HighPass {
    Prewitt,
    Sobel,
    Laplacian,
}

/// Orientation selection.
#[derive(Clone, Copy, ValueEnum)]
enum Flip {
    Horizontal,
    Vertical,
}

/// Point operation selection.
#[derive(Clone, Copy, ValueEnum)]
enum PointOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(PipelineConfig {
        arithmetic_operation: match cli.arithmetic {
            None => ArithmeticOperation::None,
            Some(Arithmetic::Add) => ArithmeticOperation::Add,
            Some(Arithmetic::Subtract) => ArithmeticOperation::Subtract,
            Some(Arithmetic::Difference) => ArithmeticOperation::Difference,
            Some(Arithmetic::Blend) => ArithmeticOperation::Blending,
            Some(Arithmetic::Average) => ArithmeticOperation::LinearCombination,
        },
        logical_operation: match cli.logical {
            None => LogicalOperation::None,
            Some(Logical::And) => LogicalOperation::And,
            Some(Logical::Or) => LogicalOperation::Or,
            Some(Logical::Xor) => LogicalOperation::Xor,
            Some(Logical::Not) => LogicalOperation::Not,
        },
        morphologic_operation: match cli.morphology {
            None => MorphologicOperation::None,
            Some(Morphology::Dilation) => MorphologicOperation::Dilation,
            Some(Morphology::Erosion) => MorphologicOperation::Erosion,
            Some(Morphology::Opening) => MorphologicOperation::Opening,
            Some(Morphology::Closing) => MorphologicOperation::Closing,
            Some(Morphology::Outline) => MorphologicOperation::Outline,
        },
        orientation: match cli.orientation {
            None => Orientation::Normal,
            Some(Flip::Horizontal) => Orientation::FlipHorizontal,
            Some(Flip::Vertical) => Orientation::FlipVertical,
        },
        low_pass_filter: match cli.low_pass {
            None => LowPassFilter::None,
            Some(LowPass::Min) => LowPassFilter::Min,
            Some(LowPass::Max) => LowPassFilter::Max,
            Some(LowPass::Mean) => LowPassFilter::Mean,
            Some(LowPass::Median) => LowPassFilter::Median,
            Some(LowPass::Order) => LowPassFilter::Order,
            Some(LowPass::ConservativeSmoothing) => LowPassFilter::ConservativeSmoothing,
            Some(LowPass::Gaussian) => LowPassFilter::Gaussian,
        },
        high_pass_filter: match cli.high_pass {
            None => HighPassFilter::None,
            Some(HighPass::Prewitt) => HighPassFilter::Prewitt,
            Some(HighPass::Sobel) => HighPassFilter::Sobel,
            Some(HighPass::Laplacian) => HighPassFilter::Laplacian,
        },
        to_binary: cli.binary,
        to_grayscale: cli.grayscale,
        histogram_equalization: cli.equalize,
        blend_alpha: cli.blend_alpha,
        binary_threshold: cli.threshold,
        order_filter: OrderFilterParams {
            rank: cli.rank,
            neighborhood_size: cli.neighborhood_size,
        },
        point_operation: match (cli.operation, cli.operand) {
            (Some(op), Some(operand)) => {
                let kind = match op {
                    PointOp::Add => OperationKind::Add,
                    PointOp::Subtract => OperationKind::Subtract,
                    PointOp::Multiply => OperationKind::Multiply,
                    PointOp::Divide => OperationKind::Divide,
                };
                Some(Operation::new(kind, operand))
            }
            _ => None,
        },
    })
}

/// Read and decode one input image.
fn load(path: &Path) -> Result<pixlab_pipeline::PixelMatrix, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let image = pixlab_pipeline::decode(&bytes)
        .map_err(|e| format!("Error decoding {}: {e}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        width = image.width(),
        height = image.height(),
        "loaded image"
    );
    Ok(image)
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;

    let a = load(&cli.image_a)?;
    let b = cli.image_b.as_deref().map(load).transpose()?;

    let applied = pixlab_pipeline::apply_with_diagnostics(Some(&a), b.as_ref(), &config)
        .map_err(|e| format!("Pipeline error: {e}"))?
        .ok_or_else(|| format!("{} has no pixels", cli.image_a.display()))?;

    if let Some(ref path) = cli.output {
        let png = pixlab_pipeline::encode(&applied.image)
            .map_err(|e| format!("Error encoding result: {e}"))?;
        std::fs::write(path, &png)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = png.len(), "wrote result");
    } else {
        tracing::info!("no --output given, result not written");
    }

    if cli.histogram {
        let hist = pixlab_pipeline::histogram(&applied.image);
        let json = serde_json::to_string(&hist)
            .map_err(|e| format!("Error serializing histogram: {e}"))?;
        println!("{json}");
    }

    if cli.diagnostics {
        if cli.json {
            let json = serde_json::to_string_pretty(&applied.diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", applied.diagnostics.report());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
