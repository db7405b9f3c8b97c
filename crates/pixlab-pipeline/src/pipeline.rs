//! Pipeline composer: turns a configuration plus one or two inputs into
//! a single result.
//!
//! Stages run in a fixed order (see [`plan`]). The two-input combine
//! stage reads the **original** inputs; every later stage reads the
//! running result. The two are kept in separate bindings so neither can
//! be confused for the other.
//!
//! A stage error aborts the whole call. Partial results are never
//! returned.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::diagnostics::{PipelineDiagnostics, StageDiagnostics};
use crate::types::{
    ArithmeticOperation, Dimensions, HighPassFilter, LogicalOperation, LowPassFilter,
    MorphologicOperation, Operation, Orientation, PipelineConfig, PipelineError, PixelMatrix,
};
use crate::{composite, histogram, point};

/// One step of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Bitwise combination of the two original inputs.
    Logical(LogicalOperation),
    /// Arithmetic combination of the two original inputs.
    Arithmetic(ArithmeticOperation),
    /// Complement of the current result.
    Not,
    /// Scalar arithmetic on the current result.
    PointOperation(Operation),
    /// Grayscale conversion.
    Grayscale,
    /// Black/white thresholding.
    Binarize,
    /// Histogram equalization.
    Equalize,
    /// Smoothing filter.
    LowPass(LowPassFilter),
    /// Edge detector.
    HighPass(HighPassFilter),
    /// Binary morphology.
    Morphology(MorphologicOperation),
    /// Final flip.
    Orientation(Orientation),
}

impl Stage {
    /// Short human-readable label, e.g. `low-pass median`.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Logical(op) => format!("logical {}", op.as_str()),
            Self::Arithmetic(op) => format!("arithmetic {}", op.as_str()),
            Self::Not => "not".to_owned(),
            Self::PointOperation(op) => format!("point {} {}", op.kind.as_str(), op.operand),
            Self::Grayscale => "grayscale".to_owned(),
            Self::Binarize => "binarize".to_owned(),
            Self::Equalize => "equalize".to_owned(),
            Self::LowPass(f) => format!("low-pass {}", f.as_str()),
            Self::HighPass(f) => format!("high-pass {}", f.as_str()),
            Self::Morphology(op) => format!("morphology {}", op.as_str()),
            Self::Orientation(o) => format!("orientation {}", o.as_str()),
        }
    }

    /// Whether this stage reads both original inputs.
    #[must_use]
    pub const fn is_combine(&self) -> bool {
        matches!(self, Self::Logical(_) | Self::Arithmetic(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// The ordered list of stages `config` selects.
///
/// 1. Combine, only when a secondary input is present: the two-input
///    logical operation if one is selected, otherwise the arithmetic
///    operation if one is selected.
/// 2. `not`, when the logical operation is `not`.
/// 3. Point operation.
/// 4. Grayscale.
/// 5. Binarize.
/// 6. Histogram equalization.
/// 7. Low-pass filter.
/// 8. High-pass filter.
/// 9. Morphology.
/// 10. Orientation flip, last so filters see the original orientation.
#[must_use]
pub fn plan(config: &PipelineConfig, has_secondary: bool) -> Vec<Stage> {
    let mut stages = Vec::new();

    if has_secondary {
        if config.logical_operation.is_binary() {
            stages.push(Stage::Logical(config.logical_operation));
        } else if config.arithmetic_operation != ArithmeticOperation::None {
            stages.push(Stage::Arithmetic(config.arithmetic_operation));
        }
    }
    if config.logical_operation == LogicalOperation::Not {
        stages.push(Stage::Not);
    }
    if let Some(op) = config.point_operation {
        stages.push(Stage::PointOperation(op));
    }
    if config.to_grayscale {
        stages.push(Stage::Grayscale);
    }
    if config.to_binary {
        stages.push(Stage::Binarize);
    }
    if config.histogram_equalization {
        stages.push(Stage::Equalize);
    }
    if config.low_pass_filter != LowPassFilter::None {
        stages.push(Stage::LowPass(config.low_pass_filter));
    }
    if config.high_pass_filter != HighPassFilter::None {
        stages.push(Stage::HighPass(config.high_pass_filter));
    }
    if config.morphologic_operation != MorphologicOperation::None {
        stages.push(Stage::Morphology(config.morphologic_operation));
    }
    if config.orientation != Orientation::Normal {
        stages.push(Stage::Orientation(config.orientation));
    }

    stages
}

/// The original inputs of a run.
#[derive(Clone, Copy)]
struct Originals<'a> {
    primary: &'a PixelMatrix,
    secondary: Option<&'a PixelMatrix>,
}

/// Run a two-input operator on the original inputs. A missing secondary
/// has no overlap with the primary.
fn combine(
    originals: Originals<'_>,
    f: impl FnOnce(&PixelMatrix, &PixelMatrix) -> Result<PixelMatrix, PipelineError>,
) -> Result<PixelMatrix, PipelineError> {
    let a = originals.primary;
    match originals.secondary {
        Some(b) => f(a, b),
        None => Err(PipelineError::ShapeMismatch {
            left: Dimensions::of(a),
            right: Dimensions {
                width: 0,
                height: 0,
            },
        }),
    }
}

/// Run one stage. Combine stages read `originals`; all others read
/// `current`.
fn run_stage(
    stage: Stage,
    originals: Originals<'_>,
    current: &PixelMatrix,
    config: &PipelineConfig,
) -> Result<PixelMatrix, PipelineError> {
    let unchanged = || current.clone();
    match stage {
        Stage::Logical(op) => match op {
            LogicalOperation::And => combine(originals, composite::and),
            LogicalOperation::Or => combine(originals, composite::or),
            LogicalOperation::Xor => combine(originals, composite::xor),
            LogicalOperation::Not => composite::not(current),
            LogicalOperation::None => Ok(unchanged()),
        },
        Stage::Arithmetic(op) => match op {
            ArithmeticOperation::Add => combine(originals, composite::add),
            ArithmeticOperation::Subtract => combine(originals, composite::subtract),
            ArithmeticOperation::Difference => combine(originals, composite::difference),
            ArithmeticOperation::Blending => combine(originals, |a, b| {
                composite::blend(a, b, config.blend_alpha)
            }),
            ArithmeticOperation::LinearCombination => {
                combine(originals, composite::average)
            }
            ArithmeticOperation::None => Ok(unchanged()),
        },
        Stage::Not => composite::not(current),
        Stage::PointOperation(op) => point::apply_operation(current, op),
        Stage::Grayscale => point::grayscale(current),
        Stage::Binarize => point::binarize(current, config.binary_threshold),
        Stage::Equalize => histogram::equalize(current),
        Stage::LowPass(filter) => Ok(filter
            .apply(current, config.order_filter)?
            .unwrap_or_else(unchanged)),
        Stage::HighPass(filter) => Ok(filter.apply(current)?.unwrap_or_else(unchanged)),
        Stage::Morphology(op) => Ok(op
            .apply(current, config.binary_threshold)?
            .unwrap_or_else(unchanged)),
        Stage::Orientation(orientation) => match orientation {
            Orientation::Normal => Ok(unchanged()),
            Orientation::FlipHorizontal => point::flip_horizontal(current),
            Orientation::FlipVertical => point::flip_vertical(current),
        },
    }
}

/// Result of [`apply_with_diagnostics`].
#[derive(Debug, Clone)]
pub struct Applied {
    /// The resultant matrix.
    pub image: PixelMatrix,
    /// Per-stage timing.
    pub diagnostics: PipelineDiagnostics,
}

/// Run the pipeline and collect per-stage diagnostics.
///
/// Returns `Ok(None)` when `primary` is absent or has no pixels. A
/// `secondary` that is absent or empty skips the combine stage. With no
/// stage selected the result is a copy of `primary`.
///
/// # Errors
///
/// Returns the first error raised by any stage.
pub fn apply_with_diagnostics(
    primary: Option<&PixelMatrix>,
    secondary: Option<&PixelMatrix>,
    config: &PipelineConfig,
) -> Result<Option<Applied>, PipelineError> {
    let Some(primary) = primary.filter(|m| !Dimensions::of(m).is_empty()) else {
        tracing::debug!("no primary input, nothing to apply");
        return Ok(None);
    };
    let secondary = secondary.filter(|m| !Dimensions::of(m).is_empty());
    let originals = Originals { primary, secondary };

    let stages = plan(config, secondary.is_some());
    if secondary.is_none()
        && (config.logical_operation.is_binary()
            || config.arithmetic_operation != ArithmeticOperation::None)
    {
        tracing::debug!("combine stage skipped: no secondary input");
    }

    let start = Instant::now();
    let mut current = Cow::Borrowed(primary);
    let mut diagnostics = Vec::with_capacity(stages.len());

    for stage in stages {
        let t = Instant::now();
        let output = run_stage(stage, originals, &current, config)?;
        let duration = t.elapsed();
        let dims = Dimensions::of(&output);
        tracing::debug!(
            %stage,
            dimensions = %dims,
            elapsed_ms = duration.as_secs_f64() * 1000.0,
            "stage complete"
        );
        diagnostics.push(StageDiagnostics {
            stage,
            duration,
            output: dims,
        });
        current = Cow::Owned(output);
    }

    let image = current.into_owned();
    let diagnostics = PipelineDiagnostics {
        stages: diagnostics,
        total_duration: start.elapsed(),
        input: Dimensions::of(primary),
        output: Dimensions::of(&image),
    };
    Ok(Some(Applied { image, diagnostics }))
}

/// Run the pipeline.
///
/// Returns `Ok(None)` when `primary` is absent or has no pixels. See
/// [`apply_with_diagnostics`] for the full contract.
///
/// # Errors
///
/// Returns the first error raised by any stage.
pub fn apply(
    primary: Option<&PixelMatrix>,
    secondary: Option<&PixelMatrix>,
    config: &PipelineConfig,
) -> Result<Option<PixelMatrix>, PipelineError> {
    Ok(apply_with_diagnostics(primary, secondary, config)?.map(|applied| applied.image))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::types::{OperationKind, OrderFilterParams};

    fn solid(width: u32, height: u32, pixel: [u8; 4]) -> PixelMatrix {
        PixelMatrix::from_pixel(width, height, Rgba(pixel))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn gradient(width: u32, height: u32) -> PixelMatrix {
        PixelMatrix::from_fn(width, height, |x, y| {
            Rgba([(x * 30) as u8, (y * 30) as u8, 60, 255])
        })
    }

    #[test]
    fn default_config_plans_nothing() {
        assert!(plan(&PipelineConfig::default(), true).is_empty());
    }

    #[test]
    fn plan_orders_every_stage() {
        let config = PipelineConfig {
            arithmetic_operation: ArithmeticOperation::Add,
            logical_operation: LogicalOperation::Not,
            morphologic_operation: MorphologicOperation::Outline,
            orientation: Orientation::FlipVertical,
            low_pass_filter: LowPassFilter::Gaussian,
            high_pass_filter: HighPassFilter::Sobel,
            to_binary: true,
            to_grayscale: true,
            histogram_equalization: true,
            point_operation: Some(Operation::new(OperationKind::Add, 1.0)),
            ..PipelineConfig::default()
        };
        assert_eq!(
            plan(&config, true),
            vec![
                Stage::Arithmetic(ArithmeticOperation::Add),
                Stage::Not,
                Stage::PointOperation(Operation::new(OperationKind::Add, 1.0)),
                Stage::Grayscale,
                Stage::Binarize,
                Stage::Equalize,
                Stage::LowPass(LowPassFilter::Gaussian),
                Stage::HighPass(HighPassFilter::Sobel),
                Stage::Morphology(MorphologicOperation::Outline),
                Stage::Orientation(Orientation::FlipVertical),
            ]
        );
    }

    #[test]
    fn logical_takes_precedence_over_arithmetic() {
        let config = PipelineConfig {
            arithmetic_operation: ArithmeticOperation::Add,
            logical_operation: LogicalOperation::Xor,
            ..PipelineConfig::default()
        };
        assert_eq!(
            plan(&config, true),
            vec![Stage::Logical(LogicalOperation::Xor)]
        );
    }

    #[test]
    fn combine_needs_secondary() {
        let config = PipelineConfig {
            arithmetic_operation: ArithmeticOperation::Add,
            ..PipelineConfig::default()
        };
        assert!(plan(&config, false).is_empty());
    }

    #[test]
    fn absent_or_empty_primary_yields_none() {
        let config = PipelineConfig::default();
        assert!(apply(None, None, &config).unwrap().is_none());
        let empty = PixelMatrix::new(0, 3);
        assert!(apply(Some(&empty), None, &config).unwrap().is_none());
    }

    #[test]
    fn noop_config_returns_copy() {
        let a = gradient(4, 3);
        let out = apply(Some(&a), None, &PipelineConfig::default()).unwrap().unwrap();
        assert_eq!(out, a);
    }

    #[test]
    fn empty_secondary_skips_combine() {
        let a = gradient(4, 3);
        let config = PipelineConfig {
            arithmetic_operation: ArithmeticOperation::Add,
            ..PipelineConfig::default()
        };
        let out = apply(Some(&a), Some(&PixelMatrix::new(0, 0)), &config)
            .unwrap()
            .unwrap();
        assert_eq!(out, a);
    }

    #[test]
    fn not_applies_to_combined_result() {
        let a = solid(2, 2, [10, 20, 30, 255]);
        let b = solid(2, 2, [5, 5, 5, 255]);
        let config = PipelineConfig {
            arithmetic_operation: ArithmeticOperation::Add,
            logical_operation: LogicalOperation::Not,
            ..PipelineConfig::default()
        };
        let out = apply(Some(&a), Some(&b), &config).unwrap().unwrap();
        // add -> (15, 25, 35, 255), not -> (240, 230, 220, 255)
        assert!(out.pixels().all(|p| p.0 == [240, 230, 220, 255]));
    }

    #[test]
    fn not_runs_without_secondary() {
        let a = solid(2, 3, [10, 20, 30, 99]);
        let config = PipelineConfig {
            arithmetic_operation: ArithmeticOperation::Add,
            logical_operation: LogicalOperation::Not,
            ..PipelineConfig::default()
        };
        let out = apply(Some(&a), None, &config).unwrap().unwrap();
        assert!(out.pixels().all(|p| p.0 == [245, 235, 225, 99]));
    }

    #[test]
    fn point_operation_runs_between_not_and_grayscale() {
        let a = solid(2, 2, [10, 200, 30, 255]);
        let config = PipelineConfig {
            logical_operation: LogicalOperation::Not,
            point_operation: Some(Operation::new(OperationKind::Subtract, 100.0)),
            to_grayscale: true,
            ..PipelineConfig::default()
        };
        let out = apply(Some(&a), None, &config).unwrap().unwrap();
        // not -> (245, 55, 225), -100 -> (145, 0, 125), gray -> 90.
        assert!(out.pixels().all(|p| p.0 == [90, 90, 90, 255]));
    }

    #[test]
    fn huge_order_window_goes_through_composer() {
        let a = gradient(3, 2);
        let config = PipelineConfig {
            low_pass_filter: LowPassFilter::Order,
            order_filter: OrderFilterParams {
                rank: 0,
                neighborhood_size: u32::MAX,
            },
            ..PipelineConfig::default()
        };
        let out = apply(Some(&a), None, &config).unwrap().unwrap();
        assert!(out.pixels().all(|p| p.0 == [0, 0, 60, 255]));
    }

    #[test]
    fn even_order_window_is_rejected_by_composer() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"lowPassFilter": "order", "orderFilter": {"neighborhoodSize": 20000}}"#,
        )
        .unwrap();
        assert!(matches!(
            apply(Some(&gradient(2, 2)), None, &config),
            Err(PipelineError::InvalidOperand(_))
        ));
    }

    #[test]
    fn blend_uses_configured_alpha() {
        let a = solid(1, 1, [0, 0, 0, 255]);
        let b = solid(1, 1, [200, 100, 50, 255]);
        let config = PipelineConfig {
            arithmetic_operation: ArithmeticOperation::Blending,
            blend_alpha: 0.5,
            ..PipelineConfig::default()
        };
        let out = apply(Some(&a), Some(&b), &config).unwrap().unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [100, 50, 25, 255]);
    }

    #[test]
    fn orientation_runs_after_filters() {
        let a = gradient(5, 5);
        let config = PipelineConfig {
            to_grayscale: true,
            high_pass_filter: HighPassFilter::Sobel,
            orientation: Orientation::FlipHorizontal,
            ..PipelineConfig::default()
        };
        let out = apply(Some(&a), None, &config).unwrap().unwrap();
        let expected = point::flip_horizontal(
            &crate::edge::sobel(&point::grayscale(&a).unwrap()).unwrap(),
        )
        .unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn stage_error_aborts_whole_call() {
        let a = gradient(3, 3);
        let b = solid(3, 3, [1, 1, 1, 1]);
        let config = PipelineConfig {
            arithmetic_operation: ArithmeticOperation::Blending,
            blend_alpha: 2.0,
            to_grayscale: true,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            apply(Some(&a), Some(&b), &config),
            Err(PipelineError::InvalidOperand(_))
        ));
    }

    #[test]
    fn combine_crops_to_common_area() {
        let a = gradient(5, 2);
        let b = solid(3, 4, [0, 0, 0, 0]);
        let config = PipelineConfig {
            logical_operation: LogicalOperation::Or,
            ..PipelineConfig::default()
        };
        let out = apply(Some(&a), Some(&b), &config).unwrap().unwrap();
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let a = gradient(4, 4);
        let b = solid(4, 4, [9, 9, 9, 9]);
        let (a0, b0) = (a.clone(), b.clone());
        let config = PipelineConfig {
            logical_operation: LogicalOperation::And,
            to_grayscale: true,
            low_pass_filter: LowPassFilter::Mean,
            ..PipelineConfig::default()
        };
        let _ = apply(Some(&a), Some(&b), &config).unwrap();
        assert_eq!(a, a0);
        assert_eq!(b, b0);
    }

    #[test]
    fn diagnostics_record_each_stage() {
        let a = gradient(6, 4);
        let config = PipelineConfig {
            to_grayscale: true,
            low_pass_filter: LowPassFilter::Median,
            ..PipelineConfig::default()
        };
        let applied = apply_with_diagnostics(Some(&a), None, &config)
            .unwrap()
            .unwrap();
        let stages: Vec<Stage> = applied.diagnostics.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![Stage::Grayscale, Stage::LowPass(LowPassFilter::Median)]
        );
        assert_eq!(applied.diagnostics.input, Dimensions::of(&a));
        assert_eq!(applied.diagnostics.output, Dimensions::of(&applied.image));
        assert!(
            applied
                .diagnostics
                .stages
                .iter()
                .all(|s| s.duration <= applied.diagnostics.total_duration)
        );
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::LowPass(LowPassFilter::Median).to_string(), "low-pass median");
        assert_eq!(
            Stage::Orientation(Orientation::FlipHorizontal).to_string(),
            "orientation flip-horizontal"
        );
        assert_eq!(Stage::Logical(LogicalOperation::And).name(), "logical and");
        assert!(Stage::Arithmetic(ArithmeticOperation::Add).is_combine());
        assert!(!Stage::Not.is_combine());
    }
}
