//! Per-stage timing collected by [`crate::apply_with_diagnostics`].
//!
//! Timestamps come from the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations are serialized as fractional seconds (`f64`) since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Stage;
use crate::types::Dimensions;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Executed stages, in order.
    pub stages: Vec<StageDiagnostics>,
    /// Wall-clock duration of the whole invocation (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Shape of the primary input.
    pub input: Dimensions,
    /// Shape of the result.
    pub output: Dimensions,
}

/// Diagnostics for a single executed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Which stage ran.
    pub stage: Stage,
    /// Wall-clock duration of the stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Shape of the stage's output.
    pub output: Dimensions,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {} -> {} ({} pixels)",
            self.input,
            self.output,
            self.output.area(),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        if self.stages.is_empty() {
            lines.push("No stages selected.".to_owned());
            return lines.join("\n");
        }

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Output"
        ));
        lines.push("-".repeat(60));

        let total_ms = duration_ms(self.total_duration);
        for diag in &self.stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{:<24} {ms:>8.3}ms {pct:>9.1}%  {}",
                diag.stage.name(),
                diag.output,
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
