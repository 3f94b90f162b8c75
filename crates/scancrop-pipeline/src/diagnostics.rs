//! Crop diagnostics: timing and counts for each pipeline stage.
//!
//! Every call to [`crop_with_diagnostics`](crate::crop::crop_with_diagnostics)
//! fills in a [`CropDiagnostics`] alongside the outcome. Stages that did
//! not run (everything after a color-gate rejection, the crop after an
//! empty contour search) are left as `None`.
//!
//! Time is read through the [`Clock`] trait so this crate stays free of
//! platform clocks; the CLI supplies one backed by `std::time::Instant`.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::NoRegion;

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A [`Clock`] that never advances. Every duration is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) -> Self::Instant {}

    fn elapsed(&self, _since: &Self::Instant) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single crop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropDiagnostics {
    /// Stage 1: color gate. Always runs.
    pub color_gate: StageDiagnostics,
    /// Stage 2: grayscale conversion.
    pub grayscale: Option<StageDiagnostics>,
    /// Stage 3: intensity threshold.
    pub threshold: Option<StageDiagnostics>,
    /// Stage 4: erosion + dilation.
    pub morphology: Option<StageDiagnostics>,
    /// Stages 5-6: external contour extraction and selection.
    pub contours: Option<StageDiagnostics>,
    /// Stages 7-8: extremes and crop.
    pub crop: Option<StageDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the run.
    pub summary: CropSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Color gate metrics.
    ColorGate {
        /// Pixels in any disqualifying hue range.
        flagged_pixel_count: u64,
        /// Whether the image was rejected.
        rejected: bool,
    },
    /// Grayscale conversion metrics.
    Grayscale {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Threshold metrics.
    Threshold {
        /// Inclusive lower intensity bound.
        low: u8,
        /// Inclusive upper intensity bound.
        high: u8,
        /// Pixels inside the band.
        foreground_pixel_count: u64,
    },
    /// Morphological cleanup metrics.
    Morphology {
        /// Erosion (and dilation) pass count.
        iterations: u8,
        /// Foreground pixels before cleanup.
        foreground_before: u64,
        /// Foreground pixels after cleanup.
        foreground_after: u64,
    },
    /// Contour extraction metrics.
    Contours {
        /// Number of external contours found.
        contour_count: usize,
        /// Total vertices across all contours.
        total_point_count: usize,
        /// Area of the selected contour (0 when none).
        largest_area: f64,
    },
    /// Crop metrics.
    Crop {
        /// Left column of the window.
        x: u32,
        /// Top row of the window.
        y: u32,
        /// Window width.
        width: u32,
        /// Window height.
        height: u32,
    },
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeSummary {
    /// A crop of the given size was produced.
    Cropped {
        /// Crop width in pixels.
        width: u32,
        /// Crop height in pixels.
        height: u32,
    },
    /// No crop was produced.
    NoRegion(NoRegion),
}

/// High-level summary of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// How the run ended.
    pub outcome: OutcomeSummary,
}

impl CropDiagnostics {
    /// Stages that ran, in order, with their display names.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        let mut stages = vec![("Color Gate", &self.color_gate)];
        let optional = [
            ("Grayscale", &self.grayscale),
            ("Threshold", &self.threshold),
            ("Morphology", &self.morphology),
            ("Contours", &self.contours),
            ("Crop", &self.crop),
        ];
        for (name, stage) in optional {
            if let Some(stage) = stage {
                stages.push((name, stage));
            }
        }
        stages
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Crop Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(72));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(match self.summary.outcome {
            OutcomeSummary::Cropped { width, height } => format!("Outcome: cropped {width}x{height}"),
            OutcomeSummary::NoRegion(reason) => format!("Outcome: no region ({reason})"),
        });

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
pub(crate) fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::ColorGate {
            flagged_pixel_count,
            rejected,
        } => {
            let verdict = if *rejected { "rejected" } else { "passed" };
            format!("{verdict} ({flagged_pixel_count} flagged px)")
        }
        StageMetrics::Grayscale { width, height } => format!("{width}x{height}"),
        StageMetrics::Threshold {
            low,
            high,
            foreground_pixel_count,
        } => format!("[{low}, {high}] fg={foreground_pixel_count}"),
        StageMetrics::Morphology {
            iterations,
            foreground_before,
            foreground_after,
        } => format!("x{iterations} fg={foreground_before}->{foreground_after}"),
        StageMetrics::Contours {
            contour_count,
            total_point_count,
            largest_area,
        } => format!("{contour_count} contours, {total_point_count} pts, largest area={largest_area:.1}"),
        StageMetrics::Crop {
            x,
            y,
            width,
            height,
        } => format!("{width}x{height} at ({x}, {y})"),
    }
}
