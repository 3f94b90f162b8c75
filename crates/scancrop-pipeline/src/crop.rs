//! Contour cropper: isolate the brain region of a scan.
//!
//! # Steps
//!
//! 1. Color gate (reject annotated images)
//! 2. Grayscale conversion
//! 3. Intensity threshold
//! 4. Erosion then dilation
//! 5. External contour extraction
//! 6. Largest-area contour selection
//! 7. Extreme points
//! 8. Crop of the original image
//!
//! A rejection at step 1 or an empty contour set at step 6 ends the run
//! with [`CropOutcome::NoRegion`]; later steps do not run.

use tracing::debug;

use crate::color;
use crate::contour::{self, BoundingExtremes};
use crate::diagnostics::{
    Clock, CropDiagnostics, CropSummary, NoClock, OutcomeSummary, StageDiagnostics, StageMetrics,
};
use crate::grayscale;
use crate::mask;
use crate::types::{BgrImage, CropConfig, CropOutcome, NoRegion, PipelineError};

/// Crop the brain region out of `image`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// [`CropConfig::validate`]. Color rejection and missing contours are not
/// errors; they come back as [`CropOutcome::NoRegion`].
pub fn crop_brain_contour(
    image: &BgrImage,
    config: &CropConfig,
) -> Result<CropOutcome, PipelineError> {
    crop_with_diagnostics(image, config, &NoClock).map(|(outcome, _)| outcome)
}

/// Slice the half-open window spanned by `extremes` out of `image`.
///
/// A zero-width or zero-height window produces an empty image.
#[must_use = "returns the cropped image"]
pub fn crop_to_extremes(image: &BgrImage, extremes: &BoundingExtremes) -> BgrImage {
    let window = extremes.window();
    image.crop(window.x, window.y, window.width, window.height)
}

/// Crop the brain region and record per-stage diagnostics.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// [`CropConfig::validate`].
#[allow(clippy::too_many_lines)]
pub fn crop_with_diagnostics<C: Clock>(
    image: &BgrImage,
    config: &CropConfig,
    clock: &C,
) -> Result<(CropOutcome, CropDiagnostics), PipelineError> {
    config.validate()?;

    let total_start = clock.now();
    let summary = |outcome| CropSummary {
        image_width: image.width(),
        image_height: image.height(),
        pixel_count: u64::from(image.width()) * u64::from(image.height()),
        outcome,
    };

    // 1. Color gate.
    let start = clock.now();
    let rejected = color::has_disqualifying_color(image);
    let flagged = if rejected {
        mask::count_foreground(&color::disqualifying_mask(image))
    } else {
        0
    };
    let color_gate = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::ColorGate {
            flagged_pixel_count: flagged,
            rejected,
        },
    };
    if rejected {
        debug!(flagged, "color gate rejected image");
        let diagnostics = CropDiagnostics {
            color_gate,
            grayscale: None,
            threshold: None,
            morphology: None,
            contours: None,
            crop: None,
            total_duration: clock.elapsed(&total_start),
            summary: summary(OutcomeSummary::NoRegion(NoRegion::ColorRejected)),
        };
        return Ok((CropOutcome::NoRegion(NoRegion::ColorRejected), diagnostics));
    }

    // 2. Grayscale.
    let start = clock.now();
    let gray = grayscale::to_grayscale(image);
    let grayscale = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Grayscale {
            width: gray.width(),
            height: gray.height(),
        },
    };

    // 3. Threshold.
    let start = clock.now();
    let binary = mask::threshold(&gray, config.threshold_low, config.threshold_high);
    let foreground_before = mask::count_foreground(&binary);
    let threshold = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Threshold {
            low: config.threshold_low,
            high: config.threshold_high,
            foreground_pixel_count: foreground_before,
        },
    };
    debug!(foreground = foreground_before, "thresholded");

    // 4. Erosion + dilation.
    let start = clock.now();
    let cleaned = mask::clean(&binary, config.morph_iterations);
    let foreground_after = mask::count_foreground(&cleaned);
    let morphology = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Morphology {
            iterations: config.morph_iterations,
            foreground_before,
            foreground_after,
        },
    };
    debug!(foreground = foreground_after, "mask cleaned");

    // 5-6. Contours and selection.
    let start = clock.now();
    let contours = contour::find_external_contours(&cleaned);
    let selected = contour::largest(&contours);
    let contours_stage = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Contours {
            contour_count: contours.len(),
            total_point_count: contours.iter().map(contour::Contour::len).sum(),
            largest_area: selected.map_or(0.0, contour::Contour::area),
        },
    };
    debug!(count = contours.len(), "external contours found");

    let Some(extremes) = selected.and_then(contour::Contour::extremes) else {
        debug!("no contour survived cleanup");
        let diagnostics = CropDiagnostics {
            color_gate,
            grayscale: Some(grayscale),
            threshold: Some(threshold),
            morphology: Some(morphology),
            contours: Some(contours_stage),
            crop: None,
            total_duration: clock.elapsed(&total_start),
            summary: summary(OutcomeSummary::NoRegion(NoRegion::NoContour)),
        };
        return Ok((CropOutcome::NoRegion(NoRegion::NoContour), diagnostics));
    };

    // 7-8. Extremes and crop.
    let start = clock.now();
    let window = extremes.window();
    let cropped = crop_to_extremes(image, &extremes);
    let crop = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Crop {
            x: window.x,
            y: window.y,
            width: window.width,
            height: window.height,
        },
    };
    debug!(
        x = window.x,
        y = window.y,
        width = window.width,
        height = window.height,
        "cropped region"
    );

    let diagnostics = CropDiagnostics {
        color_gate,
        grayscale: Some(grayscale),
        threshold: Some(threshold),
        morphology: Some(morphology),
        contours: Some(contours_stage),
        crop: Some(crop),
        total_duration: clock.elapsed(&total_start),
        summary: summary(OutcomeSummary::Cropped {
            width: cropped.width(),
            height: cropped.height(),
        }),
    };
    Ok((CropOutcome::Cropped(cropped), diagnostics))
}
