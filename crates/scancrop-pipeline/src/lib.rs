//! scancrop-pipeline: Pure scan preprocessing pipeline (sans-IO).
//!
//! Prepares scan images for a downstream classifier through:
//! color gate -> grayscale -> threshold -> erosion/dilation ->
//! external contours -> largest contour -> extreme points -> crop.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! buffers and returns structured data. Reading files, writing crops,
//! and installing a log subscriber live in `scancrop-bench`.
//!
//! Every function is a pure function of its inputs, so images may be
//! processed concurrently from any number of threads.

pub mod classify;
pub mod color;
pub mod contour;
pub mod crop;
pub mod diagnostics;
pub mod grayscale;
pub mod mask;
pub mod prepare;
pub mod types;

pub use classify::{Assessment, Classifier, Verdict, classify};
pub use color::has_disqualifying_color;
pub use contour::{BoundingExtremes, Contour, CropWindow};
pub use crop::crop_brain_contour;
pub use prepare::{ModelInput, PrepareConfig, prepare};
pub use types::{
    BgrImage, ColorMask, CropConfig, CropOutcome, Dimensions, NoRegion, PipelineError, Point,
};

/// Decode raw image bytes and crop the brain region.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration,
/// then returns the [`CropOutcome`] of [`crop_brain_contour`].
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Returns [`PipelineError::InvalidConfig`] if `config` is inconsistent.
pub fn process(image_bytes: &[u8], config: &CropConfig) -> Result<CropOutcome, PipelineError> {
    let image = grayscale::decode(image_bytes)?;
    crop_brain_contour(&image, config)
}
