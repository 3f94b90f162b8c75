//! Classification seam: crop, prepare, and score one image.
//!
//! The trained model lives outside this crate. Callers plug it in through
//! the [`Classifier`] trait; closures of the right shape implement it.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crop::crop_brain_contour;
use crate::prepare::{ModelInput, PrepareConfig, prepare};
use crate::types::{BgrImage, CropConfig, CropOutcome, NoRegion, PipelineError};

/// Probability above which a scan is reported as positive.
pub const POSITIVE_THRESHOLD: f32 = 0.5;

/// A binary classifier over prepared scan images.
pub trait Classifier {
    /// Probability in `[0, 1]` that the scan shows a tumor.
    fn predict(&self, input: &ModelInput) -> f32;
}

impl<F> Classifier for F
where
    F: Fn(&ModelInput) -> f32,
{
    fn predict(&self, input: &ModelInput) -> f32 {
        self(input)
    }
}

/// Binary label derived from a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Probability strictly above [`POSITIVE_THRESHOLD`].
    TumorDetected,
    /// Probability at or below [`POSITIVE_THRESHOLD`].
    NoTumor,
}

impl Verdict {
    /// Label a probability.
    #[must_use]
    pub fn from_probability(probability: f32) -> Self {
        if probability > POSITIVE_THRESHOLD {
            Self::TumorDetected
        } else {
            Self::NoTumor
        }
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Assessment {
    /// The cropper produced no region, so the classifier was not run.
    Skipped(NoRegion),
    /// The classifier scored the crop.
    Scored {
        /// Model output.
        probability: f32,
        /// Label derived from `probability`.
        verdict: Verdict,
    },
}

impl Assessment {
    /// Probability as a percentage, when scored.
    #[must_use]
    pub fn percentage(&self) -> Option<f32> {
        match self {
            Self::Skipped(_) => None,
            Self::Scored { probability, .. } => Some(probability * 100.0),
        }
    }
}

/// Crop `image`, prepare the crop, and score it with `classifier`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an invalid crop or
/// prepare configuration, and [`PipelineError::InvalidInput`] if the crop
/// has zero area and cannot be resized.
pub fn classify<C: Classifier + ?Sized>(
    image: &BgrImage,
    crop_config: &CropConfig,
    prepare_config: &PrepareConfig,
    classifier: &C,
) -> Result<Assessment, PipelineError> {
    let crop = match crop_brain_contour(image, crop_config)? {
        CropOutcome::Cropped(crop) => crop,
        CropOutcome::NoRegion(reason) => {
            info!(%reason, "skipping classification");
            return Ok(Assessment::Skipped(reason));
        }
    };
    let input = prepare(&crop, prepare_config)?;
    let probability = classifier.predict(&input);
    let verdict = Verdict::from_probability(probability);
    info!(probability, ?verdict, "scan classified");
    Ok(Assessment::Scored {
        probability,
        verdict,
    })
}
