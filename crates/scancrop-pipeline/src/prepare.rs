//! Classifier input preparation: resize a crop and scale it to `[0, 1]`.

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::types::{BgrImage, Dimensions, PipelineError};

/// Target size of the classifier input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

impl PrepareConfig {
    /// Default classifier input width.
    pub const DEFAULT_WIDTH: u32 = 240;
    /// Default classifier input height.
    pub const DEFAULT_HEIGHT: u32 = 240;
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
        }
    }
}

/// A normalized image tensor: row-major, channels interleaved in BGR
/// order, every value in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    dimensions: Dimensions,
    data: Vec<f32>,
}

impl ModelInput {
    /// Width and height of the tensor.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The flattened `height x width x 3` values.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value of channel `c` (0 = blue) at `(x, y)`, if in bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32, c: u32) -> Option<f32> {
        if x >= self.dimensions.width || y >= self.dimensions.height || c >= 3 {
            return None;
        }
        let index = (u64::from(y) * u64::from(self.dimensions.width) + u64::from(x)) * 3
            + u64::from(c);
        self.data.get(usize::try_from(index).ok()?).copied()
    }
}

/// Resize `crop` to the configured size with bicubic (Catmull-Rom)
/// interpolation and scale every channel to `[0, 1]`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if `crop` has zero area.
/// Returns [`PipelineError::InvalidConfig`] if the target size is zero.
pub fn prepare(crop: &BgrImage, config: &PrepareConfig) -> Result<ModelInput, PipelineError> {
    if crop.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "cannot resize a {}x{} crop",
            crop.width(),
            crop.height()
        )));
    }
    if config.width == 0 || config.height == 0 {
        return Err(PipelineError::InvalidConfig(format!(
            "classifier input size must be non-zero, got {}x{}",
            config.width, config.height
        )));
    }

    let resized = imageops::resize(
        crop.as_buffer(),
        config.width,
        config.height,
        FilterType::CatmullRom,
    );
    let data = resized
        .as_raw()
        .iter()
        .map(|&v| f32::from(v) / 255.0)
        .collect();

    Ok(ModelInput {
        dimensions: Dimensions {
            width: config.width,
            height: config.height,
        },
        data,
    })
}
