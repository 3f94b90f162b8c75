//! Image decoding and grayscale conversion.
//!
//! [`decode`] turns raw file bytes (PNG, JPEG, BMP, WebP) into a
//! [`BgrImage`]; [`to_grayscale`] reduces a BGR image to one intensity
//! channel for thresholding.

use image::{GrayImage, Luma};

use crate::types::{BgrImage, PipelineError};

/// Fixed-point luma weights (14 fractional bits) for blue, green, red.
///
/// They sum to `1 << 14`, so a uniform gray pixel maps to itself.
const LUMA_WEIGHTS: [u32; 3] = [1868, 9617, 4899];
const LUMA_SHIFT: u32 = 14;
const _: () = assert!(LUMA_WEIGHTS[0] + LUMA_WEIGHTS[1] + LUMA_WEIGHTS[2] == 1 << LUMA_SHIFT);

/// Decode raw image bytes into BGR channel order.
///
/// Any alpha channel is discarded.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<BgrImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(BgrImage::from_rgb(&img.to_rgb8()))
}

/// Intensity of one `[b, g, r]` pixel: `0.299*R + 0.587*G + 0.114*B`,
/// rounded to nearest.
#[must_use]
pub fn luma([b, g, r]: [u8; 3]) -> u8 {
    let sum = u32::from(b) * LUMA_WEIGHTS[0]
        + u32::from(g) * LUMA_WEIGHTS[1]
        + u32::from(r) * LUMA_WEIGHTS[2];
    let rounded = (sum + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT;
    u8::try_from(rounded).unwrap_or(u8::MAX)
}

/// Convert a BGR image to a single-channel intensity image.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &BgrImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma(image.pixel(x, y))])
    })
}
