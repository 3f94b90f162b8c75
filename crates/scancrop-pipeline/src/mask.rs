//! Binary foreground mask: intensity thresholding and morphological cleanup.
//!
//! Thresholding keeps pixels whose intensity falls in an inclusive band.
//! Cleanup then erodes and dilates the mask with a 3x3 square element,
//! which strips thin noise (skull rims, text, scanner streaks) while
//! restoring the extent of the main region.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;

/// Mark pixels with `low <= intensity <= high` as 255, others 0.
#[must_use = "returns the binary mask"]
pub fn threshold(gray: &GrayImage, low: u8, high: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        Luma([if (low..=high).contains(&v) { 255 } else { 0 }])
    })
}

/// Erode `iterations` times, then dilate `iterations` times, with a 3x3
/// square structuring element.
///
/// `n` passes of a 3x3 square equal one pass of a `(2n+1)x(2n+1)` square,
/// which is a chessboard (L-infinity) ball of radius `n`. Pixels outside
/// the image neither erode nor dilate the border.
#[must_use = "returns the cleaned mask"]
pub fn clean(mask: &GrayImage, iterations: u8) -> GrayImage {
    if iterations == 0 || mask.width() == 0 || mask.height() == 0 {
        return mask.clone();
    }
    let eroded = imageproc::morphology::erode(mask, Norm::LInf, iterations);
    imageproc::morphology::dilate(&eroded, Norm::LInf, iterations)
}

/// Number of foreground (non-zero) pixels.
#[must_use]
pub fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}
