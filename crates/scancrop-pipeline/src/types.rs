//! Shared types for the scancrop pipeline.

use std::fmt;

use image::{ImageBuffer, Rgb};
use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` for callers converting to and from the
/// `image` crate's native channel order.
pub use image::RgbImage;

/// A single-channel mask whose pixels are either 0 or 255.
///
/// Always has the same dimensions as the image it was derived from.
pub type ColorMask = GrayImage;

/// An 8-bit, 3-channel image stored in (blue, green, red) order.
///
/// The pixel storage reuses `image`'s three-channel buffer, but channel 0
/// is blue and channel 2 is red. Use [`from_rgb`](Self::from_rgb) and
/// [`to_rgb`](Self::to_rgb) when crossing into code that expects RGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrImage(ImageBuffer<Rgb<u8>, Vec<u8>>);

impl BgrImage {
    /// Create an all-black image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self(ImageBuffer::new(width, height))
    }

    /// Create an image where every pixel has the same `[b, g, r]` value.
    #[must_use]
    pub fn from_pixel(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        Self(ImageBuffer::from_pixel(width, height, Rgb(bgr)))
    }

    /// Create an image from a function returning `[b, g, r]` for each
    /// `(x, y)` coordinate.
    #[must_use]
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 3],
    {
        Self(ImageBuffer::from_fn(width, height, |x, y| Rgb(f(x, y))))
    }

    /// Wrap an already-decoded, row-major BGR byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if `data.len()` is not
    /// exactly `width * height * 3`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PipelineError> {
        let expected = u64::from(width) * u64::from(height) * 3;
        if u64::try_from(data.len()).ok() != Some(expected) {
            return Err(PipelineError::InvalidInput(format!(
                "expected {expected} bytes for a {width}x{height} BGR image, got {}",
                data.len()
            )));
        }
        ImageBuffer::from_raw(width, height, data)
            .map(Self)
            .ok_or_else(|| PipelineError::InvalidInput("buffer does not fit dimensions".into()))
    }

    /// Convert an RGB image into BGR channel order.
    #[must_use]
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        Self(ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
            let [r, g, b] = rgb.get_pixel(x, y).0;
            Rgb([b, g, r])
        }))
    }

    /// Convert back into the `image` crate's RGB channel order.
    #[must_use]
    pub fn to_rgb(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width(), self.height(), |x, y| {
            let [b, g, r] = self.0.get_pixel(x, y).0;
            Rgb([r, g, b])
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Width and height as [`Dimensions`].
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Returns `true` if the image has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// The `[b, g, r]` value at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds, like `ImageBuffer::get_pixel`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.0.get_pixel(x, y).0
    }

    /// Iterate over all pixels in row-major order as `[b, g, r]`.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.0.pixels().map(|p| p.0)
    }

    /// The raw row-major BGR bytes.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.0.as_raw()
    }

    /// Consume the image and return the raw BGR bytes.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.0.into_raw()
    }

    /// Copy out the rectangle starting at `(x, y)`.
    ///
    /// Callers must pass a window inside the image. A zero-width or
    /// zero-height window yields an empty image.
    #[must_use]
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        debug_assert!(
            u64::from(x) + u64::from(width) <= u64::from(self.width())
                && u64::from(y) + u64::from(height) <= u64::from(self.height()),
            "crop window {width}x{height}+{x}+{y} exceeds {}x{} image",
            self.width(),
            self.height()
        );
        Self(image::imageops::crop_imm(&self.0, x, y, width, height).to_image())
    }

    /// Borrow the underlying three-channel buffer (channels in BGR order).
    #[must_use]
    pub const fn as_buffer(&self) -> &ImageBuffer<Rgb<u8>, Vec<u8>> {
        &self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// An integer point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from the left edge).
    pub x: i32,
    /// Row (pixels from the top edge).
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Why the pipeline declined to produce a crop.
///
/// Both reasons are ordinary outcomes on real data, not faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoRegion {
    /// The image contains red, blue, or yellow pixels and was rejected
    /// before contour analysis.
    ColorRejected,
    /// No external contour survived thresholding and cleanup.
    NoContour,
}

impl fmt::Display for NoRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColorRejected => f.write_str("image contains red, blue, or yellow pixels"),
            Self::NoContour => f.write_str("no brain contour found in the image"),
        }
    }
}

/// Result of running the contour cropper on one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CropOutcome {
    /// The region of interest, sliced from the original image.
    ///
    /// May be zero-area when the selected contour is a single row or
    /// column.
    Cropped(BgrImage),
    /// No region was produced.
    NoRegion(NoRegion),
}

impl CropOutcome {
    /// Returns `true` if a crop was produced.
    #[must_use]
    pub const fn is_cropped(&self) -> bool {
        matches!(self, Self::Cropped(_))
    }

    /// Borrow the crop, if any.
    #[must_use]
    pub const fn crop(&self) -> Option<&BgrImage> {
        match self {
            Self::Cropped(image) => Some(image),
            Self::NoRegion(_) => None,
        }
    }

    /// Consume the outcome and return the crop, if any.
    #[must_use]
    pub fn into_crop(self) -> Option<BgrImage> {
        match self {
            Self::Cropped(image) => Some(image),
            Self::NoRegion(_) => None,
        }
    }

    /// The reason no crop was produced, if any.
    #[must_use]
    pub const fn no_region(&self) -> Option<NoRegion> {
        match self {
            Self::Cropped(_) => None,
            Self::NoRegion(reason) => Some(*reason),
        }
    }
}

/// Tunable parameters of the contour cropper.
///
/// The defaults were tuned empirically against the downstream classifier;
/// changing them shifts its accuracy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropConfig {
    /// Lowest grayscale intensity (inclusive) counted as foreground.
    pub threshold_low: u8,

    /// Highest grayscale intensity (inclusive) counted as foreground.
    pub threshold_high: u8,

    /// Number of 3x3 erosion passes, followed by the same number of
    /// 3x3 dilation passes.
    pub morph_iterations: u8,
}

impl CropConfig {
    /// Default lower threshold bound.
    pub const DEFAULT_THRESHOLD_LOW: u8 = 45;
    /// Default upper threshold bound.
    pub const DEFAULT_THRESHOLD_HIGH: u8 = 255;
    /// Default erosion/dilation iteration count.
    pub const DEFAULT_MORPH_ITERATIONS: u8 = 2;

    /// Check the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `threshold_low`
    /// exceeds `threshold_high`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.threshold_low > self.threshold_high {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold_low ({}) > threshold_high ({})",
                self.threshold_low, self.threshold_high
            )));
        }
        Ok(())
    }
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            threshold_low: Self::DEFAULT_THRESHOLD_LOW,
            threshold_high: Self::DEFAULT_THRESHOLD_HIGH,
            morph_iterations: Self::DEFAULT_MORPH_ITERATIONS,
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// The two expected negative outcomes (color rejection and no contour)
/// are reported through [`CropOutcome::NoRegion`], never through this type.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The input buffer is malformed or unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- BgrImage tests ---

    #[test]
    fn from_raw_accepts_matching_length() {
        let img = BgrImage::from_raw(2, 3, vec![7; 18]).unwrap();
        assert_eq!(img.dimensions(), Dimensions { width: 2, height: 3 });
        assert_eq!(img.pixel(1, 2), [7, 7, 7]);
    }

    #[test]
    fn from_raw_rejects_wrong_length() {
        let result = BgrImage::from_raw(2, 2, vec![0; 11]);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn rgb_conversion_swaps_channels() {
        let rgb = RgbImage::from_pixel(1, 1, Rgb([10, 20, 30]));
        let bgr = BgrImage::from_rgb(&rgb);
        assert_eq!(bgr.pixel(0, 0), [30, 20, 10]);
        assert_eq!(bgr.to_rgb(), rgb);
    }

    #[test]
    fn crop_copies_window() {
        let img = BgrImage::from_fn(10, 10, |x, y| [x as u8, y as u8, 0]);
        let cropped = img.crop(2, 3, 4, 5);
        assert_eq!(cropped.dimensions(), Dimensions { width: 4, height: 5 });
        assert_eq!(cropped.pixel(0, 0), [2, 3, 0]);
        assert_eq!(cropped.pixel(3, 4), [5, 7, 0]);
    }

    #[test]
    fn zero_width_crop_is_empty() {
        let img = BgrImage::from_pixel(10, 10, [1, 2, 3]);
        let cropped = img.crop(4, 4, 0, 3);
        assert!(cropped.is_empty());
        assert_eq!(cropped.height(), 3);
    }

    #[test]
    fn crop_leaves_source_untouched() {
        let img = BgrImage::from_pixel(4, 4, [9, 9, 9]);
        let before = img.clone();
        let _ = img.crop(0, 0, 2, 2);
        assert_eq!(img, before);
    }

    #[test]
    fn crop_may_reach_the_far_edges() {
        let img = BgrImage::from_pixel(6, 4, [1, 1, 1]);
        assert_eq!(img.crop(0, 0, 6, 4), img);
        assert_eq!(img.crop(5, 3, 1, 1).dimensions(), Dimensions { width: 1, height: 1 });
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "exceeds")]
    fn out_of_bounds_crop_is_caught() {
        let img = BgrImage::from_pixel(6, 4, [1, 1, 1]);
        let _ = img.crop(3, 0, 4, 2);
    }

    // --- CropOutcome tests ---

    #[test]
    fn outcome_accessors() {
        let cropped = CropOutcome::Cropped(BgrImage::new(1, 1));
        assert!(cropped.is_cropped());
        assert!(cropped.crop().is_some());
        assert!(cropped.no_region().is_none());

        let rejected = CropOutcome::NoRegion(NoRegion::ColorRejected);
        assert!(!rejected.is_cropped());
        assert_eq!(rejected.no_region(), Some(NoRegion::ColorRejected));
        assert!(rejected.into_crop().is_none());
    }

    #[test]
    fn no_region_display() {
        assert_eq!(
            NoRegion::NoContour.to_string(),
            "no brain contour found in the image"
        );
    }

    // --- CropConfig tests ---

    #[test]
    fn crop_config_defaults() {
        let config = CropConfig::default();
        assert_eq!(config.threshold_low, 45);
        assert_eq!(config.threshold_high, 255);
        assert_eq!(config.morph_iterations, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn crop_config_rejects_inverted_thresholds() {
        let config = CropConfig {
            threshold_low: 200,
            threshold_high: 100,
            ..CropConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid pipeline configuration: threshold_low (200) > threshold_high (100)"
        );
    }

    #[test]
    fn crop_config_serde_round_trip() {
        let config = CropConfig {
            threshold_low: 30,
            threshold_high: 240,
            morph_iterations: 1,
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: CropConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    // --- PipelineError tests ---

    #[test]
    fn error_empty_input_display() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty"
        );
    }
}
