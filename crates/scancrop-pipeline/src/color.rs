//! Color gate: reject images that carry red, blue, or yellow pixels.
//!
//! Raw scans are grayscale in content even when stored as three-channel
//! images. Saturated red, blue, or yellow pixels indicate annotations or
//! rendered overlays, so such images are rejected before contour analysis.
//!
//! Hue tests run in 8-bit HSV space: hue in `[0, 180)` (degrees halved so
//! the full circle fits a byte), saturation and value in `[0, 255]`.

use image::{ImageBuffer, Luma, Rgb};

use crate::types::{BgrImage, ColorMask};

/// An 8-bit HSV image. Channel 0 is hue, 1 saturation, 2 value.
pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// An inclusive per-channel `[lower, upper]` box in HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    /// Inclusive lower bound for `[hue, saturation, value]`.
    pub lower: [u8; 3],
    /// Inclusive upper bound for `[hue, saturation, value]`.
    pub upper: [u8; 3],
}

impl HsvRange {
    /// Create a new range.
    #[must_use]
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Returns `true` if every channel of `hsv` lies within its bounds.
    #[must_use]
    pub const fn contains(&self, hsv: [u8; 3]) -> bool {
        hsv[0] >= self.lower[0]
            && hsv[0] <= self.upper[0]
            && hsv[1] >= self.lower[1]
            && hsv[1] <= self.upper[1]
            && hsv[2] >= self.lower[2]
            && hsv[2] <= self.upper[2]
    }
}

/// Saturated red.
pub const RED: HsvRange = HsvRange::new([0, 100, 100], [10, 255, 255]);

/// Blue, with a looser saturation/value floor than red and yellow.
pub const BLUE: HsvRange = HsvRange::new([110, 50, 50], [130, 255, 255]);

/// Saturated yellow.
pub const YELLOW: HsvRange = HsvRange::new([20, 100, 100], [30, 255, 255]);

/// Every hue range that disqualifies an image.
pub const DISQUALIFYING_RANGES: [HsvRange; 3] = [RED, BLUE, YELLOW];

/// Fractional bits of the fixed-point reciprocals used by [`bgr_to_hsv`].
const HSV_SHIFT: u32 = 12;

/// `scale / divisor` in [`HSV_SHIFT`]-bit fixed point, rounded to nearest.
const fn reciprocal(scale: i32, divisor: i32) -> i32 {
    ((scale << HSV_SHIFT) + divisor / 2) / divisor
}

/// Convert one `[b, g, r]` pixel to 8-bit `[h, s, v]`.
///
/// `v = max(b, g, r)`, `s = 255 * (v - min) / v` and hue is the usual
/// hexcone angle halved. Both divisions go through 12-bit fixed-point
/// reciprocals and round half up, so a half-degree hue of exactly `-0.5`
/// lands on 0, not 179. Achromatic pixels get hue 0.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn bgr_to_hsv([b, g, r]: [u8; 3]) -> [u8; 3] {
    let v = b.max(g).max(r);
    let diff = i32::from(v - b.min(g).min(r));
    let half = 1 << (HSV_SHIFT - 1);

    let s = if v == 0 {
        0
    } else {
        (diff * reciprocal(255, i32::from(v)) + half) >> HSV_SHIFT
    };

    let h = if diff == 0 {
        0
    } else {
        let (vi, [b, g, r]) = (i32::from(v), [b, g, r].map(i32::from));
        let sextant = if vi == r {
            g - b
        } else if vi == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        // Arithmetic shift floors, so negative hues round half up too.
        let h = (sextant * reciprocal(30, diff) + half) >> HSV_SHIFT;
        if h < 0 { h + 180 } else { h }
    };

    [
        u8::try_from(h).unwrap_or(0),
        u8::try_from(s).unwrap_or(u8::MAX),
        v,
    ]
}

/// Convert a BGR image to 8-bit HSV.
#[must_use = "returns the HSV image"]
pub fn to_hsv(image: &BgrImage) -> HsvImage {
    HsvImage::from_fn(image.width(), image.height(), |x, y| {
        Rgb(bgr_to_hsv(image.pixel(x, y)))
    })
}

/// Mark every pixel of `hsv` that lies in `range` with 255, others 0.
#[must_use = "returns the color mask"]
pub fn in_range(hsv: &HsvImage, range: &HsvRange) -> ColorMask {
    ColorMask::from_fn(hsv.width(), hsv.height(), |x, y| {
        Luma([if range.contains(hsv.get_pixel(x, y).0) {
            255
        } else {
            0
        }])
    })
}

/// Pixel-wise OR of the masks for every range in
/// [`DISQUALIFYING_RANGES`].
#[must_use = "returns the combined color mask"]
pub fn disqualifying_mask(image: &BgrImage) -> ColorMask {
    let hsv = to_hsv(image);
    let mut combined = ColorMask::new(hsv.width(), hsv.height());
    for range in &DISQUALIFYING_RANGES {
        let mask = in_range(&hsv, range);
        for (out, px) in combined.pixels_mut().zip(mask.pixels()) {
            out.0[0] |= px.0[0];
        }
    }
    combined
}

/// Returns `true` if any pixel falls in a disqualifying hue range.
///
/// Zero-area images return `false`.
#[must_use]
pub fn has_disqualifying_color(image: &BgrImage) -> bool {
    image.pixels().any(|px| {
        let hsv = bgr_to_hsv(px);
        DISQUALIFYING_RANGES.iter().any(|range| range.contains(hsv))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mask::count_foreground;

    #[test]
    fn primary_colors_map_to_expected_hues() {
        assert_eq!(bgr_to_hsv([0, 0, 255]), [0, 255, 255]); // red
        assert_eq!(bgr_to_hsv([0, 255, 255]), [30, 255, 255]); // yellow
        assert_eq!(bgr_to_hsv([0, 255, 0]), [60, 255, 255]); // green
        assert_eq!(bgr_to_hsv([255, 0, 0]), [120, 255, 255]); // blue
    }

    #[test]
    fn gray_has_zero_saturation() {
        assert_eq!(bgr_to_hsv([128, 128, 128]), [0, 0, 128]);
        assert_eq!(bgr_to_hsv([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn magenta_side_of_red_wraps_below_180() {
        // r = 255, b slightly above g: negative half-degree hue wraps.
        let [h, _, _] = bgr_to_hsv([40, 0, 255]);
        assert!(h > 170 && h < 180, "hue {h}");
    }

    #[test]
    fn half_degree_below_red_rounds_up_to_zero() {
        // 30 * (g - b) / diff = -0.5 exactly.
        assert_eq!(bgr_to_hsv([2, 0, 120]), [0, 255, 120]);
        assert_eq!(bgr_to_hsv([4, 0, 240]), [0, 255, 240]);
        assert!(has_disqualifying_color(&BgrImage::from_pixel(4, 4, [2, 0, 120])));
        assert!(has_disqualifying_color(&BgrImage::from_pixel(4, 4, [4, 0, 240])));
    }

    #[test]
    fn fixed_point_hue_matches_reference_values() {
        assert_eq!(bgr_to_hsv([0, 230, 230]), [30, 255, 230]);
        assert_eq!(bgr_to_hsv([40, 0, 255]), [175, 255, 255]);
        assert_eq!(bgr_to_hsv([12, 10, 130]), [0, 235, 130]);
    }

    #[test]
    fn gate_agrees_with_mask() {
        let img = BgrImage::from_fn(16, 16, |x, y| {
            let v = u8::try_from((x * 16 + y) % 256).unwrap();
            [v, v.wrapping_mul(3), v.wrapping_mul(7)]
        });
        assert_eq!(
            has_disqualifying_color(&img),
            count_foreground(&disqualifying_mask(&img)) > 0
        );
    }

    #[test]
    fn range_bounds_are_inclusive() {
        assert!(RED.contains([10, 100, 100]));
        assert!(RED.contains([0, 255, 255]));
        assert!(!RED.contains([11, 255, 255]));
        assert!(!RED.contains([5, 99, 255]));
        assert!(BLUE.contains([110, 50, 50]));
        assert!(!BLUE.contains([131, 200, 200]));
    }

    #[test]
    fn solid_red_is_rejected() {
        let img = BgrImage::from_pixel(8, 8, [0, 0, 255]);
        assert!(has_disqualifying_color(&img));
    }

    #[test]
    fn solid_blue_is_rejected() {
        let img = BgrImage::from_pixel(8, 8, [255, 0, 0]);
        assert!(has_disqualifying_color(&img));
    }

    #[test]
    fn solid_yellow_is_rejected() {
        let img = BgrImage::from_pixel(8, 8, [0, 230, 230]);
        assert!(has_disqualifying_color(&img));
    }

    #[test]
    fn solid_gray_is_accepted() {
        let img = BgrImage::from_pixel(8, 8, [128, 128, 128]);
        assert!(!has_disqualifying_color(&img));
    }

    #[test]
    fn solid_green_is_accepted() {
        let img = BgrImage::from_pixel(8, 8, [0, 200, 0]);
        assert!(!has_disqualifying_color(&img));
    }

    #[test]
    fn dark_red_is_below_value_floor() {
        let img = BgrImage::from_pixel(8, 8, [0, 0, 60]);
        assert!(!has_disqualifying_color(&img));
    }

    #[test]
    fn zero_area_image_is_accepted() {
        assert!(!has_disqualifying_color(&BgrImage::new(0, 0)));
        assert!(!has_disqualifying_color(&BgrImage::new(0, 5)));
    }

    #[test]
    fn single_annotated_pixel_is_enough() {
        let img = BgrImage::from_fn(20, 20, |x, y| {
            if x == 13 && y == 4 {
                [255, 0, 0]
            } else {
                [90, 90, 90]
            }
        });
        assert!(has_disqualifying_color(&img));
        assert_eq!(count_foreground(&disqualifying_mask(&img)), 1);
    }

    #[test]
    fn mask_dimensions_match_source() {
        let img = BgrImage::new(7, 3);
        let mask = disqualifying_mask(&img);
        assert_eq!(mask.dimensions(), (7, 3));
    }

    #[test]
    fn replication_into_larger_canvas_preserves_result() {
        let tile = [[0, 0, 255], [70, 70, 70], [200, 200, 200], [10, 10, 10]];
        let small = BgrImage::from_fn(2, 2, |x, y| tile[(y * 2 + x) as usize]);
        let large = BgrImage::from_fn(32, 32, |x, y| tile[((y % 2) * 2 + x % 2) as usize]);
        assert!(has_disqualifying_color(&small));
        assert_eq!(
            has_disqualifying_color(&small),
            has_disqualifying_color(&large)
        );

        let gray_small = BgrImage::from_pixel(2, 2, [70, 70, 70]);
        let gray_large = BgrImage::from_pixel(64, 48, [70, 70, 70]);
        assert_eq!(
            has_disqualifying_color(&gray_small),
            has_disqualifying_color(&gray_large)
        );
    }
}
