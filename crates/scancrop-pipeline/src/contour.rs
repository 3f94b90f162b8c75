//! External contour extraction and selection.
//!
//! Contours are traced with Suzuki-Abe border following
//! (`imageproc::contours::find_contours`), filtered down to outermost
//! borders, and compressed so straight runs keep only their endpoints.

use image::imageops;
use imageproc::contours::BorderType;
use serde::{Deserialize, Serialize};

use crate::types::{GrayImage, Point};

/// A closed boundary in a binary mask.
///
/// Points are in tracing order. Only the vertices needed to reconstruct
/// the polygon are stored: horizontal, vertical, and diagonal runs are
/// reduced to their endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a contour from its vertices.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns the vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the contour has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Enclosed area of the polygon (shoelace formula, unsigned).
    ///
    /// Contours with fewer than three vertices enclose nothing.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn area(&self) -> f64 {
        let n = self.0.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.0[i];
                let b = self.0[(i + 1) % n];
                i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
            })
            .sum();
        twice.unsigned_abs() as f64 / 2.0
    }

    /// The leftmost, rightmost, topmost, and bottommost vertices.
    ///
    /// Ties go to the vertex that comes first in tracing order. Returns
    /// `None` for an empty contour.
    #[must_use]
    pub fn extremes(&self) -> Option<BoundingExtremes> {
        let first = *self.0.first()?;
        let mut ext = BoundingExtremes {
            left: first,
            right: first,
            top: first,
            bottom: first,
        };
        for &p in &self.0[1..] {
            if p.x < ext.left.x {
                ext.left = p;
            }
            if p.x > ext.right.x {
                ext.right = p;
            }
            if p.y < ext.top.y {
                ext.top = p;
            }
            if p.y > ext.bottom.y {
                ext.bottom = p;
            }
        }
        Some(ext)
    }
}

/// The four extreme vertices of one contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingExtremes {
    /// Vertex with minimum x.
    pub left: Point,
    /// Vertex with maximum x.
    pub right: Point,
    /// Vertex with minimum y.
    pub top: Point,
    /// Vertex with maximum y.
    pub bottom: Point,
}

impl BoundingExtremes {
    /// The half-open crop window `[left.x, right.x) x [top.y, bottom.y)`.
    ///
    /// Contour vertices lie inside the mask, so coordinates are never
    /// negative.
    #[must_use]
    pub const fn window(&self) -> CropWindow {
        CropWindow {
            x: self.left.x.unsigned_abs(),
            y: self.top.y.unsigned_abs(),
            width: self.right.x.abs_diff(self.left.x),
            height: self.bottom.y.abs_diff(self.top.y),
        }
    }
}

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    /// Left column (inclusive).
    pub x: u32,
    /// Top row (inclusive).
    pub y: u32,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl CropWindow {
    /// Returns `true` if the window contains no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Find all outermost borders in a binary mask.
///
/// Non-zero pixels are foreground. Holes, and components nested inside
/// holes, are ignored. Contours are returned in discovery (raster-scan)
/// order. Components touching the image border are traced like any other;
/// their vertices on the border keep coordinate 0 or `width - 1` /
/// `height - 1`.
#[must_use = "returns the external contours"]
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }
    // The tracer misreads borders that start on column 0 as holes, so trace
    // inside a one-pixel background frame and shift back afterwards.
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut padded, mask, 1, 1);
    imageproc::contours::find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            let points: Vec<Point> = c
                .points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();
            Contour::new(compress_runs(&points))
        })
        .collect()
}

/// Drop vertices that sit in the middle of a straight 8-connected run.
///
/// The first vertex is always kept. A vertex is dropped when the step
/// into it and the step out of it point in the same direction.
#[must_use]
pub fn compress_runs(points: &[Point]) -> Vec<Point> {
    let n = points.len();
    if n <= 2 {
        return points.to_vec();
    }
    let step = |a: Point, b: Point| ((b.x - a.x).signum(), (b.y - a.y).signum());
    points
        .iter()
        .enumerate()
        .filter(|&(i, &p)| {
            if i == 0 {
                return true;
            }
            let prev = points[i - 1];
            let next = points[(i + 1) % n];
            step(prev, p) != step(p, next)
        })
        .map(|(_, &p)| p)
        .collect()
}

/// The contour with the largest enclosed area.
///
/// When several contours share the maximum area, the first one wins.
/// Returns `None` if `contours` is empty.
#[must_use]
pub fn largest(contours: &[Contour]) -> Option<&Contour> {
    let mut best: Option<(&Contour, f64)> = None;
    for contour in contours {
        let area = contour.area();
        match best {
            Some((_, best_area)) if best_area >= area => {}
            _ => best = Some((contour, area)),
        }
    }
    best.map(|(contour, _)| contour)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Luma;

    fn fill(mask: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    #[test]
    fn empty_mask_has_no_contours() {
        let mask = GrayImage::new(10, 10);
        assert!(find_external_contours(&mask).is_empty());
    }

    #[test]
    fn rectangle_compresses_to_four_corners() {
        let mut mask = GrayImage::new(20, 20);
        fill(&mut mask, 3, 5, 10, 6);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);

        let mut corners = contours[0].points().to_vec();
        corners.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            corners,
            vec![
                Point::new(3, 5),
                Point::new(12, 5),
                Point::new(3, 10),
                Point::new(12, 10),
            ]
        );
        assert!((contours[0].area() - 45.0).abs() < f64::EPSILON);
    }

    fn x_span(contour: &Contour) -> (i32, i32) {
        let ext = contour.extremes().unwrap();
        (ext.left.x, ext.right.x)
    }

    #[test]
    fn region_on_left_edge_is_external() {
        let mut mask = GrayImage::new(60, 40);
        fill(&mut mask, 0, 5, 30, 30);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);
        let ext = contours[0].extremes().unwrap();
        assert_eq!(
            ext.window(),
            CropWindow {
                x: 0,
                y: 5,
                width: 29,
                height: 29
            }
        );
    }

    #[test]
    fn left_edge_region_does_not_swallow_others() {
        let mut mask = GrayImage::new(120, 60);
        fill(&mut mask, 0, 5, 60, 50);
        fill(&mut mask, 90, 20, 15, 15);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 2);
        assert_eq!(x_span(&contours[0]), (0, 59));
        assert_eq!(x_span(&contours[1]), (90, 104));
        assert_eq!(x_span(largest(&contours).unwrap()), (0, 59));
    }

    #[test]
    fn full_frame_traces_the_image_border() {
        let mut mask = GrayImage::new(30, 20);
        fill(&mut mask, 0, 0, 30, 20);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);
        let mut corners = contours[0].points().to_vec();
        corners.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            corners,
            vec![
                Point::new(0, 0),
                Point::new(29, 0),
                Point::new(0, 19),
                Point::new(29, 19),
            ]
        );
    }

    #[test]
    fn points_stay_within_mask_bounds() {
        let mut mask = GrayImage::new(25, 17);
        fill(&mut mask, 0, 0, 5, 5);
        fill(&mut mask, 20, 12, 5, 5);
        fill(&mut mask, 10, 0, 4, 17);
        for contour in find_external_contours(&mask) {
            for p in contour.points() {
                assert!((0..25).contains(&p.x) && (0..17).contains(&p.y), "{p:?}");
            }
        }
    }

    #[test]
    fn holes_and_nested_islands_are_ignored() {
        let mut mask = GrayImage::new(30, 30);
        fill(&mut mask, 2, 2, 26, 26);
        // Carve a hole, then put an island inside it.
        for y in 8..22 {
            for x in 8..22 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        fill(&mut mask, 12, 12, 6, 6);

        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 1);
        let ext = contours[0].extremes().unwrap();
        assert_eq!(ext.left.x, 2);
        assert_eq!(ext.right.x, 27);
    }

    #[test]
    fn separate_components_each_produce_a_contour() {
        let mut mask = GrayImage::new(40, 20);
        fill(&mut mask, 2, 2, 5, 5);
        fill(&mut mask, 20, 4, 10, 10);
        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 2);
        let big = largest(&contours).unwrap();
        assert_eq!(big.extremes().unwrap().left.x, 20);
    }

    #[test]
    fn compress_runs_keeps_direction_changes() {
        let points = vec![
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(2, 0),
            Point::new(2, 1),
            Point::new(2, 2),
            Point::new(1, 1),
        ];
        assert_eq!(
            compress_runs(&points),
            vec![Point::new(0, 0), Point::new(2, 0), Point::new(2, 2)]
        );
    }

    #[test]
    fn compress_runs_short_input_unchanged() {
        let points = vec![Point::new(4, 4)];
        assert_eq!(compress_runs(&points), points);
    }

    #[test]
    fn degenerate_contours_have_zero_area() {
        assert!(Contour::new(vec![]).area().abs() < f64::EPSILON);
        let line = Contour::new(vec![Point::new(0, 0), Point::new(5, 0)]);
        assert!(line.area().abs() < f64::EPSILON);
    }

    #[test]
    fn largest_breaks_ties_by_discovery_order() {
        let a = Contour::new(vec![
            Point::new(0, 0),
            Point::new(2, 0),
            Point::new(2, 2),
            Point::new(0, 2),
        ]);
        let b = Contour::new(vec![
            Point::new(5, 5),
            Point::new(7, 5),
            Point::new(7, 7),
            Point::new(5, 7),
        ]);
        let contours = vec![a.clone(), b];
        assert_eq!(largest(&contours), Some(&a));
    }

    #[test]
    fn largest_of_nothing_is_none() {
        assert!(largest(&[]).is_none());
    }

    #[test]
    fn extremes_prefer_first_occurrence() {
        let c = Contour::new(vec![
            Point::new(1, 0),
            Point::new(3, 0),
            Point::new(3, 4),
            Point::new(1, 4),
        ]);
        let ext = c.extremes().unwrap();
        assert_eq!(ext.left, Point::new(1, 0));
        assert_eq!(ext.right, Point::new(3, 0));
        assert_eq!(ext.top, Point::new(1, 0));
        assert_eq!(ext.bottom, Point::new(3, 4));
        assert_eq!(
            ext.window(),
            CropWindow {
                x: 1,
                y: 0,
                width: 2,
                height: 4
            }
        );
    }

    #[test]
    fn extremes_of_empty_contour_is_none() {
        assert!(Contour::new(vec![]).extremes().is_none());
    }

    #[test]
    fn single_point_window_is_empty() {
        let c = Contour::new(vec![Point::new(6, 9)]);
        assert!(c.extremes().unwrap().window().is_empty());
    }
}
