//! Planar geometry used by glyphs, the spatial index and contours.
//!
//! Rectangles are half-open: a rectangle at `(x, y)` with size `(w, h)` covers
//! `[x, x + w) x [y, y + h)`. A rectangle with zero extent on an axis covers the
//! single coordinate `x` (or `y`) on that axis, so points are rectangles of size zero.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RenderError, Result};

/// A point in absolute (data) or screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle stored as min/max corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    /// Creates a rectangle from its origin and size. Negative sizes are normalized.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_corners(Point::new(x, y), Point::new(x + width, y + height))
    }

    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// A zero-extent rectangle at `p`.
    pub fn point(p: Point) -> Self {
        Self::from_corners(p, p)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Half-open containment, with the zero-extent convention for degenerate axes.
    pub fn contains(&self, p: Point) -> bool {
        axis_contains(self.min_x, self.max_x, p.x) && axis_contains(self.min_y, self.max_y, p.y)
    }

    /// True when the two regions share at least one point.
    pub fn intersects(&self, other: &Rect) -> bool {
        axis_overlaps(self.min_x, self.max_x, other.min_x, other.max_x)
            && axis_overlaps(self.min_y, self.max_y, other.min_y, other.max_y)
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Union over an iterator of rectangles, `None` when empty.
    pub fn union_all<I: IntoIterator<Item = Rect>>(rects: I) -> Option<Rect> {
        rects.into_iter().reduce(|acc, r| acc.union(&r))
    }

    /// Splits into the NW, NE, SW, SE quadrants. In screen convention "north" is low y.
    pub fn quadrants(&self) -> [Rect; 4] {
        let c = self.center();
        [
            Rect { min_x: self.min_x, min_y: self.min_y, max_x: c.x, max_y: c.y },
            Rect { min_x: c.x, min_y: self.min_y, max_x: self.max_x, max_y: c.y },
            Rect { min_x: self.min_x, min_y: c.y, max_x: c.x, max_y: self.max_y },
            Rect { min_x: c.x, min_y: c.y, max_x: self.max_x, max_y: self.max_y },
        ]
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) x [{}, {})",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

fn axis_contains(min: f64, max: f64, v: f64) -> bool {
    if min == max {
        v == min
    } else {
        min <= v && v < max
    }
}

fn axis_overlaps(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> bool {
    match (a_min == a_max, b_min == b_max) {
        (true, true) => a_min == b_min,
        (true, false) => axis_contains(b_min, b_max, a_min),
        (false, true) => axis_contains(a_min, a_max, b_min),
        (false, false) => a_min < b_max && b_min < a_max,
    }
}

/// A closed path made of one or more rings, filled with the even-odd rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    rings: Vec<Vec<Point>>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a closed ring. The closing edge back to the first vertex is implicit.
    pub fn push_ring(&mut self, ring: Vec<Point>) {
        if !ring.is_empty() {
            self.rings.push(ring);
        }
    }

    pub fn rings(&self) -> &[Vec<Point>] {
        &self.rings
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Iterates every edge of every ring, including the implicit closing edges.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.rings.iter().flat_map(|ring| {
            let n = ring.len();
            (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
        })
    }

    pub fn bounds(&self) -> Option<Rect> {
        Rect::union_all(self.rings.iter().flatten().map(|p| Rect::point(*p)))
    }

    /// Even-odd point containment using a horizontal ray towards +x.
    pub fn contains(&self, p: Point) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let cross_x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < cross_x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// True when the filled path and the rectangle share area or boundary.
    pub fn intersects(&self, rect: &Rect) -> bool {
        let Some(bounds) = self.bounds() else {
            return false;
        };
        if !bounds.intersects(rect) {
            return false;
        }
        if self.rings.iter().flatten().any(|p| rect.contains(*p)) {
            return true;
        }
        if self.contains(rect.center()) {
            return true;
        }
        let corners = [
            Point::new(rect.min_x, rect.min_y),
            Point::new(rect.max_x, rect.min_y),
            Point::new(rect.max_x, rect.max_y),
            Point::new(rect.min_x, rect.max_y),
        ];
        self.edges().any(|(a, b)| {
            (0..4).any(|i| segments_touch(a, b, corners[i], corners[(i + 1) % 4]))
        })
    }
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// `r` lies within the bounding box of segment `p q`.
fn within_segment_box(p: Point, q: Point, r: Point) -> bool {
    r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
}

/// Closed segments `a b` and `c d` share at least one point, endpoints included.
fn segments_touch(a: Point, b: Point, c: Point, d: Point) -> bool {
    let d1 = orientation(c, d, a);
    let d2 = orientation(c, d, b);
    let d3 = orientation(a, b, c);
    let d4 = orientation(a, b, d);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && within_segment_box(c, d, a))
        || (d2 == 0.0 && within_segment_box(c, d, b))
        || (d3 == 0.0 && within_segment_box(a, b, c))
        || (d4 == 0.0 && within_segment_box(a, b, d))
}

/// The geometry carried by a glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect(Rect),
    Path(Path),
}

impl Shape {
    /// Bounding box. An empty path reports a zero-extent box at the origin.
    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Rect(r) => *r,
            Shape::Path(p) => p.bounds().unwrap_or_else(|| Rect::point(Point::default())),
        }
    }

    pub fn intersects(&self, region: &Rect) -> bool {
        match self {
            Shape::Rect(r) => r.intersects(region),
            Shape::Path(p) => p.intersects(region),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        match self {
            Shape::Rect(r) => r.contains(point),
            Shape::Path(p) => p.contains(point),
        }
    }
}

impl From<Rect> for Shape {
    fn from(rect: Rect) -> Self {
        Shape::Rect(rect)
    }
}

impl From<Path> for Shape {
    fn from(path: Path) -> Self {
        Shape::Path(path)
    }
}

/// Affine map `(x, y) -> (m00 x + m01 y + m02, m10 x + m11 y + m12)`.
///
/// View transforms map absolute (data) coordinates to screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub m00: f64,
    pub m01: f64,
    pub m02: f64,
    pub m10: f64,
    pub m11: f64,
    pub m12: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self { m00: 1.0, m01: 0.0, m02: 0.0, m10: 0.0, m11: 1.0, m12: 0.0 }
    }

    pub fn scale_translate(sx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self { m00: sx, m01: 0.0, m02: tx, m10: 0.0, m11: sy, m12: ty }
    }

    /// View that fits `bounds` into a `width` x `height` screen, preserving aspect ratio.
    pub fn zoom_fit(bounds: &Rect, width: usize, height: usize) -> Result<Self> {
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(RenderError::InvalidParameter(format!(
                "cannot fit degenerate bounds {bounds}"
            )));
        }
        let scale = (width as f64 / bounds.width()).min(height as f64 / bounds.height());
        Ok(Self::scale_translate(
            scale,
            scale,
            -bounds.min_x * scale,
            -bounds.min_y * scale,
        ))
    }

    pub fn determinant(&self) -> f64 {
        self.m00 * self.m11 - self.m01 * self.m10
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.m00 * p.x + self.m01 * p.y + self.m02,
            self.m10 * p.x + self.m11 * p.y + self.m12,
        )
    }

    pub fn inverse(&self) -> Result<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(RenderError::NonInvertibleTransform(det));
        }
        Ok(Self {
            m00: self.m11 / det,
            m01: -self.m01 / det,
            m02: (self.m01 * self.m12 - self.m11 * self.m02) / det,
            m10: -self.m10 / det,
            m11: self.m00 / det,
            m12: (self.m10 * self.m02 - self.m00 * self.m12) / det,
        })
    }

    /// Bounding box of a transformed rectangle.
    pub fn apply_rect(&self, r: &Rect) -> Rect {
        let corners = [
            self.apply(Point::new(r.min_x, r.min_y)),
            self.apply(Point::new(r.max_x, r.min_y)),
            self.apply(Point::new(r.min_x, r.max_y)),
            self.apply(Point::new(r.max_x, r.max_y)),
        ];
        let mut out = Rect::point(corners[0]);
        for c in &corners[1..] {
            out = out.union(&Rect::point(*c));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_open_containment() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(r.contains(Point::new(9.99, 5.0)));
        assert!(!r.contains(Point::new(10.0, 5.0)));
        assert!(!r.contains(Point::new(5.0, -0.1)));
    }

    #[test]
    fn test_point_rect_intersections() {
        let region = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!(Rect::point(Point::new(0.5, 0.5)).intersects(&region));
        assert!(Rect::point(Point::new(0.0, 0.0)).intersects(&region));
        assert!(!Rect::point(Point::new(1.0, 0.5)).intersects(&region));
        assert!(Rect::point(Point::new(2.0, 2.0))
            .intersects(&Rect::point(Point::new(2.0, 2.0))));
    }

    #[test]
    fn test_quadrants_partition_parent() {
        let parent = Rect::new(0.0, 0.0, 8.0, 4.0);
        let quads = parent.quadrants();
        for p in [Point::new(0.0, 0.0), Point::new(4.0, 2.0), Point::new(7.9, 3.9), Point::new(3.9, 2.0)] {
            let hits = quads.iter().filter(|q| q.contains(p)).count();
            assert_eq!(hits, 1, "point {p:?} should fall in exactly one quadrant");
        }
        assert_eq!(Rect::union_all(quads), Some(parent));
    }

    #[test]
    fn test_path_even_odd() {
        let mut path = Path::new();
        path.push_ring(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        path.push_ring(vec![
            Point::new(3.0, 3.0),
            Point::new(7.0, 3.0),
            Point::new(7.0, 7.0),
            Point::new(3.0, 7.0),
        ]);
        assert!(path.contains(Point::new(1.5, 1.5)));
        assert!(!path.contains(Point::new(5.0, 5.0)));
        assert!(!path.contains(Point::new(11.0, 5.0)));
        assert!(path.intersects(&Rect::new(9.0, 9.0, 5.0, 5.0)));
        assert!(!path.intersects(&Rect::new(4.0, 4.0, 1.0, 1.0)));
    }

    #[test]
    fn test_path_edge_touching_rect_corner_intersects() {
        let mut triangle = Path::new();
        triangle.push_ring(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ]);
        // The hypotenuse passes exactly through the rectangle's low corner.
        assert!(triangle.intersects(&Rect::new(2.0, 2.0, 1.0, 1.0)));
        assert!(!triangle.intersects(&Rect::new(2.5, 2.5, 1.0, 1.0)));
    }

    #[test]
    fn test_transform_inverse_round_trip() {
        let t = AffineTransform::scale_translate(2.0, 4.0, 10.0, -3.0);
        let inv = t.inverse().unwrap();
        let p = Point::new(3.5, -1.25);
        let back = inv.apply(t.apply(p));
        assert!((back.x - p.x).abs() < 1e-12);
        assert!((back.y - p.y).abs() < 1e-12);
    }

    #[test]
    fn test_singular_transform_rejected() {
        let t = AffineTransform::scale_translate(0.0, 1.0, 0.0, 0.0);
        assert!(matches!(
            t.inverse(),
            Err(RenderError::NonInvertibleTransform(_))
        ));
    }

    #[test]
    fn test_zoom_fit_maps_bounds_to_screen() {
        let bounds = Rect::new(-5.0, -5.0, 10.0, 10.0);
        let view = AffineTransform::zoom_fit(&bounds, 100, 100).unwrap();
        let low = view.apply(Point::new(-5.0, -5.0));
        let high = view.apply(Point::new(5.0, 5.0));
        assert_eq!(low, Point::new(0.0, 0.0));
        assert_eq!(high, Point::new(100.0, 100.0));
    }
}
