// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types shared by detection, placement and routing

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether two coordinates coincide
pub const COORD_EPSILON: f64 = 1e-9;

/// A 2D point.
///
/// Deserializes from either `{"x": .., "y": ..}` or `[x, y]`; always
/// serializes as an object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(from = "RawPoint")]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

/// Accepted wire forms of a point
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Pair([f64; 2]),
    Object { x: f64, y: f64 },
}

impl From<RawPoint> for Point2D {
    fn from(raw: RawPoint) -> Self {
        match raw {
            RawPoint::Pair([x, y]) => Self { x, y },
            RawPoint::Object { x, y } => Self { x, y },
        }
    }
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn from_nalgebra(p: &Point2<f64>) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Vector from `self` to `other`
    pub fn vector_to(&self, other: &Point2D) -> Vector2<f64> {
        other.to_nalgebra() - self.to_nalgebra()
    }

    /// Linear interpolation between `self` (t = 0) and `other` (t = 1)
    pub fn lerp(&self, other: &Point2D, t: f64) -> Point2D {
        Point2D::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn approx_eq(&self, other: &Point2D, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

/// Axis-aligned extent of a floor plan or shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounds of a point set, `None` when empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point2D>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bounds.include(p);
        }
        Some(bounds)
    }

    pub fn include(&mut self, p: &Point2D) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Finite and with a strictly positive extent on both axes
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.width() > 0.0
            && self.height() > 0.0
    }

    pub fn contains_point(&self, p: &Point2D, tolerance: f64) -> bool {
        p.x >= self.min_x - tolerance
            && p.x <= self.max_x + tolerance
            && p.y >= self.min_y - tolerance
            && p.y <= self.max_y + tolerance
    }

    pub fn expanded(&self, margin: f64) -> Bounds {
        Bounds::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn to_rect(&self) -> Rect {
        Rect::from_min_max(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Closed ring of the four corners, counter-clockwise
    pub fn to_polygon(&self) -> Polygon {
        self.to_rect().to_polygon()
    }
}

/// Axis-aligned rectangle given by its lower-left corner and size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_min_max(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.max_x(), self.max_y())
    }

    /// Rectangle shrunk by `inset` on every side (never below zero size)
    pub fn inset(&self, inset: f64) -> Rect {
        let dx = inset.min(self.width / 2.0);
        let dy = inset.min(self.height / 2.0);
        Rect::new(
            self.x + dx,
            self.y + dy,
            self.width - 2.0 * dx,
            self.height - 2.0 * dy,
        )
    }

    pub fn expanded(&self, margin: f64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Area of the intersection with `other` (zero when disjoint or touching)
    pub fn overlap_area(&self, other: &Rect) -> f64 {
        let w = self.max_x().min(other.max_x()) - self.x.max(other.x);
        let h = self.max_y().min(other.max_y()) - self.y.max(other.y);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// True when the interiors overlap by more than `slack` on both axes
    pub fn overlaps(&self, other: &Rect, slack: f64) -> bool {
        self.x < other.max_x() - slack
            && other.x < self.max_x() - slack
            && self.y < other.max_y() - slack
            && other.y < self.max_y() - slack
    }

    pub fn contains_point(&self, p: &Point2D) -> bool {
        p.x >= self.x && p.x <= self.max_x() && p.y >= self.y && p.y <= self.max_y()
    }

    /// True when the rectangle lies within `bounds` up to `tolerance`
    pub fn within(&self, bounds: &Bounds, tolerance: f64) -> bool {
        self.x >= bounds.min_x - tolerance
            && self.y >= bounds.min_y - tolerance
            && self.max_x() <= bounds.max_x + tolerance
            && self.max_y() <= bounds.max_y + tolerance
    }

    /// Intersection with `bounds`, `None` when nothing is left
    pub fn clamped_to(&self, bounds: &Bounds) -> Option<Rect> {
        let min_x = self.x.max(bounds.min_x);
        let min_y = self.y.max(bounds.min_y);
        let max_x = self.max_x().min(bounds.max_x);
        let max_y = self.max_y().min(bounds.max_y);
        if max_x <= min_x || max_y <= min_y {
            return None;
        }
        Some(Rect::from_min_max(min_x, min_y, max_x, max_y))
    }

    pub fn corners(&self) -> [Point2D; 4] {
        [
            Point2D::new(self.x, self.y),
            Point2D::new(self.max_x(), self.y),
            Point2D::new(self.max_x(), self.max_y()),
            Point2D::new(self.x, self.max_y()),
        ]
    }

    /// The four boundary edges, counter-clockwise from the lower-left corner
    pub fn edges(&self) -> [WallSegment; 4] {
        let [a, b, c, d] = self.corners();
        [
            WallSegment::new(a, b),
            WallSegment::new(b, c),
            WallSegment::new(c, d),
            WallSegment::new(d, a),
        ]
    }

    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(self.corners().to_vec())
    }
}

/// A straight wall piece. Immutable once extracted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WallSegment {
    pub start: Point2D,
    pub end: Point2D,
}

impl WallSegment {
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn angle(&self) -> f64 {
        (self.end.y - self.start.y).atan2(self.end.x - self.start.x)
    }

    pub fn midpoint(&self) -> Point2D {
        self.start.lerp(&self.end, 0.5)
    }

    pub fn point_at(&self, t: f64) -> Point2D {
        self.start.lerp(&self.end, t)
    }

    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }

    pub fn is_horizontal(&self, tolerance: f64) -> bool {
        (self.end.y - self.start.y).abs() <= tolerance
            && (self.end.x - self.start.x).abs() > tolerance
    }

    pub fn is_vertical(&self, tolerance: f64) -> bool {
        (self.end.x - self.start.x).abs() <= tolerance
            && (self.end.y - self.start.y).abs() > tolerance
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(
            self.start.x.min(self.end.x),
            self.start.y.min(self.end.y),
            self.start.x.max(self.end.x),
            self.start.y.max(self.end.y),
        )
    }

    /// Segment with both ends pulled towards the middle by `amount`.
    ///
    /// Segments shorter than `2 * amount` collapse to their midpoint.
    pub fn shrunk(&self, amount: f64) -> WallSegment {
        let len = self.length();
        if len <= 2.0 * amount {
            let mid = self.midpoint();
            return WallSegment::new(mid, mid);
        }
        let t = amount / len;
        WallSegment::new(self.point_at(t), self.point_at(1.0 - t))
    }
}

/// A closed ring of points (the closing edge is implicit).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Polygon {
    pub points: Vec<Point2D>,
}

impl Polygon {
    pub fn new(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area; positive for counter-clockwise rings
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }

        area * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    /// Area-weighted centroid, falling back to the vertex mean for
    /// degenerate rings
    pub fn centroid(&self) -> Point2D {
        let n = self.points.len();
        if n == 0 {
            return Point2D::default();
        }

        let signed = self.signed_area();
        if signed.abs() < COORD_EPSILON {
            let sx: f64 = self.points.iter().map(|p| p.x).sum();
            let sy: f64 = self.points.iter().map(|p| p.y).sum();
            return Point2D::new(sx / n as f64, sy / n as f64);
        }

        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let p = &self.points[i];
            let q = &self.points[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        let factor = 1.0 / (6.0 * signed);
        Point2D::new(cx * factor, cy * factor)
    }

    /// Ray-casting point-in-polygon test
    pub fn contains_point(&self, point: &Point2D) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = &self.points[i];
            let pj = &self.points[j];

            if ((pi.y > point.y) != (pj.y > point.y))
                && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Boundary edges including the closing edge
    pub fn edges(&self) -> Vec<WallSegment> {
        let n = self.points.len();
        if n < 2 {
            return Vec::new();
        }
        (0..n)
            .map(|i| WallSegment::new(self.points[i], self.points[(i + 1) % n]))
            .filter(|s| s.length() > COORD_EPSILON)
            .collect()
    }

    /// Same ring with counter-clockwise winding
    pub fn to_ccw(&self) -> Polygon {
        if self.signed_area() < 0.0 {
            Polygon::new(self.points.iter().rev().copied().collect())
        } else {
            self.clone()
        }
    }

    /// Drop repeated vertices and vertices lying on a straight run
    pub fn simplified(&self, epsilon: f64) -> Polygon {
        let mut pts: Vec<Point2D> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if pts.last().map_or(true, |last| !last.approx_eq(p, epsilon)) {
                pts.push(*p);
            }
        }
        while pts.len() > 1 && pts[0].approx_eq(&pts[pts.len() - 1], epsilon) {
            pts.pop();
        }
        if pts.len() <= 3 {
            return Polygon::new(pts);
        }

        let mut changed = true;
        while changed && pts.len() > 3 {
            changed = false;
            let n = pts.len();
            for i in 0..n {
                let prev = pts[(i + n - 1) % n];
                let curr = pts[i];
                let next = pts[(i + 1) % n];
                let cross =
                    (curr.x - prev.x) * (next.y - prev.y) - (curr.y - prev.y) * (next.x - prev.x);
                let span = prev.distance_to(&next).max(COORD_EPSILON);
                if (cross / span).abs() <= epsilon {
                    pts.remove(i);
                    changed = true;
                    break;
                }
            }
        }

        Polygon::new(pts)
    }
}

/// Orientation of a run of boxes and the corridor that serves it.
///
/// `Horizontal` rows extend along x and strips stack along y.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Horizontal,
    Vertical,
}

impl Direction {
    pub fn perpendicular(self) -> Direction {
        match self {
            Direction::Horizontal => Direction::Vertical,
            Direction::Vertical => Direction::Horizontal,
        }
    }

    /// Coordinate along which strips stack
    pub fn primary(self, p: &Point2D) -> f64 {
        match self {
            Direction::Horizontal => p.y,
            Direction::Vertical => p.x,
        }
    }

    /// Coordinate along which boxes in a row are laid out
    pub fn secondary(self, p: &Point2D) -> f64 {
        match self {
            Direction::Horizontal => p.x,
            Direction::Vertical => p.y,
        }
    }

    pub fn point(self, secondary: f64, primary: f64) -> Point2D {
        match self {
            Direction::Horizontal => Point2D::new(secondary, primary),
            Direction::Vertical => Point2D::new(primary, secondary),
        }
    }

    pub fn primary_range(self, r: &Rect) -> (f64, f64) {
        match self {
            Direction::Horizontal => (r.y, r.max_y()),
            Direction::Vertical => (r.x, r.max_x()),
        }
    }

    pub fn secondary_range(self, r: &Rect) -> (f64, f64) {
        match self {
            Direction::Horizontal => (r.x, r.max_x()),
            Direction::Vertical => (r.y, r.max_y()),
        }
    }

    pub fn rect(self, s0: f64, s1: f64, p0: f64, p1: f64) -> Rect {
        match self {
            Direction::Horizontal => Rect::from_min_max(s0, p0, s1, p1),
            Direction::Vertical => Rect::from_min_max(p0, s0, p1, s1),
        }
    }
}
