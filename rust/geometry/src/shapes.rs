// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heterogeneous input shapes and their normalisation into segments and
//! rectangles.
//!
//! The CAD classifier hands over walls, forbidden zones and entrances as a
//! mix of lines, polylines, polygons and bounding boxes. This is the only
//! place where those forms are accepted; everything downstream works on
//! [`WallSegment`], [`Rect`] and [`Polygon`].

use crate::types::{Bounds, Point2D, Polygon, Rect, WallSegment, COORD_EPSILON};
use serde::{Deserialize, Serialize};

/// One input shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Shape {
    /// A single line `{start, end}`
    Segment { start: Point2D, end: Point2D },
    /// A closed ring `{polygon: [...]}`; closed implicitly if needed
    Polygon { polygon: Vec<Point2D> },
    /// An open chain `{polyline: [...]}` (also accepted as `points`)
    Polyline {
        #[serde(alias = "points")]
        polyline: Vec<Point2D>,
    },
    /// An axis-aligned box `{bounds: {minX, ...}}`
    Bounds { bounds: Bounds },
}

impl Shape {
    pub fn segment(start: Point2D, end: Point2D) -> Self {
        Shape::Segment { start, end }
    }

    pub fn polygon(points: Vec<Point2D>) -> Self {
        Shape::Polygon { polygon: points }
    }

    pub fn polyline(points: Vec<Point2D>) -> Self {
        Shape::Polyline { polyline: points }
    }

    /// All defining vertices, finite or not
    pub fn points(&self) -> Vec<Point2D> {
        match self {
            Shape::Segment { start, end } => vec![*start, *end],
            Shape::Polygon { polygon } => polygon.clone(),
            Shape::Polyline { polyline } => polyline.clone(),
            Shape::Bounds { bounds } => bounds.to_rect().corners().to_vec(),
        }
    }

    /// Split into straight segments.
    ///
    /// Multi-vertex shapes become consecutive-pair segments; polygons and
    /// boxes are closed. Non-finite and zero-length pieces are dropped.
    pub fn segments(&self) -> Vec<WallSegment> {
        let raw: Vec<WallSegment> = match self {
            Shape::Segment { start, end } => vec![WallSegment::new(*start, *end)],
            Shape::Polyline { polyline } => chain_segments(polyline, false),
            Shape::Polygon { polygon } => chain_segments(polygon, true),
            Shape::Bounds { bounds } => bounds.to_rect().edges().to_vec(),
        };

        raw.into_iter()
            .filter(|s| s.is_finite() && s.length() > COORD_EPSILON)
            .collect()
    }

    /// Axis-aligned box around the finite vertices
    pub fn bounding_rect(&self) -> Option<Rect> {
        let points: Vec<Point2D> = self.points().into_iter().filter(|p| p.is_finite()).collect();
        Bounds::from_points(&points).map(|b| b.to_rect())
    }

    /// Closed outline when the shape encloses an area
    pub fn outline(&self) -> Option<Polygon> {
        match self {
            Shape::Polygon { polygon } => {
                let pts: Vec<Point2D> = polygon.iter().copied().filter(|p| p.is_finite()).collect();
                (pts.len() >= 3).then(|| Polygon::new(pts))
            }
            Shape::Bounds { bounds } if bounds.is_valid() => Some(bounds.to_polygon()),
            _ => None,
        }
    }

    /// Representative point: segment midpoint, otherwise the box center
    pub fn center(&self) -> Option<Point2D> {
        match self {
            Shape::Segment { start, end } if start.is_finite() && end.is_finite() => {
                Some(start.lerp(end, 0.5))
            }
            _ => self.bounding_rect().map(|r| r.center()),
        }
    }
}

fn chain_segments(points: &[Point2D], closed: bool) -> Vec<WallSegment> {
    if points.len() < 2 {
        return Vec::new();
    }

    let mut segments: Vec<WallSegment> = points
        .windows(2)
        .map(|w| WallSegment::new(w[0], w[1]))
        .collect();

    if closed && points.len() >= 3 {
        let first = points[0];
        let last = points[points.len() - 1];
        if !first.approx_eq(&last, COORD_EPSILON) {
            segments.push(WallSegment::new(last, first));
        }
    }

    segments
}

/// Flatten a shape list into segments at least `min_length` long
pub fn extract_segments(shapes: &[Shape], min_length: f64) -> Vec<WallSegment> {
    shapes
        .iter()
        .flat_map(|s| s.segments())
        .filter(|s| s.length() >= min_length)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_shapes_decode() {
        let json = r#"[
            {"start": {"x": 0, "y": 0}, "end": [10, 0]},
            {"polygon": [[0, 0], [4, 0], [4, 4], [0, 4]]},
            {"points": [[0, 0], [1, 1], [2, 0]]},
            {"bounds": {"minX": 1, "minY": 1, "maxX": 2, "maxY": 3}}
        ]"#;
        let shapes: Vec<Shape> = serde_json::from_str(json).unwrap();
        assert!(matches!(shapes[0], Shape::Segment { .. }));
        assert!(matches!(shapes[1], Shape::Polygon { .. }));
        assert!(matches!(shapes[2], Shape::Polyline { .. }));
        assert!(matches!(shapes[3], Shape::Bounds { .. }));
    }

    #[test]
    fn test_polygon_is_closed() {
        let square = Shape::polygon(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(4.0, 4.0),
            Point2D::new(0.0, 4.0),
        ]);
        assert_eq!(square.segments().len(), 4);

        // Already closed: no duplicate closing edge
        let closed = Shape::polygon(vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(4.0, 4.0),
            Point2D::new(0.0, 0.0),
        ]);
        assert_eq!(closed.segments().len(), 3);
    }

    #[test]
    fn test_degenerate_segments_filtered() {
        let shapes = vec![
            Shape::segment(Point2D::new(0.0, 0.0), Point2D::new(0.0, 0.0)),
            Shape::segment(Point2D::new(f64::NAN, 0.0), Point2D::new(1.0, 0.0)),
            Shape::segment(Point2D::new(0.0, 0.0), Point2D::new(0.2, 0.0)),
            Shape::segment(Point2D::new(0.0, 0.0), Point2D::new(5.0, 0.0)),
        ];
        let segments = extract_segments(&shapes, 0.3);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_center_of_segment_and_polygon() {
        let seg = Shape::segment(Point2D::new(0.0, 0.0), Point2D::new(2.0, 0.0));
        assert_eq!(seg.center(), Some(Point2D::new(1.0, 0.0)));
        let bx = Shape::Bounds {
            bounds: Bounds::new(0.0, 0.0, 2.0, 4.0),
        };
        assert_eq!(bx.center(), Some(Point2D::new(1.0, 2.0)));
    }
}
