// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Intersection and distance primitives.
//!
//! Pure functions with no state: segment-vs-rectangle clipping
//! (Liang–Barsky), segment-vs-segment intersection (cross-product
//! parametrisation) and point-to-segment distance.

use crate::types::{Point2D, Rect, WallSegment};

/// Parallel-direction threshold for the cross-product denominator
const PARALLEL_EPSILON: f64 = 1e-12;

/// Clip a segment against an axis-aligned box (Liang–Barsky).
///
/// Returns the parameter interval `(t0, t1)` of the part inside the closed
/// box, or `None` when the segment misses it entirely.
pub fn clip_segment(seg: &WallSegment, min: Point2D, max: Point2D) -> Option<(f64, f64)> {
    let dx = seg.end.x - seg.start.x;
    let dy = seg.end.y - seg.start.y;

    let p = [-dx, dx, -dy, dy];
    let q = [
        seg.start.x - min.x,
        max.x - seg.start.x,
        seg.start.y - min.y,
        max.y - seg.start.y,
    ];

    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;

    for i in 0..4 {
        if p[i].abs() < PARALLEL_EPSILON {
            // Parallel to this edge: reject when outside it
            if q[i] < 0.0 {
                return None;
            }
        } else {
            let r = q[i] / p[i];
            if p[i] < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }

    (t0 <= t1).then_some((t0, t1))
}

/// True when the segment touches or enters the closed rectangle
pub fn segment_intersects_rect(seg: &WallSegment, rect: &Rect) -> bool {
    clip_segment(
        seg,
        Point2D::new(rect.x, rect.y),
        Point2D::new(rect.max_x(), rect.max_y()),
    )
    .is_some()
}

/// True when the segment enters the rectangle shrunk by `tolerance`.
///
/// Walls running along an edge of the rectangle (boxes flush against a
/// wall) do not count.
pub fn segment_crosses_rect(seg: &WallSegment, rect: &Rect, tolerance: f64) -> bool {
    segment_intersects_rect(seg, &rect.inset(tolerance))
}

/// A proper intersection between two segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    /// Parameter along the first segment
    pub t: f64,
    /// Parameter along the second segment
    pub u: f64,
    pub point: Point2D,
}

/// Intersect two segments by cross-product parametrisation.
///
/// Parallel (including collinear) pairs return `None`; `slack` widens the
/// accepted parameter range to `[-slack, 1 + slack]` on both segments.
pub fn segment_intersection(a: &WallSegment, b: &WallSegment, slack: f64) -> Option<SegmentHit> {
    let r = a.start.vector_to(&a.end);
    let s = b.start.vector_to(&b.end);
    let denom = r.perp(&s);

    if denom.abs() < PARALLEL_EPSILON * (r.norm() * s.norm()).max(1.0) {
        return None;
    }

    let qp = a.start.vector_to(&b.start);
    let t = qp.perp(&s) / denom;
    let u = qp.perp(&r) / denom;

    let range = -slack..=1.0 + slack;
    if range.contains(&t) && range.contains(&u) {
        Some(SegmentHit {
            t,
            u,
            point: a.point_at(t),
        })
    } else {
        None
    }
}

/// Bounding-box reject followed by an exact crossing test
pub fn segments_cross(a: &WallSegment, b: &WallSegment) -> bool {
    if !a.bounds().overlaps(&b.bounds()) {
        return false;
    }
    segment_intersection(a, b, 0.0).is_some()
}

/// Closest point on the segment to `point`, with its clamped parameter
pub fn project_onto_segment(point: &Point2D, seg: &WallSegment) -> (f64, Point2D) {
    let d = seg.start.vector_to(&seg.end);
    let length_sq = d.norm_squared();

    if length_sq < 1e-18 {
        return (0.0, seg.start);
    }

    let t = seg.start.vector_to(point).dot(&d) / length_sq;
    if t <= 0.0 {
        (0.0, seg.start)
    } else if t >= 1.0 {
        (1.0, seg.end)
    } else {
        (t, seg.point_at(t))
    }
}

/// Euclidean distance from a point to a segment
pub fn point_segment_distance(point: &Point2D, seg: &WallSegment) -> f64 {
    let (_, closest) = project_onto_segment(point, seg);
    point.distance_to(&closest)
}

/// Perpendicular distance from a point to the infinite line through `seg`
pub fn point_line_distance(point: &Point2D, seg: &WallSegment) -> f64 {
    let d = seg.start.vector_to(&seg.end);
    let len = d.norm();
    if len < 1e-12 {
        return point.distance_to(&seg.start);
    }
    seg.start.vector_to(point).perp(&d).abs() / len
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment::new(Point2D::new(x0, y0), Point2D::new(x1, y1))
    }

    #[test]
    fn test_clip_segment_through_box() {
        let (t0, t1) = clip_segment(
            &seg(-5.0, 1.0, 15.0, 1.0),
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 2.0),
        )
        .unwrap();
        assert_relative_eq!(t0, 0.25);
        assert_relative_eq!(t1, 0.75);
    }

    #[test]
    fn test_segment_rect_miss_and_hit() {
        let rect = Rect::new(0.0, 0.0, 2.0, 2.0);
        assert!(segment_intersects_rect(&seg(-1.0, 1.0, 3.0, 1.0), &rect));
        assert!(!segment_intersects_rect(&seg(-1.0, 3.0, 3.0, 3.0), &rect));
        // Diagonal passing near the corner but outside
        assert!(!segment_intersects_rect(&seg(2.5, 0.0, 4.0, 1.5), &rect));
    }

    #[test]
    fn test_flush_wall_does_not_cross() {
        let rect = Rect::new(0.0, 0.0, 2.0, 2.5);
        let perimeter = seg(-5.0, 0.0, 5.0, 0.0);
        assert!(segment_intersects_rect(&perimeter, &rect));
        assert!(!segment_crosses_rect(&perimeter, &rect, 0.01));
    }

    #[test]
    fn test_segment_intersection_cross() {
        let hit = segment_intersection(&seg(0.0, 0.0, 10.0, 0.0), &seg(5.0, -5.0, 5.0, 5.0), 0.0)
            .unwrap();
        assert_relative_eq!(hit.t, 0.5);
        assert_relative_eq!(hit.u, 0.5);
        assert_relative_eq!(hit.point.x, 5.0);
    }

    #[test]
    fn test_parallel_segments_do_not_intersect() {
        assert!(segment_intersection(&seg(0.0, 0.0, 10.0, 0.0), &seg(0.0, 1.0, 10.0, 1.0), 0.0)
            .is_none());
        assert!(!segments_cross(&seg(0.0, 0.0, 10.0, 0.0), &seg(2.0, 0.0, 4.0, 0.0)));
    }

    #[test]
    fn test_point_segment_distance() {
        let s = seg(0.0, 0.0, 10.0, 0.0);
        assert_relative_eq!(point_segment_distance(&Point2D::new(5.0, 5.0), &s), 5.0);
        assert_relative_eq!(point_segment_distance(&Point2D::new(13.0, 4.0), &s), 5.0);
        assert_relative_eq!(point_line_distance(&Point2D::new(13.0, 4.0), &s), 4.0);
    }
}
