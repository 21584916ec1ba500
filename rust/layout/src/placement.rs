// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Strip-based box placement.
//!
//! A region is cut into strips stacked along the primary axis, each strip
//! being `row + corridor + row`. Rows are filled with catalog widths inside
//! wall-free gaps along the secondary axis. Both orientations are tried in
//! parallel and the one placing more units wins.

use boxplan_detection::Room;
use boxplan_geometry::intersect::{clip_segment, segment_crosses_rect};
use boxplan_geometry::{Bounds, Direction, GridIndex, Point2D, Polygon, Rect, WallSegment};
use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry};
use crate::config::LayoutConfig;
use crate::corridors::{synthesize_corridors, CorridorRect};
use crate::types::{CorridorType, RowSide};

/// Containment slack against the plan bounds
pub(crate) const BOUNDS_EPSILON: f64 = 0.02;
/// Inset applied to a rectangle before testing wall crossings
pub(crate) const WALL_TOLERANCE: f64 = 0.01;
/// Row bands are shrunk by this much so walls on their edge don't block
const BAND_EPSILON: f64 = 0.01;
/// Overlap slack for box-vs-box and box-vs-obstacle tests
pub(crate) const OVERLAP_SLACK: f64 = 0.01;

/// Read-only inputs shared by every placement attempt
#[derive(Debug)]
pub struct PlacementContext<'a> {
    pub config: &'a LayoutConfig,
    pub catalog: &'a Catalog,
    pub bounds: Bounds,
    pub walls: &'a [WallSegment],
    /// Forbidden zones and entrance clearances
    pub obstacles: &'a [Rect],
    wall_index: GridIndex,
    obstacle_index: GridIndex,
}

impl<'a> PlacementContext<'a> {
    pub fn new(
        config: &'a LayoutConfig,
        catalog: &'a Catalog,
        bounds: Bounds,
        walls: &'a [WallSegment],
        obstacles: &'a [Rect],
    ) -> Self {
        let cell = (2.0 * config.box_depth).max(1.0);
        Self {
            config,
            catalog,
            bounds,
            walls,
            obstacles,
            wall_index: GridIndex::from_segments(walls, cell),
            obstacle_index: GridIndex::from_rects(obstacles, cell),
        }
    }

    pub fn walls_near(&self, rect: &Rect) -> impl Iterator<Item = &WallSegment> + '_ {
        self.wall_index
            .query(&rect.bounds())
            .into_iter()
            .map(move |i| &self.walls[i])
    }

    pub fn obstacles_near(&self, rect: &Rect) -> impl Iterator<Item = &Rect> + '_ {
        self.obstacle_index
            .query(&rect.bounds())
            .into_iter()
            .map(move |i| &self.obstacles[i])
    }

    pub fn crosses_wall(&self, rect: &Rect) -> bool {
        self.walls_near(rect)
            .any(|w| segment_crosses_rect(w, rect, WALL_TOLERANCE))
    }

    pub fn hits_obstacle(&self, rect: &Rect) -> bool {
        self.obstacles_near(rect).any(|o| rect.overlaps(o, OVERLAP_SLACK))
    }

    /// Inside the plan, clear of walls and obstacles
    pub fn is_clear(&self, rect: &Rect) -> bool {
        rect.within(&self.bounds, BOUNDS_EPSILON) && !self.crosses_wall(rect) && !self.hits_obstacle(rect)
    }

    /// Secondary-axis intervals of `band` blocked by walls, obstacles and
    /// `extra` segments, each grown by `pad`, merged and sorted.
    ///
    /// Walls only block where they pass through the band shrunk by a hair,
    /// so walls lying on the band's own edge leave it free.
    pub fn band_blocks(&self, band: &Rect, direction: Direction, pad: f64, extra: &[WallSegment]) -> Vec<(f64, f64)> {
        let (p0, p1) = direction.primary_range(band);
        let (s0, s1) = direction.secondary_range(band);
        let eps = BAND_EPSILON.min((p1 - p0) / 4.0);
        let inner = direction.rect(s0, s1, p0 + eps, p1 - eps);
        let min = Point2D::new(inner.x, inner.y);
        let max = Point2D::new(inner.max_x(), inner.max_y());

        let mut blocks = Vec::new();
        for wall in self.walls_near(band).chain(extra.iter()) {
            if let Some((t0, t1)) = clip_segment(wall, min, max) {
                let a = direction.secondary(&wall.point_at(t0));
                let b = direction.secondary(&wall.point_at(t1));
                blocks.push((a.min(b) - pad, a.max(b) + pad));
            }
        }
        for obstacle in self.obstacles_near(band) {
            if obstacle.overlaps(&inner, 0.0) {
                let (a, b) = direction.secondary_range(obstacle);
                blocks.push((a - pad, b + pad));
            }
        }

        merge_intervals(blocks, 0.0)
    }
}

/// Sorts and merges intervals whose gap is at most `join`
pub(crate) fn merge_intervals(mut intervals: Vec<(f64, f64)>, join: f64) -> Vec<(f64, f64)> {
    intervals.retain(|(a, b)| a.is_finite() && b.is_finite() && b >= a);
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
    for (a, b) in intervals {
        match merged.last_mut() {
            Some(last) if a <= last.1 + join => last.1 = last.1.max(b),
            _ => merged.push((a, b)),
        }
    }
    merged
}

/// Parts of `[lo, hi]` not covered by `blocks` (sorted, merged)
pub(crate) fn complement(lo: f64, hi: f64, blocks: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut free = Vec::new();
    let mut cursor = lo;
    for &(a, b) in blocks {
        if b <= cursor {
            continue;
        }
        if a >= hi {
            break;
        }
        if a > cursor {
            free.push((cursor, a.min(hi)));
        }
        cursor = cursor.max(b);
    }
    if cursor < hi {
        free.push((cursor, hi));
    }
    free
}

/// Intersection of two sorted, merged interval lists
pub(crate) fn intersect_intervals(a: &[(f64, f64)], b: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let lo = a[i].0.max(b[j].0);
        let hi = a[i].1.min(b[j].1);
        if hi > lo {
            out.push((lo, hi));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// A box cut from the catalog, before ids are assigned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedBox {
    pub rect: Rect,
    pub entry: CatalogEntry,
    pub side: RowSide,
    pub direction: Direction,
}

/// Outcome of filling one area in one orientation
#[derive(Debug, Clone)]
pub struct Placement {
    pub direction: Direction,
    pub boxes: Vec<PlacedBox>,
    pub corridors: Vec<CorridorRect>,
    /// Catalog cursor after the last row
    pub cursor: usize,
}

/// Primary-axis layout of one strip
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StripBands {
    pub lower: (f64, f64),
    pub aisle: (f64, f64),
    /// `None` for the single-sided edge strip
    pub upper: Option<(f64, f64)>,
}

/// Cuts `[p0, p1]` into strips.
///
/// As many whole `row + aisle + row` strips as fit are stacked. When the
/// leftover still holds `depth + corridor`, a single-sided edge strip goes
/// first. Aisles are always exactly `corridor` wide; the stack is centred
/// and whatever remains is split evenly between the two ends.
pub(crate) fn plan_strips(p0: f64, p1: f64, depth: f64, corridor: f64) -> Vec<StripBands> {
    let span = p1 - p0;
    let pitch = 2.0 * depth + corridor;
    if span.is_nan() || span <= 0.0 || depth <= 0.0 || corridor < 0.0 {
        return Vec::new();
    }

    let count = ((span + 1e-9) / pitch).floor() as usize;
    let single = depth + corridor;
    // The leftover is shorter than a pitch, so at most one edge strip fits
    let edge = span - count as f64 * pitch + 1e-9 >= single;
    let used = count as f64 * pitch + if edge { single } else { 0.0 };
    let mut base = p0 + ((span - used) / 2.0).max(0.0);

    let mut strips = Vec::with_capacity(count + 1);
    if edge {
        strips.push(StripBands {
            lower: (base, base + depth),
            aisle: (base + depth, base + single),
            upper: None,
        });
        base += single;
    }
    for _ in 0..count {
        strips.push(StripBands {
            lower: (base, base + depth),
            aisle: (base + depth, base + single),
            upper: Some((base + single, base + pitch)),
        });
        base += pitch;
    }
    strips
}

/// Fills `area` with strips in `direction`.
///
/// `outline` restricts gaps to the region's polygon; `accept` vets every
/// box before it is kept. A rejected box leaves its slot empty.
pub fn fill_area(
    ctx: &PlacementContext<'_>,
    area: &Rect,
    outline: Option<&Polygon>,
    direction: Direction,
    start_cursor: usize,
    corridor_type: CorridorType,
    accept: &(dyn Fn(&Rect) -> bool + Sync),
) -> Placement {
    let config = ctx.config;
    let (s0, s1) = direction.secondary_range(area);
    let (p0, p1) = direction.primary_range(area);
    let edges = outline.map(Polygon::edges).unwrap_or_default();

    let mut cursor = start_cursor;
    let mut boxes = Vec::new();
    let mut corridors = Vec::new();

    for strip in plan_strips(p0, p1, config.box_depth, config.corridor_width) {
        let lower_side = if strip.upper.is_some() {
            RowSide::Lower
        } else {
            RowSide::Single
        };

        let lower = fill_row(ctx, direction, strip.lower, (s0, s1), outline, &edges, lower_side, &mut cursor, accept);
        let upper = strip
            .upper
            .map(|band| fill_row(ctx, direction, band, (s0, s1), outline, &edges, RowSide::Upper, &mut cursor, accept))
            .unwrap_or_default();

        let rows: Vec<&[PlacedBox]> = if strip.upper.is_some() {
            vec![&lower[..], &upper[..]]
        } else {
            vec![&lower[..]]
        };
        let kind = match (corridor_type, strip.upper.is_some()) {
            (CorridorType::Access, false) => CorridorType::SingleSided,
            (kind, _) => kind,
        };
        corridors.extend(synthesize_corridors(ctx, direction, strip.aisle, &rows, kind));

        boxes.extend(lower);
        boxes.extend(upper);
    }

    Placement {
        direction,
        boxes,
        corridors,
        cursor,
    }
}

/// Wall-free gaps of one row band, each at least one box wide
fn row_gaps(
    ctx: &PlacementContext<'_>,
    direction: Direction,
    band: (f64, f64),
    span: (f64, f64),
    outline: Option<&Polygon>,
    edges: &[WallSegment],
) -> Vec<(f64, f64)> {
    let config = ctx.config;
    let band_rect = direction.rect(span.0, span.1, band.0, band.1);
    let blocks = ctx.band_blocks(&band_rect, direction, config.box_spacing, edges);
    // Blocks closer than a box width leave nothing usable between them
    let blocks = merge_intervals(blocks, config.min_box_width);
    let middle = (band.0 + band.1) * 0.5;

    complement(span.0, span.1, &blocks)
        .into_iter()
        .filter(|(a, b)| b - a + 1e-9 >= config.min_box_width)
        .filter(|(a, b)| outline.map_or(true, |poly| poly.contains_point(&direction.point((a + b) * 0.5, middle))))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn fill_row(
    ctx: &PlacementContext<'_>,
    direction: Direction,
    band: (f64, f64),
    span: (f64, f64),
    outline: Option<&Polygon>,
    edges: &[WallSegment],
    side: RowSide,
    cursor: &mut usize,
    accept: &(dyn Fn(&Rect) -> bool + Sync),
) -> Vec<PlacedBox> {
    let config = ctx.config;
    let mut placed = Vec::new();

    for (g0, g1) in row_gaps(ctx, direction, band, span, outline, edges) {
        let mut s = g0;
        while g1 - s + 1e-9 >= config.min_box_width {
            let Some(entry) = ctx.catalog.next_fitting(cursor, g1 - s) else {
                break;
            };
            let rect = direction.rect(s, s + entry.width, band.0, band.1);
            if accept(&rect) {
                placed.push(PlacedBox {
                    rect,
                    entry,
                    side,
                    direction,
                });
            }
            s += entry.width + config.box_spacing;
        }
    }

    placed
}

/// Places one region in both orientations concurrently and keeps the
/// denser result. Ties go to horizontal rows.
///
/// Returns `None` when the region is too small for a single row.
pub fn place_region(ctx: &PlacementContext<'_>, room: &Room, start_cursor: usize) -> Option<Placement> {
    let config = ctx.config;
    let bounds = room.bounds;
    let short = bounds.width().min(bounds.height());
    let long = bounds.width().max(bounds.height());
    if short < config.box_depth || long < 2.0 * config.min_box_width {
        debug!(room = %room.id, short, long, "Region too small for placement");
        return None;
    }

    let area = bounds.to_rect();
    let accept = |rect: &Rect| ctx.is_clear(rect);
    let (horizontal, vertical) = rayon::join(
        || fill_area(ctx, &area, Some(&room.polygon), Direction::Horizontal, start_cursor, CorridorType::Access, &accept),
        || fill_area(ctx, &area, Some(&room.polygon), Direction::Vertical, start_cursor, CorridorType::Access, &accept),
    );

    debug!(
        room = %room.id,
        horizontal = horizontal.boxes.len(),
        vertical = vertical.boxes.len(),
        "Compared orientations"
    );

    Some(if vertical.boxes.len() > horizontal.boxes.len() {
        vertical
    } else {
        horizontal
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment::new(Point2D::new(x0, y0), Point2D::new(x1, y1))
    }

    fn aisle_width(strip: &StripBands) -> f64 {
        strip.aisle.1 - strip.aisle.0
    }

    #[test]
    fn test_plan_strips_centres_leftover() {
        let strips = plan_strips(0.0, 8.0, 2.5, 1.2);
        assert_eq!(strips.len(), 1);
        assert_abs_diff_eq!(strips[0].lower.0, 0.9, epsilon = 1e-9);
        assert_abs_diff_eq!(8.0 - strips[0].upper.unwrap().1, 0.9, epsilon = 1e-9);
        assert_abs_diff_eq!(aisle_width(&strips[0]), 1.2, epsilon = 1e-9);

        let strips = plan_strips(0.0, 12.4, 2.5, 1.2);
        assert_eq!(strips.len(), 2);
        assert_abs_diff_eq!(strips[0].lower.0, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(strips[1].upper.unwrap().1, 12.4, epsilon = 1e-9);
        assert_abs_diff_eq!(strips[0].upper.unwrap().1, strips[1].lower.0, epsilon = 1e-9);
    }

    #[test]
    fn test_plan_strips_adds_edge_row() {
        // 11 = 6.2 + 3.7 + 1.1: one strip plus an edge strip
        let strips = plan_strips(0.0, 11.0, 2.5, 1.2);
        assert_eq!(strips.len(), 2);
        assert!(strips[0].upper.is_none());
        assert!(strips[1].upper.is_some());
        assert_abs_diff_eq!(strips[0].lower.0, 0.55, epsilon = 1e-9);
        assert_abs_diff_eq!(strips[0].aisle.1, strips[1].lower.0, epsilon = 1e-9);
        assert_abs_diff_eq!(11.0 - strips[1].upper.unwrap().1, 0.55, epsilon = 1e-9);
        assert!(strips.iter().all(|s| (aisle_width(s) - 1.2).abs() < 1e-9));
    }

    #[test]
    fn test_plan_strips_single_sided_and_empty() {
        let strips = plan_strips(0.0, 4.0, 2.5, 1.2);
        assert_eq!(strips.len(), 1);
        assert!(strips[0].upper.is_none());
        assert_abs_diff_eq!(aisle_width(&strips[0]), 1.2, epsilon = 1e-9);
        assert!(plan_strips(0.0, 3.0, 2.5, 1.2).is_empty());
    }

    #[test]
    fn test_interval_helpers() {
        let merged = merge_intervals(vec![(5.0, 6.0), (0.0, 1.0), (0.5, 2.0)], 0.0);
        assert_eq!(merged, vec![(0.0, 2.0), (5.0, 6.0)]);
        assert_eq!(complement(0.0, 10.0, &merged), vec![(2.0, 5.0), (6.0, 10.0)]);
        assert_eq!(
            intersect_intervals(&[(0.0, 4.0), (6.0, 9.0)], &[(2.0, 7.0)]),
            vec![(2.0, 4.0), (6.0, 7.0)]
        );
    }

    #[test]
    fn test_perimeter_wall_does_not_block_but_crossing_wall_does() {
        let config = LayoutConfig::default();
        let catalog = Catalog::build(&config);
        let walls = vec![seg(0.0, 0.0, 10.0, 0.0), seg(5.0, 0.0, 5.0, 2.0)];
        let ctx = PlacementContext::new(&config, &catalog, Bounds::new(0.0, 0.0, 10.0, 8.0), &walls, &[]);

        let band = Rect::new(0.0, 0.0, 10.0, 2.5);
        let blocks = ctx.band_blocks(&band, Direction::Horizontal, 0.05, &[]);
        assert_eq!(blocks.len(), 1);
        assert_abs_diff_eq!(blocks[0].0, 4.95, epsilon = 1e-9);
        assert_abs_diff_eq!(blocks[0].1, 5.05, epsilon = 1e-9);
    }

    #[test]
    fn test_fill_area_respects_gaps() {
        let config = LayoutConfig::default();
        let catalog = Catalog::build(&config);
        let walls = vec![seg(5.0, 0.0, 5.0, 8.0)];
        let obstacles = vec![Rect::new(1.0, 6.0, 1.0, 1.0)];
        let ctx = PlacementContext::new(&config, &catalog, Bounds::new(0.0, 0.0, 10.0, 8.0), &walls, &obstacles);

        let accept = |r: &Rect| ctx.is_clear(r);
        let placement = fill_area(
            &ctx,
            &Rect::new(0.0, 0.0, 10.0, 8.0),
            None,
            Direction::Horizontal,
            0,
            CorridorType::Access,
            &accept,
        );

        assert!(!placement.boxes.is_empty());
        for b in &placement.boxes {
            assert!(!ctx.crosses_wall(&b.rect));
            assert!(!b.rect.overlaps(&obstacles[0], OVERLAP_SLACK));
        }
        for (i, a) in placement.boxes.iter().enumerate() {
            for b in &placement.boxes[i + 1..] {
                assert!(!a.rect.overlaps(&b.rect, OVERLAP_SLACK));
            }
        }
    }

    #[test]
    fn test_fill_area_keeps_corridor_width_and_uses_margin() {
        let config = LayoutConfig::default();
        let catalog = Catalog::build(&config);
        let ctx = PlacementContext::new(&config, &catalog, Bounds::new(0.0, 0.0, 40.0, 11.0), &[], &[]);

        let accept = |r: &Rect| ctx.is_clear(r);
        let placement = fill_area(
            &ctx,
            &Rect::new(0.0, 0.0, 40.0, 11.0),
            None,
            Direction::Horizontal,
            0,
            CorridorType::Access,
            &accept,
        );

        let mut rows: Vec<i64> = placement.boxes.iter().map(|b| (b.rect.y * 1000.0).round() as i64).collect();
        rows.sort_unstable();
        rows.dedup();
        assert_eq!(rows.len(), 3);

        assert_eq!(placement.corridors.len(), 2);
        for c in &placement.corridors {
            assert_abs_diff_eq!(c.rect.height, config.corridor_width, epsilon = 1e-9);
        }
        assert!(placement.corridors.iter().any(|c| c.kind == CorridorType::SingleSided));
    }
}
