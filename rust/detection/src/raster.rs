// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raster fallback for room detection.
//!
//! Walls are painted onto an occupancy grid with a thickness buffer wide
//! enough to bridge small drafting gaps. The exterior is flood-filled from
//! the border, the remaining free cells are split into 4-connected
//! components, and each component's outline is traced along cell edges.

use std::collections::VecDeque;

use boxplan_geometry::intersect::point_segment_distance;
use boxplan_geometry::{Bounds, Point2D, Polygon, Rect, WallSegment};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DetectionConfig;

const FREE: i32 = -1;
const BLOCKED: i32 = -2;
const EXTERIOR: i32 = -3;

/// Grid statistics from one raster run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterStats {
    pub cell_size: f64,
    pub cols: usize,
    pub rows: usize,
    pub components: usize,
    pub discarded: usize,
}

/// Outlines found by the raster detector, largest first
#[derive(Debug, Clone, Default)]
pub struct RasterOutcome {
    pub polygons: Vec<Polygon>,
    pub stats: RasterStats,
}

/// Occupancy grid with one label per cell.
///
/// Labels: `FREE`, `BLOCKED`, `EXTERIOR`, or a component index `>= 0`.
#[derive(Debug, Clone)]
struct RasterGrid {
    origin: Point2D,
    cell: f64,
    cols: usize,
    rows: usize,
    labels: Vec<i32>,
}

impl RasterGrid {
    /// Grid covering `extent` plus a margin, coarsened to stay within
    /// `max_cells`. The origin sits on a multiple of the cell size.
    fn covering(extent: &Bounds, cell: f64, buffer: f64, max_cells: usize) -> Self {
        let mut cell = if cell > 0.0 { cell } else { 0.2 };
        let max_cells = max_cells.max(16);

        loop {
            let margin = (buffer / cell).ceil() as i64 + 2;
            let x0 = (extent.min_x / cell).floor() as i64 - margin;
            let y0 = (extent.min_y / cell).floor() as i64 - margin;
            let x1 = (extent.max_x / cell).ceil() as i64 + margin;
            let y1 = (extent.max_y / cell).ceil() as i64 + margin;
            let cols = (x1 - x0).max(1) as usize;
            let rows = (y1 - y0).max(1) as usize;

            if cols.saturating_mul(rows) <= max_cells {
                return Self {
                    origin: Point2D::new(x0 as f64 * cell, y0 as f64 * cell),
                    cell,
                    cols,
                    rows,
                    labels: vec![FREE; cols * rows],
                };
            }
            cell *= 1.25;
        }
    }

    fn index(&self, c: usize, r: usize) -> usize {
        r * self.cols + c
    }

    fn center(&self, c: usize, r: usize) -> Point2D {
        Point2D::new(
            self.origin.x + (c as f64 + 0.5) * self.cell,
            self.origin.y + (r as f64 + 0.5) * self.cell,
        )
    }

    /// Column/row range of cells overlapping `b`, clamped to the grid
    fn cell_range(&self, b: &Bounds) -> (usize, usize, usize, usize) {
        let clamp_c = |v: f64| ((v - self.origin.x) / self.cell).floor().clamp(0.0, (self.cols - 1) as f64) as usize;
        let clamp_r = |v: f64| ((v - self.origin.y) / self.cell).floor().clamp(0.0, (self.rows - 1) as f64) as usize;
        (clamp_c(b.min_x), clamp_r(b.min_y), clamp_c(b.max_x), clamp_r(b.max_y))
    }

    fn paint_segment(&mut self, seg: &WallSegment, buffer: f64) {
        let (c0, r0, c1, r1) = self.cell_range(&seg.bounds().expanded(buffer));
        for r in r0..=r1 {
            for c in c0..=c1 {
                if point_segment_distance(&self.center(c, r), seg) <= buffer {
                    let i = self.index(c, r);
                    self.labels[i] = BLOCKED;
                }
            }
        }
    }

    fn paint_rect(&mut self, rect: &Rect, buffer: f64) {
        let grown = rect.expanded(buffer);
        let (c0, r0, c1, r1) = self.cell_range(&grown.bounds());
        for r in r0..=r1 {
            for c in c0..=c1 {
                if grown.contains_point(&self.center(c, r)) {
                    let i = self.index(c, r);
                    self.labels[i] = BLOCKED;
                }
            }
        }
    }

    fn neighbors4(&self, c: usize, r: usize) -> impl Iterator<Item = (usize, usize)> {
        let (cols, rows) = (self.cols as i64, self.rows as i64);
        [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .map(move |(dc, dr)| (c as i64 + dc, r as i64 + dr))
            .filter(move |&(nc, nr)| nc >= 0 && nr >= 0 && nc < cols && nr < rows)
            .map(|(nc, nr)| (nc as usize, nr as usize))
    }

    /// Labels every free cell reachable from `seeds` and returns the count
    fn flood(&mut self, seeds: Vec<(usize, usize)>, label: i32) -> usize {
        let limit = self.labels.len();
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        let mut filled = 0;

        for (c, r) in seeds {
            let i = self.index(c, r);
            if self.labels[i] == FREE {
                self.labels[i] = label;
                queue.push_back((c, r));
            }
        }

        while let Some((c, r)) = queue.pop_front() {
            filled += 1;
            if filled > limit {
                break;
            }
            let next: Vec<(usize, usize)> = self.neighbors4(c, r).collect();
            for (nc, nr) in next {
                let i = self.index(nc, nr);
                if self.labels[i] == FREE {
                    self.labels[i] = label;
                    queue.push_back((nc, nr));
                }
            }
        }

        filled
    }

    fn border_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(2 * (self.cols + self.rows));
        for c in 0..self.cols {
            cells.push((c, 0));
            cells.push((c, self.rows - 1));
        }
        for r in 0..self.rows {
            cells.push((0, r));
            cells.push((self.cols - 1, r));
        }
        cells
    }

    /// Grows components into adjacent wall cells, one ring per step
    fn dilate(&mut self, steps: usize) {
        for _ in 0..steps {
            let snapshot = self.labels.clone();
            for r in 0..self.rows {
                for c in 0..self.cols {
                    let i = self.index(c, r);
                    if snapshot[i] != BLOCKED {
                        continue;
                    }
                    let mut owner: Option<i32> = None;
                    for dr in -1i64..=1 {
                        for dc in -1i64..=1 {
                            let (nc, nr) = (c as i64 + dc, r as i64 + dr);
                            if nc < 0 || nr < 0 || nc >= self.cols as i64 || nr >= self.rows as i64 {
                                continue;
                            }
                            let label = snapshot[nr as usize * self.cols + nc as usize];
                            if label >= 0 && owner.map_or(true, |o| label < o) {
                                owner = Some(label);
                            }
                        }
                    }
                    if let Some(label) = owner {
                        self.labels[i] = label;
                    }
                }
            }
        }
    }

    /// Outline of component `label` along cell edges: the largest closed
    /// loop, counter-clockwise, collinear runs removed
    fn trace_outline(&self, label: i32) -> Option<Polygon> {
        let owned = |c: i64, r: i64| -> bool {
            c >= 0
                && r >= 0
                && c < self.cols as i64
                && r < self.rows as i64
                && self.labels[r as usize * self.cols + c as usize] == label
        };

        // Directed boundary edges with the component on the left
        let mut outgoing: FxHashMap<(i64, i64), Vec<(i64, i64)>> = FxHashMap::default();
        let mut edge_count = 0usize;
        for r in 0..self.rows as i64 {
            for c in 0..self.cols as i64 {
                if !owned(c, r) {
                    continue;
                }
                let sides = [
                    (!owned(c, r - 1), (c, r), (c + 1, r)),
                    (!owned(c + 1, r), (c + 1, r), (c + 1, r + 1)),
                    (!owned(c, r + 1), (c + 1, r + 1), (c, r + 1)),
                    (!owned(c - 1, r), (c, r + 1), (c, r)),
                ];
                for (open, a, b) in sides {
                    if open {
                        outgoing.entry(a).or_default().push(b);
                        edge_count += 1;
                    }
                }
            }
        }

        let mut best: Option<(f64, Vec<(i64, i64)>)> = None;
        let mut starts: Vec<(i64, i64)> = outgoing.keys().copied().collect();
        starts.sort_unstable();

        for start in starts {
            while outgoing.get(&start).is_some_and(|v| !v.is_empty()) {
                let mut ring = vec![start];
                let mut current = start;
                for _ in 0..=edge_count {
                    let Some(next) = outgoing.get_mut(&current).and_then(Vec::pop) else {
                        break;
                    };
                    if next == start {
                        break;
                    }
                    ring.push(next);
                    current = next;
                }

                let area = lattice_area(&ring);
                if best.as_ref().map_or(true, |(a, _)| area.abs() > a.abs()) {
                    best = Some((area, ring));
                }
            }
        }

        let (_, ring) = best?;
        let points: Vec<Point2D> = ring
            .into_iter()
            .map(|(i, j)| Point2D::new(self.origin.x + i as f64 * self.cell, self.origin.y + j as f64 * self.cell))
            .collect();
        let polygon = Polygon::new(points).simplified(self.cell * 1e-6).to_ccw();
        (polygon.len() >= 3).then_some(polygon)
    }
}

fn lattice_area(ring: &[(i64, i64)]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum();
    twice as f64 * 0.5
}

/// Detects enclosed areas by rasterizing `segments` (walls and entrances)
/// and `obstacles` over `bounds`.
pub fn detect_raster_rooms(
    segments: &[WallSegment],
    obstacles: &[Rect],
    bounds: &Bounds,
    config: &DetectionConfig,
) -> RasterOutcome {
    let buffer = config.wall_buffer();

    let mut extent = *bounds;
    for s in segments.iter().filter(|s| s.is_finite()) {
        extent.include(&s.start);
        extent.include(&s.end);
    }

    // ─── Step 1: Grid ───
    let mut grid = RasterGrid::covering(&extent, config.grid_size, buffer, config.max_grid_cells);
    // A coarsened grid needs a thicker brush to keep walls watertight
    let buffer = buffer.max(grid.cell * 0.75);
    let mut stats = RasterStats {
        cell_size: grid.cell,
        cols: grid.cols,
        rows: grid.rows,
        ..Default::default()
    };

    // ─── Step 2: Paint walls with their buffer ───
    for seg in segments.iter().filter(|s| s.is_finite()) {
        grid.paint_segment(seg, buffer);
    }
    for rect in obstacles {
        grid.paint_rect(rect, buffer);
    }

    // ─── Step 3: Exterior ───
    let border = grid.border_cells();
    grid.flood(border, EXTERIOR);

    // ─── Step 4: Components ───
    let cell_area = grid.cell * grid.cell;
    let mut next_label = 0;
    for r in 0..grid.rows {
        for c in 0..grid.cols {
            if grid.labels[grid.index(c, r)] != FREE {
                continue;
            }
            let filled = grid.flood(vec![(c, r)], next_label);
            stats.components += 1;
            if filled as f64 * cell_area < config.min_room_area {
                // Too small to matter; fold back into the walls
                for l in grid.labels.iter_mut().filter(|l| **l == next_label) {
                    *l = BLOCKED;
                }
                stats.discarded += 1;
            } else {
                next_label += 1;
            }
        }
    }

    // ─── Step 5: Reclaim half the wall thickness, then trace ───
    grid.dilate((buffer / grid.cell).round() as usize);

    let mut polygons: Vec<Polygon> = (0..next_label).filter_map(|label| grid.trace_outline(label)).collect();
    polygons.sort_by(|a, b| b.area().total_cmp(&a.area()));

    debug!(
        cell = stats.cell_size,
        cols = stats.cols,
        rows = stats.rows,
        components = stats.components,
        kept = polygons.len(),
        "Raster detection finished"
    );

    RasterOutcome { polygons, stats }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment::new(Point2D::new(x0, y0), Point2D::new(x1, y1))
    }

    fn rectangle_walls(w: f64, h: f64) -> Vec<WallSegment> {
        vec![
            seg(0.0, 0.0, w, 0.0),
            seg(w, 0.0, w, h),
            seg(w, h, 0.0, h),
            seg(0.0, h, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_closed_rectangle_area_recovered() {
        let bounds = Bounds::new(0.0, 0.0, 10.0, 8.0);
        let out = detect_raster_rooms(&rectangle_walls(10.0, 8.0), &[], &bounds, &DetectionConfig::default());
        assert_eq!(out.polygons.len(), 1);
        let area = out.polygons[0].area();
        assert!((area - 80.0).abs() / 80.0 < 0.05, "area {area}");
    }

    #[test]
    fn test_small_gap_bridged_by_buffer() {
        let walls = vec![
            seg(0.0, 0.0, 4.9, 0.0),
            seg(5.1, 0.0, 10.0, 0.0),
            seg(10.0, 0.0, 10.0, 8.0),
            seg(10.0, 8.0, 0.0, 8.0),
            seg(0.0, 8.0, 0.0, 0.0),
        ];
        let bounds = Bounds::new(0.0, 0.0, 10.0, 8.0);
        let out = detect_raster_rooms(&walls, &[], &bounds, &DetectionConfig::default());
        assert_eq!(out.polygons.len(), 1);
    }

    #[test]
    fn test_open_shape_has_no_rooms() {
        let walls = vec![seg(0.0, 0.0, 10.0, 0.0), seg(10.0, 0.0, 10.0, 8.0)];
        let bounds = Bounds::new(0.0, 0.0, 10.0, 8.0);
        let out = detect_raster_rooms(&walls, &[], &bounds, &DetectionConfig::default());
        assert!(out.polygons.is_empty());
    }

    #[test]
    fn test_grid_coarsened_under_ceiling() {
        let config = DetectionConfig {
            max_grid_cells: 10_000,
            ..Default::default()
        };
        let bounds = Bounds::new(0.0, 0.0, 100.0, 80.0);
        let out = detect_raster_rooms(&rectangle_walls(100.0, 80.0), &[], &bounds, &config);
        assert!(out.stats.cols * out.stats.rows <= 10_000);
        assert!(out.stats.cell_size > 0.2);
        assert_eq!(out.polygons.len(), 1);
    }

    #[test]
    fn test_obstacle_becomes_hole_not_room() {
        let bounds = Bounds::new(0.0, 0.0, 10.0, 8.0);
        let obstacles = vec![Rect::new(3.0, 3.0, 3.0, 2.0)];
        let out = detect_raster_rooms(&rectangle_walls(10.0, 8.0), &obstacles, &bounds, &DetectionConfig::default());
        assert_eq!(out.polygons.len(), 1);
        assert!((out.polygons[0].area() - 80.0).abs() < 4.0);
    }
}
