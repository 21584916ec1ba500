// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-fill of leftover space.
//!
//! Placed units, corridors, obstacles and walls are rasterised onto a coarse
//! occupancy grid. Free 4-connected zones of at least 3×3 cells are filled
//! again with rows running perpendicular to their room's orientation.

use std::collections::VecDeque;

use boxplan_detection::Room;
use boxplan_geometry::{Direction, GridIndex, Point2D, Rect};
use tracing::debug;

use crate::corridors::CorridorRect;
use crate::placement::{fill_area, PlacedBox, PlacementContext, OVERLAP_SLACK};
use crate::types::CorridorType;

/// Smallest zone side in cells
const MIN_ZONE_SIDE: usize = 3;
/// Smallest zone size in cells
const MIN_ZONE_CELLS: usize = 9;
/// Occupancy grids are coarsened until they fit
const MAX_CELLS: usize = 250_000;

/// Boxes and corridors added by the cross-fill pass
#[derive(Debug, Clone, Default)]
pub(crate) struct CrossFill {
    /// Each box with the index of the room holding its center
    pub boxes: Vec<(PlacedBox, Option<usize>)>,
    pub corridors: Vec<CorridorRect>,
    pub zones: usize,
}

struct OccupancyGrid {
    origin: Point2D,
    cell: f64,
    cols: usize,
    rows: usize,
    occupied: Vec<bool>,
}

impl OccupancyGrid {
    fn new(ctx: &PlacementContext<'_>, cell: f64) -> Option<Self> {
        let b = ctx.bounds;
        let mut cell = cell;
        let (mut cols, mut rows);
        loop {
            cols = (b.width() / cell).ceil().max(1.0) as usize;
            rows = (b.height() / cell).ceil().max(1.0) as usize;
            if cols.saturating_mul(rows) <= MAX_CELLS {
                break;
            }
            cell *= 1.25;
        }
        if !cell.is_finite() {
            return None;
        }
        Some(Self {
            origin: Point2D::new(b.min_x, b.min_y),
            cell,
            cols,
            rows,
            occupied: vec![false; cols * rows],
        })
    }

    fn cell_rect(&self, c: usize, r: usize) -> Rect {
        Rect::new(
            self.origin.x + c as f64 * self.cell,
            self.origin.y + r as f64 * self.cell,
            self.cell,
            self.cell,
        )
    }

    /// Cell ranges with positive overlap with `rect`
    fn span(&self, rect: &Rect) -> Option<((usize, usize), (usize, usize))> {
        let c0 = ((rect.x - self.origin.x) / self.cell).floor().max(0.0);
        let r0 = ((rect.y - self.origin.y) / self.cell).floor().max(0.0);
        let c1 = ((rect.max_x() - self.origin.x) / self.cell).ceil() - 1.0;
        let r1 = ((rect.max_y() - self.origin.y) / self.cell).ceil() - 1.0;
        if c1 < c0 || r1 < r0 || c0 >= self.cols as f64 || r0 >= self.rows as f64 {
            return None;
        }
        let c1 = (c1 as usize).min(self.cols - 1);
        let r1 = (r1 as usize).min(self.rows - 1);
        Some(((c0 as usize, c1), (r0 as usize, r1)))
    }

    fn mark_rect(&mut self, rect: &Rect) {
        let Some(((c0, c1), (r0, r1))) = self.span(rect) else {
            return;
        };
        for r in r0..=r1 {
            for c in c0..=c1 {
                if self.cell_rect(c, r).overlap_area(rect) > 1e-6 {
                    self.occupied[r * self.cols + c] = true;
                }
            }
        }
    }

    /// Free 4-connected components as `(cells, col range, row range)`
    fn free_zones(&self) -> Vec<(usize, (usize, usize), (usize, usize))> {
        let mut seen = vec![false; self.occupied.len()];
        let mut zones = Vec::new();
        let mut queue = VecDeque::new();

        for start in 0..self.occupied.len() {
            if self.occupied[start] || seen[start] {
                continue;
            }
            seen[start] = true;
            queue.push_back(start);
            let (mut cells, mut c0, mut c1, mut r0, mut r1) = (0, usize::MAX, 0, usize::MAX, 0);

            while let Some(idx) = queue.pop_front() {
                let (c, r) = (idx % self.cols, idx / self.cols);
                cells += 1;
                c0 = c0.min(c);
                c1 = c1.max(c);
                r0 = r0.min(r);
                r1 = r1.max(r);

                let mut visit = |n: usize| {
                    if !self.occupied[n] && !seen[n] {
                        seen[n] = true;
                        queue.push_back(n);
                    }
                };
                if c > 0 {
                    visit(idx - 1);
                }
                if c + 1 < self.cols {
                    visit(idx + 1);
                }
                if r > 0 {
                    visit(idx - self.cols);
                }
                if r + 1 < self.rows {
                    visit(idx + self.cols);
                }
            }
            zones.push((cells, (c0, c1), (r0, r1)));
        }
        zones
    }
}

fn room_at(rooms: &[Room], p: &Point2D) -> Option<usize> {
    rooms.iter().position(|room| room.contains_point(p))
}

/// Fills leftover zones.
///
/// `directions[i]` is the orientation used in `rooms[i]`; new rows run
/// perpendicular to it. Every new box must clear the bounds, walls,
/// obstacles and everything placed so far, and sit inside a room.
pub(crate) fn cross_fill(
    ctx: &PlacementContext<'_>,
    rooms: &[Room],
    directions: &[Direction],
    units: &[Rect],
    corridors: &[Rect],
    cursor: &mut usize,
) -> CrossFill {
    let config = ctx.config;
    let Some(mut grid) = OccupancyGrid::new(ctx, config.cross_fill_cell_size) else {
        return CrossFill::default();
    };

    for rect in units.iter().chain(corridors).chain(ctx.obstacles) {
        grid.mark_rect(rect);
    }
    for r in 0..grid.rows {
        for c in 0..grid.cols {
            let cell = grid.cell_rect(c, r);
            if room_at(rooms, &cell.center()).is_none() || ctx.crosses_wall(&cell) {
                grid.occupied[r * grid.cols + c] = true;
            }
        }
    }

    let mut placed: Vec<Rect> = units.iter().chain(corridors).copied().collect();
    let mut index = GridIndex::from_rects(&placed, (2.0 * config.box_depth).max(1.0));
    let mut out = CrossFill::default();

    for (cells, (c0, c1), (r0, r1)) in grid.free_zones() {
        if cells < MIN_ZONE_CELLS || c1 - c0 + 1 < MIN_ZONE_SIDE || r1 - r0 + 1 < MIN_ZONE_SIDE {
            continue;
        }
        let low = grid.cell_rect(c0, r0);
        let high = grid.cell_rect(c1, r1);
        let Some(zone) = Rect::from_min_max(low.x, low.y, high.max_x(), high.max_y()).clamped_to(&ctx.bounds) else {
            continue;
        };
        out.zones += 1;

        let base = room_at(rooms, &zone.center())
            .and_then(|i| directions.get(i).copied())
            .unwrap_or(Direction::Horizontal);
        let direction = base.perpendicular();

        let accept = |rect: &Rect| {
            ctx.is_clear(rect)
                && room_at(rooms, &rect.center()).is_some()
                && !index
                    .query(&rect.bounds())
                    .into_iter()
                    .any(|i| rect.overlaps(&placed[i], OVERLAP_SLACK))
        };
        let fill = fill_area(ctx, &zone, None, direction, *cursor, CorridorType::CrossFill, &accept);
        *cursor = fill.cursor;

        debug!(
            zone = ?zone,
            ?direction,
            boxes = fill.boxes.len(),
            corridors = fill.corridors.len(),
            "Cross-filled zone"
        );

        for b in fill.boxes {
            index.insert(placed.len(), &b.rect.bounds());
            placed.push(b.rect);
            out.boxes.push((b, room_at(rooms, &b.rect.center())));
        }
        for c in fill.corridors {
            let clear = !index
                .query(&c.rect.bounds())
                .into_iter()
                .any(|i| c.rect.overlaps(&placed[i], OVERLAP_SLACK));
            if clear && !ctx.crosses_wall(&c.rect) {
                index.insert(placed.len(), &c.rect.bounds());
                placed.push(c.rect);
                out.corridors.push(c);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::LayoutConfig;
    use boxplan_detection::{RoomSource, RoomType};
    use boxplan_geometry::{Bounds, Polygon};

    fn room(x0: f64, y0: f64, x1: f64, y1: f64) -> Room {
        let polygon = Polygon::new(vec![
            Point2D::new(x0, y0),
            Point2D::new(x1, y0),
            Point2D::new(x1, y1),
            Point2D::new(x0, y1),
        ]);
        Room::from_polygon("room_01", polygon, RoomType::Room, RoomSource::Boundary).unwrap()
    }

    #[test]
    fn test_free_zones_respect_occupancy() {
        let config = LayoutConfig::default();
        let catalog = Catalog::build(&config);
        let ctx = PlacementContext::new(&config, &catalog, Bounds::new(0.0, 0.0, 10.0, 4.0), &[], &[]);
        let mut grid = OccupancyGrid::new(&ctx, 1.0).unwrap();
        grid.mark_rect(&Rect::new(4.2, 0.0, 1.0, 4.0));

        let zones = grid.free_zones();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0], (16, (0, 3), (0, 3)));
        assert_eq!(zones[1], (16, (6, 9), (0, 3)));
    }

    #[test]
    fn test_cross_fill_uses_empty_room() {
        let config = LayoutConfig::default();
        let catalog = Catalog::build(&config);
        let bounds = Bounds::new(0.0, 0.0, 12.0, 12.0);
        let ctx = PlacementContext::new(&config, &catalog, bounds, &[], &[]);
        let rooms = vec![room(0.0, 0.0, 12.0, 12.0)];
        let existing = vec![Rect::new(0.0, 0.0, 12.0, 2.5)];

        let mut cursor = 0;
        let fill = cross_fill(&ctx, &rooms, &[Direction::Horizontal], &existing, &[], &mut cursor);

        assert_eq!(fill.zones, 1);
        assert!(!fill.boxes.is_empty());
        assert!(cursor > 0);
        for (b, room) in &fill.boxes {
            assert_eq!(b.direction, Direction::Vertical);
            assert_eq!(*room, Some(0));
            assert!(!b.rect.overlaps(&existing[0], OVERLAP_SLACK));
        }
    }

    #[test]
    fn test_cross_fill_skips_space_outside_rooms() {
        let config = LayoutConfig::default();
        let catalog = Catalog::build(&config);
        let ctx = PlacementContext::new(&config, &catalog, Bounds::new(0.0, 0.0, 12.0, 12.0), &[], &[]);
        let mut cursor = 0;
        let fill = cross_fill(&ctx, &[], &[], &[], &[], &mut cursor);
        assert_eq!(fill.zones, 0);
        assert!(fill.boxes.is_empty());
    }
}
