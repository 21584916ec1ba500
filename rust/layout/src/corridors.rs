// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Corridor synthesis between paired rows, end-to-end merging, and the
//! final clamp-and-drop filter.

use boxplan_geometry::{Direction, Rect};
use tracing::debug;

use crate::placement::{complement, intersect_intervals, merge_intervals, PlacedBox, PlacementContext};
use crate::types::CorridorType;

/// Corridors thinner than this after clamping are dropped
const MIN_CORRIDOR_SIDE: f64 = 0.3;
/// Coverage gaps up to the box spacing (plus this) count as covered
const COVERAGE_JOIN: f64 = 0.01;
/// End-to-end merge tolerance
const TOUCH_EPSILON: f64 = 1e-6;

/// A corridor rectangle before ids are assigned
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorridorRect {
    pub rect: Rect,
    /// Direction the corridor runs in
    pub direction: Direction,
    pub kind: CorridorType,
}

/// Secondary-axis span covered by boxes of one row
fn row_coverage(row: &[PlacedBox], direction: Direction, join: f64) -> Vec<(f64, f64)> {
    let spans = row.iter().map(|b| direction.secondary_range(&b.rect)).collect();
    merge_intervals(spans, join)
}

/// Corridor fragments for one aisle.
///
/// A corridor exists only where every row of the strip has boxes. It is
/// split wherever a wall or obstacle crosses the aisle, each fragment's
/// ends are pulled back by the corridor inset, and short fragments are
/// discarded.
pub(crate) fn synthesize_corridors(
    ctx: &PlacementContext<'_>,
    direction: Direction,
    aisle: (f64, f64),
    rows: &[&[PlacedBox]],
    kind: CorridorType,
) -> Vec<CorridorRect> {
    let config = ctx.config;
    if rows.is_empty() || aisle.1 - aisle.0 <= 0.0 {
        return Vec::new();
    }

    let join = config.box_spacing + COVERAGE_JOIN;
    let mut coverage = row_coverage(rows[0], direction, join);
    for row in &rows[1..] {
        coverage = intersect_intervals(&coverage, &row_coverage(row, direction, join));
    }
    let (Some(first), Some(last)) = (coverage.first(), coverage.last()) else {
        return Vec::new();
    };

    let span_rect = direction.rect(first.0, last.1, aisle.0, aisle.1);
    let blocks = ctx.band_blocks(&span_rect, direction, 0.0, &[]);

    let mut out = Vec::new();
    for &(c0, c1) in &coverage {
        for (f0, f1) in complement(c0, c1, &blocks) {
            let a = f0 + config.corridor_inset;
            let b = f1 - config.corridor_inset;
            if b - a < config.min_corridor_length {
                continue;
            }
            out.push(CorridorRect {
                rect: direction.rect(a, b, aisle.0, aisle.1),
                direction,
                kind,
            });
        }
    }
    out
}

/// Merges corridors in the same band whose ends touch.
///
/// Returns the merged list and how many merges happened.
pub(crate) fn merge_touching(mut corridors: Vec<CorridorRect>) -> (Vec<CorridorRect>, usize) {
    corridors.sort_by(|a, b| {
        let (pa, pb) = (a.direction.primary_range(&a.rect), b.direction.primary_range(&b.rect));
        (a.direction as u8)
            .cmp(&(b.direction as u8))
            .then(pa.0.total_cmp(&pb.0))
            .then(pa.1.total_cmp(&pb.1))
            .then(a.direction.secondary_range(&a.rect).0.total_cmp(&b.direction.secondary_range(&b.rect).0))
    });

    let mut merged: Vec<CorridorRect> = Vec::with_capacity(corridors.len());
    let mut count = 0;
    for c in corridors {
        if let Some(last) = merged.last_mut() {
            if same_band(last, &c) {
                let dir = c.direction;
                let (l0, l1) = dir.secondary_range(&last.rect);
                let (c0, c1) = dir.secondary_range(&c.rect);
                if c0 <= l1 + TOUCH_EPSILON {
                    let (p0, p1) = dir.primary_range(&last.rect);
                    last.rect = dir.rect(l0.min(c0), l1.max(c1), p0, p1);
                    count += 1;
                    continue;
                }
            }
        }
        merged.push(c);
    }
    (merged, count)
}

fn same_band(a: &CorridorRect, b: &CorridorRect) -> bool {
    if a.direction != b.direction {
        return false;
    }
    let (a0, a1) = a.direction.primary_range(&a.rect);
    let (b0, b1) = b.direction.primary_range(&b.rect);
    (a0 - b0).abs() < TOUCH_EPSILON && (a1 - b1).abs() < TOUCH_EPSILON
}

/// Clamps corridors to the plan and drops those that became too thin or
/// touch a wall or obstacle. Returns the survivors and the drop count.
pub(crate) fn filter_corridors(ctx: &PlacementContext<'_>, corridors: Vec<CorridorRect>) -> (Vec<CorridorRect>, usize) {
    let before = corridors.len();
    let kept: Vec<CorridorRect> = corridors
        .into_iter()
        .filter_map(|c| {
            let rect = c.rect.clamped_to(&ctx.bounds)?;
            if rect.width < MIN_CORRIDOR_SIDE || rect.height < MIN_CORRIDOR_SIDE {
                return None;
            }
            if ctx.crosses_wall(&rect) || ctx.hits_obstacle(&rect) {
                return None;
            }
            Some(CorridorRect { rect, ..c })
        })
        .collect();

    let dropped = before - kept.len();
    if dropped > 0 {
        debug!(dropped, "Dropped corridors in post-filter");
    }
    (kept, dropped)
}
