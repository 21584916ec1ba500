// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segment preparation: snapping, gap healing and intersection splitting.
//!
//! Turns raw wall segments into a clean set where every junction is an
//! exact shared endpoint:
//!
//! 1. Snap endpoints onto first-seen anchors, then onto per-axis levels so
//!    near-horizontal and near-vertical walls become exact
//! 2. Heal gaps by moving open endpoints onto nearby segments
//! 3. Collect crossings, collinear overlaps and near-endpoint touches
//! 4. Split at the collected points and re-snap every fragment
//!
//! Splitting can leave walls just off an axis level or fragments below the
//! minimum length, so the pass is repeated until the set stops changing.
//! The output is a fixed point: preparing it again returns it unchanged.

use boxplan_geometry::intersect::{point_line_distance, project_onto_segment, segment_intersection};
use boxplan_geometry::{Bounds, GridIndex, Point2D, WallSegment, COORD_EPSILON};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DetectionConfig;

/// Exact key for a snapped point (negative zero folded into zero)
pub(crate) fn point_key(p: &Point2D) -> (u64, u64) {
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

fn segment_key(seg: &WallSegment) -> ((u64, u64), (u64, u64)) {
    let a = point_key(&seg.start);
    let b = point_key(&seg.end);
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Passes of the snap/heal/split pipeline before settling for the last one
const MAX_PASSES: usize = 12;

/// Counters collected while preparing segments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepStats {
    pub input: usize,
    /// Segments left after the first snap
    pub after_snap: usize,
    pub healed_endpoints: usize,
    pub split_points: usize,
    /// Passes run until the set stopped changing
    pub passes: usize,
    pub output: usize,
}

/// Clean segment set ready for graph construction
#[derive(Debug, Clone, Default)]
pub struct PreparedSegments {
    pub segments: Vec<WallSegment>,
    pub stats: PrepStats,
}

/// Snap, heal and split `input` into a clean segment set
pub fn prepare_segments(input: &[WallSegment], config: &DetectionConfig) -> PreparedSegments {
    let mut stats = PrepStats {
        input: input.len(),
        ..Default::default()
    };

    let mut current = input.to_vec();
    let mut settled = false;
    while stats.passes < MAX_PASSES {
        let next = prepare_pass(&current, config, &mut stats);
        if same_set(&current, &next) {
            settled = true;
            break;
        }
        current = next;
    }
    stats.output = current.len();

    if !settled {
        debug!(passes = stats.passes, "Segment preparation did not settle");
    }
    debug!(
        input = stats.input,
        after_snap = stats.after_snap,
        healed = stats.healed_endpoints,
        splits = stats.split_points,
        passes = stats.passes,
        output = stats.output,
        "Prepared wall segments"
    );

    PreparedSegments {
        segments: current,
        stats,
    }
}

/// Order-independent equality of two segment sets
fn same_set(a: &[WallSegment], b: &[WallSegment]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut ka: Vec<_> = a.iter().map(segment_key).collect();
    let mut kb: Vec<_> = b.iter().map(segment_key).collect();
    ka.sort_unstable();
    kb.sort_unstable();
    ka == kb
}

/// One snap, heal and split pass
fn prepare_pass(input: &[WallSegment], config: &DetectionConfig, stats: &mut PrepStats) -> Vec<WallSegment> {
    let tolerance = config.snap_tolerance.max(COORD_EPSILON);
    stats.passes += 1;

    let valid: Vec<WallSegment> = input
        .iter()
        .filter(|s| s.is_finite() && s.length() >= config.min_segment_length)
        .copied()
        .collect();
    if valid.is_empty() {
        return valid;
    }

    // ─── Step 1: Snap endpoints ───
    let mut snapper = Snapper::new(tolerance);
    let mut segments = snapper.snap_all(&valid);
    if stats.passes == 1 {
        stats.after_snap = segments.len();
    }

    // ─── Step 2: Heal gaps ───
    let mut splits: Vec<Vec<Point2D>> = vec![Vec::new(); segments.len()];
    stats.healed_endpoints += heal_gaps(&mut segments, &mut splits, config.healing_radius(), tolerance);

    // ─── Step 3: Collect intersections ───
    collect_intersections(&segments, &mut splits, tolerance);
    stats.split_points += splits.iter().map(Vec::len).sum::<usize>();

    // ─── Step 4: Split and re-snap ───
    // Fragments obey the same minimum as input walls
    let min_piece = config.min_fragment_length().max(config.min_segment_length);
    split_segments(&segments, &splits, &mut snapper, min_piece)
}

// ─── Snapping ───

/// First-seen snapping of scalar coordinates onto levels at least
/// `tolerance` apart
#[derive(Debug, Default)]
struct LevelSet {
    tolerance: f64,
    buckets: FxHashMap<i64, Vec<(usize, f64)>>,
    next: usize,
}

impl LevelSet {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Default::default()
        }
    }

    fn snap(&mut self, value: f64) -> f64 {
        let cell = (value / self.tolerance).floor() as i64;
        let mut best: Option<(usize, f64)> = None;

        for c in cell - 1..=cell + 1 {
            if let Some(levels) = self.buckets.get(&c) {
                for &(order, level) in levels {
                    if (level - value).abs() <= self.tolerance
                        && best.map_or(true, |(o, _)| order < o)
                    {
                        best = Some((order, level));
                    }
                }
            }
        }

        if let Some((_, level)) = best {
            return level;
        }

        self.buckets.entry(cell).or_default().push((self.next, value));
        self.next += 1;
        value
    }
}

/// Point snapper: 2D anchors followed by per-axis levels.
///
/// State persists across calls so fragments produced after splitting land
/// on the same anchors as the original endpoints.
struct Snapper {
    tolerance: f64,
    anchors: FxHashMap<(i64, i64), Vec<(usize, Point2D)>>,
    next_anchor: usize,
    x_levels: LevelSet,
    y_levels: LevelSet,
}

impl Snapper {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            anchors: FxHashMap::default(),
            next_anchor: 0,
            x_levels: LevelSet::new(tolerance),
            y_levels: LevelSet::new(tolerance),
        }
    }

    fn anchor(&mut self, p: Point2D) -> Point2D {
        let cx = (p.x / self.tolerance).floor() as i64;
        let cy = (p.y / self.tolerance).floor() as i64;
        let mut best: Option<(usize, Point2D)> = None;

        for x in cx - 1..=cx + 1 {
            for y in cy - 1..=cy + 1 {
                if let Some(list) = self.anchors.get(&(x, y)) {
                    for &(order, a) in list {
                        if a.distance_to(&p) <= self.tolerance
                            && best.map_or(true, |(o, _)| order < o)
                        {
                            best = Some((order, a));
                        }
                    }
                }
            }
        }

        if let Some((_, a)) = best {
            return a;
        }

        self.anchors.entry((cx, cy)).or_default().push((self.next_anchor, p));
        self.next_anchor += 1;
        p
    }

    fn level(&mut self, p: Point2D) -> Point2D {
        Point2D::new(self.x_levels.snap(p.x), self.y_levels.snap(p.y))
    }

    fn snap_point(&mut self, p: Point2D) -> Point2D {
        let a = self.anchor(p);
        self.level(a)
    }

    fn snap_all(&mut self, segments: &[WallSegment]) -> Vec<WallSegment> {
        let anchored: Vec<WallSegment> = segments
            .iter()
            .map(|s| WallSegment::new(self.anchor(s.start), self.anchor(s.end)))
            .collect();

        // Axis-aligned walls seed the levels first so their perpendicular
        // coordinate wins over stray endpoints
        for s in &anchored {
            if s.is_horizontal(self.tolerance) {
                self.y_levels.snap((s.start.y + s.end.y) * 0.5);
            } else if s.is_vertical(self.tolerance) {
                self.x_levels.snap((s.start.x + s.end.x) * 0.5);
            }
        }

        anchored
            .into_iter()
            .map(|s| WallSegment::new(self.level(s.start), self.level(s.end)))
            .filter(|s| s.length() > COORD_EPSILON)
            .collect()
    }
}

// ─── Gap healing ───

fn endpoint_degrees(segments: &[WallSegment]) -> FxHashMap<(u64, u64), usize> {
    let mut degree: FxHashMap<(u64, u64), usize> = FxHashMap::default();
    for s in segments {
        *degree.entry(point_key(&s.start)).or_default() += 1;
        *degree.entry(point_key(&s.end)).or_default() += 1;
    }
    degree
}

/// Moves open endpoints onto the nearest segment within `radius`.
///
/// A first pass only accepts moves along the segment's own line (extending
/// or trimming the wall); a second pass accepts any remaining move.
fn heal_gaps(
    segments: &mut [WallSegment],
    splits: &mut [Vec<Point2D>],
    radius: f64,
    tolerance: f64,
) -> usize {
    if radius <= 0.0 || segments.is_empty() {
        return 0;
    }

    let mut degree = endpoint_degrees(segments);
    let index = GridIndex::from_segments(segments, radius.max(1.0));

    let mut healed = 0;
    for collinear_only in [true, false] {
        for i in 0..segments.len() {
            for at_end in [false, true] {
                healed += heal_endpoint(
                    segments,
                    splits,
                    &mut degree,
                    &index,
                    i,
                    at_end,
                    radius,
                    tolerance,
                    collinear_only,
                ) as usize;
            }
        }
    }
    healed
}

#[allow(clippy::too_many_arguments)]
fn heal_endpoint(
    segments: &mut [WallSegment],
    splits: &mut [Vec<Point2D>],
    degree: &mut FxHashMap<(u64, u64), usize>,
    index: &GridIndex,
    i: usize,
    at_end: bool,
    radius: f64,
    tolerance: f64,
    collinear_only: bool,
) -> bool {
    let seg = segments[i];
    let (p, other) = if at_end {
        (seg.end, seg.start)
    } else {
        (seg.start, seg.end)
    };

    if degree.get(&point_key(&p)).copied().unwrap_or(0) != 1 {
        return false;
    }

    let query = Bounds::new(p.x - radius, p.y - radius, p.x + radius, p.y + radius);
    let mut best: Option<(f64, usize, f64, Point2D)> = None;

    for j in index.query(&query) {
        if j == i {
            continue;
        }
        let (t, q) = project_onto_segment(&p, &segments[j]);
        let d = p.distance_to(&q);

        // Already touching: the intersection pass splits it
        if d < COORD_EPSILON || d > radius {
            continue;
        }
        if q.distance_to(&other) <= tolerance {
            continue;
        }
        if collinear_only && point_line_distance(&q, &seg) > tolerance {
            continue;
        }
        if best.map_or(true, |(bd, ..)| d < bd) {
            best = Some((d, j, t, q));
        }
    }

    let Some((_, j, t, q)) = best else {
        return false;
    };

    if let Some(count) = degree.get_mut(&point_key(&p)) {
        *count = count.saturating_sub(1);
    }
    *degree.entry(point_key(&q)).or_default() += 1;

    if at_end {
        segments[i].end = q;
    } else {
        segments[i].start = q;
    }
    if t > 0.0 && t < 1.0 {
        splits[j].push(q);
    }
    true
}

// ─── Intersections ───

/// Projection of `p` onto the interior of `seg` when within `tolerance`
fn near_interior(p: &Point2D, seg: &WallSegment, tolerance: f64) -> Option<Point2D> {
    let (t, q) = project_onto_segment(p, seg);
    (t > 0.0 && t < 1.0 && p.distance_to(&q) <= tolerance).then_some(q)
}

fn collect_intersections(segments: &[WallSegment], splits: &mut [Vec<Point2D>], tolerance: f64) {
    if segments.len() < 2 {
        return;
    }

    let total: f64 = segments.iter().map(WallSegment::length).sum();
    let cell = (total / segments.len() as f64 * 0.5).max(tolerance * 4.0);
    let index = GridIndex::from_segments(segments, cell);

    for (i, a) in segments.iter().enumerate() {
        for j in index.query(&a.bounds().expanded(tolerance)) {
            if j <= i {
                continue;
            }
            let b = &segments[j];

            if let Some(hit) = segment_intersection(a, b, 0.0) {
                splits[i].push(hit.point);
                splits[j].push(hit.point);
                continue;
            }

            // Collinear overlaps and near-miss T-junctions both show up as
            // an endpoint of one segment lying on the other
            for p in [b.start, b.end] {
                if let Some(q) = near_interior(&p, a, tolerance) {
                    splits[i].push(q);
                }
            }
            for p in [a.start, a.end] {
                if let Some(q) = near_interior(&p, b, tolerance) {
                    splits[j].push(q);
                }
            }
        }
    }
}

// ─── Splitting ───

fn parameter_along(seg: &WallSegment, p: &Point2D) -> f64 {
    let d = seg.start.vector_to(&seg.end);
    let len_sq = d.norm_squared();
    if len_sq < 1e-18 {
        return 0.0;
    }
    seg.start.vector_to(p).dot(&d) / len_sq
}

fn split_segments(
    segments: &[WallSegment],
    splits: &[Vec<Point2D>],
    snapper: &mut Snapper,
    min_fragment: f64,
) -> Vec<WallSegment> {
    let mut out = Vec::with_capacity(segments.len());
    let mut seen: FxHashSet<((u64, u64), (u64, u64))> = FxHashSet::default();

    for (seg, points) in segments.iter().zip(splits) {
        let mut cuts: Vec<(f64, Point2D)> = points
            .iter()
            .map(|p| (parameter_along(seg, p), *p))
            .filter(|(t, _)| *t > 0.0 && *t < 1.0)
            .collect();
        cuts.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut chain = Vec::with_capacity(cuts.len() + 2);
        chain.push(seg.start);
        chain.extend(cuts.into_iter().map(|(_, p)| p));
        chain.push(seg.end);

        let chain: Vec<Point2D> = chain.into_iter().map(|p| snapper.snap_point(p)).collect();

        for pair in chain.windows(2) {
            let piece = WallSegment::new(pair[0], pair[1]);
            if piece.length() < min_fragment {
                continue;
            }
            if seen.insert(segment_key(&piece)) {
                out.push(piece);
            }
        }
    }

    out
}
