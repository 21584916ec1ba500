// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Circulation routing through corridor centers.
//!
//! Corridors are grouped into bands (one per strip). A spine crosses the
//! bands of the dominant direction, branches run along every corridor, and
//! entrances hook in with L-shaped legs. Every emitted leg is tested
//! against walls and the four edges of every unit; a leg that would cross
//! either is rerouted or left out.

use boxplan_geometry::intersect::{project_onto_segment, segments_cross};
use boxplan_geometry::{Direction, GridIndex, Point2D, Rect, WallSegment};
use tracing::{debug, warn};

use crate::types::{CirculationSegment, Corridor, PathType};

/// Tested legs are shrunk by this at both ends
const LEG_SHRINK: f64 = 0.05;
/// Bands closer than this share a group
const BAND_TOLERANCE: f64 = 0.25;
/// Largest gap bridged between corridors of one band
const MAX_BRIDGE_GAP: f64 = 3.0;
/// Entrance link window
const MIN_LINK_DISTANCE: f64 = 0.5;
const MAX_LINK_DISTANCE: f64 = 25.0;
/// Detour candidates also step this far past each corridor end
const DETOUR_OFFSET: f64 = 0.2;
const POINT_EPSILON: f64 = 1e-9;

/// Routed paths and what could not be routed
#[derive(Debug, Clone, Default)]
pub struct Circulation {
    pub paths: Vec<CirculationSegment>,
    pub links_omitted: usize,
    pub entrances_skipped: usize,
}

/// Walls plus unit edges, bucketed for leg tests
struct Blockers {
    segments: Vec<WallSegment>,
    index: GridIndex,
}

impl Blockers {
    fn new(walls: &[WallSegment], units: &[Rect]) -> Self {
        let mut segments = walls.to_vec();
        segments.extend(units.iter().flat_map(Rect::edges));
        let index = GridIndex::from_segments(&segments, 4.0);
        Self { segments, index }
    }

    fn leg_blocked(&self, a: &Point2D, b: &Point2D) -> bool {
        let leg = WallSegment::new(*a, *b).shrunk(LEG_SHRINK);
        if leg.length() < POINT_EPSILON {
            return false;
        }
        self.index
            .query(&leg.bounds())
            .into_iter()
            .any(|i| segments_cross(&leg, &self.segments[i]))
    }

    fn path_clear(&self, path: &[Point2D]) -> bool {
        path.windows(2).all(|w| !self.leg_blocked(&w[0], &w[1]))
    }
}

/// Corridors of one strip
#[derive(Debug, Clone)]
struct Band {
    direction: Direction,
    primary: f64,
    /// Secondary extents, sorted
    extents: Vec<(f64, f64)>,
}

impl Band {
    fn covered(&self) -> (f64, f64) {
        let lo = self.extents.iter().map(|e| e.0).fold(f64::INFINITY, f64::min);
        let hi = self.extents.iter().map(|e| e.1).fold(f64::NEG_INFINITY, f64::max);
        (lo, hi)
    }

    fn point(&self, secondary: f64) -> Point2D {
        self.direction.point(secondary, self.primary)
    }

    fn length(&self) -> f64 {
        self.extents.iter().map(|(a, b)| b - a).sum()
    }
}

fn group_bands(corridors: &[Corridor]) -> Vec<Band> {
    let mut keyed: Vec<(Direction, f64, (f64, f64))> = corridors
        .iter()
        .map(|c| {
            let rect = c.rect();
            let (p0, p1) = c.direction.primary_range(&rect);
            (c.direction, (p0 + p1) * 0.5, c.direction.secondary_range(&rect))
        })
        .collect();
    keyed.sort_by(|a, b| (a.0 as u8).cmp(&(b.0 as u8)).then(a.1.total_cmp(&b.1)));

    let mut bands: Vec<(Band, f64, usize)> = Vec::new();
    for (direction, center, extent) in keyed {
        match bands.last_mut() {
            Some((band, first, count)) if band.direction == direction && center - *first <= BAND_TOLERANCE => {
                band.primary = (band.primary * *count as f64 + center) / (*count + 1) as f64;
                band.extents.push(extent);
                *count += 1;
            }
            _ => bands.push((
                Band {
                    direction,
                    primary: center,
                    extents: vec![extent],
                },
                center,
                1,
            )),
        }
    }

    bands
        .into_iter()
        .map(|(mut band, _, _)| {
            band.extents.sort_by(|a, b| a.0.total_cmp(&b.0));
            band
        })
        .collect()
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(values[values.len() / 2])
}

/// Nearest point on any existing path
fn nearest_on_network(paths: &[CirculationSegment], p: &Point2D) -> Option<(Point2D, f64)> {
    paths
        .iter()
        .flat_map(|s| s.path.windows(2))
        .map(|w| {
            let (_, q) = project_onto_segment(p, &WallSegment::new(w[0], w[1]));
            (q, p.distance_to(&q))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Two-leg axis-aligned link, trying both leg orders
fn l_link(blockers: &Blockers, from: Point2D, to: Point2D) -> Option<Vec<Point2D>> {
    [Point2D::new(to.x, from.y), Point2D::new(from.x, to.y)]
        .into_iter()
        .map(|corner| vec![from, corner, to])
        .find(|path| blockers.path_clear(path))
}

struct Router {
    blockers: Blockers,
    paths: Vec<CirculationSegment>,
    links_omitted: usize,
    entrances_skipped: usize,
}

impl Router {
    fn push(&mut self, path_type: PathType, path: Vec<Point2D>) {
        self.paths.push(CirculationSegment { path_type, path });
    }

    /// Straight spine link, else the closest wall-free detour.
    ///
    /// Detour candidates come from corridor extents only. Rows that run past
    /// a corridor's ends can block all of them even where the row ends leave
    /// room, and the link is then omitted.
    fn link_bands(&mut self, spine: f64, a: &Band, b: &Band) {
        let start = a.point(spine);
        let end = b.point(spine);
        if !self.blockers.leg_blocked(&start, &end) {
            self.push(PathType::Spine, vec![start, end]);
            return;
        }

        let mut candidates: Vec<f64> = a
            .extents
            .iter()
            .chain(&b.extents)
            .flat_map(|&(lo, hi)| [lo, hi, (lo + hi) * 0.5, lo - DETOUR_OFFSET, hi + DETOUR_OFFSET])
            .filter(|c| (c - spine).abs() > POINT_EPSILON)
            .collect();
        candidates.sort_by(|x, y| (x - spine).abs().total_cmp(&(y - spine).abs()));

        let detour = candidates.into_iter().find_map(|c| {
            let path = vec![start, a.point(c), b.point(c), end];
            self.blockers.path_clear(&path).then_some(path)
        });

        match detour {
            Some(path) => self.push(PathType::Spine, path),
            None => {
                self.links_omitted += 1;
                warn!(
                    from = a.primary,
                    to = b.primary,
                    "No wall-free spine link between corridor bands; link omitted"
                );
            }
        }
    }

    /// Corridor centerlines, bridges across short gaps, and a stub to the spine
    fn branch(&mut self, band: &Band, spine: Option<f64>) {
        for &(lo, hi) in &band.extents {
            let line = vec![band.point(lo), band.point(hi)];
            if self.blockers.path_clear(&line) {
                self.push(PathType::Branch, line);
            } else {
                debug!(primary = band.primary, lo, hi, "Corridor centerline blocked");
            }
        }

        for pair in band.extents.windows(2) {
            let (end, next) = (pair[0].1, pair[1].0);
            let gap = next - end;
            if gap > POINT_EPSILON && gap < MAX_BRIDGE_GAP {
                let bridge = vec![band.point(end), band.point(next)];
                if self.blockers.path_clear(&bridge) {
                    self.push(PathType::Branch, bridge);
                }
            }
        }

        let Some(spine) = spine else {
            return;
        };
        let (lo, hi) = band.covered();
        let from = if spine < lo {
            lo
        } else if spine > hi {
            hi
        } else {
            return;
        };
        let stub = vec![band.point(from), band.point(spine)];
        if self.blockers.path_clear(&stub) {
            self.push(PathType::Branch, stub);
        } else {
            debug!(primary = band.primary, "Spine stub blocked");
        }
    }

    /// L-shaped link from `point` to the nearest network point
    fn connect(&mut self, point: Point2D, path_type: PathType, min_distance: f64) -> bool {
        let Some((target, distance)) = nearest_on_network(&self.paths, &point) else {
            return false;
        };
        if distance < min_distance {
            return true;
        }
        if distance > MAX_LINK_DISTANCE {
            return false;
        }
        match l_link(&self.blockers, point, target) {
            Some(path) => {
                self.push(path_type, path);
                true
            }
            None => false,
        }
    }
}

/// Builds the circulation network.
///
/// Walls and the edges of every unit block legs. Links that cannot be
/// routed wall-free are omitted and counted.
pub fn route_circulation(
    walls: &[WallSegment],
    units: &[Rect],
    corridors: &[Corridor],
    entrances: &[Point2D],
) -> Circulation {
    let mut router = Router {
        blockers: Blockers::new(walls, units),
        paths: Vec::new(),
        links_omitted: 0,
        entrances_skipped: 0,
    };

    let bands = group_bands(corridors);
    let length_of = |d: Direction| bands.iter().filter(|b| b.direction == d).map(Band::length).sum::<f64>();
    let major = if length_of(Direction::Vertical) > length_of(Direction::Horizontal) {
        Direction::Vertical
    } else {
        Direction::Horizontal
    };
    let (majors, minors): (Vec<&Band>, Vec<&Band>) = bands.iter().partition(|b| b.direction == major);

    let spine = median(
        majors
            .iter()
            .flat_map(|b| b.extents.iter().map(|(lo, hi)| (lo + hi) * 0.5))
            .collect(),
    );

    if let Some(spine) = spine {
        for pair in majors.windows(2) {
            router.link_bands(spine, pair[0], pair[1]);
        }
    }
    for band in &majors {
        router.branch(band, spine.filter(|_| majors.len() > 1));
    }

    for band in &minors {
        let before = router.paths.len();
        router.branch(band, None);
        let Some(&(lo, hi)) = band.extents.first() else {
            continue;
        };
        if before == 0 {
            continue;
        }
        let anchor = band.point((lo + hi) * 0.5);
        // Only search the network built before this band
        let own: Vec<CirculationSegment> = router.paths.drain(before..).collect();
        let linked = router.connect(anchor, PathType::Branch, POINT_EPSILON);
        router.paths.extend(own);
        if !linked {
            router.links_omitted += 1;
            warn!(primary = band.primary, "Corridor band could not be linked to the network");
        }
    }

    for entrance in entrances {
        if !router.connect(*entrance, PathType::EntranceConnection, MIN_LINK_DISTANCE) {
            router.entrances_skipped += 1;
            warn!(x = entrance.x, y = entrance.y, "Entrance connection skipped");
        }
    }

    let paths = cleanup(router.paths);
    debug!(
        paths = paths.len(),
        omitted = router.links_omitted,
        skipped = router.entrances_skipped,
        "Routed circulation"
    );

    Circulation {
        paths,
        links_omitted: router.links_omitted,
        entrances_skipped: router.entrances_skipped,
    }
}

/// Drops repeated points and paths that collapse to a point
fn cleanup(paths: Vec<CirculationSegment>) -> Vec<CirculationSegment> {
    paths
        .into_iter()
        .filter_map(|mut seg| {
            seg.path.dedup_by(|b, a| a.approx_eq(b, POINT_EPSILON));
            (seg.path.len() >= 2).then_some(seg)
        })
        .collect()
}
