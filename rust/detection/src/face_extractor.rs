// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face extraction by walking half-edges of the planar graph.
//!
//! Every half-edge belongs to exactly one face in a well-formed graph. The
//! walk is iterative with an explicit visited set keyed by `(from, to)` and
//! a hard step ceiling, so malformed input only aborts a single walk.

use boxplan_geometry::{Point2D, Polygon, COORD_EPSILON};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::planar_graph::PlanarGraph;

/// Counters from one extraction run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceStats {
    pub walks: usize,
    pub closed: usize,
    pub aborted: usize,
    pub too_small: usize,
    pub duplicates: usize,
    pub containers: usize,
}

/// Faces kept after filtering, counter-clockwise
#[derive(Debug, Clone, Default)]
pub struct FaceExtraction {
    pub faces: Vec<Polygon>,
    pub stats: FaceStats,
}

/// Enumerates the closed faces of `graph`.
///
/// Faces with fewer than three vertices or an unsigned area below
/// `min_area` are discarded, as are repeats of an already emitted vertex
/// set and faces that contain a smaller face's centroid.
pub fn extract_faces(graph: &PlanarGraph, min_area: f64, step_limit: usize) -> FaceExtraction {
    let mut stats = FaceStats::default();
    let mut visited: FxHashSet<(usize, usize)> = FxHashSet::default();
    let mut seen_sets: FxHashSet<Vec<usize>> = FxHashSet::default();
    let mut candidates: Vec<Polygon> = Vec::new();

    for start in 0..graph.node_count() {
        for &first in graph.neighbors(start) {
            if !visited.insert((start, first)) {
                continue;
            }
            stats.walks += 1;

            let Some(cycle) = walk_face(graph, start, first, step_limit, &mut visited) else {
                stats.aborted += 1;
                continue;
            };
            stats.closed += 1;

            if cycle.len() < 3 {
                stats.too_small += 1;
                continue;
            }

            let points: Vec<Point2D> = cycle.iter().map(|&id| graph.position(id)).collect();
            let polygon = Polygon::new(points).simplified(COORD_EPSILON);
            if polygon.len() < 3 || polygon.area() < min_area {
                stats.too_small += 1;
                continue;
            }

            // The outer face of a lone ring repeats the inner face's vertices
            let mut key = cycle;
            key.sort_unstable();
            key.dedup();
            if !seen_sets.insert(key) {
                stats.duplicates += 1;
                continue;
            }

            candidates.push(polygon.to_ccw());
        }
    }

    let faces = remove_containers(candidates, &mut stats);

    debug!(
        walks = stats.walks,
        closed = stats.closed,
        aborted = stats.aborted,
        containers = stats.containers,
        faces = faces.len(),
        "Extracted graph faces"
    );

    FaceExtraction { faces, stats }
}

/// Walks one face starting with half-edge `start → first`.
///
/// Returns the node cycle, or `None` when the walk runs into an already
/// consumed half-edge, a dead end or the step ceiling. Consumed half-edges
/// stay marked either way.
fn walk_face(
    graph: &PlanarGraph,
    start: usize,
    first: usize,
    step_limit: usize,
    visited: &mut FxHashSet<(usize, usize)>,
) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let (mut from, mut to) = (start, first);

    for _ in 0..step_limit {
        path.push(from);
        let next = graph.next_in_face(from, to)?;
        from = to;
        to = next;

        if (from, to) == (start, first) {
            return Some(path);
        }
        if !visited.insert((from, to)) {
            return None;
        }
    }

    None
}

/// Drops every face whose interior holds the centroid of a strictly smaller
/// face (the building envelope and other container zones).
fn remove_containers(mut faces: Vec<Polygon>, stats: &mut FaceStats) -> Vec<Polygon> {
    faces.sort_by(|a, b| a.area().total_cmp(&b.area()));
    let areas: Vec<f64> = faces.iter().map(Polygon::area).collect();
    let centroids: Vec<Point2D> = faces.iter().map(Polygon::centroid).collect();

    let keep: Vec<bool> = (0..faces.len())
        .map(|big| {
            !(0..big).any(|small| {
                areas[small] < areas[big] - COORD_EPSILON && faces[big].contains_point(&centroids[small])
            })
        })
        .collect();

    stats.containers = keep.iter().filter(|k| !**k).count();

    faces
        .into_iter()
        .zip(keep)
        .filter_map(|(f, k)| k.then_some(f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use boxplan_geometry::WallSegment;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment::new(Point2D::new(x0, y0), Point2D::new(x1, y1))
    }

    #[test]
    fn test_single_ring_yields_one_face() {
        let segments = vec![
            seg(0.0, 0.0, 10.0, 0.0),
            seg(10.0, 0.0, 10.0, 8.0),
            seg(10.0, 8.0, 0.0, 8.0),
            seg(0.0, 8.0, 0.0, 0.0),
        ];
        let graph = PlanarGraph::build(&segments, 1e-6);
        let result = extract_faces(&graph, 1.0, 2000);
        assert_eq!(result.faces.len(), 1);
        assert_eq!(result.stats.duplicates, 1);
        assert_relative_eq!(result.faces[0].area(), 80.0);
        assert!(result.faces[0].signed_area() > 0.0);
    }

    #[test]
    fn test_two_rooms_drop_envelope() {
        let segments = vec![
            seg(0.0, 0.0, 5.0, 0.0),
            seg(5.0, 0.0, 10.0, 0.0),
            seg(10.0, 0.0, 10.0, 8.0),
            seg(10.0, 8.0, 5.0, 8.0),
            seg(5.0, 8.0, 0.0, 8.0),
            seg(0.0, 8.0, 0.0, 0.0),
            seg(5.0, 0.0, 5.0, 8.0),
        ];
        let graph = PlanarGraph::build(&segments, 1e-6);
        let result = extract_faces(&graph, 1.0, 2000);
        assert_eq!(result.faces.len(), 2);
        assert_eq!(result.stats.containers, 1);
        for face in &result.faces {
            assert_relative_eq!(face.area(), 40.0);
        }
    }

    #[test]
    fn test_small_faces_filtered() {
        let segments = vec![
            seg(0.0, 0.0, 0.5, 0.0),
            seg(0.5, 0.0, 0.5, 0.5),
            seg(0.5, 0.5, 0.0, 0.5),
            seg(0.0, 0.5, 0.0, 0.0),
        ];
        let graph = PlanarGraph::build(&segments, 1e-6);
        assert!(extract_faces(&graph, 1.0, 2000).faces.is_empty());
    }

    #[test]
    fn test_step_limit_aborts_walk() {
        let n = 50;
        let segments: Vec<WallSegment> = (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * std::f64::consts::TAU;
                let b = (i + 1) as f64 / n as f64 * std::f64::consts::TAU;
                seg(10.0 * a.cos(), 10.0 * a.sin(), 10.0 * b.cos(), 10.0 * b.sin())
            })
            .collect();
        let graph = PlanarGraph::build(&segments, 1e-6);
        let result = extract_faces(&graph, 1.0, 10);
        assert!(result.faces.is_empty());
        assert!(result.stats.aborted > 0);
    }
}
