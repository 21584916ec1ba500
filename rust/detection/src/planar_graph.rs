// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar graph over prepared wall segments.
//!
//! Nodes live in an arena indexed by integer id; a hash map from rounded
//! coordinate to id deduplicates them. Each node keeps its neighbor ids
//! sorted by outgoing angle, which is all the face walk needs.

use boxplan_geometry::{Point2D, WallSegment};
use rustc_hash::FxHashMap;

/// A graph node: one distinct coordinate.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub position: Point2D,
    /// Neighbor ids, ascending by outgoing angle in `(-π, π]`
    pub neighbors: Vec<usize>,
}

/// Undirected planar graph; every edge stands for two half-edges.
#[derive(Debug, Clone, Default)]
pub struct PlanarGraph {
    nodes: Vec<GraphNode>,
    /// Rounded coordinate → node id
    key_to_node: FxHashMap<(i64, i64), usize>,
    precision: f64,
}

impl PlanarGraph {
    /// Builds the graph from a clean segment set.
    ///
    /// Coordinates are rounded to `precision` to form node keys. Self loops
    /// and repeated edges are ignored.
    pub fn build(segments: &[WallSegment], precision: f64) -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            key_to_node: FxHashMap::default(),
            precision: if precision > 0.0 { precision } else { 1e-6 },
        };

        for seg in segments {
            if !seg.is_finite() {
                continue;
            }
            let a = graph.node_id(seg.start);
            let b = graph.node_id(seg.end);
            if a == b || graph.nodes[a].neighbors.contains(&b) {
                continue;
            }
            graph.nodes[a].neighbors.push(b);
            graph.nodes[b].neighbors.push(a);
        }

        for id in 0..graph.nodes.len() {
            graph.sort_neighbors(id);
        }

        graph
    }

    fn node_id(&mut self, p: Point2D) -> usize {
        let key = (
            (p.x / self.precision).round() as i64,
            (p.y / self.precision).round() as i64,
        );
        if let Some(&id) = self.key_to_node.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(GraphNode {
            position: p,
            neighbors: Vec::new(),
        });
        self.key_to_node.insert(key, id);
        id
    }

    fn sort_neighbors(&mut self, id: usize) {
        let origin = self.nodes[id].position;
        let mut keyed: Vec<(f64, usize)> = self.nodes[id]
            .neighbors
            .iter()
            .map(|&n| {
                let p = self.nodes[n].position;
                ((p.y - origin.y).atan2(p.x - origin.x), n)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        self.nodes[id].neighbors = keyed.into_iter().map(|(_, n)| n).collect();
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn position(&self, id: usize) -> Point2D {
        self.nodes[id].position
    }

    pub fn neighbors(&self, id: usize) -> &[usize] {
        self.nodes.get(id).map_or(&[], |n| n.neighbors.as_slice())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.neighbors.len()).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }

    /// Removes dangling chains (degree-1 nodes, repeatedly).
    ///
    /// Returns the number of edges removed. Neighbor order is preserved.
    pub fn prune_filaments(&mut self) -> usize {
        let mut queue: Vec<usize> = (0..self.nodes.len())
            .filter(|&id| self.nodes[id].neighbors.len() == 1)
            .collect();
        let mut removed = 0;

        while let Some(id) = queue.pop() {
            if self.nodes[id].neighbors.len() != 1 {
                continue;
            }
            let other = self.nodes[id].neighbors[0];
            self.nodes[id].neighbors.clear();
            self.nodes[other].neighbors.retain(|&n| n != id);
            removed += 1;

            if self.nodes[other].neighbors.len() == 1 {
                queue.push(other);
            }
        }

        removed
    }

    /// Next node when walking a face along half-edge `from → to`.
    ///
    /// Takes the neighbor of `to` that comes immediately before `from` in
    /// angular order, which keeps the face on the left of the walk.
    pub fn next_in_face(&self, from: usize, to: usize) -> Option<usize> {
        let around = self.neighbors(to);
        let pos = around.iter().position(|&n| n == from)?;
        let prev = if pos == 0 { around.len() - 1 } else { pos - 1 };
        Some(around[prev])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment::new(Point2D::new(x0, y0), Point2D::new(x1, y1))
    }

    fn square() -> Vec<WallSegment> {
        vec![
            seg(0.0, 0.0, 4.0, 0.0),
            seg(4.0, 0.0, 4.0, 4.0),
            seg(4.0, 4.0, 0.0, 4.0),
            seg(0.0, 4.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_build_dedupes_nodes_and_edges() {
        let mut segments = square();
        segments.push(seg(4.0, 0.0, 0.0, 0.0));
        segments.push(seg(1.0, 1.0, 1.0, 1.0));
        let graph = PlanarGraph::build(&segments, 1e-6);
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_neighbors_sorted_by_angle() {
        let segments = vec![
            seg(0.0, 0.0, 0.0, 1.0),
            seg(0.0, 0.0, -1.0, 0.0),
            seg(0.0, 0.0, 1.0, 0.0),
            seg(0.0, 0.0, 0.0, -1.0),
        ];
        let graph = PlanarGraph::build(&segments, 1e-6);
        let angles: Vec<f64> = graph
            .neighbors(0)
            .iter()
            .map(|&n| {
                let p = graph.position(n);
                p.y.atan2(p.x)
            })
            .collect();
        assert!(angles.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_prune_filaments_removes_dangling_chain() {
        let mut segments = square();
        segments.push(seg(4.0, 4.0, 6.0, 4.0));
        segments.push(seg(6.0, 4.0, 6.0, 6.0));
        let mut graph = PlanarGraph::build(&segments, 1e-6);
        assert_eq!(graph.prune_filaments(), 2);
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_next_in_face_walks_square_counter_clockwise() {
        let graph = PlanarGraph::build(&square(), 1e-6);
        // Nodes in insertion order: (0,0), (4,0), (4,4), (0,4)
        assert_eq!(graph.next_in_face(0, 1), Some(2));
        assert_eq!(graph.next_in_face(1, 2), Some(3));
        assert_eq!(graph.next_in_face(2, 3), Some(0));
    }
}
