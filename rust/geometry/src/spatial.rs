// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grid-based spatial hash for candidate lookups.
//!
//! Items are registered by their bounding box into every square cell of side
//! `cell_size` they touch. Queries return the ids registered in the cells a
//! query box touches; callers run the exact test on those candidates.
//! Built and dropped within a single stage, never shared.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::types::{Bounds, Rect, WallSegment};

/// Upper bound on cells a single item may register into
const MAX_CELLS_PER_ITEM: i64 = 1 << 16;

/// A spatial hash from grid cell to item ids.
#[derive(Debug, Clone)]
pub struct GridIndex {
    cell_size: f64,
    grid: FxHashMap<(i64, i64), Vec<usize>>,
    /// Items too large to register cell by cell; always returned by queries
    oversized: Vec<usize>,
}

impl GridIndex {
    /// Creates an empty index.
    ///
    /// `cell_size` should be at least the query tolerance.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: if cell_size.is_finite() && cell_size > 0.0 {
                cell_size
            } else {
                1.0
            },
            grid: FxHashMap::default(),
            oversized: Vec::new(),
        }
    }

    /// Index every segment by its bounding box, id = position in the slice
    pub fn from_segments(segments: &[WallSegment], cell_size: f64) -> Self {
        let mut index = Self::new(cell_size);
        for (i, s) in segments.iter().enumerate() {
            index.insert(i, &s.bounds());
        }
        index
    }

    /// Index every rectangle, id = position in the slice
    pub fn from_rects(rects: &[Rect], cell_size: f64) -> Self {
        let mut index = Self::new(cell_size);
        for (i, r) in rects.iter().enumerate() {
            index.insert(i, &r.bounds());
        }
        index
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Registers `id` in every cell overlapped by `bounds`
    pub fn insert(&mut self, id: usize, bounds: &Bounds) {
        let (x0, y0) = self.cell_coords(bounds.min_x, bounds.min_y);
        let (x1, y1) = self.cell_coords(bounds.max_x, bounds.max_y);

        if (x1 - x0 + 1).saturating_mul(y1 - y0 + 1) > MAX_CELLS_PER_ITEM {
            self.oversized.push(id);
            return;
        }

        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.grid.entry((cx, cy)).or_default().push(id);
            }
        }
    }

    /// Candidate ids whose boxes may overlap `bounds`, ascending, no repeats
    pub fn query(&self, bounds: &Bounds) -> Vec<usize> {
        let (x0, y0) = self.cell_coords(bounds.min_x, bounds.min_y);
        let (x1, y1) = self.cell_coords(bounds.max_x, bounds.max_y);

        let mut seen: FxHashSet<usize> = self.oversized.iter().copied().collect();

        if (x1 - x0 + 1).saturating_mul(y1 - y0 + 1) > MAX_CELLS_PER_ITEM {
            // Query larger than the grid is meant for: scan every bucket
            for ids in self.grid.values() {
                seen.extend(ids.iter().copied());
            }
        } else {
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    if let Some(ids) = self.grid.get(&(cx, cy)) {
                        seen.extend(ids.iter().copied());
                    }
                }
            }
        }

        let mut out: Vec<usize> = seen.into_iter().collect();
        out.sort_unstable();
        out
    }

    fn cell_coords(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point2D;

    #[test]
    fn test_query_finds_nearby_segments_only() {
        let segments = vec![
            WallSegment::new(Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0)),
            WallSegment::new(Point2D::new(50.0, 50.0), Point2D::new(60.0, 50.0)),
        ];
        let index = GridIndex::from_segments(&segments, 1.0);
        let hits = index.query(&Bounds::new(4.5, -0.5, 5.5, 0.5));
        assert_eq!(hits, vec![0]);
        assert!(index.query(&Bounds::new(20.0, 20.0, 21.0, 21.0)).is_empty());
    }

    #[test]
    fn test_query_deduplicates() {
        let rects = vec![Rect::new(0.0, 0.0, 5.0, 5.0)];
        let index = GridIndex::from_rects(&rects, 1.0);
        assert_eq!(index.query(&Bounds::new(0.0, 0.0, 5.0, 5.0)), vec![0]);
    }

    #[test]
    fn test_oversized_items_always_returned() {
        let mut index = GridIndex::new(0.001);
        index.insert(7, &Bounds::new(0.0, 0.0, 1000.0, 1000.0));
        assert_eq!(index.query(&Bounds::new(5000.0, 5000.0, 5001.0, 5001.0)), vec![7]);
    }
}
