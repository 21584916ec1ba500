// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Region merging across detectors

use boxplan_geometry::{Point2D, Polygon};

use crate::config::DetectionConfig;
use crate::types::RoomSource;

/// A room outline before classification
#[derive(Debug, Clone)]
pub struct Candidate {
    pub polygon: Polygon,
    pub source: RoomSource,
    area: f64,
    centroid: Point2D,
}

impl Candidate {
    pub fn new(polygon: Polygon, source: RoomSource) -> Self {
        Self {
            area: polygon.area(),
            centroid: polygon.centroid(),
            polygon,
            source,
        }
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// Same region: similar area and nearby centroids
    fn duplicates(&self, other: &Candidate, area_ratio: f64, centroid_distance: f64) -> bool {
        let larger = self.area.max(other.area);
        if larger <= 0.0 {
            return true;
        }
        (self.area - other.area).abs() / larger < area_ratio
            && self.centroid.distance_to(&other.centroid) < centroid_distance
    }
}

/// Deduplicates candidates, earlier entries winning.
///
/// Callers pass graph faces before raster outlines so the exact geometry is
/// preferred over the cell-aligned one.
pub fn merge_candidates(candidates: Vec<Candidate>, config: &DetectionConfig) -> Vec<Candidate> {
    let distance = config.merge_centroid_distance();
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if candidate.polygon.len() < 3 || !candidate.area.is_finite() {
            continue;
        }
        if kept
            .iter()
            .any(|k| k.duplicates(&candidate, config.merge_area_ratio, distance))
        {
            continue;
        }
        kept.push(candidate);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxplan_geometry::Bounds;

    #[test]
    fn test_graph_face_wins_over_raster_duplicate() {
        let graph = Candidate::new(Bounds::new(0.0, 0.0, 10.0, 8.0).to_polygon(), RoomSource::Graph);
        let raster = Candidate::new(Bounds::new(0.2, 0.0, 10.0, 8.2).to_polygon(), RoomSource::Raster);
        let merged = merge_candidates(vec![graph, raster], &DetectionConfig::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, RoomSource::Graph);
    }

    #[test]
    fn test_distinct_regions_survive() {
        let a = Candidate::new(Bounds::new(0.0, 0.0, 5.0, 8.0).to_polygon(), RoomSource::Graph);
        let b = Candidate::new(Bounds::new(5.0, 0.0, 10.0, 8.0).to_polygon(), RoomSource::Raster);
        let c = Candidate::new(Bounds::new(0.0, 0.0, 10.0, 8.0).to_polygon(), RoomSource::Raster);
        let merged = merge_candidates(vec![a, b, c], &DetectionConfig::default());
        assert_eq!(merged.len(), 3);
    }
}
