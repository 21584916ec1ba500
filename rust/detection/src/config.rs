// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detection tuning parameters

use serde::{Deserialize, Serialize};

/// Configuration for room detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Endpoints closer than this collapse onto one anchor
    pub snap_tolerance: f64,
    /// Largest wall gap treated as a drafting error
    pub gap_tolerance: f64,
    /// Healing search radius = gap_tolerance × this factor
    pub healing_radius_factor: f64,
    /// Segments shorter than this are discarded at extraction
    pub min_segment_length: f64,
    /// Smallest polygon kept as a room candidate
    pub min_room_area: f64,
    /// Raster cell size for the fallback detector
    pub grid_size: f64,
    /// Ceiling on raster cells; the grid is coarsened above it
    pub max_grid_cells: usize,
    /// Wall thickness buffer for rasterization; derived from the gap
    /// tolerance when unset
    pub wall_buffer: Option<f64>,
    /// Relative area difference below which two candidates are duplicates
    pub merge_area_ratio: f64,
    /// Centroid distance multiple (of max(snap, grid)) for duplicates
    pub merge_centroid_factor: f64,
    /// Rounding step for planar graph node keys
    pub coordinate_precision: f64,
    /// Face count below which the raster fallback runs
    pub min_graph_regions: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 0.1,
            gap_tolerance: 0.15,
            healing_radius_factor: 4.0,
            min_segment_length: 0.3,
            min_room_area: 2.0,
            grid_size: 0.2,
            max_grid_cells: 250_000,
            wall_buffer: None,
            merge_area_ratio: 0.2,
            merge_centroid_factor: 5.0,
            coordinate_precision: 1e-6,
            min_graph_regions: 2,
        }
    }
}

impl DetectionConfig {
    /// Search radius for gap healing
    pub fn healing_radius(&self) -> f64 {
        (self.gap_tolerance * self.healing_radius_factor).max(0.0)
    }

    /// Raster wall thickness
    pub fn wall_buffer(&self) -> f64 {
        self.wall_buffer
            .filter(|b| b.is_finite() && *b > 0.0)
            .unwrap_or_else(|| (1.5 * self.gap_tolerance).max(0.1))
    }

    /// Fragments shorter than this are dropped after splitting
    pub fn min_fragment_length(&self) -> f64 {
        (self.snap_tolerance * 0.1).max(0.001)
    }

    /// Step ceiling for a single face walk
    pub fn face_step_limit(&self, segment_count: usize) -> usize {
        (6 * segment_count).max(2000)
    }

    /// Centroid distance under which two candidates may be duplicates
    pub fn merge_centroid_distance(&self) -> f64 {
        self.merge_centroid_factor * self.snap_tolerance.max(self.grid_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectionConfig::default();
        assert!((config.healing_radius() - 0.6).abs() < 1e-12);
        assert!((config.wall_buffer() - 0.225).abs() < 1e-12);
        assert!((config.min_fragment_length() - 0.01).abs() < 1e-12);
        assert_eq!(config.face_step_limit(10), 2000);
        assert_eq!(config.face_step_limit(1000), 6000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: DetectionConfig =
            serde_json::from_str(r#"{"snapTolerance": 0.05, "wallBuffer": 0.3}"#).unwrap();
        assert_eq!(config.snap_tolerance, 0.05);
        assert_eq!(config.wall_buffer(), 0.3);
        assert_eq!(config.grid_size, 0.2);
    }
}
