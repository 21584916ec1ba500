// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room and open-area detection from wall geometry
//!
//! Detection runs in stages, each falling back to the next:
//! 1. Segment preparation (snap, heal gaps, split at intersections)
//! 2. Planar graph face walk, envelope faces filtered out
//! 3. Raster flood fill when the graph yields fewer than two regions
//! 4. Merge of both candidate sets, else the whole plan boundary
//!
//! # Usage
//!
//! ```rust,ignore
//! use boxplan_detection::{DetectionConfig, RoomDetector};
//!
//! let detector = RoomDetector::new(DetectionConfig::default());
//! let outcome = detector.detect_plan(&plan);
//! for room in &outcome.rooms {
//!     println!("{} {:?} {:.1} m²", room.id, room.room_type, room.area);
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod face_extractor;
pub mod merge;
pub mod planar_graph;
pub mod raster;
pub mod segment_prep;
pub mod types;

pub use classifier::{classify_by_rules, RoomClassifier, RoomClassify, RoomType};
pub use config::DetectionConfig;
pub use face_extractor::{extract_faces, FaceExtraction, FaceStats};
pub use merge::{merge_candidates, Candidate};
pub use planar_graph::PlanarGraph;
pub use raster::{detect_raster_rooms, RasterOutcome, RasterStats};
pub use segment_prep::{prepare_segments, PrepStats, PreparedSegments};
pub use types::{DetectionMethod, DetectionOutcome, DetectionStats, Room, RoomSource};

use boxplan_geometry::{Bounds, FloorPlan, Rect, WallSegment};
use tracing::{info, warn};

/// Stateless room detector, built per call.
///
/// The only capability it carries is the room classifier.
#[derive(Debug, Clone, Default)]
pub struct RoomDetector {
    config: DetectionConfig,
    classifier: RoomClassifier,
}

impl RoomDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            classifier: RoomClassifier::RuleBased,
        }
    }

    pub fn with_classifier(mut self, classifier: RoomClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Rooms for a whole plan; rooms supplied with the plan bypass detection
    pub fn detect_plan(&self, plan: &FloorPlan) -> DetectionOutcome {
        if let Some(provided) = plan.rooms.as_deref().filter(|r| !r.is_empty()) {
            let rooms: Vec<Room> = provided
                .iter()
                .filter_map(|r| {
                    let polygon = r.outline()?.to_ccw();
                    let room_type = r
                        .room_type
                        .as_deref()
                        .and_then(RoomType::from_label)
                        .unwrap_or_else(|| self.classifier.classify(&polygon));
                    Some((r.id.clone(), polygon, room_type))
                })
                .enumerate()
                .filter_map(|(i, (id, polygon, room_type))| {
                    let id = id.unwrap_or_else(|| room_id(i));
                    Room::from_polygon(id, polygon, room_type, RoomSource::Provided)
                })
                .collect();

            if !rooms.is_empty() {
                info!(rooms = rooms.len(), "Using rooms supplied with the plan");
                return DetectionOutcome {
                    rooms,
                    method: DetectionMethod::Provided,
                    stats: DetectionStats::default(),
                };
            }
            warn!("Supplied rooms have no usable outline, detecting instead");
        }

        self.detect(
            &plan.wall_segments(self.config.min_segment_length),
            &plan.entrance_segments(),
            &plan.forbidden_rects(),
            &plan.bounds,
        )
    }

    /// Detects rooms from walls.
    ///
    /// Entrances and obstacles only take part in the raster fallback, where
    /// they seal door openings and keep obstacle interiors out.
    pub fn detect(
        &self,
        walls: &[WallSegment],
        entrances: &[WallSegment],
        obstacles: &[Rect],
        bounds: &Bounds,
    ) -> DetectionOutcome {
        let mut stats = DetectionStats::default();

        // ─── Step 1: Clean segments ───
        let prepared = prepare_segments(walls, &self.config);
        stats.prep = prepared.stats.clone();

        // ─── Step 2: Graph faces ───
        let mut graph = PlanarGraph::build(&prepared.segments, self.config.coordinate_precision);
        stats.pruned_filaments = graph.prune_filaments();
        let step_limit = self.config.face_step_limit(prepared.segments.len());
        let extraction = extract_faces(&graph, self.config.min_room_area, step_limit);
        stats.faces = extraction.stats.clone();

        let mut candidates: Vec<Candidate> = extraction
            .faces
            .into_iter()
            .map(|f| Candidate::new(f, RoomSource::Graph))
            .collect();

        // ─── Step 3: Raster fallback ───
        if candidates.len() < self.config.min_graph_regions {
            warn!(
                faces = candidates.len(),
                "Graph yielded too few regions, running raster fallback"
            );
            let mut sealed = prepared.segments.clone();
            sealed.extend(entrances.iter().filter(|s| s.is_finite()).copied());
            let raster = detect_raster_rooms(&sealed, obstacles, bounds, &self.config);
            stats.raster = Some(raster.stats.clone());
            candidates.extend(
                raster
                    .polygons
                    .into_iter()
                    .map(|p| Candidate::new(p, RoomSource::Raster)),
            );
        }

        // ─── Step 4: Merge ───
        stats.candidates = candidates.len();
        let mut merged = merge_candidates(candidates, &self.config);
        stats.merged = merged.len();

        if merged.is_empty() {
            warn!("No region detected, using the plan boundary");
            merged.push(Candidate::new(bounds.to_polygon(), RoomSource::Boundary));
        }

        merged.sort_by(|a, b| b.area().total_cmp(&a.area()));
        let method = method_for(&merged);

        let rooms: Vec<Room> = merged
            .into_iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let room_type = self.classifier.classify(&c.polygon);
                Room::from_polygon(room_id(i), c.polygon, room_type, c.source)
            })
            .collect();

        info!(rooms = rooms.len(), method = ?method, "Room detection finished");

        DetectionOutcome {
            rooms,
            method,
            stats,
        }
    }
}

fn room_id(index: usize) -> String {
    format!("room_{:02}", index + 1)
}

fn method_for(candidates: &[Candidate]) -> DetectionMethod {
    let graph = candidates.iter().any(|c| c.source == RoomSource::Graph);
    let raster = candidates.iter().any(|c| c.source == RoomSource::Raster);
    match (graph, raster) {
        (true, true) => DetectionMethod::Hybrid,
        (true, false) => DetectionMethod::Graph,
        (false, true) => DetectionMethod::Raster,
        (false, false) => DetectionMethod::Boundary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxplan_geometry::{PlanRoom, Point2D, Shape};

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> WallSegment {
        WallSegment::new(Point2D::new(x0, y0), Point2D::new(x1, y1))
    }

    #[test]
    fn test_no_walls_falls_back_to_boundary() {
        let bounds = Bounds::new(0.0, 0.0, 12.0, 6.0);
        let outcome = RoomDetector::default().detect(&[], &[], &[], &bounds);
        assert_eq!(outcome.method, DetectionMethod::Boundary);
        assert_eq!(outcome.rooms.len(), 1);
        assert!((outcome.rooms[0].area - 72.0).abs() < 1e-9);
        assert_eq!(outcome.rooms[0].id, "room_01");
    }

    #[test]
    fn test_two_rooms_from_graph() {
        let walls = vec![
            seg(0.0, 0.0, 10.0, 0.0),
            seg(10.0, 0.0, 10.0, 8.0),
            seg(10.0, 8.0, 0.0, 8.0),
            seg(0.0, 8.0, 0.0, 0.0),
            seg(5.0, 0.0, 5.0, 8.0),
        ];
        let bounds = Bounds::new(0.0, 0.0, 10.0, 8.0);
        let outcome = RoomDetector::default().detect(&walls, &[], &[], &bounds);
        assert_eq!(outcome.method, DetectionMethod::Graph);
        assert_eq!(outcome.rooms.len(), 2);
        assert!(outcome.stats.raster.is_none());
    }

    #[test]
    fn test_provided_rooms_bypass_detection() {
        let mut plan = FloorPlan::new(Bounds::new(0.0, 0.0, 10.0, 8.0));
        plan.walls.push(Shape::segment(Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0)));
        plan.rooms = Some(vec![PlanRoom {
            id: Some("store".into()),
            room_type: Some("hall".into()),
            bounds: Some(Bounds::new(1.0, 1.0, 9.0, 7.0)),
            ..Default::default()
        }]);
        let outcome = RoomDetector::default().detect_plan(&plan);
        assert_eq!(outcome.method, DetectionMethod::Provided);
        assert_eq!(outcome.rooms[0].id, "store");
        assert_eq!(outcome.rooms[0].room_type, RoomType::Hall);
        assert_eq!(outcome.rooms[0].source, RoomSource::Provided);
    }
}
