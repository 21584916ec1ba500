// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan handed over by the CAD classification stage

use crate::error::{Error, Result};
use crate::shapes::{extract_segments, Shape};
use crate::types::{Bounds, Point2D, Polygon, Rect, WallSegment};
use serde::{Deserialize, Serialize};

/// A room supplied with the plan, bypassing detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanRoom {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub room_type: Option<String>,
    #[serde(default)]
    pub polygon: Option<Vec<Point2D>>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
}

impl PlanRoom {
    /// Outline from the polygon, else from the bounds
    pub fn outline(&self) -> Option<Polygon> {
        if let Some(points) = &self.polygon {
            let pts: Vec<Point2D> = points.iter().copied().filter(|p| p.is_finite()).collect();
            if pts.len() >= 3 {
                return Some(Polygon::new(pts));
            }
        }
        self.bounds
            .filter(|b| b.is_valid())
            .map(|b| b.to_polygon())
    }
}

/// Input floor plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloorPlan {
    pub bounds: Bounds,
    #[serde(default)]
    pub walls: Vec<Shape>,
    #[serde(default, alias = "forbidden_zones")]
    pub forbidden_zones: Vec<Shape>,
    #[serde(default)]
    pub entrances: Vec<Shape>,
    #[serde(default)]
    pub rooms: Option<Vec<PlanRoom>>,
}

impl FloorPlan {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            walls: Vec::new(),
            forbidden_zones: Vec::new(),
            entrances: Vec::new(),
            rooms: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rejects plans whose bounds are unusable
    pub fn validate(&self) -> Result<()> {
        if self.bounds.is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidBounds(self.bounds))
        }
    }

    /// Wall segments at least `min_length` long
    pub fn wall_segments(&self, min_length: f64) -> Vec<WallSegment> {
        extract_segments(&self.walls, min_length)
    }

    /// Entrance segments (door lines and entrance outlines)
    pub fn entrance_segments(&self) -> Vec<WallSegment> {
        extract_segments(&self.entrances, 0.0)
    }

    /// Forbidden zones as axis-aligned obstacle rectangles
    pub fn forbidden_rects(&self) -> Vec<Rect> {
        self.forbidden_zones
            .iter()
            .filter_map(|z| z.bounding_rect())
            .filter(|r| r.width > 0.0 || r.height > 0.0)
            .collect()
    }

    /// Entrance envelopes grown by `clearance` on every side
    pub fn entrance_clearances(&self, clearance: f64) -> Vec<Rect> {
        self.entrances
            .iter()
            .filter_map(|e| e.bounding_rect())
            .map(|r| r.expanded(clearance))
            .collect()
    }

    /// One representative point per entrance
    pub fn entrance_points(&self) -> Vec<Point2D> {
        self.entrances.iter().filter_map(|e| e.center()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_plan_from_json() {
        let json = r#"{
            "bounds": {"minX": 0, "minY": 0, "maxX": 10, "maxY": 8},
            "walls": [{"start": [0, 0], "end": [10, 0]}],
            "forbiddenZones": [{"bounds": {"minX": 4, "minY": 4, "maxX": 5, "maxY": 5}}],
            "entrances": [{"start": {"x": 4, "y": 0}, "end": {"x": 5, "y": 0}}]
        }"#;
        let plan = FloorPlan::from_json(json).unwrap();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.wall_segments(0.3).len(), 1);
        assert_eq!(plan.forbidden_rects().len(), 1);
        assert_eq!(plan.entrance_points(), vec![Point2D::new(4.5, 0.0)]);

        let clearance = plan.entrance_clearances(0.5)[0];
        assert_eq!(clearance, Rect::new(3.5, -0.5, 2.0, 1.0));
        assert!(plan.rooms.is_none());
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let plan = FloorPlan::new(Bounds::new(0.0, 0.0, 0.0, 5.0));
        assert!(matches!(plan.validate(), Err(Error::InvalidBounds(_))));
        let plan = FloorPlan::new(Bounds::new(0.0, 0.0, f64::INFINITY, 5.0));
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_room_outline_from_bounds() {
        let room = PlanRoom {
            bounds: Some(Bounds::new(0.0, 0.0, 4.0, 3.0)),
            ..Default::default()
        };
        let outline = room.outline().unwrap();
        assert_eq!(outline.len(), 4);
        assert!((outline.area() - 12.0).abs() < 1e-9);
    }
}
