// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layout output types

use boxplan_detection::{DetectionMethod, Room};
use boxplan_geometry::{Direction, Point2D, Rect};
use serde::{Deserialize, Serialize};

use crate::mix_report::MixReport;

/// Which row of a strip a unit sits in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RowSide {
    /// Row below (or left of) the corridor
    Lower,
    /// Row above (or right of) the corridor
    Upper,
    /// Only row of a single-sided strip
    Single,
}

/// A placed storage unit. Never moved once emitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub area: f64,
    /// Size class name
    #[serde(rename = "type")]
    pub unit_type: String,
    pub side: RowSide,
    pub direction: Direction,
    pub room_id: String,
    /// Placed by the cross-fill pass
    #[serde(default)]
    pub cross_fill: bool,
}

impl Unit {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum CorridorType {
    /// Between the two rows of a strip
    Access,
    /// In front of a single-sided row
    SingleSided,
    /// Serving a cross-fill zone
    CrossFill,
}

/// Access corridor rectangle; never touches a wall or obstacle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Corridor {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Direction the corridor runs in
    pub direction: Direction,
    #[serde(rename = "type")]
    pub corridor_type: CorridorType,
}

impl Corridor {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Centerline from one end to the other
    pub fn centerline(&self) -> (Point2D, Point2D) {
        let c = self.rect().center();
        match self.direction {
            Direction::Horizontal => (Point2D::new(self.x, c.y), Point2D::new(self.x + self.width, c.y)),
            Direction::Vertical => (Point2D::new(c.x, self.y), Point2D::new(c.x, self.y + self.height)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PathType {
    Spine,
    Branch,
    EntranceConnection,
}

/// One polyline of the circulation network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CirculationSegment {
    #[serde(rename = "type")]
    pub path_type: PathType,
    pub path: Vec<Point2D>,
}

/// Zig-zag radiator symbol along a perimeter wall
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Radiator {
    pub id: String,
    pub wall_index: usize,
    pub path: Vec<Point2D>,
    pub length: f64,
}

/// Orientation chosen for one region
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegionOrientation {
    pub room_id: String,
    pub direction: Direction,
    pub units: usize,
}

/// Counters for one generation run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStats {
    pub detection_method: DetectionMethod,
    pub rooms: usize,
    pub skipped_rooms: usize,
    pub orientations: Vec<RegionOrientation>,
    pub units_placed: usize,
    pub cross_fill_units: usize,
    pub units_dropped: usize,
    pub corridors_merged: usize,
    pub corridors_dropped: usize,
    pub spine_links_omitted: usize,
    pub entrances_skipped: usize,
}

/// Everything one pipeline run produces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub units: Vec<Unit>,
    pub corridors: Vec<Corridor>,
    pub radiators: Vec<Radiator>,
    pub circulation_paths: Vec<CirculationSegment>,
    pub rooms: Vec<Room>,
    pub mix_report: MixReport,
    pub stats: LayoutStats,
}
