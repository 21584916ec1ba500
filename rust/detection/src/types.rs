// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detection results

use boxplan_geometry::{Bounds, Point2D, Polygon};
use serde::{Deserialize, Serialize};

use crate::classifier::RoomType;
use crate::face_extractor::FaceStats;
use crate::raster::RasterStats;
use crate::segment_prep::PrepStats;

/// Where a room outline came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoomSource {
    /// Planar graph face walk
    Graph,
    /// Raster flood fill
    Raster,
    /// Whole plan boundary, nothing else survived
    Boundary,
    /// Supplied with the floor plan
    Provided,
}

/// A usable region handed to placement. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub polygon: Polygon,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub bounds: Bounds,
    pub center: Point2D,
    pub area: f64,
    pub source: RoomSource,
}

impl Room {
    /// Builds a room from a counter-clockwise outline.
    ///
    /// Returns `None` for outlines with no extent.
    pub fn from_polygon(
        id: impl Into<String>,
        polygon: Polygon,
        room_type: RoomType,
        source: RoomSource,
    ) -> Option<Self> {
        let bounds = polygon.bounds()?;
        Some(Self {
            id: id.into(),
            center: polygon.centroid(),
            area: polygon.area(),
            polygon,
            room_type,
            bounds,
            source,
        })
    }

    /// Bounds reject, then point-in-outline
    pub fn contains_point(&self, p: &Point2D) -> bool {
        self.bounds.contains_point(p, 0.0) && self.polygon.contains_point(p)
    }
}

/// Which path produced the final room set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    #[default]
    Graph,
    Raster,
    /// Graph faces completed by raster outlines
    Hybrid,
    Boundary,
    Provided,
}

/// Counters collected across one detection run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStats {
    pub prep: PrepStats,
    pub pruned_filaments: usize,
    pub faces: FaceStats,
    pub raster: Option<RasterStats>,
    pub candidates: usize,
    pub merged: usize,
}

/// Rooms plus how they were found
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionOutcome {
    pub rooms: Vec<Room>,
    pub method: DetectionMethod,
    pub stats: DetectionStats,
}
