// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry foundation for automated storage layouts
//!
//! This crate provides:
//! 1. Canonical types ([`Point2D`], [`Bounds`], [`Rect`], [`WallSegment`],
//!    [`Polygon`], [`Direction`]) used by every later stage
//! 2. The ingestion boundary ([`FloorPlan`], [`Shape`]) that normalises the
//!    heterogeneous shapes coming out of CAD classification
//! 3. Intersection primitives (Liang–Barsky clipping, segment crossing,
//!    point-to-segment distance)
//! 4. A grid spatial hash for candidate lookups
//!
//! # Usage
//!
//! ```rust,ignore
//! use boxplan_geometry::{FloorPlan, intersect::segment_crosses_rect};
//!
//! let plan = FloorPlan::from_json(&json)?;
//! plan.validate()?;
//! let walls = plan.wall_segments(0.3);
//! ```

pub mod error;
pub mod intersect;
pub mod plan;
pub mod shapes;
pub mod spatial;
pub mod types;

pub use error::{Error, Result};
pub use plan::{FloorPlan, PlanRoom};
pub use shapes::{extract_segments, Shape};
pub use spatial::GridIndex;
pub use types::{Bounds, Direction, Point2D, Polygon, Rect, WallSegment, COORD_EPSILON};
