// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for layout generation.

use boxplan_geometry::Bounds;

/// Result type alias for layout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-visible failures. Infeasible regions, blocked routes and missing
/// rooms degrade the result instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Plan bounds are non-finite or have no extent.
    #[error("invalid plan bounds: {0:?}")]
    InvalidBounds(Bounds),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON could not be decoded.
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<boxplan_geometry::Error> for Error {
    fn from(err: boxplan_geometry::Error) -> Self {
        match err {
            boxplan_geometry::Error::InvalidBounds(b) => Error::InvalidBounds(b),
            boxplan_geometry::Error::Json(e) => Error::Json(e),
        }
    }
}
