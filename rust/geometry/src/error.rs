// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for plan ingestion.

use crate::types::Bounds;

/// Result type alias for geometry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers. Malformed individual shapes are filtered,
/// never reported.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Plan bounds are non-finite or have no extent.
    #[error("invalid plan bounds: {0:?}")]
    InvalidBounds(Bounds),

    /// JSON could not be decoded into a floor plan.
    #[error("floor plan decode error: {0}")]
    Json(#[from] serde_json::Error),
}
