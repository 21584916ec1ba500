// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room classification.
//!
//! The rule-based path is always available. A learned model can be injected
//! as a capability; whenever it declines to answer the rules decide.

use std::fmt;
use std::sync::Arc;

use boxplan_geometry::Polygon;
use serde::{Deserialize, Serialize};

/// Aspect ratio above which a narrow room reads as a corridor
const CORRIDOR_ASPECT: f64 = 4.0;
/// Corridors are at most this wide
const CORRIDOR_MAX_WIDTH: f64 = 3.0;
const CLOSET_MAX_AREA: f64 = 4.0;
const HALL_MIN_AREA: f64 = 150.0;

/// What a detected area is used as
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Corridor,
    Closet,
    #[default]
    Room,
    Hall,
}

impl RoomType {
    /// Parses a free-form label from upstream tooling
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "corridor" | "hallway" | "passage" => Some(RoomType::Corridor),
            "closet" | "storage" | "cupboard" => Some(RoomType::Closet),
            "room" | "office" => Some(RoomType::Room),
            "hall" | "warehouse" | "open" => Some(RoomType::Hall),
            _ => None,
        }
    }
}

/// A pluggable room classifier (e.g. a trained model)
pub trait RoomClassify: Send + Sync {
    /// Classifies the outline, or returns `None` to defer to the rules
    fn classify(&self, polygon: &Polygon) -> Option<RoomType>;
}

/// Classifier capability, resolved once when the detector is built
#[derive(Clone, Default)]
pub enum RoomClassifier {
    #[default]
    RuleBased,
    Learned(Arc<dyn RoomClassify>),
}

impl fmt::Debug for RoomClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomClassifier::RuleBased => f.write_str("RuleBased"),
            RoomClassifier::Learned(_) => f.write_str("Learned(..)"),
        }
    }
}

impl RoomClassifier {
    pub fn classify(&self, polygon: &Polygon) -> RoomType {
        match self {
            RoomClassifier::RuleBased => classify_by_rules(polygon),
            RoomClassifier::Learned(model) => model
                .classify(polygon)
                .unwrap_or_else(|| classify_by_rules(polygon)),
        }
    }
}

/// Aspect ratio and area thresholds
pub fn classify_by_rules(polygon: &Polygon) -> RoomType {
    let area = polygon.area();
    let Some(bounds) = polygon.bounds() else {
        return RoomType::Room;
    };
    let short = bounds.width().min(bounds.height());
    let long = bounds.width().max(bounds.height());

    if short > 0.0 && long / short >= CORRIDOR_ASPECT && short <= CORRIDOR_MAX_WIDTH {
        RoomType::Corridor
    } else if area < CLOSET_MAX_AREA {
        RoomType::Closet
    } else if area >= HALL_MIN_AREA {
        RoomType::Hall
    } else {
        RoomType::Room
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxplan_geometry::Bounds;

    struct AlwaysHall;

    impl RoomClassify for AlwaysHall {
        fn classify(&self, _polygon: &Polygon) -> Option<RoomType> {
            Some(RoomType::Hall)
        }
    }

    struct Declines;

    impl RoomClassify for Declines {
        fn classify(&self, _polygon: &Polygon) -> Option<RoomType> {
            None
        }
    }

    fn rect(w: f64, h: f64) -> Polygon {
        Bounds::new(0.0, 0.0, w, h).to_polygon()
    }

    #[test]
    fn test_rules() {
        assert_eq!(classify_by_rules(&rect(20.0, 2.0)), RoomType::Corridor);
        assert_eq!(classify_by_rules(&rect(1.5, 1.5)), RoomType::Closet);
        assert_eq!(classify_by_rules(&rect(10.0, 8.0)), RoomType::Room);
        assert_eq!(classify_by_rules(&rect(20.0, 15.0)), RoomType::Hall);
    }

    #[test]
    fn test_learned_overrides_and_degrades() {
        let learned = RoomClassifier::Learned(Arc::new(AlwaysHall));
        assert_eq!(learned.classify(&rect(1.5, 1.5)), RoomType::Hall);

        let declining = RoomClassifier::Learned(Arc::new(Declines));
        assert_eq!(declining.classify(&rect(1.5, 1.5)), RoomType::Closet);
    }

    #[test]
    fn test_from_label() {
        assert_eq!(RoomType::from_label(" Storage "), Some(RoomType::Closet));
        assert_eq!(RoomType::from_label("lobby"), None);
    }
}
