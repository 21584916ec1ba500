// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layout configuration.
//!
//! Every option has a default; JSON input and `BOXPLAN_*` environment
//! variables only override what they name.

use std::collections::BTreeMap;

use boxplan_detection::DetectionConfig;
use serde::{Deserialize, Serialize};

use crate::catalog::{default_distribution, default_size_classes, SizeClass};
use crate::error::{Error, Result};

/// Upper cap on the gap tolerance handed to detection
const MAX_GAP_TOLERANCE: f64 = 0.2;

/// Options recognised by [`crate::generate_layout`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub corridor_width: f64,
    pub box_depth: f64,
    pub box_spacing: f64,
    pub min_box_width: f64,
    pub max_box_width: f64,
    /// Inset of radiators from perimeter walls
    pub perimeter_margin: f64,
    pub snap_tolerance: f64,
    pub gap_tolerance: f64,
    pub min_room_area: f64,
    pub grid_size: f64,
    /// Size class name → target percentage
    pub distribution: BTreeMap<String, f64>,
    pub size_classes: Vec<SizeClass>,
    /// Margin grown around each entrance to keep it clear
    pub entrance_clearance: f64,
    /// Pull-back of corridor ends from walls
    pub corridor_inset: f64,
    pub min_corridor_length: f64,
    /// Occupancy cell size for the cross-fill pass
    pub cross_fill_cell_size: f64,
    /// Seed for catalog shuffling
    pub seed: u64,
    pub radiator_length: f64,
    pub radiator_spacing: f64,
    pub radiator_amplitude: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            corridor_width: 1.2,
            box_depth: 2.5,
            box_spacing: 0.05,
            min_box_width: 1.0,
            max_box_width: 4.0,
            perimeter_margin: 0.3,
            snap_tolerance: 0.1,
            gap_tolerance: 0.15,
            min_room_area: 2.0,
            grid_size: 0.2,
            distribution: default_distribution(),
            size_classes: default_size_classes(),
            entrance_clearance: 0.75,
            corridor_inset: 0.08,
            min_corridor_length: 0.8,
            cross_fill_cell_size: 1.0,
            seed: 42,
            radiator_length: 1.6,
            radiator_spacing: 6.0,
            radiator_amplitude: 0.15,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl LayoutConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `BOXPLAN_*` environment variables.
    ///
    /// Unparseable values keep the default. The distribution is read from
    /// `BOXPLAN_DISTRIBUTION` as `S=25,M=35,L=25,XL=15`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            corridor_width: env_or("BOXPLAN_CORRIDOR_WIDTH", d.corridor_width),
            box_depth: env_or("BOXPLAN_BOX_DEPTH", d.box_depth),
            box_spacing: env_or("BOXPLAN_BOX_SPACING", d.box_spacing),
            min_box_width: env_or("BOXPLAN_MIN_BOX_WIDTH", d.min_box_width),
            max_box_width: env_or("BOXPLAN_MAX_BOX_WIDTH", d.max_box_width),
            perimeter_margin: env_or("BOXPLAN_PERIMETER_MARGIN", d.perimeter_margin),
            snap_tolerance: env_or("BOXPLAN_SNAP_TOLERANCE", d.snap_tolerance),
            gap_tolerance: env_or("BOXPLAN_GAP_TOLERANCE", d.gap_tolerance),
            min_room_area: env_or("BOXPLAN_MIN_ROOM_AREA", d.min_room_area),
            grid_size: env_or("BOXPLAN_GRID_SIZE", d.grid_size),
            distribution: std::env::var("BOXPLAN_DISTRIBUTION")
                .ok()
                .and_then(|v| parse_distribution(&v))
                .unwrap_or(d.distribution),
            size_classes: d.size_classes,
            entrance_clearance: env_or("BOXPLAN_ENTRANCE_CLEARANCE", d.entrance_clearance),
            corridor_inset: env_or("BOXPLAN_CORRIDOR_INSET", d.corridor_inset),
            min_corridor_length: env_or("BOXPLAN_MIN_CORRIDOR_LENGTH", d.min_corridor_length),
            cross_fill_cell_size: env_or("BOXPLAN_CROSS_FILL_CELL_SIZE", d.cross_fill_cell_size),
            seed: env_or("BOXPLAN_SEED", d.seed),
            radiator_length: env_or("BOXPLAN_RADIATOR_LENGTH", d.radiator_length),
            radiator_spacing: env_or("BOXPLAN_RADIATOR_SPACING", d.radiator_spacing),
            radiator_amplitude: env_or("BOXPLAN_RADIATOR_AMPLITUDE", d.radiator_amplitude),
        }
    }

    /// Rejects values no layout can be built from
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("corridorWidth", self.corridor_width),
            ("boxDepth", self.box_depth),
            ("minBoxWidth", self.min_box_width),
            ("maxBoxWidth", self.max_box_width),
            ("snapTolerance", self.snap_tolerance),
            ("gridSize", self.grid_size),
            ("crossFillCellSize", self.cross_fill_cell_size),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }

        let non_negative = [
            ("boxSpacing", self.box_spacing),
            ("perimeterMargin", self.perimeter_margin),
            ("gapTolerance", self.gap_tolerance),
            ("minRoomArea", self.min_room_area),
            ("entranceClearance", self.entrance_clearance),
            ("corridorInset", self.corridor_inset),
            ("minCorridorLength", self.min_corridor_length),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!("{name} must not be negative, got {value}")));
            }
        }

        if self.min_box_width > self.max_box_width {
            return Err(Error::InvalidConfig(format!(
                "minBoxWidth ({}) exceeds maxBoxWidth ({})",
                self.min_box_width, self.max_box_width
            )));
        }

        if self.distribution.values().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::InvalidConfig("distribution percentages must be non-negative".into()));
        }
        let total: f64 = self
            .distribution
            .iter()
            .filter(|(name, _)| self.size_classes.iter().any(|c| &c.name == *name))
            .map(|(_, v)| v)
            .sum();
        if total <= 0.0 {
            return Err(Error::InvalidConfig(
                "distribution must give a positive share to at least one size class".into(),
            ));
        }

        for class in &self.size_classes {
            if !(class.min_area.is_finite() && class.max_area.is_finite()) || class.min_area > class.max_area {
                return Err(Error::InvalidConfig(format!("size class {} has an invalid area range", class.name)));
            }
        }

        Ok(())
    }

    /// Detection settings derived from the flat options.
    ///
    /// The gap tolerance is clamped to `[snapTolerance, 0.2]`.
    pub fn detection_config(&self) -> DetectionConfig {
        let gap = self
            .gap_tolerance
            .min(MAX_GAP_TOLERANCE)
            .max(self.snap_tolerance.min(MAX_GAP_TOLERANCE));
        DetectionConfig {
            snap_tolerance: self.snap_tolerance,
            gap_tolerance: gap,
            min_room_area: self.min_room_area,
            grid_size: self.grid_size,
            ..DetectionConfig::default()
        }
    }

    /// Depth of one strip: two rows and the corridor between them
    pub fn strip_pitch(&self) -> f64 {
        2.0 * self.box_depth + self.corridor_width
    }
}

/// Parses `S=25,M=35` style distributions
fn parse_distribution(raw: &str) -> Option<BTreeMap<String, f64>> {
    let mut out = BTreeMap::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = part.split_once('=')?;
        out.insert(name.trim().to_string(), value.trim().parse().ok()?);
    }
    (!out.is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = LayoutConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.strip_pitch() - 6.2).abs() < 1e-12);
    }

    #[test]
    fn test_from_json_partial() {
        let config = LayoutConfig::from_json(r#"{"corridorWidth": 1.5, "distribution": {"M": 100}}"#).unwrap();
        assert_eq!(config.corridor_width, 1.5);
        assert_eq!(config.box_depth, 2.5);
        assert_eq!(config.distribution.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = LayoutConfig {
            min_box_width: 5.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = LayoutConfig {
            box_depth: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = LayoutConfig::default();
        config.distribution = BTreeMap::from([("XXL".to_string(), 100.0)]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_detection_config_clamps_gap() {
        let config = LayoutConfig {
            gap_tolerance: 0.5,
            ..Default::default()
        };
        assert_eq!(config.detection_config().gap_tolerance, 0.2);

        let config = LayoutConfig {
            gap_tolerance: 0.01,
            ..Default::default()
        };
        assert_eq!(config.detection_config().gap_tolerance, 0.1);
    }

    #[test]
    fn test_parse_distribution() {
        let d = parse_distribution("S=10, M=90").unwrap();
        assert_eq!(d.get("M"), Some(&90.0));
        assert!(parse_distribution("S10").is_none());
    }
}
