// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit-mix report: placed size classes against the target distribution

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::catalog::SizeClass;
use crate::types::Unit;

/// One size class in the report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassMix {
    pub name: String,
    pub target_percent: f64,
    pub count: usize,
    pub actual_percent: f64,
    pub total_area: f64,
    /// `actual_percent - target_percent`
    pub deviation: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MixReport {
    pub classes: Vec<ClassMix>,
    pub total_units: usize,
    /// `max(0, 1 - Σ|deviation| / 100)`
    pub compliance: f64,
}

impl MixReport {
    pub fn build(units: &[Unit], classes: &[SizeClass], distribution: &BTreeMap<String, f64>) -> Self {
        let target_total: f64 = classes
            .iter()
            .filter_map(|c| distribution.get(&c.name))
            .filter(|v| v.is_finite() && **v > 0.0)
            .sum();

        let mut tally: FxHashMap<&str, (usize, f64)> = FxHashMap::default();
        for unit in units {
            let entry = tally.entry(unit.unit_type.as_str()).or_default();
            entry.0 += 1;
            entry.1 += unit.area;
        }

        let total_units = units.len();
        let classes: Vec<ClassMix> = classes
            .iter()
            .map(|class| {
                let share = distribution.get(&class.name).copied().unwrap_or(0.0);
                let target_percent = if target_total > 0.0 && share > 0.0 {
                    share / target_total * 100.0
                } else {
                    0.0
                };
                let (count, total_area) = tally.get(class.name.as_str()).copied().unwrap_or_default();
                let actual_percent = if total_units > 0 {
                    count as f64 / total_units as f64 * 100.0
                } else {
                    0.0
                };
                ClassMix {
                    name: class.name.clone(),
                    target_percent,
                    count,
                    actual_percent,
                    total_area,
                    deviation: actual_percent - target_percent,
                }
            })
            .collect();

        let off: f64 = classes.iter().map(|c| c.deviation.abs()).sum();
        Self {
            classes,
            total_units,
            compliance: (1.0 - off / 100.0).max(0.0),
        }
    }
}
