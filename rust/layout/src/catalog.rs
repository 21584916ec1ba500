// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Size classes and the shuffled catalog of box widths

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::LayoutConfig;

/// Catalog slots distributed across the classes by percentage
const CATALOG_SLOTS: usize = 100;

/// A named band of unit areas
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SizeClass {
    pub name: String,
    pub min_area: f64,
    pub max_area: f64,
}

impl SizeClass {
    pub fn new(name: impl Into<String>, min_area: f64, max_area: f64) -> Self {
        Self {
            name: name.into(),
            min_area,
            max_area,
        }
    }
}

pub fn default_size_classes() -> Vec<SizeClass> {
    vec![
        SizeClass::new("S", 0.0, 1.0),
        SizeClass::new("M", 1.0, 3.0),
        SizeClass::new("L", 3.0, 5.0),
        SizeClass::new("XL", 5.0, 10.0),
    ]
}

pub fn default_distribution() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("S".to_string(), 25.0),
        ("M".to_string(), 35.0),
        ("L".to_string(), 25.0),
        ("XL".to_string(), 15.0),
    ])
}

/// One target width and the class it was cut from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub width: f64,
    pub class_index: usize,
}

/// Shuffled sequence of target widths.
///
/// Rows draw from it round-robin through a caller-held cursor, so two
/// orientation attempts can share one catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    /// Distinct widths, widest first
    by_width: Vec<CatalogEntry>,
    classes: Vec<SizeClass>,
}

impl Catalog {
    pub fn build(config: &LayoutConfig) -> Self {
        let classes = config.size_classes.clone();
        let total: f64 = classes
            .iter()
            .filter_map(|c| config.distribution.get(&c.name))
            .filter(|v| v.is_finite() && **v > 0.0)
            .sum();

        for name in config.distribution.keys() {
            if !classes.iter().any(|c| &c.name == name) {
                warn!(class = %name, "Distribution names an unknown size class");
            }
        }

        let (reach_min, reach_max) = (
            config.min_box_width * config.box_depth,
            config.max_box_width * config.box_depth,
        );
        for class in &classes {
            if class.max_area <= reach_min || class.min_area >= reach_max {
                warn!(
                    class = %class.name,
                    min_area = class.min_area,
                    max_area = class.max_area,
                    reach_min,
                    reach_max,
                    "Size class cannot be reached at this box depth"
                );
            }
        }

        let mut entries = Vec::with_capacity(CATALOG_SLOTS);
        if total > 0.0 {
            for (index, class) in classes.iter().enumerate() {
                let share = config.distribution.get(&class.name).copied().unwrap_or(0.0);
                if share.is_nan() || share <= 0.0 {
                    continue;
                }
                let count = ((share / total) * CATALOG_SLOTS as f64).round().max(1.0) as usize;
                for i in 0..count {
                    let t = (i as f64 + 0.5) / count as f64;
                    let area = class.min_area + (class.max_area - class.min_area) * t;
                    let width = (area / config.box_depth).clamp(config.min_box_width, config.max_box_width);
                    entries.push(CatalogEntry {
                        width,
                        class_index: index,
                    });
                }
            }
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        entries.shuffle(&mut rng);

        let mut by_width = entries.clone();
        by_width.sort_by(|a, b| b.width.total_cmp(&a.width).then(a.class_index.cmp(&b.class_index)));
        by_width.dedup_by(|a, b| (a.width - b.width).abs() < 1e-9);

        Self {
            entries,
            by_width,
            classes,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn classes(&self) -> &[SizeClass] {
        &self.classes
    }

    pub fn class_name(&self, index: usize) -> &str {
        self.classes.get(index).map_or("", |c| c.name.as_str())
    }

    /// Class a placed unit of `area` belongs to.
    ///
    /// Ranges are half-open `[min, max)`; areas beyond the table fall into
    /// the nearest end class.
    pub fn class_for_area(&self, area: f64) -> Option<usize> {
        const EPS: f64 = 1e-9;
        if let Some(i) = self
            .classes
            .iter()
            .position(|c| area + EPS >= c.min_area && area + EPS < c.max_area)
        {
            return Some(i);
        }
        let smallest = self.classes.iter().enumerate().min_by(|a, b| a.1.min_area.total_cmp(&b.1.min_area));
        let largest = self.classes.iter().enumerate().max_by(|a, b| a.1.max_area.total_cmp(&b.1.max_area));
        match (smallest, largest) {
            (Some((i, c)), _) if area < c.min_area => Some(i),
            (_, Some((i, _))) => Some(i),
            _ => None,
        }
    }

    /// Narrowest width in the catalog
    pub fn min_width(&self) -> Option<f64> {
        self.by_width.last().map(|e| e.width)
    }

    /// Next width that fits `remaining`.
    ///
    /// Takes the round-robin entry at `cursor` when it fits, else the widest
    /// catalog width that does. `None` when nothing fits.
    pub fn next_fitting(&self, cursor: &mut usize, remaining: f64) -> Option<CatalogEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let entry = self.entries[*cursor % self.entries.len()];
        *cursor += 1;
        if entry.width <= remaining + 1e-9 {
            return Some(entry);
        }
        self.by_width.iter().copied().find(|e| e.width <= remaining + 1e-9)
    }
}
