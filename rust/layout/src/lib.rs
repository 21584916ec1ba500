// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Storage box layout from floor plans
//!
//! One call runs the whole pipeline:
//! 1. Room detection (provided rooms, planar graph, raster, boundary)
//! 2. Strip placement per room, both orientations tried in parallel
//! 3. Cross-fill of leftover zones
//! 4. Post-filter of units and corridors
//! 5. Circulation routing, radiators and the unit-mix report
//!
//! # Usage
//!
//! ```rust,ignore
//! use boxplan_geometry::FloorPlan;
//! use boxplan_layout::{generate_layout, LayoutConfig};
//!
//! let plan = FloorPlan::from_json(&json)?;
//! let result = generate_layout(&plan, &LayoutConfig::default())?;
//! println!("{} units, compliance {:.2}", result.units.len(), result.mix_report.compliance);
//! ```

pub mod catalog;
pub mod circulation;
pub mod config;
pub mod corridors;
mod cross_fill;
pub mod error;
pub mod mix_report;
pub mod placement;
pub mod radiators;
pub mod types;

pub use catalog::{Catalog, CatalogEntry, SizeClass};
pub use circulation::{route_circulation, Circulation};
pub use config::LayoutConfig;
pub use error::{Error, Result};
pub use mix_report::{ClassMix, MixReport};
pub use placement::{fill_area, place_region, PlacedBox, Placement, PlacementContext};
pub use radiators::place_radiators;
pub use types::{
    CirculationSegment, Corridor, CorridorType, LayoutResult, LayoutStats, PathType, Radiator, RegionOrientation,
    RowSide, Unit,
};

use boxplan_detection::{RoomClassifier, RoomDetector};
use boxplan_geometry::{Direction, FloorPlan, GridIndex, Rect};
use tracing::{debug, info};

use corridors::{filter_corridors, merge_touching, CorridorRect};
use placement::OVERLAP_SLACK;

/// Generates a layout with the rule-based room classifier
pub fn generate_layout(plan: &FloorPlan, config: &LayoutConfig) -> Result<LayoutResult> {
    generate_layout_with(plan, config, RoomClassifier::RuleBased)
}

/// Generates a layout, classifying detected rooms with `classifier`.
///
/// Fails only on unusable bounds or configuration. Rooms too small for a
/// row, blocked routes and skipped entrances degrade the result and are
/// counted in [`LayoutStats`].
pub fn generate_layout_with(
    plan: &FloorPlan,
    config: &LayoutConfig,
    classifier: RoomClassifier,
) -> Result<LayoutResult> {
    plan.validate()?;
    config.validate()?;
    let mut stats = LayoutStats::default();

    // ─── Step 1: Detect rooms ───
    let detector = RoomDetector::new(config.detection_config()).with_classifier(classifier);
    let detection = detector.detect_plan(plan);
    let rooms = detection.rooms;
    stats.detection_method = detection.method;
    stats.rooms = rooms.len();

    // ─── Step 2: Placement inputs ───
    let walls = plan.wall_segments(detector.config().min_segment_length);
    let clearances = plan.entrance_clearances(config.entrance_clearance);
    let mut obstacles = plan.forbidden_rects();
    obstacles.extend(clearances.iter().copied());
    let catalog = Catalog::build(config);
    let ctx = PlacementContext::new(config, &catalog, plan.bounds, &walls, &obstacles);

    // ─── Step 3: Strips per room ───
    let mut cursor = 0;
    let mut boxes: Vec<(PlacedBox, Option<usize>, bool)> = Vec::new();
    let mut corridor_rects: Vec<CorridorRect> = Vec::new();
    let mut directions = Vec::with_capacity(rooms.len());

    for (index, room) in rooms.iter().enumerate() {
        let Some(placement) = place_region(&ctx, room, cursor) else {
            stats.skipped_rooms += 1;
            directions.push(Direction::Horizontal);
            continue;
        };
        info!(
            room = %room.id,
            direction = ?placement.direction,
            units = placement.boxes.len(),
            "Orientation chosen"
        );
        cursor = placement.cursor;
        directions.push(placement.direction);
        stats.orientations.push(RegionOrientation {
            room_id: room.id.clone(),
            direction: placement.direction,
            units: placement.boxes.len(),
        });
        boxes.extend(placement.boxes.into_iter().map(|b| (b, Some(index), false)));
        corridor_rects.extend(placement.corridors);
    }

    // ─── Step 4: Cross-fill ───
    let unit_rects: Vec<Rect> = boxes.iter().map(|(b, _, _)| b.rect).collect();
    let placed_corridors: Vec<Rect> = corridor_rects.iter().map(|c| c.rect).collect();
    let fill = cross_fill::cross_fill(&ctx, &rooms, &directions, &unit_rects, &placed_corridors, &mut cursor);
    stats.cross_fill_units = fill.boxes.len();
    boxes.extend(fill.boxes.into_iter().map(|(b, room)| (b, room, true)));
    corridor_rects.extend(fill.corridors);
    stats.units_placed = boxes.len();

    // ─── Step 5: Post-filter units ───
    let mut kept: Vec<(PlacedBox, Option<usize>, bool)> = Vec::with_capacity(boxes.len());
    let mut kept_index = GridIndex::new((2.0 * config.box_depth).max(1.0));
    for item in boxes {
        let rect = item.0.rect;
        let overlaps_kept = kept_index
            .query(&rect.bounds())
            .into_iter()
            .any(|i| rect.overlaps(&kept[i].0.rect, OVERLAP_SLACK));
        if overlaps_kept || !ctx.is_clear(&rect) {
            continue;
        }
        kept_index.insert(kept.len(), &rect.bounds());
        kept.push(item);
    }
    stats.units_dropped = stats.units_placed - kept.len();
    if stats.units_dropped > 0 {
        debug!(dropped = stats.units_dropped, "Dropped units in post-filter");
    }

    // ─── Step 6: Corridor network ───
    let (merged, merges) = merge_touching(corridor_rects);
    stats.corridors_merged = merges;
    let before = merged.len();
    let (filtered, _) = filter_corridors(&ctx, merged);
    let corridor_rects: Vec<CorridorRect> = filtered
        .into_iter()
        .filter(|c| {
            !kept_index
                .query(&c.rect.bounds())
                .into_iter()
                .any(|i| c.rect.overlaps(&kept[i].0.rect, OVERLAP_SLACK))
        })
        .collect();
    stats.corridors_dropped = before - corridor_rects.len();

    let units: Vec<Unit> = kept
        .iter()
        .enumerate()
        .map(|(i, (b, room, cross_fill))| Unit {
            id: format!("unit_{:04}", i + 1),
            x: b.rect.x,
            y: b.rect.y,
            width: b.rect.width,
            height: b.rect.height,
            area: b.rect.area(),
            unit_type: catalog
                .class_for_area(b.rect.area())
                .map_or("", |c| catalog.class_name(c))
                .to_string(),
            side: b.side,
            direction: b.direction,
            room_id: room.and_then(|r| rooms.get(r)).map(|r| r.id.clone()).unwrap_or_default(),
            cross_fill: *cross_fill,
        })
        .collect();

    let corridors: Vec<Corridor> = corridor_rects
        .iter()
        .enumerate()
        .map(|(i, c)| Corridor {
            id: format!("corridor_{:03}", i + 1),
            x: c.rect.x,
            y: c.rect.y,
            width: c.rect.width,
            height: c.rect.height,
            direction: c.direction,
            corridor_type: c.kind,
        })
        .collect();

    // ─── Step 7: Circulation, radiators, mix ───
    let unit_rects: Vec<Rect> = units.iter().map(Unit::rect).collect();
    let circulation = route_circulation(&walls, &unit_rects, &corridors, &plan.entrance_points());
    stats.spine_links_omitted = circulation.links_omitted;
    stats.entrances_skipped = circulation.entrances_skipped;

    let radiators = place_radiators(&walls, &plan.bounds, &clearances, &unit_rects, config);
    let mix_report = MixReport::build(&units, catalog.classes(), &config.distribution);

    info!(
        rooms = stats.rooms,
        units = units.len(),
        corridors = corridors.len(),
        cross_fill = stats.cross_fill_units,
        paths = circulation.paths.len(),
        compliance = mix_report.compliance,
        "Layout generated"
    );

    Ok(LayoutResult {
        units,
        corridors,
        radiators,
        circulation_paths: circulation.paths,
        rooms,
        mix_report,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxplan_geometry::{Bounds, Point2D, Shape};

    fn rectangle_plan(width: f64, height: f64) -> FloorPlan {
        let corners = [
            Point2D::new(0.0, 0.0),
            Point2D::new(width, 0.0),
            Point2D::new(width, height),
            Point2D::new(0.0, height),
        ];
        let mut plan = FloorPlan::new(Bounds::new(0.0, 0.0, width, height));
        plan.walls = (0..4).map(|i| Shape::segment(corners[i], corners[(i + 1) % 4])).collect();
        plan
    }

    #[test]
    fn test_generate_layout_basic() {
        let result = generate_layout(&rectangle_plan(20.0, 14.0), &LayoutConfig::default()).unwrap();
        assert!(!result.units.is_empty());
        assert!(!result.corridors.is_empty());
        assert_eq!(result.stats.rooms, 1);
        assert_eq!(result.mix_report.total_units, result.units.len());
        assert!(result.units.iter().all(|u| u.room_id == "room_01"));
    }

    #[test]
    fn test_ids_are_sequential() {
        let result = generate_layout(&rectangle_plan(20.0, 14.0), &LayoutConfig::default()).unwrap();
        assert_eq!(result.units[0].id, "unit_0001");
        assert_eq!(result.corridors[0].id, "corridor_001");
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let plan = FloorPlan::new(Bounds::new(0.0, 0.0, 0.0, 5.0));
        assert!(matches!(
            generate_layout(&plan, &LayoutConfig::default()),
            Err(Error::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LayoutConfig {
            corridor_width: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            generate_layout(&rectangle_plan(10.0, 8.0), &config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tiny_room_yields_no_units() {
        let result = generate_layout(&rectangle_plan(2.0, 2.0), &LayoutConfig::default()).unwrap();
        assert!(result.units.is_empty());
        assert_eq!(result.stats.skipped_rooms, 1);
    }
}
