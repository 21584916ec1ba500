// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end layout properties on synthetic plans

use boxplan_geometry::intersect::{segment_crosses_rect, segment_intersects_rect, segments_cross};
use boxplan_geometry::{Bounds, Direction, FloorPlan, Point2D, Shape, WallSegment};
use boxplan_layout::{generate_layout, LayoutConfig, LayoutResult, PathType, SizeClass};

const EPSILON: f64 = 0.02;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn p(x: f64, y: f64) -> Point2D {
    Point2D::new(x, y)
}

fn wall(x0: f64, y0: f64, x1: f64, y1: f64) -> Shape {
    Shape::segment(p(x0, y0), p(x1, y1))
}

fn enclosed(width: f64, height: f64) -> FloorPlan {
    let mut plan = FloorPlan::new(Bounds::new(0.0, 0.0, width, height));
    plan.walls = vec![
        wall(0.0, 0.0, width, 0.0),
        wall(width, 0.0, width, height),
        wall(width, height, 0.0, height),
        wall(0.0, height, 0.0, 0.0),
    ];
    plan
}

/// Every box exactly 2.0 wide
fn fixed_width_config() -> LayoutConfig {
    LayoutConfig {
        size_classes: vec![SizeClass::new("U", 5.0, 5.0)],
        distribution: [("U".to_string(), 100.0)].into_iter().collect(),
        ..Default::default()
    }
}

fn plan_walls(plan: &FloorPlan) -> Vec<WallSegment> {
    plan.wall_segments(0.3)
}

fn assert_layout_invariants(plan: &FloorPlan, result: &LayoutResult) {
    let bounds = plan.bounds;
    let walls = plan_walls(plan);
    let obstacles = plan.forbidden_rects();

    let rects = result
        .units
        .iter()
        .map(|u| (u.id.as_str(), u.rect()))
        .chain(result.corridors.iter().map(|c| (c.id.as_str(), c.rect())));
    for (id, r) in rects {
        // Containment
        assert!(r.within(&bounds, EPSILON), "{id} leaves the plan: {r:?}");
        // No wall passes through the interior
        for w in &walls {
            assert!(!segment_crosses_rect(w, &r, 0.01), "{id} crossed by wall {w:?}");
        }
        for o in &obstacles {
            assert!(!r.overlaps(o, 0.01), "{id} overlaps obstacle {o:?}");
        }
    }

    // No overlap between units
    for (i, a) in result.units.iter().enumerate() {
        for b in &result.units[i + 1..] {
            assert!(!a.rect().overlaps(&b.rect(), 0.01), "{} overlaps {}", a.id, b.id);
        }
    }

    // Radiator symbols never sit inside a unit
    for r in &result.radiators {
        for u in &result.units {
            let inner = u.rect().inset(0.01);
            assert!(r.path.iter().all(|p| !inner.contains_point(p)), "{} inside {}", r.id, u.id);
        }
    }

    // Circulation legs stay clear of walls and unit edges
    let mut blockers = walls.clone();
    blockers.extend(result.units.iter().flat_map(|u| u.rect().edges()));
    for path in &result.circulation_paths {
        assert!(path.path.len() >= 2);
        for leg in path.path.windows(2) {
            let leg = WallSegment::new(leg[0], leg[1]).shrunk(0.05);
            assert!(
                blockers.iter().all(|b| !segments_cross(&leg, b)),
                "{:?} path crosses a wall or unit",
                path.path_type
            );
        }
    }
}

#[test]
fn test_closed_rectangle_single_strip() {
    init_tracing();
    let plan = enclosed(8.5, 8.0);
    let config = fixed_width_config();
    let result = generate_layout(&plan, &config).unwrap();

    assert_layout_invariants(&plan, &result);
    assert_eq!(result.stats.orientations.len(), 1);
    assert_eq!(result.stats.orientations[0].direction, Direction::Horizontal);
    assert_eq!(result.stats.cross_fill_units, 0);

    // One strip centred in the room: two rows around one corridor
    assert_eq!(result.units.len(), 8);
    for u in &result.units {
        let low_row = (u.y - 0.9).abs() < 1e-9;
        let high_row = (u.y + u.height - 7.1).abs() < 1e-9;
        assert!(low_row || high_row, "{} is off the strip rows", u.id);
        assert!((u.width - 2.0).abs() < 1e-9);
    }
    assert_eq!(result.corridors.len(), 1);
    let corridor = result.corridors[0].rect();
    assert!((corridor.height - config.corridor_width).abs() < 1e-9);
    for w in plan_walls(&plan) {
        assert!(!segment_intersects_rect(&w, &corridor));
    }
}

#[test]
fn test_leftover_span_becomes_edge_row() {
    init_tracing();
    let plan = enclosed(40.0, 11.0);
    let config = LayoutConfig::default();
    let result = generate_layout(&plan, &config).unwrap();

    assert_layout_invariants(&plan, &result);

    // 11 across: one strip plus an edge row; 40 across: six strips
    let direction = result.stats.orientations[0].direction;
    let expected = match direction {
        Direction::Horizontal => 3,
        Direction::Vertical => 12,
    };
    let mut rows: Vec<i64> = result
        .units
        .iter()
        .filter(|u| !u.cross_fill)
        .map(|u| match direction {
            Direction::Horizontal => (u.y * 1000.0).round() as i64,
            Direction::Vertical => (u.x * 1000.0).round() as i64,
        })
        .collect();
    rows.sort_unstable();
    rows.dedup();
    assert_eq!(rows.len(), expected);

    for c in &result.corridors {
        let across = match c.direction {
            Direction::Horizontal => c.height,
            Direction::Vertical => c.width,
        };
        assert!((across - config.corridor_width).abs() < 1e-9, "{} is {} wide", c.id, across);
    }
}

#[test]
fn test_multi_room_plan_invariants() {
    init_tracing();
    let mut plan = enclosed(30.0, 20.0);
    plan.walls.push(wall(12.0, 0.0, 12.0, 9.0));
    plan.walls.push(wall(12.0, 11.0, 12.0, 20.0));
    plan.walls.push(wall(12.0, 10.0, 30.0, 10.0));
    plan.forbidden_zones.push(Shape::polygon(vec![p(20.0, 3.0), p(22.0, 3.0), p(22.0, 5.0), p(20.0, 5.0)]));
    plan.entrances.push(wall(5.0, 0.0, 6.5, 0.0));

    let result = generate_layout(&plan, &LayoutConfig::default()).unwrap();

    assert!(!result.units.is_empty());
    assert!(!result.corridors.is_empty());
    assert_layout_invariants(&plan, &result);

    // Entrance clearance stays free
    let clearance = plan.entrance_clearances(0.75)[0];
    assert!(result.units.iter().all(|u| !u.rect().overlaps(&clearance, 0.01)));
}

#[test]
fn test_spine_never_drawn_through_internal_wall() {
    init_tracing();
    let mut plan = enclosed(8.5, 14.0);
    plan.walls.push(wall(0.0, 7.0, 8.5, 7.0));

    let result = generate_layout(&plan, &fixed_width_config()).unwrap();
    assert!(result
        .stats
        .orientations
        .iter()
        .all(|o| o.direction == Direction::Horizontal));
    assert_layout_invariants(&plan, &result);

    let divider = WallSegment::new(p(0.0, 7.0), p(8.5, 7.0));
    let spines: Vec<_> = result
        .circulation_paths
        .iter()
        .filter(|s| s.path_type == PathType::Spine)
        .collect();
    for spine in &spines {
        for leg in spine.path.windows(2) {
            let leg = WallSegment::new(leg[0], leg[1]).shrunk(0.05);
            assert!(!segments_cross(&leg, &divider));
        }
    }
    // The rooms are sealed from each other, so the link can only be omitted
    assert!(spines.is_empty());
    assert!(result.stats.spine_links_omitted >= 1);
}

#[test]
fn test_unit_type_matches_placed_area() {
    init_tracing();
    let config = LayoutConfig::default();
    let result = generate_layout(&enclosed(20.0, 14.0), &config).unwrap();
    assert!(!result.units.is_empty());

    for u in &result.units {
        let class = config
            .size_classes
            .iter()
            .find(|c| c.name == u.unit_type)
            .unwrap_or_else(|| panic!("{} has unknown type {:?}", u.id, u.unit_type));
        assert!(
            u.area >= class.min_area - 1e-6 && u.area <= class.max_area + 1e-6,
            "{} of area {} labelled {}",
            u.id,
            u.area,
            u.unit_type
        );
    }

    // The report tallies what was actually placed
    let counted: usize = result.mix_report.classes.iter().map(|c| c.count).sum();
    assert_eq!(counted, result.units.len());
}

#[test]
fn test_layout_from_json_plan() {
    init_tracing();
    let json = r#"{
        "bounds": {"minX": 0, "minY": 0, "maxX": 16, "maxY": 12},
        "walls": [
            {"polygon": [[0, 0], [16, 0], [16, 12], [0, 12]]}
        ],
        "forbiddenZones": [
            {"bounds": {"minX": 7, "minY": 5, "maxX": 9, "maxY": 7}}
        ],
        "entrances": [
            {"start": {"x": 0, "y": 5}, "end": {"x": 0, "y": 6.5}}
        ]
    }"#;
    let plan = FloorPlan::from_json(json).unwrap();
    let result = generate_layout(&plan, &LayoutConfig::default()).unwrap();

    assert!(!result.units.is_empty());
    assert_layout_invariants(&plan, &result);

    let out = serde_json::to_value(&result).unwrap();
    assert!(out.get("circulationPaths").is_some());
    assert!(out["mixReport"]["compliance"].is_number());
    assert!(out["units"][0]["type"].is_string());
}

#[test]
fn test_layout_is_deterministic() {
    init_tracing();
    let mut plan = enclosed(24.0, 18.0);
    plan.walls.push(wall(8.0, 0.0, 8.0, 18.0));

    let a = generate_layout(&plan, &LayoutConfig::default()).unwrap();
    let b = generate_layout(&plan, &LayoutConfig::default()).unwrap();
    assert_eq!(a.units, b.units);
    assert_eq!(a.corridors, b.corridors);
    assert_eq!(a.circulation_paths, b.circulation_paths);

    let reseeded = LayoutConfig {
        seed: 7,
        ..Default::default()
    };
    let c = generate_layout(&plan, &reseeded).unwrap();
    assert_layout_invariants(&plan, &c);
}

#[test]
fn test_open_plan_falls_back_to_boundary() {
    init_tracing();
    let plan = FloorPlan::new(Bounds::new(0.0, 0.0, 12.0, 9.0));
    let result = generate_layout(&plan, &LayoutConfig::default()).unwrap();

    assert_eq!(result.rooms.len(), 1);
    assert!(!result.units.is_empty());
    assert_layout_invariants(&plan, &result);
}
