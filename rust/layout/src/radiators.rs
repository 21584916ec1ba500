// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Zig-zag radiator symbols along the plan perimeter

use boxplan_geometry::{Bounds, Point2D, Rect, WallSegment};
use nalgebra::Vector2;

use crate::config::LayoutConfig;
use crate::types::Radiator;

/// How far a wall may sit from the bounds edge and still count as perimeter
const PERIMETER_TOLERANCE: f64 = 0.15;
/// Zig-zag segments per radiator
const TEETH: usize = 8;

/// Inward unit normal when `wall` runs along a bounds edge
fn perimeter_normal(wall: &WallSegment, bounds: &Bounds) -> Option<Vector2<f64>> {
    let near = |a: f64, b: f64| (a - b).abs() <= PERIMETER_TOLERANCE;
    let (s, e) = (wall.start, wall.end);

    if wall.is_horizontal(PERIMETER_TOLERANCE) {
        if near(s.y, bounds.min_y) && near(e.y, bounds.min_y) {
            return Some(Vector2::new(0.0, 1.0));
        }
        if near(s.y, bounds.max_y) && near(e.y, bounds.max_y) {
            return Some(Vector2::new(0.0, -1.0));
        }
    } else if wall.is_vertical(PERIMETER_TOLERANCE) {
        if near(s.x, bounds.min_x) && near(e.x, bounds.min_x) {
            return Some(Vector2::new(1.0, 0.0));
        }
        if near(s.x, bounds.max_x) && near(e.x, bounds.max_x) {
            return Some(Vector2::new(-1.0, 0.0));
        }
    }
    None
}

fn zig_zag(start: Point2D, along: Vector2<f64>, normal: Vector2<f64>, length: f64, amplitude: f64) -> Vec<Point2D> {
    (0..=TEETH)
        .map(|i| {
            let offset = match i {
                0 => 0.0,
                i if i == TEETH => 0.0,
                i if i % 2 == 1 => amplitude,
                _ => -amplitude,
            };
            let p = start.to_nalgebra() + along * (length * i as f64 / TEETH as f64) + normal * offset;
            Point2D::from_nalgebra(&p)
        })
        .collect()
}

/// Radiators spaced evenly along every perimeter wall.
///
/// Each symbol sits `perimeterMargin` inside its wall and is skipped when
/// it would reach into an entrance clearance or a placed unit.
pub fn place_radiators(
    walls: &[WallSegment],
    bounds: &Bounds,
    clearances: &[Rect],
    units: &[Rect],
    config: &LayoutConfig,
) -> Vec<Radiator> {
    let length = config.radiator_length;
    let spacing = config.radiator_spacing.max(length);
    if length <= 0.0 || spacing <= 0.0 {
        return Vec::new();
    }

    let mut radiators = Vec::new();
    for (wall_index, wall) in walls.iter().enumerate() {
        let Some(normal) = perimeter_normal(wall, bounds) else {
            continue;
        };
        let wall_length = wall.length();
        if wall_length < length {
            continue;
        }
        let along = wall.start.vector_to(&wall.end) / wall_length;

        let count = ((wall_length - length) / spacing).floor() as usize + 1;
        let first = (wall_length - (count - 1) as f64 * spacing) / 2.0;
        for k in 0..count {
            let center = first + k as f64 * spacing;
            let base = Point2D::from_nalgebra(
                &(wall.start.to_nalgebra() + along * (center - length / 2.0) + normal * config.perimeter_margin),
            );
            let path = zig_zag(base, along, normal, length, config.radiator_amplitude);

            let Some(envelope) = Bounds::from_points(path.iter()) else {
                continue;
            };
            let envelope = envelope.expanded(config.radiator_amplitude).to_rect();
            if clearances.iter().chain(units).any(|c| c.overlaps(&envelope, 0.0)) {
                continue;
            }

            radiators.push(Radiator {
                id: String::new(),
                wall_index,
                path,
                length,
            });
        }
    }

    for (i, r) in radiators.iter_mut().enumerate() {
        r.id = format!("radiator_{:03}", i + 1);
    }
    radiators
}
