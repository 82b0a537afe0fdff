//! # Field of View
//!
//! Bresenham line of sight and the visibility pass run after every turn.

use crate::game::{Map, Position};
use std::collections::BTreeSet;

/// Rasterises the line from `from` to `to`, both ends included.
pub fn line(from: Position, to: Position) -> Vec<Position> {
    let mut points = Vec::new();
    let (mut x, mut y) = (from.x, from.y);
    let dx = (to.x - x).abs();
    let dy = -(to.y - y).abs();
    let sx = if x < to.x { 1 } else { -1 };
    let sy = if y < to.y { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        points.push(Position::new(x, y));
        if x == to.x && y == to.y {
            return points;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// True when nothing strictly between the two tiles blocks sight.
///
/// The target itself may block sight; walls are visible.
pub fn has_line_of_sight(map: &Map, from: Position, to: Position) -> bool {
    let points = line(from, to);
    points
        .iter()
        .skip(1)
        .take(points.len().saturating_sub(2))
        .all(|p| !map.blocks_sight(*p))
}

/// Every tile within `radius` of `origin` that the origin can see.
pub fn compute_visible(map: &Map, origin: Position, radius: u32) -> BTreeSet<Position> {
    let mut visible = BTreeSet::new();
    if !map.in_bounds(origin) {
        return visible;
    }
    let r = radius as i32;
    for y in (origin.y - r)..=(origin.y + r) {
        for x in (origin.x - r)..=(origin.x + r) {
            let pos = Position::new(x, y);
            if !map.in_bounds(pos) || origin.euclidean_distance(pos) > radius as f64 {
                continue;
            }
            if has_line_of_sight(map, origin, pos) {
                visible.insert(pos);
            }
        }
    }
    visible
}

/// Recomputes visibility from `origin` and updates the map's tiles.
pub fn update_field_of_view(map: &mut Map, origin: Position, radius: u32) -> &BTreeSet<Position> {
    let visible = compute_visible(map, origin, radius);
    map.apply_visibility(origin, radius, visible);
    map.visible_tiles()
}

/// Like [`update_field_of_view`] but skips the work when neither the
/// observer nor the map changed. Returns whether it recomputed.
pub fn refresh_field_of_view(map: &mut Map, origin: Position, radius: u32) -> bool {
    if !map.needs_fov_refresh(origin, radius) {
        return false;
    }
    update_field_of_view(map, origin, radius);
    true
}
