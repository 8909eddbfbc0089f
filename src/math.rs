//! Geometry helpers for slope-relative movement.

use bevy::prelude::*;

/// Project `vector` onto the plane with unit normal `plane_normal`.
///
/// A zero normal leaves the vector untouched, which is what the callers want
/// for degenerate surface data.
pub fn project_onto_plane(vector: Vec3, plane_normal: Vec3) -> Vec3 {
    vector - plane_normal * vector.dot(plane_normal)
}

/// Re-express `direction` so it lies in the plane of `surface_normal` while
/// keeping its heading relative to `up`. Returns a unit vector (or zero for
/// degenerate input); callers rescale by the original magnitude.
pub fn tangent_to_surface(direction: Vec3, surface_normal: Vec3, up: Vec3) -> Vec3 {
    let direction_right = direction.cross(up);
    surface_normal.cross(direction_right).normalize_or_zero()
}

/// Normal of the vertical plane that blocks climbing a steep slope: the
/// horizontal component of the slope normal, as a unit vector.
pub fn obstruction_normal(up: Vec3, ground_normal: Vec3) -> Vec3 {
    up.cross(up.cross(ground_normal)).normalize_or_zero()
}
