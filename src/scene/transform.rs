//! Quad transforms
//!
//! Matrices compose right to left: `translate * scale` scales the unit quad
//! about its own centre and then moves it.

use glam::{Mat4, Vec2, Vec3};

/// `translate(position) ∘ scale(size)` for a quad in the z = 0 plane
pub fn quad_transform(position: Vec2, size: Vec2) -> Mat4 {
    Mat4::from_translation(position.extend(0.0)) * Mat4::from_scale(size.extend(1.0))
}

/// Quad parked at (0.5, -0.5) spinning about z by `time` radians
pub fn spinning_quad(time: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.5, -0.5, 0.0)) * Mat4::from_rotation_z(time)
}

/// Quad parked at (-0.5, 0.5) pulsing between zero and full size
pub fn pulsing_quad(time: f32) -> Mat4 {
    let s = pulse_scale(time);
    Mat4::from_translation(Vec3::new(-0.5, 0.5, 0.0)) * Mat4::from_scale(Vec3::new(s, s, 1.0))
}

/// `sin(t) / 2 + 0.5`, always within [0, 1]
#[inline]
pub fn pulse_scale(time: f32) -> f32 {
    time.sin() / 2.0 + 0.5
}
