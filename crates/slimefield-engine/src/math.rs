//! Vector aliases and world-unit helpers.
//!
//! World space is measured in pixels. `x`/`y` lie on the ground plane and `z`
//! is height above the ground, so a body with `z == 0` is standing on it.

pub use glam::{Vec2, Vec3};

/// Pixels per meter of world space.
pub const PIXELS_PER_METER: f32 = 64.0;

/// Convert meters to world pixels.
#[inline]
pub const fn meters(m: f32) -> f32 {
    m * PIXELS_PER_METER
}

/// Ground-plane projection of a 3D point.
#[inline]
pub fn ground(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// `true` if all components of `v` are exactly zero.
#[inline]
pub fn is_zero(v: Vec3) -> bool {
    v.x == 0.0 && v.y == 0.0 && v.z == 0.0
}

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const RED: Rgba = Rgba::new(230, 41, 55, 255);
    pub const GOLD: Rgba = Rgba::new(255, 203, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with alpha scaled by `alpha` (clamped to `[0, 1]`).
    pub fn fade(self, alpha: f32) -> Self {
        let a = (alpha.clamp(0.0, 1.0) * 255.0) as u8;
        Self { a, ..self }
    }
}
