//! `Body3D` facet and its per-tick integrator.
//!
//! Bodies live in pixel space with `z` as height above the ground. Every
//! tick [`Body3D::integrate`] applies drag, gravity, and velocity, then
//! resolves ground contact:
//!
//! 1. A body with zero velocity at `z == 0` is resting and does not move.
//! 2. `v.z -= g * gravity_scale * dt`, then `position += v * dt`.
//! 3. On reaching `z <= 0` the body either settles (when the remaining
//!    vertical speed is within one tick of gravity) or bounces with
//!    `restitution`; horizontal velocity loses `friction` either way.
//! 4. Velocity components below [`VELOCITY_EPSILON`] snap to zero.
//!
//! Coefficients are clamped to `[0, 1]` at use. `dt` is used as given; the
//! clock layer is responsible for clamping hitches.

use serde::{Deserialize, Serialize};
use slimefield_ecs::facet::{FacetHeader, FacetType};

use crate::math::{ground, is_zero, meters, Vec2, Vec3};

/// Downward acceleration at `gravity_scale == 1`, in pixels/s².
pub const GRAVITY: f32 = meters(10.0);

/// Velocity components smaller than this snap to zero.
pub const VELOCITY_EPSILON: f32 = 0.001;

/// Default seconds without movement before a body reports idle.
pub const IDLE_THRESHOLD_SECONDS: f64 = 6.0;

/// Physical state of an entity or particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body3D {
    pub header: FacetHeader,
    /// Move speed in meters, used by behaviors to size a step.
    pub speed: f32,
    pub velocity: Vec3,
    /// 0 = no bounce, 1 = perfectly elastic.
    pub restitution: f32,
    /// Fraction of velocity lost per second.
    pub drag: f32,
    /// Fraction of horizontal velocity lost per ground contact.
    pub friction: f32,
    /// Multiplier on [`GRAVITY`].
    pub gravity_scale: f32,

    position: Vec3,
    position_prev: Vec3,
    last_moved: f64,
    last_updated: f64,
    jumped: bool,
    landed: bool,
    bounced: bool,
    idle: bool,
}

impl Default for Body3D {
    fn default() -> Self {
        Self {
            header: FacetHeader {
                facet_type: FacetType::Body3D,
                ..FacetHeader::default()
            },
            speed: 0.0,
            velocity: Vec3::ZERO,
            restitution: 0.0,
            drag: 0.0,
            friction: 0.0,
            gravity_scale: 1.0,
            position: Vec3::ZERO,
            position_prev: Vec3::ZERO,
            last_moved: 0.0,
            last_updated: 0.0,
            jumped: false,
            landed: false,
            bounced: false,
            idle: false,
        }
    }
}

crate::impl_facet!(Body3D, FacetType::Body3D);

impl Body3D {
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Position at the start of the last integrated tick.
    #[inline]
    pub fn position_prev(&self) -> Vec3 {
        self.position_prev
    }

    /// Position projected onto the ground plane.
    #[inline]
    pub fn ground_position(&self) -> Vec2 {
        ground(self.position)
    }

    /// Place the body at `pos`, counting it as movement at `now`.
    pub fn teleport(&mut self, pos: Vec3, now: f64) {
        self.position_prev = self.position;
        self.position = pos;
        self.last_moved = now;
    }

    /// Add an instantaneous change in velocity.
    #[inline]
    pub fn apply_force(&mut self, force: Vec3) {
        self.velocity += force;
    }

    #[inline]
    pub fn on_ground(&self) -> bool {
        self.position.z == 0.0
    }

    /// On the ground with zero velocity; integration is a no-op.
    #[inline]
    pub fn resting(&self) -> bool {
        is_zero(self.velocity) && self.on_ground()
    }

    #[inline]
    pub fn time_since_last_move(&self, now: f64) -> f64 {
        now - self.last_moved
    }

    #[inline]
    pub fn last_moved(&self) -> f64 {
        self.last_moved
    }

    #[inline]
    pub fn last_updated(&self) -> f64 {
        self.last_updated
    }

    /// Left the ground during the last tick.
    #[inline]
    pub fn jumped(&self) -> bool {
        self.jumped
    }

    /// Touched down during the last tick (`z` went from above zero to zero).
    #[inline]
    pub fn landed(&self) -> bool {
        self.landed
    }

    /// Bounced off the ground during the last tick and is still moving.
    #[inline]
    pub fn bounced(&self) -> bool {
        self.bounced
    }

    /// Has not moved for longer than the idle threshold.
    #[inline]
    pub fn idle(&self) -> bool {
        self.idle
    }

    /// Integrate one tick with the default idle threshold.
    pub fn update(&mut self, now: f64, dt: f64) {
        self.integrate(now, dt, IDLE_THRESHOLD_SECONDS);
    }

    /// Integrate one tick.
    ///
    /// A resting body keeps its position, velocity and `last_moved`; only the
    /// per-tick flags and `last_updated` are refreshed.
    pub fn integrate(&mut self, now: f64, dt: f64, idle_threshold: f64) {
        self.position_prev = self.position;
        let mut bounced = false;

        if !self.resting() {
            let dt = dt as f32;
            let restitution = self.restitution.clamp(0.0, 1.0);
            let friction = self.friction.clamp(0.0, 1.0);
            let drag = self.drag.clamp(0.0, 1.0);
            let gravity = GRAVITY * self.gravity_scale;

            if drag > 0.0 {
                self.velocity *= (1.0 - drag * dt).clamp(0.0, 1.0);
            }
            self.velocity.z -= gravity * dt;
            self.position += self.velocity * dt;

            if self.position.z <= 0.0 {
                if self.velocity.z.abs() - gravity * dt < VELOCITY_EPSILON {
                    // Settle: all momentum is gone, not just the vertical part.
                    self.velocity = Vec3::ZERO;
                    self.position.z = 0.0;
                } else {
                    self.velocity.z *= -restitution;
                    self.position.z *= -restitution;
                    let friction_coef = 1.0 - friction;
                    self.velocity.x *= friction_coef;
                    self.velocity.y *= friction_coef;
                    bounced = true;
                }
                // -0.0 from a zero restitution bounce
                if self.position.z == 0.0 {
                    self.position.z = 0.0;
                }
            }

            for axis in [&mut self.velocity.x, &mut self.velocity.y, &mut self.velocity.z] {
                if axis.abs() < VELOCITY_EPSILON {
                    *axis = 0.0;
                }
            }

            if self.position != self.position_prev {
                self.last_moved = now;
            }
        }

        self.jumped = self.position_prev.z == 0.0 && self.position.z > 0.0;
        self.landed = self.position_prev.z > 0.0 && self.position.z == 0.0;
        self.bounced = bounced && !is_zero(self.velocity);
        self.idle = now - self.last_moved > idle_threshold;
        self.last_updated = now;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    fn airborne(z: f32) -> Body3D {
        let mut body = Body3D::default();
        body.teleport(Vec3::new(0.0, 0.0, z), 0.0);
        body
    }

    #[test]
    fn resting_body_is_a_fixed_point() {
        let mut body = Body3D::default();
        body.teleport(Vec3::new(10.0, 20.0, 0.0), 1.0);
        let before = body.clone();

        body.update(5.0, DT);

        assert_eq!(body.position(), before.position());
        assert_eq!(body.velocity, before.velocity);
        assert_eq!(body.last_moved(), before.last_moved());
        assert_eq!(body.last_updated(), 5.0);
    }

    #[test]
    fn gravity_pulls_down_and_integrates_position() {
        let mut body = airborne(100.0);
        body.update(0.1, 0.1);
        // v.z = -64, z = 100 - 6.4
        assert!((body.velocity.z + 64.0).abs() < 1e-4);
        assert!((body.position().z - 93.6).abs() < 1e-4);
        assert_eq!(body.last_moved(), 0.1);
        assert!(!body.landed());
    }

    #[test]
    fn ground_contact_bounces_with_restitution_and_friction() {
        let mut body = airborne(1.0);
        body.restitution = 0.5;
        body.friction = 0.25;
        body.velocity = Vec3::new(100.0, 0.0, -300.0);

        body.update(0.1, 0.1);

        // v.z = -300 - 64 = -364, z = 1 - 36.4 = -35.4
        assert!((body.velocity.z - 182.0).abs() < 1e-3);
        assert!((body.position().z - 17.7).abs() < 1e-3);
        assert!((body.velocity.x - 75.0).abs() < 1e-4);
        assert!(body.bounced());
    }

    #[test]
    fn coefficients_are_clamped() {
        let mut body = airborne(1.0);
        body.restitution = 4.0;
        body.friction = -2.0;
        body.velocity = Vec3::new(10.0, 0.0, -300.0);
        body.update(0.1, 0.1);
        // restitution clamps to 1, friction to 0
        assert!((body.velocity.z - 364.0).abs() < 1e-3);
        assert_eq!(body.velocity.x, 10.0);
    }

    #[test]
    fn falling_body_eventually_settles_and_lands() {
        let mut body = airborne(64.0);
        body.restitution = 0.5;
        body.friction = 0.5;

        let mut landed_ticks = 0;
        let mut now = 0.0;
        for _ in 0..600 {
            now += DT;
            body.update(now, DT);
            if body.landed() {
                landed_ticks += 1;
            }
        }

        assert!(body.resting());
        assert_eq!(landed_ticks, 1);
        assert_eq!(body.position().z, 0.0);
    }

    #[test]
    fn grounded_slide_stops_after_one_tick() {
        let mut body = Body3D::default();
        body.friction = 0.0;
        body.velocity = Vec3::new(100.0, 0.0, 0.0);

        body.update(DT, DT);

        assert!(body.resting());
        assert_eq!(body.velocity, Vec3::ZERO);
        let x = body.position().x;
        assert!(x > 0.0);

        for i in 2..60 {
            body.update(i as f64 * DT, DT);
        }
        assert_eq!(body.position().x, x);
    }

    #[test]
    fn tiny_velocities_snap_to_zero() {
        let mut body = airborne(50.0);
        body.velocity = Vec3::new(0.0005, -0.0009, 0.0);
        body.gravity_scale = 0.0;
        body.update(DT, DT);
        assert_eq!(body.velocity.x, 0.0);
        assert_eq!(body.velocity.y, 0.0);
    }

    #[test]
    fn jump_sets_jumped_flag() {
        let mut body = Body3D::default();
        body.apply_force(Vec3::new(0.0, 0.0, 320.0));
        body.update(DT, DT);
        assert!(body.jumped());
        assert!(!body.on_ground());
    }

    #[test]
    fn idle_after_threshold() {
        let mut body = Body3D::default();
        body.teleport(Vec3::ZERO, 0.0);
        body.integrate(5.0, DT, 6.0);
        assert!(!body.idle());
        body.integrate(6.5, DT, 6.0);
        assert!(body.idle());
        assert_eq!(body.time_since_last_move(6.5), 6.5);
    }

    #[test]
    fn drag_damps_velocity() {
        let mut body = airborne(100.0);
        body.gravity_scale = 0.0;
        body.drag = 0.5;
        body.velocity = Vec3::new(100.0, 0.0, 0.0);
        body.update(0.1, 0.1);
        assert!((body.velocity.x - 95.0).abs() < 1e-4);
    }

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let mut a = airborne(37.5);
        a.restitution = 0.8;
        a.friction = 0.3;
        a.drag = 0.1;
        a.velocity = Vec3::new(12.3, -45.6, 78.9);
        let mut b = a.clone();

        for i in 1..=240 {
            let now = i as f64 * DT;
            a.update(now, DT);
            b.update(now, DT);
            assert_eq!(a.position().to_array().map(f32::to_bits), b.position().to_array().map(f32::to_bits));
            assert_eq!(a.velocity.to_array().map(f32::to_bits), b.velocity.to_array().map(f32::to_bits));
        }
    }
}
