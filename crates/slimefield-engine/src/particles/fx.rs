//! Per-kind particle behavior.
//!
//! Each [`ParticleFxKind`] maps to one [`ParticleFx`] implementation. `init`
//! picks a particle's lifetime window, initial body state, color, and scale;
//! `update` maps the particle's progress `alpha` onto its look.

use std::f32::consts::PI;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::{Particle, ParticleEffect};
use crate::math::{lerp, meters, Rgba, Vec2, Vec3};
use crate::sprite::SpriteDefId;

/// Shortest lifetime window a particle can get, in seconds.
const MIN_WINDOW: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Sound
// ---------------------------------------------------------------------------

/// One-shot sounds particle effects can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    GemBounce,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundEvent {
    pub cue: SoundCue,
    pub pitch: f32,
}

/// Receives sound triggers. Playback is the host's business.
pub trait SoundSink {
    fn play(&mut self, cue: SoundCue, pitch: f32);
}

impl SoundSink for Vec<SoundEvent> {
    fn play(&mut self, cue: SoundCue, pitch: f32) {
        self.push(SoundEvent { cue, pitch });
    }
}

/// Drops every sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSound;

impl SoundSink for NullSound {
    fn play(&mut self, _cue: SoundCue, _pitch: f32) {}
}

// ---------------------------------------------------------------------------
// EffectParams
// ---------------------------------------------------------------------------

/// Tuning for one effect instance. Ranges are inclusive; velocities are in
/// meters per second.
///
/// Counts and durations apply to every kind. Spawn delay, lifespan, spawn
/// scale, the velocity ranges and `friction` drive Blood and PoisonNova;
/// `scale_a`/`scale_b` drive PoisonNova's growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParams {
    pub particle_count_min: usize,
    pub particle_count_max: usize,
    pub duration_min: f32,
    pub duration_max: f32,
    pub spawn_delay_min: f32,
    pub spawn_delay_max: f32,
    pub lifespan_min: f32,
    pub lifespan_max: f32,
    pub spawn_scale_first: f32,
    pub spawn_scale_last: f32,
    pub velocity_x_min: f32,
    pub velocity_x_max: f32,
    pub velocity_y_min: f32,
    pub velocity_y_max: f32,
    pub velocity_z_min: f32,
    pub velocity_z_max: f32,
    pub friction: f32,
    pub scale_a: f32,
    pub scale_b: f32,
    pub sprite_def: Option<SpriteDefId>,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            particle_count_min: 16,
            particle_count_max: 16,
            duration_min: 1.0,
            duration_max: 1.0,
            spawn_delay_min: 0.0,
            spawn_delay_max: 0.2,
            lifespan_min: 0.3,
            lifespan_max: 0.8,
            spawn_scale_first: 3.0,
            spawn_scale_last: 1.0,
            velocity_x_min: -1.0,
            velocity_x_max: 1.0,
            velocity_y_min: -1.0,
            velocity_y_max: 1.0,
            velocity_z_min: 1.0,
            velocity_z_max: 3.0,
            friction: 0.5,
            scale_a: 1.0,
            scale_b: 8.0,
            sprite_def: None,
        }
    }
}

impl EffectParams {
    /// Exactly `count` particles over exactly `duration` seconds.
    pub fn burst(count: usize, duration: f32) -> Self {
        Self {
            particle_count_min: count,
            particle_count_max: count,
            duration_min: duration,
            duration_max: duration,
            ..Self::default()
        }
    }

    /// Every range is ordered and the duration is positive and finite.
    pub fn is_valid(&self) -> bool {
        let ordered = |lo: f32, hi: f32| lo.is_finite() && hi.is_finite() && lo <= hi;
        self.particle_count_min <= self.particle_count_max
            && self.duration_min > 0.0
            && ordered(self.duration_min, self.duration_max)
            && self.spawn_delay_min >= 0.0
            && ordered(self.spawn_delay_min, self.spawn_delay_max)
            && self.lifespan_min >= 0.0
            && ordered(self.lifespan_min, self.lifespan_max)
            && ordered(self.velocity_x_min, self.velocity_x_max)
            && ordered(self.velocity_y_min, self.velocity_y_max)
            && ordered(self.velocity_z_min, self.velocity_z_max)
    }
}

// ---------------------------------------------------------------------------
// ParticleFx
// ---------------------------------------------------------------------------

/// Side channels available to [`ParticleFx::update`].
pub struct FxContext<'a> {
    pub rng: &'a mut dyn RngCore,
    pub sound: &'a mut dyn SoundSink,
}

/// Behavior of one effect kind.
pub trait ParticleFx: Sync {
    /// Set up a freshly allocated particle of `effect`.
    fn init(&self, particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore);

    /// Per-tick hook for a live particle, with `alpha` in `[0, 1)`.
    fn update(
        &self,
        particle: &mut Particle,
        effect: &ParticleEffect,
        alpha: f32,
        ctx: &mut FxContext<'_>,
    );
}

/// The closed set of particle effect kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleFxKind {
    Blood,
    Copper,
    Gem,
    GoldenChest,
    Goo,
    Number,
    PoisonNova,
    Rainbow,
}

impl ParticleFxKind {
    pub const ALL: [ParticleFxKind; 8] = [
        ParticleFxKind::Blood,
        ParticleFxKind::Copper,
        ParticleFxKind::Gem,
        ParticleFxKind::GoldenChest,
        ParticleFxKind::Goo,
        ParticleFxKind::Number,
        ParticleFxKind::PoisonNova,
        ParticleFxKind::Rainbow,
    ];

    pub fn behavior(self) -> &'static dyn ParticleFx {
        match self {
            ParticleFxKind::Blood => &Blood,
            ParticleFxKind::Copper => &Copper,
            ParticleFxKind::Gem => &Gem,
            ParticleFxKind::GoldenChest => &GoldenChest,
            ParticleFxKind::Goo => &Goo,
            ParticleFxKind::Number => &Number,
            ParticleFxKind::PoisonNova => &PoisonNova,
            ParticleFxKind::Rainbow => &Rainbow,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[inline]
fn range(rng: &mut dyn RngCore, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

#[inline]
fn variance(rng: &mut dyn RngCore, v: f32) -> f32 {
    range(rng, -v, v)
}

/// Fit a `[spawn, die)` window inside `[0, duration]`, at least
/// [`MIN_WINDOW`] long.
fn window(spawn: f64, die: f64, duration: f64) -> (f64, f64) {
    let spawn = spawn.clamp(0.0, (duration - MIN_WINDOW).max(0.0));
    let die = die.clamp(spawn + MIN_WINDOW, duration.max(spawn + MIN_WINDOW));
    (spawn, die)
}

/// Appear in the first `spawn_frac` of the effect, die in the last 15%.
fn early_window(particle: &mut Particle, duration: f64, spawn_frac: f32, rng: &mut dyn RngCore) {
    let spawn = duration * f64::from(range(rng, 0.0, spawn_frac));
    let die = duration * (1.0 - f64::from(range(rng, 0.0, 0.15)));
    (particle.spawn_at, particle.die_at) = window(spawn, die, duration);
}

/// Window from the effect's spawn delay and lifespan ranges. Returns the
/// spawn delay's position within its range.
fn param_window(particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore) -> f32 {
    let p = &effect.params;
    let delay = range(rng, p.spawn_delay_min, p.spawn_delay_max);
    let lifetime = range(rng, p.lifespan_min, p.lifespan_max);
    (particle.spawn_at, particle.die_at) = window(
        f64::from(delay),
        f64::from(delay + lifetime),
        effect.duration,
    );
    let span = p.spawn_delay_max - p.spawn_delay_min;
    if span > 0.0 {
        (delay - p.spawn_delay_min) / span
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

struct Blood;

impl ParticleFx for Blood {
    fn init(&self, particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore) {
        let delay_alpha = param_window(particle, effect, rng);
        let p = &effect.params;
        particle.body.velocity = Vec3::new(
            meters(range(rng, p.velocity_x_min, p.velocity_x_max)),
            meters(range(rng, p.velocity_y_min, p.velocity_y_max)),
            meters(range(rng, p.velocity_z_min, p.velocity_z_max)),
        );
        particle.body.friction = p.friction;
        particle.color = Rgba::new(255, 0, 0, 255);
        particle.scale = lerp(p.spawn_scale_first, p.spawn_scale_last, delay_alpha);
    }

    fn update(&self, particle: &mut Particle, _: &ParticleEffect, alpha: f32, _: &mut FxContext<'_>) {
        // red 1.0 -> 0.0, opacity 1.0 -> 0.1
        let r = ((1.0 - alpha) * 255.0) as u8;
        let a = ((1.0 - alpha * 0.9) * 255.0) as u8;
        particle.color = Rgba::new(r, 0, 0, a);
    }
}

struct Copper;

impl ParticleFx for Copper {
    fn init(&self, particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore) {
        early_window(particle, effect.duration, 0.05, rng);
        particle.body.velocity = Vec3::new(
            variance(rng, meters(1.0)),
            variance(rng, meters(1.0)),
            range(rng, 0.0, meters(4.0)),
        );
        particle.body.restitution = 0.8;
        particle.body.friction = 0.5;
        particle.color = Rgba::WHITE;
        particle.scale = 1.0;
    }

    fn update(&self, _: &mut Particle, _: &ParticleEffect, _: f32, _: &mut FxContext<'_>) {}
}

struct Gem;

impl ParticleFx for Gem {
    fn init(&self, particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore) {
        // Gems pop out after the chest lid has opened.
        let spawn = 0.75 + effect.duration * f64::from(range(rng, 0.0, 0.05));
        let die = effect.duration * (1.0 - f64::from(range(rng, 0.0, 0.15)));
        (particle.spawn_at, particle.die_at) = window(spawn, die, effect.duration);

        particle.body.velocity = Vec3::new(
            variance(rng, meters(1.0)),
            variance(rng, meters(1.0)),
            range(rng, meters(3.0), meters(6.0)),
        );
        particle.body.restitution = 0.9;
        particle.body.friction = 0.4;
        particle.color = Rgba::WHITE;
        particle.scale = 1.0;
    }

    fn update(&self, particle: &mut Particle, _: &ParticleEffect, _: f32, ctx: &mut FxContext<'_>) {
        if particle.body.bounced() {
            let pitch = 1.5 + variance(ctx.rng, 0.1);
            ctx.sound.play(SoundCue::GemBounce, pitch);
        }
    }
}

struct GoldenChest;

impl ParticleFx for GoldenChest {
    fn init(&self, particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore) {
        early_window(particle, effect.duration, 0.05, rng);
        particle.body.teleport(Vec3::new(0.0, 0.0, meters(1.0)), 0.0);
        particle.body.restitution = 0.2;
        particle.body.friction = 0.1;
        particle.color = Rgba::WHITE;
        particle.scale = 2.0;
    }

    fn update(&self, _: &mut Particle, _: &ParticleEffect, _: f32, _: &mut FxContext<'_>) {}
}

struct Goo;

impl ParticleFx for Goo {
    fn init(&self, particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore) {
        early_window(particle, effect.duration, 0.25, rng);
        particle.body.velocity = Vec3::new(
            variance(rng, meters(1.0)),
            variance(rng, meters(1.0)),
            range(rng, 0.0, meters(2.0)),
        );
        particle.body.friction = 0.5;
        particle.color = Rgba::new(154, 219, 63, 178);
        particle.scale = 1.0;
    }

    fn update(&self, particle: &mut Particle, _: &ParticleEffect, alpha: f32, _: &mut FxContext<'_>) {
        particle.scale = 10.0 * (1.0 - alpha * 0.8);
    }
}

struct Number;

impl ParticleFx for Number {
    fn init(&self, particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore) {
        early_window(particle, effect.duration, 0.05, rng);
        let offset = Vec3::new(
            meters(variance(rng, 0.5)),
            meters(variance(rng, 0.5)),
            0.0,
        );
        particle.body.teleport(offset, 0.0);
        particle.body.velocity = Vec3::new(0.0, 0.0, meters(range(rng, 4.0, 5.0)));
        particle.body.restitution = 0.5;
        particle.body.friction = 0.5;
        particle.body.gravity_scale = 1.3;
        particle.color = Rgba::WHITE;
        particle.scale = 2.0;
    }

    fn update(&self, _: &mut Particle, _: &ParticleEffect, _: f32, _: &mut FxContext<'_>) {}
}

struct PoisonNova;

impl ParticleFx for PoisonNova {
    fn init(&self, particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore) {
        param_window(particle, effect, rng);
        let p = &effect.params;
        let dir = Vec2::new(variance(rng, 1.0), variance(rng, 1.0)).normalize_or_zero();
        let planar = dir * range(rng, p.velocity_x_min, p.velocity_x_max);
        particle.body.velocity = Vec3::new(
            meters(planar.x),
            meters(planar.y),
            meters(range(rng, p.velocity_z_min, p.velocity_z_max)),
        );
        particle.body.friction = p.friction;
        particle.scale = p.scale_a;
    }

    fn update(&self, particle: &mut Particle, effect: &ParticleEffect, alpha: f32, _: &mut FxContext<'_>) {
        let p = &effect.params;
        particle.scale = lerp(p.scale_a, p.scale_b, alpha);
        let r = lerp(64.0, 255.0, alpha) as u8;
        // Fades in, holds, fades out.
        let ha = alpha - 0.5;
        let a = (ha.powi(6) - 5.0 * ha * ha + 1.0).clamp(0.0, 1.0);
        particle.color = Rgba::new(r, 0, 255, (a * 255.0) as u8);
    }
}

struct Rainbow;

const RAINBOW: [Rgba; 6] = [
    Rgba::new(230, 41, 55, 255),
    Rgba::new(255, 161, 0, 255),
    Rgba::new(255, 203, 0, 255),
    Rgba::new(0, 117, 44, 255),
    Rgba::new(0, 82, 172, 255),
    Rgba::new(112, 31, 126, 255),
];

impl ParticleFx for Rainbow {
    fn init(&self, particle: &mut Particle, effect: &ParticleEffect, rng: &mut dyn RngCore) {
        let angle = range(rng, 0.0, PI);
        let arc = rng.gen_range(0..RAINBOW.len());

        // Sweep the arc left to right over the first half of the effect.
        let spawn = f64::from(angle / PI) * effect.duration * 0.5;
        (particle.spawn_at, particle.die_at) =
            window(spawn, spawn + effect.duration * 0.4, effect.duration);

        let radius = meters(3.0) + arc as f32 * meters(0.16);
        particle
            .body
            .teleport(Vec3::new(-angle.cos(), 0.0, angle.sin()) * radius, 0.0);
        particle.body.drag = 0.5;
        particle.body.gravity_scale = 0.0;
        particle.body.velocity.z = meters(range(rng, 0.2, 0.4));
        particle.color = RAINBOW[arc];
        particle.scale = 1.0;
    }

    fn update(&self, particle: &mut Particle, _: &ParticleEffect, alpha: f32, _: &mut FxContext<'_>) {
        particle.scale = 7.0 * (1.0 - alpha);
        particle.color.a = ((1.0 - alpha * 0.4) * 255.0) as u8;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn effect_with(params: EffectParams, duration: f64) -> ParticleEffect {
        ParticleEffect {
            params,
            duration,
            ..ParticleEffect::default()
        }
    }

    #[test]
    fn every_kind_inits_a_window_inside_the_effect() {
        let mut rng = Pcg32::seed_from_u64(3);
        for kind in ParticleFxKind::ALL {
            for duration in [0.5, 1.0, 4.0] {
                let effect = effect_with(EffectParams::default(), duration);
                for _ in 0..64 {
                    let mut particle = Particle::default();
                    kind.behavior().init(&mut particle, &effect, &mut rng);
                    assert!(particle.spawn_at >= 0.0, "{kind:?}");
                    assert!(particle.die_at > particle.spawn_at, "{kind:?}");
                    assert!(particle.die_at <= duration + MIN_WINDOW, "{kind:?}");
                }
            }
        }
    }

    #[test]
    fn blood_fades_out() {
        let effect = effect_with(EffectParams::default(), 1.0);
        let mut particle = Particle::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut sound = NullSound;
        let mut ctx = FxContext {
            rng: &mut rng,
            sound: &mut sound,
        };
        Blood.update(&mut particle, &effect, 0.0, &mut ctx);
        assert_eq!(particle.color, Rgba::new(255, 0, 0, 255));
        Blood.update(&mut particle, &effect, 0.5, &mut ctx);
        assert_eq!(particle.color.r, 127);
        assert!(particle.color.a < 255 && particle.color.a > 25);
    }

    #[test]
    fn gem_bounce_plays_a_sound() {
        let effect = effect_with(EffectParams::default(), 3.0);
        let mut particle = Particle::default();
        particle.body.restitution = 0.9;
        particle.body.teleport(Vec3::new(0.0, 0.0, 1.0), 0.0);
        particle.body.velocity = Vec3::new(0.0, 0.0, -meters(3.0));
        particle.body.update(1.0 / 60.0, 1.0 / 60.0);
        assert!(particle.body.bounced());

        let mut rng = Pcg32::seed_from_u64(1);
        let mut sounds: Vec<SoundEvent> = Vec::new();
        Gem.update(
            &mut particle,
            &effect,
            0.5,
            &mut FxContext {
                rng: &mut rng,
                sound: &mut sounds,
            },
        );
        assert_eq!(sounds.len(), 1);
        assert_eq!(sounds[0].cue, SoundCue::GemBounce);
        assert!((sounds[0].pitch - 1.5).abs() <= 0.1);
    }

    #[test]
    fn zero_width_ranges_are_allowed() {
        let mut rng = Pcg32::seed_from_u64(9);
        assert_eq!(range(&mut rng, 2.0, 2.0), 2.0);
        assert!(EffectParams::burst(0, 1.0).is_valid());
        assert!(!EffectParams::burst(1, -1.0).is_valid());
        let inverted = EffectParams {
            velocity_z_min: 2.0,
            velocity_z_max: 1.0,
            ..EffectParams::default()
        };
        assert!(!inverted.is_valid());
    }

    #[test]
    fn window_is_clamped_and_nonempty() {
        assert_eq!(window(-1.0, 0.5, 1.0), (0.0, 0.5));
        let (spawn, die) = window(2.0, 3.0, 1.0);
        assert!(spawn < die && die <= 1.0 + MIN_WINDOW);
    }
}
