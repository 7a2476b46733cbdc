//! Fixed-capacity particle effects.
//!
//! A [`ParticleSystem`] owns two preallocated pools, effects and particles,
//! each threaded with an intrusive free list (a dead slot's `next_free` names
//! the next dead slot). Creating an effect pops one effect slot and up to the
//! requested number of particle slots; nothing is allocated per frame.
//!
//! Every particle carries a `[spawn_at, die_at)` window measured from its
//! effect's start. Each update computes
//!
//! ```text
//! alpha = (now - effect.started_at - spawn_at) / (die_at - spawn_at)
//! ```
//!
//! and integrates the particle while `alpha` is in `[0, 1)`. At `alpha >= 1`
//! the particle returns to the free list; an effect with no particles left
//! fires its dying callback and returns to its own free list.
//!
//! Pool exhaustion is never an error for the caller: effects get fewer
//! particles (or none at all) and a warning is logged.

pub mod fx;

use std::fmt;

use rand::{Rng, RngCore};
use slimefield_ecs::entity::EntityId;
use tracing::{trace, warn};

use crate::attach::AttachPoint;
use crate::body::Body3D;
use crate::math::{Rgba, Vec3};
use crate::sprite::SpriteDefId;

pub use fx::{
    EffectParams, FxContext, NullSound, ParticleFx, ParticleFxKind, SoundCue, SoundEvent, SoundSink,
};

/// Effect pool capacity.
pub const MAX_EFFECTS: usize = 32;
/// Particle pool capacity.
pub const MAX_PARTICLES: usize = 1024;

// ---------------------------------------------------------------------------
// Particle
// ---------------------------------------------------------------------------

/// One particle. A slot is live iff `effect` is set.
#[derive(Debug, Clone, Default)]
pub struct Particle {
    effect: Option<EffectId>,
    next_free: Option<usize>,
    spawned: bool,
    /// Position is relative to the effect origin until the particle spawns.
    pub body: Body3D,
    pub color: Rgba,
    pub scale: f32,
    pub sprite_def: Option<SpriteDefId>,
    /// Seconds after the effect start at which the particle appears.
    pub spawn_at: f64,
    /// Seconds after the effect start at which the particle dies.
    pub die_at: f64,
}

impl Particle {
    /// The owning effect, or `None` for a free slot.
    #[inline]
    pub fn effect(&self) -> Option<EffectId> {
        self.effect
    }

    /// Whether the particle is inside its window and being simulated.
    #[inline]
    pub fn visible(&self) -> bool {
        self.effect.is_some() && self.spawned
    }
}

// ---------------------------------------------------------------------------
// ParticleEffect
// ---------------------------------------------------------------------------

/// Handle to one effect. Goes stale once that effect dies, even after its
/// slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId {
    slot: usize,
    generation: u32,
}

/// Called once when an effect's last particle dies.
pub type DyingCallback = Box<dyn FnOnce(&ParticleEffect) + Send>;

/// A batch of particles sharing a kind, an origin, and a duration.
#[derive(Default)]
pub struct ParticleEffect {
    kind: Option<ParticleFxKind>,
    /// Bumped each time the slot is freed.
    generation: u32,
    next_free: Option<usize>,
    particles_left: usize,
    pub params: EffectParams,
    pub origin: Vec3,
    pub duration: f64,
    pub started_at: f64,
    pub sprite_def: Option<SpriteDefId>,
    /// Entity attach point the origin tracks, refreshed before each update.
    pub follow: Option<(EntityId, AttachPoint)>,
    on_dying: Option<DyingCallback>,
}

impl fmt::Debug for ParticleEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticleEffect")
            .field("kind", &self.kind)
            .field("generation", &self.generation)
            .field("particles_left", &self.particles_left)
            .field("origin", &self.origin)
            .field("duration", &self.duration)
            .field("started_at", &self.started_at)
            .field("follow", &self.follow)
            .field("on_dying", &self.on_dying.is_some())
            .finish()
    }
}

impl ParticleEffect {
    /// The effect kind, or `None` for a free slot.
    #[inline]
    pub fn kind(&self) -> Option<ParticleFxKind> {
        self.kind
    }

    /// Particles that are pending or alive.
    #[inline]
    pub fn particles_left(&self) -> usize {
        self.particles_left
    }

    pub fn set_on_dying(&mut self, callback: DyingCallback) {
        self.on_dying = Some(callback);
    }

    fn id(&self, slot: usize) -> EffectId {
        EffectId {
            slot,
            generation: self.generation,
        }
    }

    fn names(&self, id: EffectId) -> bool {
        self.kind.is_some() && self.generation == id.generation
    }
}

// ---------------------------------------------------------------------------
// ParticleSystem
// ---------------------------------------------------------------------------

/// Pools of effects and particles with O(1) alloc/free.
#[derive(Debug)]
pub struct ParticleSystem {
    effects: Vec<ParticleEffect>,
    effects_free: Option<usize>,
    effects_active: usize,

    particles: Vec<Particle>,
    particles_free: Option<usize>,
    particles_active: usize,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self::with_capacity(MAX_EFFECTS, MAX_PARTICLES)
    }

    /// Pools sized for `effects` effects and `particles` particles.
    pub fn with_capacity(effects: usize, particles: usize) -> Self {
        let effects = (0..effects)
            .map(|i| ParticleEffect {
                next_free: (i + 1 < effects).then_some(i + 1),
                ..ParticleEffect::default()
            })
            .collect::<Vec<_>>();
        let particles = (0..particles)
            .map(|i| Particle {
                next_free: (i + 1 < particles).then_some(i + 1),
                ..Particle::default()
            })
            .collect::<Vec<_>>();
        Self {
            effects_free: (!effects.is_empty()).then_some(0),
            effects,
            effects_active: 0,
            particles_free: (!particles.is_empty()).then_some(0),
            particles,
            particles_active: 0,
        }
    }

    #[inline]
    pub fn particles_active(&self) -> usize {
        self.particles_active
    }

    #[inline]
    pub fn effects_active(&self) -> usize {
        self.effects_active
    }

    /// The live effect `id` names, or `None` once it has died.
    pub fn effect(&self, id: EffectId) -> Option<&ParticleEffect> {
        self.effects.get(id.slot).filter(|e| e.names(id))
    }

    pub fn effect_mut(&mut self, id: EffectId) -> Option<&mut ParticleEffect> {
        self.effects.get_mut(id.slot).filter(|e| e.names(id))
    }

    /// Live effects.
    pub fn effects(&self) -> impl Iterator<Item = (EffectId, &ParticleEffect)> {
        self.effects
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind.is_some())
            .map(|(slot, e)| (e.id(slot), e))
    }

    /// Particles inside their window, for drawing.
    pub fn visible_particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.visible())
    }

    /// Start an effect of `kind` at `origin`.
    ///
    /// Particle count and duration are drawn from `params`. Returns `None` if
    /// the effect pool is full or `params` cannot produce a valid effect. If
    /// the particle pool runs dry the effect keeps the particles it got.
    pub fn create_effect(
        &mut self,
        kind: ParticleFxKind,
        origin: Vec3,
        params: &EffectParams,
        now: f64,
        rng: &mut dyn RngCore,
    ) -> Option<EffectId> {
        if !params.is_valid() {
            warn!(?kind, ?params, "invalid particle effect params; effect discarded");
            return None;
        }
        let Some(slot) = self.effects_free else {
            warn!(?kind, "particle effect pool is full; effect discarded");
            return None;
        };

        let duration = f64::from(rng.gen_range(params.duration_min..=params.duration_max));
        let count = rng.gen_range(params.particle_count_min..=params.particle_count_max);

        let effect = &mut self.effects[slot];
        self.effects_free = effect.next_free.take();
        self.effects_active += 1;
        *effect = ParticleEffect {
            kind: Some(kind),
            generation: effect.generation,
            params: params.clone(),
            origin,
            duration,
            started_at: now,
            sprite_def: params.sprite_def,
            ..ParticleEffect::default()
        };

        let id = self.effects[slot].id(slot);
        let behavior = kind.behavior();
        let mut allocated = 0;
        for _ in 0..count {
            let Some(index) = self.particles_free else {
                warn!(
                    ?kind,
                    requested = count,
                    allocated,
                    "particle pool is full; effect truncated"
                );
                break;
            };
            let particle = &mut self.particles[index];
            self.particles_free = particle.next_free.take();
            self.particles_active += 1;

            *particle = Particle {
                effect: Some(id),
                sprite_def: params.sprite_def,
                ..Particle::default()
            };
            behavior.init(particle, &self.effects[slot], rng);
            allocated += 1;
        }
        self.effects[slot].particles_left = allocated;

        trace!(?kind, effect = slot, particles = allocated, "particle effect created");
        Some(id)
    }

    /// Advance every live effect to `now`.
    ///
    /// `before_update` runs on each live effect first (e.g. to move its
    /// origin with the entity it follows).
    pub fn update(
        &mut self,
        now: f64,
        dt: f64,
        rng: &mut dyn RngCore,
        sound: &mut dyn SoundSink,
        mut before_update: impl FnMut(&mut ParticleEffect),
    ) {
        debug_assert!(self.particles_active <= self.particles.len());
        debug_assert!(self.effects_active <= self.effects.len());

        for effect in self.effects.iter_mut().filter(|e| e.kind.is_some()) {
            before_update(effect);
        }

        for index in 0..self.particles.len() {
            let particle = &mut self.particles[index];
            let Some(effect_id) = particle.effect else {
                continue;
            };
            let effect = &mut self.effects[effect_id.slot];
            let Some(kind) = effect.kind else {
                continue;
            };

            let window = particle.die_at - particle.spawn_at;
            let alpha = ((now - effect.started_at - particle.spawn_at) / window) as f32;
            if (0.0..1.0).contains(&alpha) {
                if !particle.spawned {
                    let offset = particle.body.position();
                    particle.body.teleport(effect.origin + offset, now);
                    particle.spawned = true;
                }
                particle.body.integrate(now, dt, f64::INFINITY);
                kind.behavior()
                    .update(particle, effect, alpha, &mut fx::FxContext {
                        rng: &mut *rng,
                        sound: &mut *sound,
                    });
            } else if alpha >= 1.0 || alpha.is_nan() {
                effect.particles_left = effect.particles_left.saturating_sub(1);
                *particle = Particle {
                    next_free: self.particles_free,
                    ..Particle::default()
                };
                self.particles_free = Some(index);
                self.particles_active -= 1;
            }
        }

        for index in 0..self.effects.len() {
            let effect = &mut self.effects[index];
            if effect.kind.is_none() || effect.particles_left > 0 {
                continue;
            }
            if let Some(on_dying) = effect.on_dying.take() {
                on_dying(effect);
            }
            trace!(kind = ?effect.kind, effect = index, "particle effect finished");
            *effect = ParticleEffect {
                generation: effect.generation.wrapping_add(1),
                next_free: self.effects_free,
                ..ParticleEffect::default()
            };
            self.effects_free = Some(index);
            self.effects_active -= 1;
        }
    }

    /// Free-list lengths plus active counts cover each pool exactly, and
    /// every effect's particle count matches the particles pointing at it.
    pub fn is_consistent(&self) -> bool {
        let free_particles = chain_len(self.particles_free, self.particles.len(), |i| {
            self.particles.get(i).and_then(|p| p.next_free)
        });
        let free_effects = chain_len(self.effects_free, self.effects.len(), |i| {
            self.effects.get(i).and_then(|e| e.next_free)
        });
        let live_particles = self.particles.iter().filter(|p| p.effect.is_some()).count();
        let live_effects = self.effects.iter().filter(|e| e.kind.is_some()).count();

        let counts_ok = live_particles == self.particles_active
            && live_effects == self.effects_active
            && free_particles == Some(self.particles.len() - self.particles_active)
            && free_effects == Some(self.effects.len() - self.effects_active);

        let owners_ok = self.effects.iter().enumerate().all(|(i, e)| {
            let owned = self
                .particles
                .iter()
                .filter(|p| p.effect == Some(e.id(i)))
                .count();
            owned == e.particles_left
        });
        counts_ok && owners_ok
    }
}

/// Length of an intrusive list through a pool of `pool_len` slots, or `None`
/// if it is longer than the pool (i.e. it loops).
fn chain_len(
    head: Option<usize>,
    pool_len: usize,
    next: impl Fn(usize) -> Option<usize>,
) -> Option<usize> {
    let mut len = 0usize;
    let mut cursor = head;
    while let Some(i) = cursor {
        len += 1;
        if len > pool_len {
            return None;
        }
        cursor = next(i);
    }
    Some(len)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
