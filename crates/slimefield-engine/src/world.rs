//! The simulation context.
//!
//! A [`World`] owns everything one simulation needs: config, clock, facet
//! depot, id allocator, item catalog, particle system, and RNG state. There
//! are no globals, so a client world and a server world can run side by side
//! on different threads.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use slimefield_ecs::entity::{EntityId, EntityIdAllocator};
use slimefield_ecs::DepotError;
use tracing::debug;

use crate::attach::{Attach, AttachPoint};
use crate::behavior;
use crate::behavior::slime::combined_scale;
use crate::body::Body3D;
use crate::clock::Clock;
use crate::combat::{Combat, LootTableId};
use crate::command::CommandError;
use crate::config::{ConfigError, SimConfig};
use crate::depot::FacetDepot;
use crate::entity::{ActionState, Entity, EntityType};
use crate::inventory::SlotId;
use crate::items::ItemCatalog;
use crate::math::{ground, Vec2, Vec3};
use crate::particles::{EffectId, EffectParams, ParticleFxKind, ParticleSystem, SoundEvent};
use crate::sprite::Sprite;

/// Particles for a single hit.
const BLOOD_HIT_PARTICLES: usize = 32;
const BLOOD_HIT_SECONDS: f32 = 1.0;
/// Particles for a killing blow.
const BLOOD_DEATH_PARTICLES: usize = 128;
const BLOOD_DEATH_SECONDS: f32 = 4.0;

/// Sound cues kept for a host that never drains them; the oldest go first.
pub const MAX_PENDING_SOUNDS: usize = 256;

/// Mixed into the seed of the cosmetic RNG so it never mirrors gameplay rolls.
const FX_SEED_SALT: u64 = 0x5eed_f00d_b100_d5ad;

// ---------------------------------------------------------------------------
// Inputs and events
// ---------------------------------------------------------------------------

/// Controls for one player during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerInput {
    /// Desired walk direction on the ground plane; zero to stand still.
    pub walk: Vec2,
    pub run: bool,
    /// Swing this tick. Cleared after the tick.
    pub attack: bool,
    /// Hotbar slot to select. Cleared after the tick.
    pub select_slot: Option<SlotId>,
}

/// Something gameplay-relevant that happened during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Damaged {
        victim: EntityId,
        attacker: EntityId,
        amount: f32,
    },
    Died {
        victim: EntityId,
        killer: EntityId,
    },
    LevelUp {
        entity: EntityId,
        level: u8,
    },
    /// A dead entity's loot table should be rolled at `position`.
    LootDropped {
        entity: EntityId,
        loot_table: LootTableId,
        position: Vec3,
    },
    Combined {
        survivor: EntityId,
        absorbed: EntityId,
    },
    Despawned {
        entity: EntityId,
        entity_type: EntityType,
    },
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct World {
    pub config: SimConfig,
    pub clock: Clock,
    pub depot: FacetDepot,
    pub ids: EntityIdAllocator,
    pub catalog: ItemCatalog,
    pub particles: ParticleSystem,
    /// Gameplay randomness. Part of the snapshot state.
    pub rng: Pcg32,
    /// Cosmetic randomness for particles. Not snapshotted.
    pub fx_rng: Pcg32,
    /// Sound cues raised by particle effects since the host last drained them,
    /// oldest first, at most [`MAX_PENDING_SOUNDS`].
    pub sounds: Vec<SoundEvent>,
    inputs: BTreeMap<EntityId, PlayerInput>,
    events: Vec<WorldEvent>,
}

impl World {
    /// Create an empty world with the builtin item catalog.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        Self::with_catalog(config, ItemCatalog::builtin())
    }

    pub fn with_catalog(config: SimConfig, catalog: ItemCatalog) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            clock: Clock::new(config.server),
            depot: FacetDepot::new(),
            ids: EntityIdAllocator::new(),
            catalog,
            particles: ParticleSystem::new(),
            rng: Pcg32::seed_from_u64(config.seed),
            fx_rng: Pcg32::seed_from_u64(config.seed ^ FX_SEED_SALT),
            sounds: Vec::new(),
            inputs: BTreeMap::new(),
            events: Vec::new(),
            config,
        })
    }

    // -- entities -----------------------------------------------------------

    /// Spawn an entity of `entity_type` standing at `position`.
    ///
    /// On failure every facet allocated so far is released and the id is
    /// returned to the allocator.
    pub fn spawn(&mut self, entity_type: EntityType, position: Vec3) -> Result<EntityId, DepotError> {
        let id = self.ids.allocate();
        let result = match self.depot.entity_alloc(id, entity_type) {
            Ok(_) => behavior::init(&mut self.depot, id, entity_type, &self.config),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.depot.entity_free(id);
            self.ids.deallocate(id);
            return Err(e);
        }

        if let Some(body) = self.depot.find_mut::<Body3D>(id) {
            body.teleport(position, self.clock.now);
        }
        debug!(entity = %id, kind = %entity_type, ?position, "spawned");
        Ok(id)
    }

    /// Mark `id` for removal at the end of the tick.
    pub fn despawn(&mut self, id: EntityId) -> Result<(), CommandError> {
        let stamp = self.clock.stamp();
        let entity = self.depot.require_mut::<Entity>(id)?;
        if entity.is_despawned() {
            return Err(CommandError::Despawned(id));
        }
        entity.despawned_at = stamp;
        Ok(())
    }

    /// Free every entity marked for removal. Returns how many were freed.
    pub fn sweep_despawned(&mut self) -> usize {
        let doomed: Vec<(EntityId, EntityType)> = self
            .depot
            .pool::<Entity>()
            .iter()
            .filter(|e| e.is_despawned())
            .map(|e| (e.header.entity_id, e.entity_type()))
            .collect();

        for &(entity, entity_type) in &doomed {
            self.depot.entity_free(entity);
            self.ids.deallocate(entity);
            self.inputs.remove(&entity);
            self.events.push(WorldEvent::Despawned {
                entity,
                entity_type,
            });
            debug!(entity = %entity, kind = %entity_type, "despawned");
        }
        doomed.len()
    }

    /// Spawned, not marked for removal, and not dead.
    pub fn is_active(&self, id: EntityId) -> bool {
        let Some(entity) = self.depot.entity_find(id) else {
            return false;
        };
        !entity.is_despawned()
            && !self.depot.find::<Combat>(id).is_some_and(Combat::is_dead)
    }

    /// The closest living player within `radius` of `from`, with the offset
    /// from `from` to that player. Ties go to the earlier spawn.
    pub fn nearest_player(&self, from: Vec2, radius: f32) -> Option<(EntityId, Vec2)> {
        let mut best: Option<(EntityId, Vec2, f32)> = None;
        for &id in self.depot.entity_ids(EntityType::Player) {
            if !self.is_active(id) {
                continue;
            }
            let Some(body) = self.depot.find::<Body3D>(id) else {
                continue;
            };
            let offset = body.ground_position() - from;
            let dist_sq = offset.length_squared();
            if dist_sq > radius * radius {
                continue;
            }
            if best.map_or(true, |(_, _, d)| dist_sq < d) {
                best = Some((id, offset, dist_sq));
            }
        }
        best.map(|(id, offset, _)| (id, offset))
    }

    /// World position of an entity's attach point.
    pub fn attach_point(&self, id: EntityId, point: AttachPoint) -> Option<Vec3> {
        attach_point_in(&self.depot, id, point)
    }

    // -- inputs and events --------------------------------------------------

    pub fn set_input(&mut self, player: EntityId, input: PlayerInput) {
        self.inputs.insert(player, input);
    }

    /// Current input for `player`; no input means standing still.
    pub fn input(&self, player: EntityId) -> PlayerInput {
        self.inputs.get(&player).copied().unwrap_or_default()
    }

    /// Reset the one-shot parts of every input (attack, slot selection).
    pub fn clear_one_shot_inputs(&mut self) {
        for input in self.inputs.values_mut() {
            input.attack = false;
            input.select_slot = None;
        }
    }

    /// Events raised since the last call.
    pub fn take_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events raised since the last [`take_events`](Self::take_events).
    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    /// Sound cues raised since the last call, oldest first.
    pub fn take_sounds(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.sounds)
    }

    // -- combat -------------------------------------------------------------

    /// `attacker` hits `victim` for up to `amount`. Returns the damage dealt.
    ///
    /// A hit that lands sprays blood from the victim's gut; a killing blow
    /// sprays a lot more and hands the victim's XP to the attacker.
    pub fn deal_damage(
        &mut self,
        attacker: EntityId,
        victim: EntityId,
        amount: f32,
    ) -> Result<f32, CommandError> {
        let now = self.clock.now;
        let combat = self.depot.require_mut::<Combat>(victim)?;
        let dealt = combat.take_damage(amount, now);
        if dealt <= 0.0 {
            return Ok(0.0);
        }
        let died = combat.is_dead();
        let bounty = combat.xp;

        self.events.push(WorldEvent::Damaged {
            victim,
            attacker,
            amount: dealt,
        });
        self.spawn_effect_following(
            ParticleFxKind::Blood,
            victim,
            AttachPoint::Gut,
            &EffectParams::burst(BLOOD_HIT_PARTICLES, BLOOD_HIT_SECONDS),
        );

        if died {
            debug!(victim = %victim, killer = %attacker, "killed");
            self.events.push(WorldEvent::Died {
                victim,
                killer: attacker,
            });
            if let Some(origin) = self.attach_point(victim, AttachPoint::Gut) {
                self.spawn_effect(
                    ParticleFxKind::Blood,
                    origin,
                    &EffectParams::burst(BLOOD_DEATH_PARTICLES, BLOOD_DEATH_SECONDS),
                );
            }
            if attacker != victim {
                if let Some(killer) = self.depot.find_mut::<Combat>(attacker) {
                    if !killer.is_dead() && killer.grant_xp(bounty) > 0 {
                        let level = killer.level;
                        self.events.push(WorldEvent::LevelUp {
                            entity: attacker,
                            level,
                        });
                    }
                }
            }
        }
        Ok(dealt)
    }

    /// Merge two slimes: the bigger one absorbs the smaller, growing by half
    /// the smaller's scale and hit points. The smaller one is despawned.
    ///
    /// Returns `Ok(false)` when either slime is dead or the result would
    /// exceed the configured max scale.
    pub fn combine_slimes(&mut self, a: EntityId, b: EntityId) -> Result<bool, CommandError> {
        if a == b {
            return Err(CommandError::Rejected {
                entity: a,
                reason: "a slime cannot combine with itself",
            });
        }
        for id in [a, b] {
            let entity = self.depot.require::<Entity>(id)?;
            if entity.entity_type() != EntityType::Slime {
                return Err(CommandError::Rejected {
                    entity: id,
                    reason: "only slimes combine",
                });
            }
            if entity.is_despawned() {
                return Err(CommandError::Despawned(id));
            }
        }
        if self.depot.require::<Combat>(a)?.is_dead() || self.depot.require::<Combat>(b)?.is_dead() {
            return Ok(false);
        }

        let (scale_a, scale_b) = (
            self.depot.require::<Sprite>(a)?.scale,
            self.depot.require::<Sprite>(b)?.scale,
        );
        let Some(scale) = combined_scale(scale_a, scale_b, self.config.slime.max_scale) else {
            return Ok(false);
        };
        let (survivor, absorbed) = if scale_b > scale_a { (b, a) } else { (a, b) };

        let (absorbed_hp, absorbed_hp_max) = {
            let c = self.depot.require::<Combat>(absorbed)?;
            (c.hit_points, c.hit_points_max)
        };
        self.depot.require_mut::<Sprite>(survivor)?.scale = scale;
        let combat = self.depot.require_mut::<Combat>(survivor)?;
        combat.hit_points += 0.5 * absorbed_hp;
        combat.hit_points_max += 0.5 * absorbed_hp_max;
        self.despawn(absorbed)?;

        debug!(survivor = %survivor, absorbed = %absorbed, scale, "slimes combined");
        self.events.push(WorldEvent::Combined { survivor, absorbed });
        Ok(true)
    }

    // -- per-tick -----------------------------------------------------------

    /// Advance every live entity by the clock's current `dt`.
    ///
    /// Eases health bars, ends finished attacks, integrates bodies, raises
    /// loot events for fresh corpses (server only), and marks corpses that
    /// have lingered past `corpse_lifetime` for removal.
    pub fn integrate(&mut self) {
        let now = self.clock.now;
        let dt = self.clock.dt;
        let stamp = self.clock.stamp();
        let server = self.clock.server;
        let idle_threshold = self.config.idle_threshold;
        let corpse_lifetime = self.config.corpse_lifetime;

        let pools = self.depot.pools_mut();
        for entity in pools.entity.iter_mut() {
            if entity.is_despawned() {
                continue;
            }
            let id = entity.header.entity_id;

            let body = pools.body.find_mut(id);
            let position = match body {
                Some(body) => {
                    body.integrate(now, dt, idle_threshold);
                    body.position()
                }
                None => Vec3::ZERO,
            };

            let Some(combat) = pools.combat.find_mut(id) else {
                continue;
            };
            combat.update(dt);
            if entity.action_state == ActionState::Attack
                && now - combat.attack_started_at > combat.attack_duration
            {
                entity.action_state = ActionState::None;
                combat.attack_started_at = 0.0;
                combat.attack_duration = 0.0;
            }

            if !combat.is_dead() {
                continue;
            }
            if server && !combat.dropped_death_loot {
                combat.dropped_death_loot = true;
                if combat.loot_table_id != LootTableId::None {
                    self.events.push(WorldEvent::LootDropped {
                        entity: id,
                        loot_table: combat.loot_table_id,
                        position,
                    });
                }
            }
            if entity.entity_type() != EntityType::Player && now - combat.died_at > corpse_lifetime {
                entity.despawned_at = stamp;
            }
        }
    }

    /// Start a particle effect at `origin` using the cosmetic RNG.
    pub fn spawn_effect(
        &mut self,
        kind: ParticleFxKind,
        origin: Vec3,
        params: &EffectParams,
    ) -> Option<EffectId> {
        self.particles
            .create_effect(kind, origin, params, self.clock.now, &mut self.fx_rng)
    }

    /// Start a particle effect whose origin tracks `point` on `entity`.
    pub fn spawn_effect_following(
        &mut self,
        kind: ParticleFxKind,
        entity: EntityId,
        point: AttachPoint,
        params: &EffectParams,
    ) -> Option<EffectId> {
        let origin = self.attach_point(entity, point)?;
        let id = self.spawn_effect(kind, origin, params)?;
        if let Some(effect) = self.particles.effect_mut(id) {
            effect.follow = Some((entity, point));
        }
        Some(id)
    }

    /// Advance particles, moving following effects with their entity first.
    pub fn update_particles(&mut self) {
        let depot = &self.depot;
        self.particles.update(
            self.clock.now,
            self.clock.dt,
            &mut self.fx_rng,
            &mut self.sounds,
            |effect| {
                if let Some((entity, point)) = effect.follow {
                    match attach_point_in(depot, entity, point) {
                        Some(origin) => effect.origin = origin,
                        None => effect.follow = None,
                    }
                }
            },
        );
        if self.sounds.len() > MAX_PENDING_SOUNDS {
            let dropped = self.sounds.len() - MAX_PENDING_SOUNDS;
            self.sounds.drain(..dropped);
            debug!(dropped, "undrained sound cues discarded");
        }
    }
}

/// Body position plus the attach offset. Without an `Attach` facet the gut
/// is the sprite center and the head the sprite top.
fn attach_point_in(depot: &FacetDepot, id: EntityId, point: AttachPoint) -> Option<Vec3> {
    let base = depot.find::<Body3D>(id)?.position();
    if let Some(attach) = depot.find::<Attach>(id) {
        return Some(base + attach.offset(point));
    }
    let offset = match (depot.find::<Sprite>(id), point) {
        (Some(sprite), AttachPoint::Head) => sprite.top_center(),
        (Some(sprite), _) => sprite.center(),
        (None, _) => Vec3::ZERO,
    };
    Some(base + offset)
}

/// Midpoint of every live entity on the ground plane, or `None` when empty.
pub fn world_center(depot: &FacetDepot) -> Option<Vec2> {
    let pool = depot.pool::<Body3D>();
    if pool.is_empty() {
        return None;
    }
    let sum: Vec2 = pool.iter().map(|b| ground(b.position())).sum();
    Some(sum / pool.len() as f32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::meters;

    fn world() -> World {
        World::new(SimConfig::default()).unwrap()
    }

    fn step(world: &mut World) {
        world.clock.advance(1.0 / 60.0, 0.1);
        world.integrate();
        world.sweep_despawned();
        world.update_particles();
    }

    #[test]
    fn undrained_sounds_stay_bounded() {
        use crate::particles::SoundCue;

        let mut world = world();
        for i in 0..MAX_PENDING_SOUNDS + 40 {
            world.sounds.push(SoundEvent {
                cue: SoundCue::GemBounce,
                pitch: i as f32,
            });
        }
        for _ in 0..3 {
            step(&mut world);
        }

        let sounds = world.take_sounds();
        assert_eq!(sounds.len(), MAX_PENDING_SOUNDS);
        assert_eq!(sounds[0].pitch, 40.0);
        assert_eq!(sounds[MAX_PENDING_SOUNDS - 1].pitch, (MAX_PENDING_SOUNDS + 39) as f32);
        assert!(world.take_sounds().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimConfig {
            fixed_dt: -1.0,
            ..SimConfig::default()
        };
        assert!(matches!(World::new(config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn spawn_allocates_type_facets() {
        let mut world = world();
        let p = world.spawn(EntityType::Player, Vec3::new(5.0, 6.0, 0.0)).unwrap();
        let s = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();

        assert_eq!(world.depot.require::<Entity>(p).unwrap().name(), "Player");
        assert!(world.depot.find::<crate::inventory::Inventory>(p).is_some());
        assert!(world.depot.find::<crate::inventory::Inventory>(s).is_none());
        assert_eq!(
            world.depot.require::<Body3D>(p).unwrap().position(),
            Vec3::new(5.0, 6.0, 0.0)
        );
        assert_eq!(world.depot.entity_ids(EntityType::Slime), &[s]);
        assert!(world.depot.is_consistent());
    }

    #[test]
    fn despawn_is_deferred_until_sweep() {
        let mut world = world();
        let s = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();
        world.despawn(s).unwrap();
        assert!(matches!(world.despawn(s), Err(CommandError::Despawned(_))));
        assert!(world.depot.entity_find(s).is_some());

        assert_eq!(world.sweep_despawned(), 1);
        assert!(world.depot.entity_find(s).is_none());
        assert!(!world.ids.is_alive(s));
        assert_eq!(
            world.take_events(),
            vec![WorldEvent::Despawned {
                entity: s,
                entity_type: EntityType::Slime
            }]
        );
        assert!(world.depot.is_consistent());
    }

    #[test]
    fn nearest_player_skips_dead_and_distant() {
        let mut world = world();
        let near = world.spawn(EntityType::Player, Vec3::new(10.0, 0.0, 0.0)).unwrap();
        let far = world.spawn(EntityType::Player, Vec3::new(100.0, 0.0, 0.0)).unwrap();

        assert_eq!(
            world.nearest_player(Vec2::ZERO, 1000.0),
            Some((near, Vec2::new(10.0, 0.0)))
        );
        assert_eq!(world.nearest_player(Vec2::ZERO, 5.0), None);

        world.depot.require_mut::<Combat>(near).unwrap().take_damage(1e6, 1.0);
        assert_eq!(world.nearest_player(Vec2::ZERO, 1000.0).map(|(id, _)| id), Some(far));
    }

    #[test]
    fn killing_blow_grants_xp_and_bleeds() {
        let mut world = world();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
        let s = world.spawn(EntityType::Slime, Vec3::new(meters(1.0), 0.0, 0.0)).unwrap();
        world.clock.advance(0.5, 1.0);

        assert_eq!(world.deal_damage(p, s, 4.0).unwrap(), 4.0);
        assert_eq!(world.particles.effects_active(), 1);
        assert_eq!(world.deal_damage(p, s, 100.0).unwrap(), 6.0);
        assert_eq!(world.particles.effects_active(), 3);
        // Already dead: nothing more to deal.
        assert_eq!(world.deal_damage(p, s, 100.0).unwrap(), 0.0);

        let events = world.take_events();
        assert!(events.contains(&WorldEvent::Died { victim: s, killer: p }));
        assert_eq!(world.depot.require::<Combat>(p).unwrap().xp, 3);
        assert_eq!(world.depot.require::<Combat>(s).unwrap().died_at, 0.5);
    }

    #[test]
    fn corpses_drop_loot_once_then_despawn() {
        let mut world = world();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
        let s = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();
        world.clock.advance(0.1, 1.0);
        world.deal_damage(s, p, 1e6).unwrap();
        world.deal_damage(p, s, 100.0).unwrap();
        world.take_events();

        step(&mut world);
        step(&mut world);
        let loot: Vec<_> = world
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, WorldEvent::LootDropped { .. }))
            .collect();
        // Players have no loot table.
        assert_eq!(loot.len(), 1);

        let ticks = (world.config.corpse_lifetime * 60.0) as usize + 2;
        for _ in 0..ticks {
            step(&mut world);
        }
        assert!(world.depot.entity_find(s).is_none());
        // Dead players stay around.
        assert!(world.depot.entity_find(p).is_some());
    }

    #[test]
    fn clients_do_not_roll_loot() {
        let config = SimConfig {
            server: false,
            ..SimConfig::default()
        };
        let mut world = World::new(config).unwrap();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
        let s = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();
        world.deal_damage(p, s, 100.0).unwrap();
        step(&mut world);
        assert!(!world
            .take_events()
            .iter()
            .any(|e| matches!(e, WorldEvent::LootDropped { .. })));
    }

    #[test]
    fn combine_bigger_absorbs_smaller() {
        let mut world = world();
        let a = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();
        let b = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();
        world.depot.require_mut::<Sprite>(b).unwrap().scale = 2.0;

        assert!(world.combine_slimes(a, b).unwrap());
        assert_eq!(world.depot.require::<Sprite>(b).unwrap().scale, 2.5);
        let combat = world.depot.require::<Combat>(b).unwrap();
        assert_eq!(combat.hit_points, 15.0);
        assert_eq!(combat.hit_points_max, 15.0);
        assert!(world.depot.require::<Entity>(a).unwrap().is_despawned());

        // Would exceed the max scale.
        let c = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();
        world.depot.require_mut::<Sprite>(c).unwrap().scale = 1.5;
        assert!(!world.combine_slimes(b, c).unwrap());
    }

    #[test]
    fn only_slimes_combine() {
        let mut world = world();
        let a = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
        assert!(world.combine_slimes(a, p).is_err());
        assert!(world.combine_slimes(a, a).is_err());
    }

    #[test]
    fn blood_follows_its_victim() {
        let mut world = world();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
        let s = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();
        world.deal_damage(s, p, 1.0).unwrap();
        let (id, _) = world.particles.effects().next().unwrap();

        world
            .depot
            .require_mut::<Body3D>(p)
            .unwrap()
            .teleport(Vec3::new(100.0, 0.0, 0.0), 0.0);
        step(&mut world);

        let origin = world.particles.effect(id).unwrap().origin;
        assert_eq!(origin, world.attach_point(p, AttachPoint::Gut).unwrap());
        assert_eq!(origin.x, 100.0);
    }

    #[test]
    fn world_center_averages_bodies() {
        let mut world = world();
        assert_eq!(world_center(&world.depot), None);
        world.spawn(EntityType::Townfolk, Vec3::new(0.0, 0.0, 0.0)).unwrap();
        world.spawn(EntityType::Townfolk, Vec3::new(10.0, 20.0, 0.0)).unwrap();
        assert_eq!(world_center(&world.depot), Some(Vec2::new(5.0, 10.0)));
    }

    #[test]
    fn worlds_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<World>();
    }
}
