//! Slimes: hop toward the nearest player, bite on landing, and merge with
//! each other.

use slimefield_ecs::entity::EntityId;
use slimefield_ecs::DepotError;
use tracing::debug;

use crate::body::Body3D;
use crate::combat::{Combat, LootTableId};
use crate::command::CommandBuffer;
use crate::config::SimConfig;
use crate::depot::FacetDepot;
use crate::entity::{Entity, EntityState, EntityType, MoveState};
use crate::math::{meters, Vec2, Vec3};
use crate::sprite::Sprite;
use crate::world::World;

/// Unscaled sprite height of a slime, in pixels.
const SLIME_HEIGHT: f32 = 32.0;

pub fn init(depot: &mut FacetDepot, id: EntityId, config: &SimConfig) -> Result<(), DepotError> {
    let cfg = &config.slime;
    depot.require_mut::<Entity>(id)?.set_name("Slime");

    let body = depot.alloc::<Body3D>(id)?;
    body.speed = cfg.move_speed;
    body.drag = 0.01;
    body.friction = 0.95;
    body.restitution = 0.5;

    let combat = depot.alloc::<Combat>(id)?;
    combat.level = 1;
    combat.set_hit_points(cfg.hit_points);
    combat.melee_damage = cfg.melee_damage;
    combat.xp = cfg.xp;
    combat.loot_table_id = LootTableId::Slime;

    let sprite = depot.alloc::<Sprite>(id)?;
    sprite.scale = 1.0;
    sprite.height = SLIME_HEIGHT;
    Ok(())
}

/// Scale after the bigger of two slimes absorbs the smaller, if it fits.
pub fn combined_scale(a: f32, b: f32, max_scale: f32) -> Option<f32> {
    let scale = a.max(b) + 0.5 * a.min(b);
    (scale <= max_scale).then_some(scale)
}

pub fn system(world: &World, cmds: &mut CommandBuffer) {
    let cfg = &world.config.slime;
    let slimes = world.depot.entity_ids(EntityType::Slime);

    for &id in slimes {
        if !world.is_active(id) {
            continue;
        }
        let (Some(entity), Some(body), Some(combat), Some(sprite)) = (
            world.depot.entity_find(id),
            world.depot.find::<Body3D>(id),
            world.depot.find::<Combat>(id),
            world.depot.find::<Sprite>(id),
        ) else {
            continue;
        };

        let Some((player, to_player)) = world.nearest_player(body.ground_position(), cfg.despawn_radius)
        else {
            debug!(entity = %id, "no players nearby, despawning slime");
            cmds.despawn(id);
            continue;
        };

        let dist = to_player.length();
        if dist <= cfg.attack_track {
            let step_len = dist.min(meters(body.speed) * sprite.scale);
            let step = to_player.normalize_or_zero() * step_len;
            let here = body.position();
            let there = here + Vec3::new(step.x, step.y, 0.0);
            let radius_sq = (cfg.radius * sprite.scale).powi(2);

            // Each pair is looked at once, from its lower id.
            let mut blocked = false;
            for &other in slimes {
                if other <= id || !world.is_active(other) {
                    continue;
                }
                let (Some(other_body), Some(other_sprite)) =
                    (world.depot.find::<Body3D>(other), world.depot.find::<Sprite>(other))
                else {
                    continue;
                };
                let other_pos = other_body.position();
                if here.distance_squared(other_pos) < radius_sq
                    && combined_scale(sprite.scale, other_sprite.scale, cfg.max_scale).is_some()
                {
                    cmds.combine(id, other);
                }
                if there.distance_squared(other_pos) < radius_sq {
                    blocked = true;
                }
            }

            if !blocked {
                step_toward(world, id, entity, body, step, cmds);
            }
        }

        if dist <= cfg.attack_reach && !world.config.peaceful && body.landed() {
            cmds.start_attack(id, 0.0);
            cmds.deal_damage(player, id, combat.melee_damage * sprite.scale);
        }
    }
}

/// Hop along `step` once the slime has sat still long enough.
fn step_toward(
    world: &World,
    id: EntityId,
    entity: &Entity,
    body: &Body3D,
    step: Vec2,
    cmds: &mut CommandBuffer,
) {
    if !body.on_ground() {
        return;
    }
    if entity.move_state != MoveState::Idle {
        cmds.set_move_state(id, MoveState::Idle);
    }
    if step == Vec2::ZERO {
        return;
    }
    let idle_for = match entity.state {
        EntityState::Slime { rand_jump_idle } => rand_jump_idle,
        _ => 0.0,
    };
    if body.time_since_last_move(world.clock.now) > idle_for {
        cmds.hop(id, Vec3::new(step.x, step.y, meters(world.config.slime.jump_speed)));
    }
}
