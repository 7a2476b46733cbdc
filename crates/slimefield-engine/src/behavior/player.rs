//! Player-controlled entities.

use slimefield_ecs::entity::EntityId;
use slimefield_ecs::DepotError;

use crate::attach::{Attach, AttachPoint};
use crate::body::Body3D;
use crate::combat::Combat;
use crate::command::CommandBuffer;
use crate::config::SimConfig;
use crate::depot::FacetDepot;
use crate::entity::{EntityType, MoveState};
use crate::inventory::Inventory;
use crate::math::{meters, Vec2, Vec3};
use crate::sprite::Sprite;
use crate::world::World;

/// Unscaled sprite height of a player, in pixels.
const PLAYER_HEIGHT: f32 = 64.0;

pub fn init(depot: &mut FacetDepot, id: EntityId, config: &SimConfig) -> Result<(), DepotError> {
    depot.require_mut::<crate::entity::Entity>(id)?.set_name("Player");

    let body = depot.alloc::<Body3D>(id)?;
    body.speed = config.player.move_speed;
    body.friction = 0.5;

    let combat = depot.alloc::<Combat>(id)?;
    combat.level = 1;
    combat.set_hit_points(config.player.hit_points);
    combat.melee_damage = config.player.melee_damage;

    depot.alloc::<Inventory>(id)?;

    let attach = depot.alloc::<Attach>(id)?;
    attach.set(AttachPoint::Gut, Vec3::new(0.0, 0.0, PLAYER_HEIGHT * 0.45));
    attach.set(AttachPoint::Head, Vec3::new(0.0, 0.0, PLAYER_HEIGHT * 0.85));
    attach.set(AttachPoint::Hand, Vec3::new(PLAYER_HEIGHT * 0.2, 0.0, PLAYER_HEIGHT * 0.5));

    depot.alloc::<Sprite>(id)?.height = PLAYER_HEIGHT;
    Ok(())
}

/// Turn each player's [`PlayerInput`](crate::world::PlayerInput) into
/// movement, slot selection, and melee attacks.
pub fn system(world: &World, cmds: &mut CommandBuffer) {
    let dt = world.clock.dt as f32;
    for &id in world.depot.entity_ids(EntityType::Player) {
        if !world.is_active(id) {
            continue;
        }
        let Some(entity) = world.depot.entity_find(id) else {
            continue;
        };
        let input = world.input(id);

        if let Some(slot) = input.select_slot {
            cmds.select_slot(id, slot);
        }

        let walk = input.walk.normalize_or_zero();
        let move_state = if walk == Vec2::ZERO {
            MoveState::Idle
        } else if input.run {
            MoveState::Run
        } else {
            MoveState::Walk
        };
        if move_state != entity.move_state {
            cmds.set_move_state(id, move_state);
        }
        if move_state != MoveState::Idle {
            let speed = world.config.player.move_speed + if input.run { 1.0 } else { 0.0 };
            cmds.move_by(id, walk * meters(speed) * dt);
            cmds.set_direction(id, walk);
        }

        if input.attack {
            attack(world, id, cmds);
        }
    }
}

/// Start a swing and hit every living slime within reach.
fn attack(world: &World, id: EntityId, cmds: &mut CommandBuffer) {
    let (Some(combat), Some(body)) = (world.depot.find::<Combat>(id), world.depot.find::<Body3D>(id))
    else {
        return;
    };
    if combat.attacking(world.clock.now) {
        return;
    }
    cmds.start_attack(id, world.config.player.attack_duration);

    let origin = body.ground_position();
    let reach = world.config.player.attack_reach;
    for &slime in world.depot.entity_ids(EntityType::Slime) {
        if !world.is_active(slime) {
            continue;
        }
        let in_reach = world
            .depot
            .find::<Body3D>(slime)
            .is_some_and(|b| b.ground_position().distance(origin) <= reach);
        if in_reach {
            cmds.deal_damage(slime, id, combat.melee_damage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use crate::world::PlayerInput;

    #[test]
    fn walking_queues_move_and_facing() {
        let mut world = World::new(SimConfig::default()).unwrap();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
        world.clock.advance(0.1, 1.0);
        world.set_input(
            p,
            PlayerInput {
                walk: Vec2::new(3.0, 0.0),
                ..PlayerInput::default()
            },
        );

        let mut cmds = CommandBuffer::new();
        system(&world, &mut cmds);

        let kinds: Vec<_> = cmds.commands().iter().map(|c| c.kind.clone()).collect();
        assert!(kinds.contains(&CommandKind::SetMoveState(MoveState::Walk)));
        // 4 m/s for 0.1 s
        assert!(kinds.contains(&CommandKind::MoveBy(Vec2::new(meters(0.4), 0.0))));
        assert!(kinds.contains(&CommandKind::SetDirection(Vec2::X)));
    }

    #[test]
    fn attack_hits_only_slimes_in_reach() {
        let mut world = World::new(SimConfig::default()).unwrap();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
        let near = world.spawn(EntityType::Slime, Vec3::new(meters(1.0), 0.0, 0.0)).unwrap();
        let far = world.spawn(EntityType::Slime, Vec3::new(meters(5.0), 0.0, 0.0)).unwrap();
        world.set_input(
            p,
            PlayerInput {
                attack: true,
                ..PlayerInput::default()
            },
        );

        let mut cmds = CommandBuffer::new();
        system(&world, &mut cmds);

        let victims: Vec<_> = cmds
            .commands()
            .iter()
            .filter(|c| matches!(c.kind, CommandKind::DealDamage { .. }))
            .map(|c| c.target)
            .collect();
        assert_eq!(victims, vec![near]);
        assert!(!victims.contains(&far));
    }
}
