//! Townfolk: invulnerable villagers that watch passing players.

use slimefield_ecs::entity::EntityId;
use slimefield_ecs::DepotError;

use crate::body::Body3D;
use crate::combat::{Combat, CombatFlags};
use crate::command::CommandBuffer;
use crate::config::SimConfig;
use crate::depot::FacetDepot;
use crate::entity::{Entity, EntityType};
use crate::sprite::{Direction, Sprite};
use crate::world::World;

pub fn init(depot: &mut FacetDepot, id: EntityId, _config: &SimConfig) -> Result<(), DepotError> {
    depot.require_mut::<Entity>(id)?.set_name("Townfolk");
    depot.alloc::<Body3D>(id)?;

    let combat = depot.alloc::<Combat>(id)?;
    combat.flags.insert(CombatFlags::TOO_BIG_TO_FAIL);
    combat.set_hit_points(1.0);

    let sprite = depot.alloc::<Sprite>(id)?;
    sprite.scale = 1.0;
    sprite.height = 48.0;
    Ok(())
}

/// Face the nearest player within the notice radius.
pub fn system(world: &World, cmds: &mut CommandBuffer) {
    for &id in world.depot.entity_ids(EntityType::Townfolk) {
        if !world.is_active(id) {
            continue;
        }
        let (Some(body), Some(sprite)) =
            (world.depot.find::<Body3D>(id), world.depot.find::<Sprite>(id))
        else {
            continue;
        };
        let nearest =
            world.nearest_player(body.ground_position(), world.config.townfolk_notice_radius);
        if let Some((_, to_player)) = nearest {
            if Direction::from_offset(to_player).is_some_and(|dir| dir != sprite.direction) {
                cmds.set_direction(id, to_player);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{meters, Vec3};

    #[test]
    fn townfolk_cannot_be_hurt() {
        let mut world = World::new(SimConfig::default()).unwrap();
        let t = world.spawn(EntityType::Townfolk, Vec3::ZERO).unwrap();
        let combat = world.depot.require_mut::<Combat>(t).unwrap();
        assert_eq!(combat.take_damage(50.0, 1.0), 0.0);
        assert!(!combat.is_dead());
    }

    #[test]
    fn turns_toward_a_nearby_player_only() {
        let mut world = World::new(SimConfig::default()).unwrap();
        let t = world.spawn(EntityType::Townfolk, Vec3::ZERO).unwrap();
        world.spawn(EntityType::Player, Vec3::new(-meters(2.0), 0.0, 0.0)).unwrap();

        let mut cmds = CommandBuffer::new();
        system(&world, &mut cmds);
        assert_eq!(cmds.len(), 1);
        cmds.apply(&mut world);
        assert_eq!(world.depot.require::<Sprite>(t).unwrap().direction, Direction::West);

        // Already facing that way: nothing to do.
        system(&world, &mut cmds);
        assert!(cmds.is_empty());
    }
}
