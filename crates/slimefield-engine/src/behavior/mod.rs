//! Per-entity-type behavior.
//!
//! Each entity type has an `init` that allocates and tunes its facets on
//! spawn, and a tick system that reads the [`World`] and queues commands.
//! Systems never mutate the world directly.

pub mod player;
pub mod slime;
pub mod townfolk;

use slimefield_ecs::entity::EntityId;
use slimefield_ecs::DepotError;

use crate::config::SimConfig;
use crate::depot::FacetDepot;
use crate::entity::EntityType;
use crate::tick::SystemFn;

/// Behavior systems in the order the tick loop runs them.
pub const SYSTEMS: [(&str, SystemFn); 3] = [
    ("player", player::system),
    ("slime", slime::system),
    ("townfolk", townfolk::system),
];

/// Allocate and tune the facets an entity of `entity_type` needs.
///
/// The `Entity` facet must already exist.
pub fn init(
    depot: &mut FacetDepot,
    id: EntityId,
    entity_type: EntityType,
    config: &SimConfig,
) -> Result<(), DepotError> {
    match entity_type {
        EntityType::Player => player::init(depot, id, config),
        EntityType::Slime => slime::init(depot, id, config),
        EntityType::Townfolk => townfolk::init(depot, id, config),
    }
}
