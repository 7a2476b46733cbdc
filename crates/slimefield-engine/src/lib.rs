//! Slimefield Engine -- deterministic simulation core for a small action RPG.
//!
//! This crate builds on [`slimefield_ecs`] to provide the game simulation:
//! concrete facets (body, combat, inventory, ...), a [`FacetDepot`](depot::FacetDepot)
//! that owns one pool per facet, per-entity-type behaviors, a deferred
//! [`CommandBuffer`](command::CommandBuffer), a fixed-capacity particle engine,
//! and a fixed-timestep [`TickLoop`](tick::TickLoop) that ties them together.
//!
//! # Quick Start
//!
//! ```
//! use slimefield_engine::prelude::*;
//!
//! let mut world = World::new(SimConfig::default()).unwrap();
//! let player = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
//! world.spawn(EntityType::Slime, Vec3::new(200.0, 0.0, 0.0)).unwrap();
//!
//! let mut tick_loop = TickLoop::new(world);
//! tick_loop.add_behaviors();
//! tick_loop.run_ticks(120);
//!
//! assert_eq!(tick_loop.tick_count(), 120);
//! assert!(tick_loop.world().depot.entity_find(player).is_some());
//! ```

#![deny(unsafe_code)]

pub mod attach;
pub mod behavior;
pub mod body;
pub mod clock;
pub mod combat;
pub mod command;
pub mod config;
pub mod depot;
pub mod entity;
pub mod inventory;
pub mod items;
pub mod math;
pub mod particles;
pub mod snapshot;
pub mod sprite;
pub mod tick;
pub mod world;

// ---------------------------------------------------------------------------
// Facet glue
// ---------------------------------------------------------------------------

/// Implement [`Facet`](slimefield_ecs::facet::Facet) for a struct with a
/// `header: FacetHeader` field.
macro_rules! impl_facet {
    ($ty:ty, $tag:expr) => {
        impl slimefield_ecs::facet::Facet for $ty {
            const TYPE: slimefield_ecs::facet::FacetType = $tag;

            #[inline]
            fn header(&self) -> &slimefield_ecs::facet::FacetHeader {
                &self.header
            }

            #[inline]
            fn header_mut(&mut self) -> &mut slimefield_ecs::facet::FacetHeader {
                &mut self.header
            }
        }
    };
}
pub(crate) use impl_facet;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Install a fmt subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use slimefield_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use slimefield_ecs::prelude::*;

    pub use crate::attach::{Attach, AttachPoint};
    pub use crate::body::Body3D;
    pub use crate::clock::Clock;
    pub use crate::combat::{Combat, CombatFlags, LootTableId};
    pub use crate::command::{ApplyReport, Command, CommandBuffer, CommandError, CommandKind};
    pub use crate::config::{ConfigError, SimConfig};
    pub use crate::depot::FacetDepot;
    pub use crate::entity::{ActionState, Entity, EntityState, EntityType, MoveState};
    pub use crate::inventory::{Inventory, SlotFilter, SlotId};
    pub use crate::items::{ItemCatalog, ItemId, ItemStack};
    pub use crate::math::{meters, Rgba, Vec2, Vec3};
    pub use crate::particles::{EffectParams, ParticleFxKind, ParticleSystem, SoundSink};
    pub use crate::snapshot::{SnapshotError, WorldSnapshot};
    pub use crate::sprite::{Direction, Sprite};
    pub use crate::tick::{SystemFn, TickDiagnostics, TickLoop};
    pub use crate::world::{PlayerInput, World, WorldEvent};
}
