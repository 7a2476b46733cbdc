//! `Entity` facet: identity, behavior kind, and per-kind state.

use std::fmt;

use serde::{Deserialize, Serialize};
use slimefield_ecs::facet::{FacetHeader, FacetType};
use slimefield_ecs::DepotError;

/// Longest entity name, in bytes.
pub const ENTITY_NAME_LENGTH_MAX: usize = 64;

/// Selects which behavior system drives an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityType {
    #[default]
    Player = 0,
    Slime = 1,
    Townfolk = 2,
}

impl EntityType {
    pub const COUNT: usize = 3;
    pub const ALL: [EntityType; Self::COUNT] =
        [EntityType::Player, EntityType::Slime, EntityType::Townfolk];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityType::Player => "player",
            EntityType::Slime => "slime",
            EntityType::Townfolk => "townfolk",
        })
    }
}

impl TryFrom<u8> for EntityType {
    type Error = DepotError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        EntityType::ALL
            .get(tag as usize)
            .copied()
            .ok_or(DepotError::UnknownType { tag })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveState {
    #[default]
    Idle,
    Walk,
    Run,
    Jump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionState {
    #[default]
    None,
    Attack,
    Recover,
}

/// Behavior state that only makes sense for one [`EntityType`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntityState {
    Player,
    Slime {
        /// Seconds the slime waits on the ground before its next hop.
        rand_jump_idle: f64,
    },
    Townfolk,
}

impl EntityState {
    /// Fresh state for a newly spawned entity of `entity_type`.
    pub fn for_type(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Player => EntityState::Player,
            EntityType::Slime => EntityState::Slime {
                rand_jump_idle: 0.0,
            },
            EntityType::Townfolk => EntityState::Townfolk,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityState::Player => EntityType::Player,
            EntityState::Slime { .. } => EntityType::Slime,
            EntityState::Townfolk => EntityType::Townfolk,
        }
    }
}

impl Default for EntityState {
    fn default() -> Self {
        EntityState::Player
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    pub header: FacetHeader,
    name: String,
    pub move_state: MoveState,
    pub action_state: ActionState,
    /// Time the entity was marked for removal; `0.0` while active.
    pub despawned_at: f64,
    /// Per-type state. Its variant is the entity's type.
    pub state: EntityState,
}

crate::impl_facet!(Entity, FacetType::Entity);

impl Entity {
    #[inline]
    pub fn entity_type(&self) -> EntityType {
        self.state.entity_type()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the name, truncated to [`ENTITY_NAME_LENGTH_MAX`] bytes on a char
    /// boundary.
    pub fn set_name(&mut self, name: &str) {
        let mut end = name.len().min(ENTITY_NAME_LENGTH_MAX);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        self.name.clear();
        self.name.push_str(&name[..end]);
    }

    #[inline]
    pub fn is_despawned(&self) -> bool {
        self.despawned_at != 0.0
    }
}
