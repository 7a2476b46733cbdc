//! Facet type tags and the [`Facet`] trait.
//!
//! A facet is a typed record attached to an entity id. Every facet record
//! carries a [`FacetHeader`] naming its owner and its [`FacetType`]; the
//! header is written by the pool on allocation and never changes afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::DepotError;

// ---------------------------------------------------------------------------
// FacetType
// ---------------------------------------------------------------------------

/// The closed set of facet kinds the depot knows how to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum FacetType {
    #[default]
    Attach = 0,
    Body3D = 1,
    Combat = 2,
    Entity = 3,
    Inventory = 4,
    Sprite = 5,
}

impl FacetType {
    /// Number of facet kinds.
    pub const COUNT: usize = 6;

    /// Every facet kind, in tag order.
    pub const ALL: [FacetType; Self::COUNT] = [
        FacetType::Attach,
        FacetType::Body3D,
        FacetType::Combat,
        FacetType::Entity,
        FacetType::Inventory,
        FacetType::Sprite,
    ];

    /// Dense index usable for per-type tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable human-readable name, used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            FacetType::Attach => "attach",
            FacetType::Body3D => "body3d",
            FacetType::Combat => "combat",
            FacetType::Entity => "entity",
            FacetType::Inventory => "inventory",
            FacetType::Sprite => "sprite",
        }
    }
}

impl fmt::Display for FacetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for FacetType {
    type Error = DepotError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        FacetType::ALL
            .get(tag as usize)
            .copied()
            .ok_or(DepotError::UnknownType { tag })
    }
}

// ---------------------------------------------------------------------------
// FacetHeader
// ---------------------------------------------------------------------------

/// Owner and kind of a facet record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FacetHeader {
    pub entity_id: EntityId,
    pub facet_type: FacetType,
}

// ---------------------------------------------------------------------------
// Facet
// ---------------------------------------------------------------------------

/// A record that can live in a [`FacetPool`](crate::pool::FacetPool).
///
/// `Default` produces the zero-initialized record handed out by a fresh
/// allocation (and used for the pool's sentinel slot).
pub trait Facet: Default {
    /// The tag every record of this type carries.
    const TYPE: FacetType;

    fn header(&self) -> &FacetHeader;

    fn header_mut(&mut self) -> &mut FacetHeader;

    /// The owning entity.
    #[inline]
    fn entity_id(&self) -> EntityId {
        self.header().entity_id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_roundtrip_through_u8() {
        for ty in FacetType::ALL {
            assert_eq!(FacetType::try_from(ty as u8).unwrap(), ty);
            assert_eq!(ty.index(), ty as usize);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = FacetType::try_from(FacetType::COUNT as u8).unwrap_err();
        assert!(matches!(err, DepotError::UnknownType { tag: 6 }));
    }
}
