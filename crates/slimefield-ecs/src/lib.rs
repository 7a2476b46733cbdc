//! Slimefield ECS -- dense per-type facet pools keyed by entity id.
//!
//! This crate provides the storage primitives for the Slimefield simulation.
//! Every entity is a bare [`EntityId`](entity::EntityId); its data lives in
//! typed facet records, one [`FacetPool`](pool::FacetPool) per facet kind.
//! Pools are dense vectors with swap-remove deletion and an id -> slot index,
//! so per-tick iteration stays linear and lookups stay O(1).
//!
//! # Quick Start
//!
//! ```
//! use slimefield_ecs::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Marker {
//!     header: FacetHeader,
//!     hits: u32,
//! }
//!
//! impl Facet for Marker {
//!     const TYPE: FacetType = FacetType::Sprite;
//!     fn header(&self) -> &FacetHeader { &self.header }
//!     fn header_mut(&mut self) -> &mut FacetHeader { &mut self.header }
//! }
//!
//! let mut ids = EntityIdAllocator::new();
//! let mut pool = FacetPool::<Marker>::new();
//!
//! let e = ids.allocate();
//! pool.alloc(e).unwrap().hits = 3;
//!
//! assert_eq!(pool.find(e).map(|m| m.hits), Some(3));
//! assert!(pool.alloc(e).is_err());
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod facet;
pub mod pool;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by facet storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DepotError {
    /// The entity already owns a facet of this type.
    #[error("entity {entity} already has a {facet_type} facet")]
    Duplicate {
        entity: entity::EntityId,
        facet_type: facet::FacetType,
    },

    /// A facet or entity type tag outside the known range.
    #[error("unknown type tag {tag}")]
    UnknownType { tag: u8 },

    /// A facet the caller required is not present.
    #[error("entity {entity} has no {facet_type} facet")]
    MissingFacet {
        entity: entity::EntityId,
        facet_type: facet::FacetType,
    },

    /// The reserved id `0` cannot own facets.
    #[error("reserved entity id cannot own a {facet_type} facet")]
    ReservedId { facet_type: facet::FacetType },

    /// Serialized id allocator state that could never have been produced.
    #[error("corrupt entity id allocator: {reason}")]
    CorruptAllocator { reason: &'static str },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{EntityId, EntityIdAllocator};
    pub use crate::facet::{Facet, FacetHeader, FacetType};
    pub use crate::pool::FacetPool;
    pub use crate::DepotError;
}
