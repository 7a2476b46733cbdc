//! Dense per-type facet storage.
//!
//! A [`FacetPool`] keeps every live record of one facet type packed in a
//! single `Vec`, with an `EntityId -> slot` index on the side. Slot `0` holds
//! a sentinel default record so that real records start at index 1 and a slot
//! value of `0` can mean "absent", mirroring the reserved entity id.
//!
//! Removal swaps the last record into the freed slot and pops. The index
//! entry of the record that moved is rewritten in the same call, so lookups
//! for every other live facet stay correct after any free.
//!
//! References handed out by the pool borrow it, so the borrow checker already
//! forbids holding one across an `alloc` or `free` on the same pool.

use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entity::EntityId;
use crate::facet::{Facet, FacetHeader};
use crate::DepotError;

/// Dense swap-remove storage for one facet type.
#[derive(Debug, Clone)]
pub struct FacetPool<T> {
    /// `records[0]` is the sentinel; live records occupy `1..`.
    records: Vec<T>,
    /// Owner id -> slot in `records` (never 0 for a present entry).
    slot_by_entity: HashMap<EntityId, usize>,
}

impl<T: Facet> FacetPool<T> {
    /// Create an empty pool holding only the sentinel record.
    pub fn new() -> Self {
        Self {
            records: vec![T::default()],
            slot_by_entity: HashMap::new(),
        }
    }

    /// Allocate a zero-initialized facet for `entity_id`.
    ///
    /// Fails with [`DepotError::Duplicate`] if the entity already owns a facet
    /// of this type (the existing facet is left untouched), and with
    /// [`DepotError::ReservedId`] for [`EntityId::NONE`].
    pub fn alloc(&mut self, entity_id: EntityId) -> Result<&mut T, DepotError> {
        if entity_id.is_none() {
            return Err(DepotError::ReservedId {
                facet_type: T::TYPE,
            });
        }
        if self.slot_by_entity.contains_key(&entity_id) {
            return Err(DepotError::Duplicate {
                entity: entity_id,
                facet_type: T::TYPE,
            });
        }

        let slot = self.records.len();
        let mut record = T::default();
        *record.header_mut() = FacetHeader {
            entity_id,
            facet_type: T::TYPE,
        };
        self.records.push(record);
        self.slot_by_entity.insert(entity_id, slot);
        Ok(&mut self.records[slot])
    }

    /// Look up the facet owned by `entity_id`.
    #[inline]
    pub fn find(&self, entity_id: EntityId) -> Option<&T> {
        let slot = *self.slot_by_entity.get(&entity_id)?;
        self.records.get(slot)
    }

    /// Mutable lookup of the facet owned by `entity_id`.
    #[inline]
    pub fn find_mut(&mut self, entity_id: EntityId) -> Option<&mut T> {
        let slot = *self.slot_by_entity.get(&entity_id)?;
        self.records.get_mut(slot)
    }

    /// Remove the facet owned by `entity_id`, returning it.
    ///
    /// No-op (returns `None`) if the entity has no facet of this type.
    pub fn free(&mut self, entity_id: EntityId) -> Option<T> {
        let slot = self.slot_by_entity.remove(&entity_id)?;
        let removed = self.records.swap_remove(slot);
        if let Some(moved) = self.records.get(slot) {
            let moved_id = moved.entity_id();
            self.slot_by_entity.insert(moved_id, slot);
            tracing::trace!(
                facet = %T::TYPE,
                freed = %entity_id,
                moved = %moved_id,
                slot,
                "facet freed, last record moved into slot"
            );
        }
        Some(removed)
    }

    /// Whether `entity_id` owns a facet of this type.
    #[inline]
    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.slot_by_entity.contains_key(&entity_id)
    }

    /// Slot index of the entity's facet (1-based; `None` if absent).
    #[inline]
    pub fn slot_of(&self, entity_id: EntityId) -> Option<usize> {
        self.slot_by_entity.get(&entity_id).copied()
    }

    /// Number of live facets (the sentinel is not counted).
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live facets in slot order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records[1..].iter()
    }

    /// Live facets in slot order, mutably.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.records[1..].iter_mut()
    }

    /// Owners of the live facets, in slot order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.iter().map(|f| f.entity_id()).collect()
    }

    /// Verify the index/record agreement. Used by tests and debug assertions.
    ///
    /// Holds iff every index entry points at a record owned by that entity
    /// with the right tag, and every live record is indexed.
    pub fn is_consistent(&self) -> bool {
        if self.slot_by_entity.len() != self.len() {
            return false;
        }
        self.slot_by_entity.iter().all(|(&id, &slot)| {
            slot != 0
                && self
                    .records
                    .get(slot)
                    .map(|r| r.header().entity_id == id && r.header().facet_type == T::TYPE)
                    .unwrap_or(false)
        })
    }

    /// Rebuild a pool from live records (e.g. after deserializing).
    pub fn from_records(records: Vec<T>) -> Result<Self, DepotError> {
        let mut pool = Self::new();
        for record in records {
            let id = record.entity_id();
            if id.is_none() {
                return Err(DepotError::ReservedId {
                    facet_type: T::TYPE,
                });
            }
            if pool.slot_by_entity.contains_key(&id) {
                return Err(DepotError::Duplicate {
                    entity: id,
                    facet_type: T::TYPE,
                });
            }
            let slot = pool.records.len();
            pool.records.push(record);
            if let Some(r) = pool.records.last_mut() {
                r.header_mut().facet_type = T::TYPE;
            }
            pool.slot_by_entity.insert(id, slot);
        }
        Ok(pool)
    }
}

impl<T: Facet> Default for FacetPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Only the live records are serialized, in slot order, so the encoding is
// independent of hash map iteration order.
impl<T: Facet + Serialize> Serialize for FacetPool<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Facet + Deserialize<'de>> Deserialize<'de> for FacetPool<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<T>::deserialize(deserializer)?;
        FacetPool::from_records(records).map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
