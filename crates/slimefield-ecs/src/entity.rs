//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is an opaque 32-bit integer. The value `0` is reserved to
//! mean "no entity" (and doubles as the empty-slot marker in facet pools), so
//! the allocator never hands it out. Freed ids are recycled, but only after
//! they have actually been freed.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::DepotError;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Identifies one game actor for the lifetime of that actor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// The reserved "no entity" id.
    pub const NONE: EntityId = EntityId(0);

    /// Wrap a raw id. Passing `0` yields [`EntityId::NONE`].
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw `u32` representation.
    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// `true` for the reserved id `0`.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityIdAllocator
// ---------------------------------------------------------------------------

/// Allocates and recycles [`EntityId`]s.
///
/// Free ids are kept in a FIFO queue so that a just-freed id is the last one
/// to come back, which keeps late packets about a despawned actor from
/// landing on its replacement.
#[derive(Debug, Clone, Serialize)]
pub struct EntityIdAllocator {
    /// Next never-used raw id.
    next: u32,
    /// Whether each raw id (index) is currently alive. Index 0 is unused.
    alive: Vec<bool>,
    /// Free-list of recyclable ids (FIFO queue).
    free: VecDeque<u32>,
}

impl EntityIdAllocator {
    /// Create a new, empty allocator. The first id handed out is `1`.
    pub fn new() -> Self {
        Self {
            next: 1,
            alive: vec![false],
            free: VecDeque::new(),
        }
    }

    /// Allocate a fresh [`EntityId`]. Never returns [`EntityId::NONE`].
    pub fn allocate(&mut self) -> EntityId {
        let raw = match self.free.pop_front() {
            Some(raw) => raw,
            None => {
                let raw = self.next;
                self.next = self.next.wrapping_add(1).max(1);
                self.alive.push(false);
                raw
            }
        };
        self.alive[raw as usize] = true;
        EntityId(raw)
    }

    /// Return an id to the allocator.
    ///
    /// Returns `true` if the id was alive and is now free, `false` if it was
    /// never allocated, already free, or the reserved id.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.alive[id.0 as usize] = false;
        self.free.push_back(id.0);
        true
    }

    /// Returns `true` if `id` is currently allocated.
    pub fn is_alive(&self, id: EntityId) -> bool {
        !id.is_none() && self.alive.get(id.0 as usize).copied().unwrap_or(false)
    }

    /// Total number of currently allocated ids.
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Rebuild an allocator from its parts (e.g. after deserializing).
    ///
    /// Every queued id must be below `next`, non-zero, not alive, and queued
    /// once, so that [`allocate`](Self::allocate) can never index past
    /// `alive` or hand out a live id twice.
    pub fn from_parts(
        next: u32,
        alive: Vec<bool>,
        free: VecDeque<u32>,
    ) -> Result<Self, DepotError> {
        let corrupt = |reason| Err(DepotError::CorruptAllocator { reason });
        if next == 0 || alive.len() != next as usize {
            return corrupt("alive table does not match next id");
        }
        if alive[0] {
            return corrupt("reserved id marked alive");
        }
        let mut queued = vec![false; alive.len()];
        for &raw in &free {
            if raw == 0 || raw >= next {
                return corrupt("free id out of range");
            }
            if alive[raw as usize] {
                return corrupt("free id is alive");
            }
            if std::mem::replace(&mut queued[raw as usize], true) {
                return corrupt("free id queued twice");
            }
        }
        Ok(Self { next, alive, free })
    }

    /// `true` if the free queue and alive table agree.
    pub fn is_consistent(&self) -> bool {
        Self::from_parts(self.next, self.alive.clone(), self.free.clone()).is_ok()
    }
}

#[derive(Deserialize)]
struct AllocatorParts {
    next: u32,
    alive: Vec<bool>,
    free: VecDeque<u32>,
}

impl<'de> Deserialize<'de> for EntityIdAllocator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = AllocatorParts::deserialize(deserializer)?;
        EntityIdAllocator::from_parts(parts.next, parts.alive, parts.free).map_err(D::Error::custom)
    }
}

impl Default for EntityIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
