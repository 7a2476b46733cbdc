//! World snapshots with BLAKE3 hashing.
//!
//! A [`WorldSnapshot`] captures the deterministic simulation state: tick
//! counter, clock, facet depot, id allocator, and gameplay RNG. Its BLAKE3
//! digest is what a client and server compare to check they agree.
//!
//! ```
//! use slimefield_engine::prelude::*;
//!
//! let mut world = World::new(SimConfig::default()).unwrap();
//! world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
//! let mut tick_loop = TickLoop::new(world);
//! tick_loop.add_behaviors();
//! tick_loop.run_ticks(10);
//!
//! let snapshot = tick_loop.capture_snapshot().unwrap();
//! assert_eq!(snapshot.tick_counter, 10);
//! assert_eq!(snapshot.hash.len(), 64);
//!
//! tick_loop.run_ticks(10);
//! tick_loop.restore_from_snapshot(&snapshot).unwrap();
//! assert_eq!(tick_loop.tick_count(), 10);
//! assert_eq!(tick_loop.state_hash().unwrap(), snapshot.hash);
//! ```
//!
//! # What Is NOT Captured
//!
//! - **Config and item catalog**: static for a session; both sides load them.
//! - **Particles, cosmetic RNG, sounds**: visual only. Restore clears them.
//! - **Player inputs and pending events**: owned by the host.
//! - **Systems**: retained on the `TickLoop` across a restore.

use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use slimefield_ecs::entity::EntityIdAllocator;
use thiserror::Error;
use tracing::debug;

use crate::clock::Clock;
use crate::depot::FacetDepot;
use crate::entity::Entity;
use crate::particles::ParticleSystem;
use crate::tick::TickLoop;
use crate::world::World;

// ---------------------------------------------------------------------------
// SnapshotError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The recorded digest does not match the snapshot's contents.
    #[error("snapshot hash mismatch: recorded {recorded} but recomputed {computed}")]
    HashMismatch { recorded: String, computed: String },

    /// The depot's pools, indices, and type lists disagree.
    #[error("snapshot depot is inconsistent")]
    InconsistentDepot,

    /// The id allocator's free queue is corrupt, or a stored entity's id is
    /// not marked alive.
    #[error("snapshot id allocator is inconsistent")]
    InconsistentIds,

    #[error("snapshot serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// WorldSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick_counter: u64,
    pub clock: Clock,
    pub depot: FacetDepot,
    pub ids: EntityIdAllocator,
    pub rng: Pcg32,
    /// BLAKE3 hex digest (64 lowercase hex chars) of everything above.
    pub hash: String,
}

#[derive(Serialize)]
struct HashableState<'a> {
    tick_counter: u64,
    clock: &'a Clock,
    depot: &'a FacetDepot,
    ids: &'a EntityIdAllocator,
    rng: &'a Pcg32,
}

impl HashableState<'_> {
    fn hash(&self) -> Result<String, SnapshotError> {
        let json_bytes = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json_bytes).to_hex().to_string())
    }
}

impl WorldSnapshot {
    /// Recompute the digest from the snapshot's contents.
    pub fn compute_hash(&self) -> Result<String, SnapshotError> {
        HashableState {
            tick_counter: self.tick_counter,
            clock: &self.clock,
            depot: &self.depot,
            ids: &self.ids,
            rng: &self.rng,
        }
        .hash()
    }

    /// Check the digest, the depot's internal consistency, and that the id
    /// allocator agrees with the depot.
    pub fn verify(&self) -> Result<(), SnapshotError> {
        let computed = self.compute_hash()?;
        if computed != self.hash {
            return Err(SnapshotError::HashMismatch {
                recorded: self.hash.clone(),
                computed,
            });
        }
        if !self.depot.is_consistent() {
            return Err(SnapshotError::InconsistentDepot);
        }
        let ids_ok = self.ids.is_consistent()
            && self
                .depot
                .pool::<Entity>()
                .iter()
                .all(|e| self.ids.is_alive(e.header.entity_id));
        if !ids_ok {
            return Err(SnapshotError::InconsistentIds);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and verify a snapshot.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: WorldSnapshot = serde_json::from_str(json)?;
        snapshot.verify()?;
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// World snapshot/restore
// ---------------------------------------------------------------------------

impl World {
    /// Digest of the current state at `tick_counter`.
    pub fn state_hash(&self, tick_counter: u64) -> Result<String, SnapshotError> {
        HashableState {
            tick_counter,
            clock: &self.clock,
            depot: &self.depot,
            ids: &self.ids,
            rng: &self.rng,
        }
        .hash()
    }

    pub fn capture_snapshot(&self, tick_counter: u64) -> Result<WorldSnapshot, SnapshotError> {
        let hash = self.state_hash(tick_counter)?;
        Ok(WorldSnapshot {
            tick_counter,
            clock: self.clock,
            depot: self.depot.clone(),
            ids: self.ids.clone(),
            rng: self.rng.clone(),
            hash,
        })
    }

    /// Replace the simulation state with `snapshot`'s.
    ///
    /// The snapshot is verified first; on error the world is untouched.
    /// Particles, sounds, and pending events are cleared.
    pub fn restore_snapshot(&mut self, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
        snapshot.verify()?;
        self.clock = snapshot.clock;
        self.depot = snapshot.depot.clone();
        self.ids = snapshot.ids.clone();
        self.rng = snapshot.rng.clone();
        self.particles = ParticleSystem::new();
        self.sounds.clear();
        self.take_events();
        debug!(tick = snapshot.tick_counter, hash = %snapshot.hash, "world restored");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TickLoop snapshot/restore
// ---------------------------------------------------------------------------

impl TickLoop {
    pub fn capture_snapshot(&self) -> Result<WorldSnapshot, SnapshotError> {
        self.world().capture_snapshot(self.tick_count())
    }

    /// Restore the world and tick counter. Registered systems are kept and
    /// any queued commands are dropped.
    pub fn restore_from_snapshot(&mut self, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
        self.world_mut().restore_snapshot(snapshot)?;
        self.reset_counter(snapshot.tick_counter);
        Ok(())
    }

    pub fn state_hash(&self) -> Result<String, SnapshotError> {
        self.world().state_hash(self.tick_count())
    }

    /// Same as [`capture_snapshot`](Self::capture_snapshot), named for
    /// branching workflows.
    pub fn fork_snapshot(&self) -> Result<WorldSnapshot, SnapshotError> {
        self.capture_snapshot()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
