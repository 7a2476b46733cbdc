//! Fixed-timestep tick loop for deterministic simulation.
//!
//! The [`TickLoop`] drives a [`World`] forward. Each tick:
//!
//! 1. The world clock advances by `fixed_dt` (clamped to `max_dt`).
//! 2. All registered systems run in declaration order, each receiving a shared
//!    reference to the [`World`] and a mutable reference to the
//!    [`CommandBuffer`].
//! 3. The command buffer is applied to the world (FIFO).
//! 4. Entities integrate: health smoothing, attack expiry, bodies, loot
//!    events, corpse timers.
//! 5. Entities marked for removal are freed.
//! 6. Particles advance.
//!
//! Because system ordering is fixed, the command buffer is FIFO, and all
//! randomness comes from the world's seeded RNGs, the same initial world with
//! the same systems and inputs always reaches the same state.
//!
//! # Example
//!
//! ```
//! use slimefield_engine::prelude::*;
//!
//! let world = World::new(SimConfig::default()).unwrap();
//! let mut tick_loop = TickLoop::new(world);
//!
//! tick_loop.add_system("noop", |_world, _cmds| {});
//!
//! for _ in 0..10 {
//!     tick_loop.tick();
//! }
//!
//! assert_eq!(tick_loop.tick_count(), 10);
//! ```

use std::time::{Duration, Instant};

use crate::behavior;
use crate::command::{Command, CommandBuffer};
use crate::world::World;

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system (in order of execution).
    pub system_times: Vec<(&'static str, Duration)>,
    /// Total time for the tick.
    pub total_time: Duration,
    /// Time spent applying commands.
    pub command_apply_time: Duration,
    /// Time spent integrating entities and particles.
    pub integrate_time: Duration,
}

// ---------------------------------------------------------------------------
// SystemFn
// ---------------------------------------------------------------------------

/// A system function that runs once per tick.
///
/// Systems read the [`World`] and queue mutations in the [`CommandBuffer`].
pub type SystemFn = fn(&World, &mut CommandBuffer);

#[derive(Debug)]
struct RegisteredSystem {
    name: &'static str,
    func: SystemFn,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// The deterministic fixed-timestep tick loop.
pub struct TickLoop {
    world: World,
    command_buffer: CommandBuffer,
    systems: Vec<RegisteredSystem>,
    tick_counter: u64,
    fixed_dt: f64,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// Create a tick loop stepping `world` by its configured `fixed_dt`.
    ///
    /// # Panics
    ///
    /// Panics if `fixed_dt` is not positive and finite.
    pub fn new(world: World) -> Self {
        let fixed_dt = world.config.fixed_dt;
        assert!(
            fixed_dt > 0.0 && fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            fixed_dt
        );
        Self {
            world,
            command_buffer: CommandBuffer::new(),
            systems: Vec::new(),
            tick_counter: 0,
            fixed_dt,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// Register a system to be run each tick, after every system registered
    /// before it.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, name: &'static str, func: SystemFn) {
        assert!(
            !self.systems.iter().any(|s| s.name == name),
            "duplicate system name: {name:?}"
        );
        self.systems.push(RegisteredSystem { name, func });
    }

    /// Register the player, slime, and townfolk behavior systems.
    pub fn add_behaviors(&mut self) {
        for (name, func) in behavior::SYSTEMS {
            self.add_system(name, func);
        }
    }

    /// Execute one simulation tick.
    ///
    /// Returns the commands processed this tick; check each command's
    /// `applied_successfully` to tell real mutations from failed attempts.
    pub fn tick(&mut self) -> Vec<Command> {
        let tick_start = Instant::now();
        let max_dt = self.world.config.max_dt;
        self.world.clock.advance(self.fixed_dt, max_dt);

        let mut system_times = Vec::with_capacity(self.systems.len());
        for system in &self.systems {
            let sys_start = Instant::now();
            self.command_buffer.set_issuer(system.name);
            (system.func)(&self.world, &mut self.command_buffer);
            system_times.push((system.name, sys_start.elapsed()));
        }

        let apply_start = Instant::now();
        let applied = self.command_buffer.apply(&mut self.world);
        let command_apply_time = apply_start.elapsed();

        let integrate_start = Instant::now();
        self.world.integrate();
        self.world.sweep_despawned();
        self.world.update_particles();
        self.world.clear_one_shot_inputs();
        let integrate_time = integrate_start.elapsed();

        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            system_times,
            total_time: tick_start.elapsed(),
            command_apply_time,
            integrate_time,
        };

        applied
    }

    /// Run `count` ticks. Returns the total number of commands processed.
    pub fn run_ticks(&mut self, count: u64) -> u64 {
        let mut total_commands = 0u64;
        for _ in 0..count {
            total_commands += self.tick().len() as u64;
        }
        total_commands
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// `tick_count * fixed_dt`, computed without accumulation.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world, for setup, inputs, and tests.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn into_world(self) -> World {
        self.world
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// The names of all registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name).collect()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    /// Rewind bookkeeping after a snapshot restore.
    pub(crate) fn reset_counter(&mut self, tick_counter: u64) {
        self.tick_counter = tick_counter;
        self.command_buffer.clear();
    }

    /// Report from the last command buffer application.
    pub fn last_apply_report(&self) -> &crate::command::ApplyReport {
        self.command_buffer.last_apply_report()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
