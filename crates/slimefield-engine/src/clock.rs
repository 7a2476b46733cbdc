//! Simulation clock.
//!
//! Each [`World`](crate::world::World) owns its own [`Clock`]; a client and a
//! server simulating in the same process never share one.

use serde::{Deserialize, Serialize};

/// Monotonic simulation time for one world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Clock {
    /// Seconds since the world started.
    pub now: f64,
    /// Length of the current tick in seconds (after clamping).
    pub dt: f64,
    /// Whether this clock drives a server simulation.
    pub server: bool,
}

impl Clock {
    pub fn new(server: bool) -> Self {
        Self {
            now: 0.0,
            dt: 0.0,
            server,
        }
    }

    /// Advance by `dt`, clamped to `[0, max_dt]` to absorb hitches.
    ///
    /// Returns the dt actually applied.
    pub fn advance(&mut self, dt: f64, max_dt: f64) -> f64 {
        let dt = if dt.is_finite() { dt.clamp(0.0, max_dt) } else { 0.0 };
        self.dt = dt;
        self.now += dt;
        dt
    }

    /// `now` as an event timestamp. Timestamps use `0.0` for "never", so an
    /// event at the very start of the world is recorded as the smallest
    /// positive time instead.
    #[inline]
    pub fn stamp(&self) -> f64 {
        if self.now > 0.0 {
            self.now
        } else {
            f64::MIN_POSITIVE
        }
    }
}
