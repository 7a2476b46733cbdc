//! Simulation configuration.
//!
//! [`SimConfig`] is plain serde data. Every field has a default, so a config
//! file only needs to name what it changes:
//!
//! ```
//! use slimefield_engine::config::SimConfig;
//!
//! let config = SimConfig::from_json(r#"{ "seed": 7, "peaceful": true }"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert!(config.peaceful);
//! assert_eq!(config.fixed_dt, 1.0 / 60.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::math::meters;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The input was not valid JSON for the target type.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The input parsed but holds a value the simulation cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// SlimeConfig
// ---------------------------------------------------------------------------

/// Tuning for slime behavior. Distances are in world pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlimeConfig {
    /// Hop distance per jump at scale 1, in meters.
    pub move_speed: f32,
    /// Players farther than this are ignored when choosing a target.
    pub attack_track: f32,
    /// Players within this distance get hit when the slime lands.
    pub attack_reach: f32,
    /// With no player inside this radius the slime despawns.
    pub despawn_radius: f32,
    /// Collision radius at scale 1 (used for combining and hop blocking).
    pub radius: f32,
    /// Combined slimes never grow beyond this scale.
    pub max_scale: f32,
    /// Upward launch speed of a hop, in meters per second.
    pub jump_speed: f32,
    pub hit_points: f32,
    /// Damage per landing attack at scale 1.
    pub melee_damage: f32,
    /// XP granted to the player who kills it.
    pub xp: u32,
}

impl Default for SlimeConfig {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            attack_track: meters(10.0),
            attack_reach: meters(1.0),
            despawn_radius: meters(30.0),
            radius: 50.0,
            max_scale: 3.0,
            jump_speed: 5.0,
            hit_points: 10.0,
            melee_damage: 3.0,
            xp: 3,
        }
    }
}

/// Tuning for player-controlled entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Walk speed in meters per second. Running adds one.
    pub move_speed: f32,
    pub hit_points: f32,
    pub melee_damage: f32,
    /// Slimes within this distance are hit by an attack.
    pub attack_reach: f32,
    /// Seconds an attack stays active.
    pub attack_duration: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            hit_points: 100.0,
            melee_damage: 5.0,
            attack_reach: meters(1.5),
            attack_duration: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Configuration for one simulated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Upper bound applied to any single clock advance.
    pub max_dt: f64,
    /// Seed for the world's deterministic RNG.
    pub seed: u64,
    /// Server role. Only servers roll loot.
    pub server: bool,
    /// Disables enemy attacks.
    pub peaceful: bool,
    /// Seconds without movement before a body is considered idle.
    pub idle_threshold: f64,
    /// Seconds a dead non-player entity lingers before it is despawned.
    pub corpse_lifetime: f64,
    /// Townfolk turn toward players inside this radius.
    pub townfolk_notice_radius: f32,
    pub player: PlayerConfig,
    pub slime: SlimeConfig,
}

impl Default for SimConfig {
    /// Defaults to a 60 Hz server world.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_dt: 0.1,
            seed: 0,
            server: true,
            peaceful: false,
            idle_threshold: 6.0,
            corpse_lifetime: 8.0,
            townfolk_notice_radius: meters(3.0),
            player: PlayerConfig::default(),
            slime: SlimeConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the tick loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "fixed_dt must be positive and finite, got {}",
                self.fixed_dt
            )));
        }
        if !(self.max_dt > 0.0 && self.max_dt.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "max_dt must be positive and finite, got {}",
                self.max_dt
            )));
        }
        if self.max_dt < self.fixed_dt {
            return Err(ConfigError::Invalid(format!(
                "max_dt ({}) is smaller than fixed_dt ({})",
                self.max_dt, self.fixed_dt
            )));
        }
        if !(self.idle_threshold >= 0.0 && self.idle_threshold.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "idle_threshold must be non-negative, got {}",
                self.idle_threshold
            )));
        }
        if !(self.corpse_lifetime >= 0.0 && self.corpse_lifetime.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "corpse_lifetime must be non-negative, got {}",
                self.corpse_lifetime
            )));
        }
        if !(self.slime.max_scale >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "slime.max_scale must be at least 1, got {}",
                self.slime.max_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_object_gives_defaults() {
        let config = SimConfig::from_json("{}").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn nested_slime_fields_merge_with_defaults() {
        let config = SimConfig::from_json(r#"{ "slime": { "max_scale": 2.0 } }"#).unwrap();
        assert_eq!(config.slime.max_scale, 2.0);
        assert_eq!(config.slime.radius, SlimeConfig::default().radius);
    }

    #[test]
    fn zero_dt_is_rejected() {
        let err = SimConfig::from_json(r#"{ "fixed_dt": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("fixed_dt"));
    }

    #[test]
    fn max_dt_below_fixed_dt_is_rejected() {
        let config = SimConfig {
            max_dt: 0.001,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = SimConfig::from_json("{ seed: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
