//! `Combat` facet: hit points, leveling, and attack timing.
//!
//! An entity is alive while `hit_points > 0`. The transition to dead is
//! one-way: [`Combat::take_damage`] records `died_at` exactly once and rejects
//! all damage afterwards.

use serde::{Deserialize, Serialize};
use slimefield_ecs::facet::{FacetHeader, FacetType};

/// Bit flags on a [`Combat`] facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatFlags(u8);

impl CombatFlags {
    pub const NONE: CombatFlags = CombatFlags(0);
    /// Invulnerable: every hit deals zero damage.
    pub const TOO_BIG_TO_FAIL: CombatFlags = CombatFlags(0x1);

    #[inline]
    pub const fn contains(self, other: CombatFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: CombatFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: CombatFlags) {
        self.0 &= !other.0;
    }
}

/// Identifies a loot table owned by an external loot system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LootTableId {
    #[default]
    None,
    Slime,
}

/// XP needed to advance past `level`.
#[inline]
pub fn xp_threshold(level: u8) -> u32 {
    u32::from(level.max(1)) * 20
}

/// Per-entity combat state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Combat {
    pub header: FacetHeader,
    pub flags: CombatFlags,
    pub level: u8,
    pub hit_points_max: f32,
    /// Hit points before the most recent damage.
    pub hit_points_prev: f32,
    pub hit_points: f32,
    /// Display-only value chasing `hit_points`.
    pub hit_points_smooth: f32,
    pub melee_damage: f32,
    /// XP held, and XP granted to whoever kills this entity.
    pub xp: u32,
    pub loot_table_id: LootTableId,
    pub attack_started_at: f64,
    pub attack_duration: f64,
    /// Time of death; `0.0` while alive.
    pub died_at: f64,
    pub dropped_death_loot: bool,
}

crate::impl_facet!(Combat, FacetType::Combat);

impl Combat {
    /// Set max and current hit points together (smoothing starts full).
    pub fn set_hit_points(&mut self, max: f32) {
        self.hit_points_max = max;
        self.hit_points = max;
        self.hit_points_prev = max;
        self.hit_points_smooth = max;
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.died_at != 0.0
    }

    /// Deal up to `damage` at time `now`, returning the amount actually dealt.
    ///
    /// Returns `0.0` without effect for non-positive (or NaN) damage, for a
    /// dead entity, and for an invulnerable one. The dealt amount is clamped
    /// to the remaining hit points.
    pub fn take_damage(&mut self, damage: f32, now: f64) -> f32 {
        if !(damage > 0.0)
            || self.is_dead()
            || self.hit_points <= 0.0
            || self.flags.contains(CombatFlags::TOO_BIG_TO_FAIL)
        {
            return 0.0;
        }

        self.hit_points_prev = self.hit_points;
        let dealt = damage.clamp(0.0, self.hit_points.max(0.0));
        self.hit_points = (self.hit_points - dealt).max(0.0);
        if self.hit_points == 0.0 && self.died_at == 0.0 {
            // A death at t=0 still needs a nonzero marker.
            self.died_at = if now > 0.0 { now } else { f64::MIN_POSITIVE };
        }
        dealt
    }

    /// Add XP and level up as many times as it covers.
    ///
    /// Each level costs [`xp_threshold`] of the current level. Leveling stops
    /// at `u8::MAX`. Returns the number of levels gained.
    pub fn grant_xp(&mut self, amount: u32) -> u8 {
        self.xp = self.xp.saturating_add(amount);
        let mut gained = 0u8;
        while self.level < u8::MAX {
            let threshold = xp_threshold(self.level);
            if self.xp < threshold {
                break;
            }
            self.xp -= threshold;
            self.level += 1;
            gained += 1;
        }
        gained
    }

    /// Ease the display value toward the real one.
    pub fn update(&mut self, dt: f64) {
        let rate = (5.0 * dt as f32).clamp(0.05, 1.0);
        self.hit_points_smooth += (self.hit_points - self.hit_points_smooth) * rate;
    }

    /// Whether an attack started at `attack_started_at` is still running.
    #[inline]
    pub fn attacking(&self, now: f64) -> bool {
        self.attack_started_at != 0.0 && now - self.attack_started_at <= self.attack_duration
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter(hp: f32) -> Combat {
        let mut combat = Combat {
            level: 1,
            ..Combat::default()
        };
        combat.set_hit_points(hp);
        combat
    }

    #[test]
    fn overkill_is_clamped_and_records_death() {
        let mut combat = fighter(10.0);
        let dealt = combat.take_damage(15.0, 12.5);
        assert_eq!(dealt, 10.0);
        assert_eq!(combat.hit_points, 0.0);
        assert_eq!(combat.died_at, 12.5);
        assert!(combat.is_dead());
    }

    #[test]
    fn damage_after_death_is_rejected() {
        let mut combat = fighter(5.0);
        combat.take_damage(5.0, 1.0);
        for t in 2..10 {
            assert_eq!(combat.take_damage(3.0, t as f64), 0.0);
            assert_eq!(combat.hit_points, 0.0);
        }
        assert_eq!(combat.died_at, 1.0);
    }

    #[test]
    fn partial_damage_tracks_previous() {
        let mut combat = fighter(10.0);
        assert_eq!(combat.take_damage(3.0, 1.0), 3.0);
        assert_eq!(combat.hit_points, 7.0);
        assert_eq!(combat.hit_points_prev, 10.0);
        assert_eq!(combat.died_at, 0.0);
    }

    #[test]
    fn invulnerable_takes_nothing() {
        let mut combat = fighter(1.0);
        combat.flags.insert(CombatFlags::TOO_BIG_TO_FAIL);
        assert_eq!(combat.take_damage(100.0, 1.0), 0.0);
        assert_eq!(combat.hit_points, 1.0);
    }

    #[test]
    fn non_positive_damage_is_noop() {
        let mut combat = fighter(10.0);
        assert_eq!(combat.take_damage(0.0, 1.0), 0.0);
        assert_eq!(combat.take_damage(-4.0, 1.0), 0.0);
        assert_eq!(combat.take_damage(f32::NAN, 1.0), 0.0);
        assert_eq!(combat.hit_points, 10.0);
    }

    #[test]
    fn death_at_time_zero_is_still_recorded() {
        let mut combat = fighter(1.0);
        combat.take_damage(1.0, 0.0);
        assert!(combat.died_at > 0.0);
        assert_eq!(combat.take_damage(1.0, 0.0), 0.0);
    }

    #[test]
    fn grant_zero_xp_changes_nothing() {
        let mut combat = fighter(10.0);
        combat.xp = 7;
        assert_eq!(combat.grant_xp(0), 0);
        assert_eq!(combat.level, 1);
        assert_eq!(combat.xp, 7);
    }

    #[test]
    fn grant_xp_loops_through_levels() {
        let mut combat = fighter(10.0);
        // 20 (L1) + 40 (L2) + 60 (L3) = 120, leaving 5 at level 4.
        assert_eq!(combat.grant_xp(125), 3);
        assert_eq!(combat.level, 4);
        assert_eq!(combat.xp, 5);
    }

    #[test]
    fn grant_xp_is_path_independent() {
        let mut once = fighter(10.0);
        once.grant_xp(1000);

        let mut twice = fighter(10.0);
        twice.grant_xp(500);
        twice.grant_xp(500);

        assert_eq!(once.level, twice.level);
        assert_eq!(once.xp, twice.xp);
    }

    #[test]
    fn level_saturates() {
        let mut combat = fighter(10.0);
        combat.level = 254;
        assert_eq!(combat.grant_xp(u32::MAX), 1);
        assert_eq!(combat.level, u8::MAX);
        assert_eq!(combat.grant_xp(1_000_000), 0);
    }

    #[test]
    fn smoothing_chases_hit_points() {
        let mut combat = fighter(10.0);
        combat.take_damage(4.0, 1.0);
        assert_eq!(combat.hit_points_smooth, 10.0);

        combat.update(0.1);
        // rate = 0.5
        assert!((combat.hit_points_smooth - 8.0).abs() < 1e-5);

        for _ in 0..200 {
            combat.update(1.0 / 60.0);
        }
        assert!((combat.hit_points_smooth - 6.0).abs() < 1e-3);
    }

    #[test]
    fn smoothing_rate_has_a_floor() {
        let mut combat = fighter(10.0);
        combat.take_damage(10.0, 1.0);
        combat.update(0.0);
        assert!((combat.hit_points_smooth - 9.5).abs() < 1e-5);
    }
}
