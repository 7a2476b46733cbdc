//! Deferred world mutations.
//!
//! Behavior systems see the [`World`] read-only; every change they want to
//! make is queued in the [`CommandBuffer`] and applied in FIFO order once all
//! systems of the tick have run. An entity therefore observes every other
//! entity as it was at the start of the tick.
//!
//! # Example
//!
//! ```
//! use slimefield_engine::prelude::*;
//!
//! let mut world = World::new(SimConfig::default()).unwrap();
//! let slime = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();
//!
//! let mut cmds = CommandBuffer::new();
//! cmds.apply_force(slime, Vec3::new(0.0, 0.0, 100.0));
//! cmds.set_move_state(slime, MoveState::Jump);
//!
//! let applied = cmds.apply(&mut world);
//! assert!(applied.iter().all(|c| c.applied_successfully));
//! assert_eq!(world.depot.entity_find(slime).unwrap().move_state, MoveState::Jump);
//! ```

use std::collections::HashMap;
use std::mem::{discriminant, Discriminant};

use rand::Rng;
use slimefield_ecs::entity::EntityId;
use slimefield_ecs::DepotError;
use thiserror::Error;
use tracing::warn;

use crate::body::Body3D;
use crate::combat::Combat;
use crate::entity::{ActionState, EntityState, MoveState};
use crate::inventory::{Inventory, SlotId};
use crate::math::{Vec2, Vec3};
use crate::sprite::Sprite;
use crate::world::World;

// ---------------------------------------------------------------------------
// CommandError
// ---------------------------------------------------------------------------

/// Why a queued command could not be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Depot(#[from] DepotError),

    /// The target was marked for removal earlier in the tick.
    #[error("entity {0} is despawned")]
    Despawned(EntityId),

    #[error("slimes {a} and {b} cannot combine")]
    CombineRejected { a: EntityId, b: EntityId },

    /// The command does not make sense for the target's current state.
    #[error("entity {entity}: {reason}")]
    Rejected {
        entity: EntityId,
        reason: &'static str,
    },
}

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// What mutation to perform on the command's target.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Add an instantaneous change in velocity.
    ApplyForce(Vec3),
    /// Walk along the ground by `offset` pixels.
    MoveBy(Vec2),
    /// Slime hop: launch with `force`, face the hop, and reroll the idle
    /// timer. Ignored unless the slime is on the ground.
    Hop { force: Vec3 },
    SetMoveState(MoveState),
    /// Face along a ground-plane offset.
    SetDirection(Vec2),
    SelectSlot(SlotId),
    /// Enter the attack action for `duration` seconds.
    StartAttack { duration: f64 },
    /// `attacker` hits the target for up to `amount` damage.
    DealDamage { attacker: EntityId, amount: f32 },
    /// Merge the target slime with `other`.
    Combine { other: EntityId },
    /// Mark the target for removal at the end of the tick.
    Despawn,
}

impl CommandKind {
    /// Kinds that overwrite a single value; two in one tick is a conflict.
    fn is_overwrite(&self) -> bool {
        matches!(
            self,
            CommandKind::SetMoveState(_) | CommandKind::SetDirection(_) | CommandKind::SelectSlot(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A single deferred mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub target: EntityId,
    pub kind: CommandKind,
    /// Name of the system that queued the command.
    pub issued_by: &'static str,
    /// Sequential index within the buffer (set on insertion).
    pub command_index: u32,
    /// `false` before `apply()`, and for commands that failed to apply.
    pub applied_successfully: bool,
}

// ---------------------------------------------------------------------------
// ApplyReport
// ---------------------------------------------------------------------------

/// Summary of the last [`CommandBuffer::apply`] call.
///
/// `conflict_count` counts targets that received more than one overwrite of
/// the same kind in a tick (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub conflict_count: usize,
    pub failed_count: usize,
    pub success_count: usize,
}

// ---------------------------------------------------------------------------
// CommandBuffer
// ---------------------------------------------------------------------------

/// Collects commands during a tick and applies them in insertion order.
#[derive(Debug)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    next_index: u32,
    issuer: &'static str,
    last_apply_report: ApplyReport,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            next_index: 0,
            issuer: "external",
            last_apply_report: ApplyReport::default(),
        }
    }

    /// Attribute subsequently queued commands to `system`.
    pub fn set_issuer(&mut self, system: &'static str) {
        self.issuer = system;
    }

    pub fn apply_force(&mut self, target: EntityId, force: Vec3) {
        self.push(target, CommandKind::ApplyForce(force));
    }

    pub fn move_by(&mut self, target: EntityId, offset: Vec2) {
        self.push(target, CommandKind::MoveBy(offset));
    }

    pub fn hop(&mut self, target: EntityId, force: Vec3) {
        self.push(target, CommandKind::Hop { force });
    }

    pub fn set_move_state(&mut self, target: EntityId, state: MoveState) {
        self.push(target, CommandKind::SetMoveState(state));
    }

    pub fn set_direction(&mut self, target: EntityId, offset: Vec2) {
        self.push(target, CommandKind::SetDirection(offset));
    }

    pub fn select_slot(&mut self, target: EntityId, slot: SlotId) {
        self.push(target, CommandKind::SelectSlot(slot));
    }

    pub fn start_attack(&mut self, target: EntityId, duration: f64) {
        self.push(target, CommandKind::StartAttack { duration });
    }

    pub fn deal_damage(&mut self, victim: EntityId, attacker: EntityId, amount: f32) {
        self.push(victim, CommandKind::DealDamage { attacker, amount });
    }

    pub fn combine(&mut self, target: EntityId, other: EntityId) {
        self.push(target, CommandKind::Combine { other });
    }

    pub fn despawn(&mut self, target: EntityId) {
        self.push(target, CommandKind::Despawn);
    }

    /// All queued commands in insertion order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Report from the last [`apply`](Self::apply) call.
    pub fn last_apply_report(&self) -> &ApplyReport {
        &self.last_apply_report
    }

    /// Apply all commands to the world in insertion order.
    ///
    /// Returns every command, successful or not, and clears the buffer.
    /// Failures are logged and counted in the [`ApplyReport`]; they never
    /// stop later commands from applying.
    pub fn apply(&mut self, world: &mut World) -> Vec<Command> {
        let mut commands = std::mem::take(&mut self.commands);
        self.next_index = 0;

        let mut seen: HashMap<(EntityId, Discriminant<CommandKind>), u32> = HashMap::new();
        for cmd in commands.iter().filter(|c| c.kind.is_overwrite()) {
            *seen.entry((cmd.target, discriminant(&cmd.kind))).or_default() += 1;
        }
        let conflict_count = seen.values().filter(|&&n| n > 1).count();
        if conflict_count > 0 {
            warn!(conflict_count, "overwriting commands target the same entity (last write wins)");
        }

        let mut success_count = 0;
        let mut failed_count = 0;
        for cmd in &mut commands {
            match apply_one(world, cmd.target, &cmd.kind) {
                Ok(()) => {
                    cmd.applied_successfully = true;
                    success_count += 1;
                }
                Err(e) => {
                    failed_count += 1;
                    warn!(
                        command_index = cmd.command_index,
                        target = %cmd.target,
                        system = cmd.issued_by,
                        error = %e,
                        "command application failed"
                    );
                }
            }
        }

        self.last_apply_report = ApplyReport {
            conflict_count,
            failed_count,
            success_count,
        };
        commands
    }

    /// Drop all queued commands.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.next_index = 0;
    }

    fn push(&mut self, target: EntityId, kind: CommandKind) {
        let command_index = self.next_index;
        self.next_index += 1;
        self.commands.push(Command {
            target,
            kind,
            issued_by: self.issuer,
            command_index,
            applied_successfully: false,
        });
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

fn apply_one(world: &mut World, target: EntityId, kind: &CommandKind) -> Result<(), CommandError> {
    if world.depot.require::<crate::entity::Entity>(target)?.is_despawned() {
        return Err(CommandError::Despawned(target));
    }
    let now = world.clock.now;

    match *kind {
        CommandKind::ApplyForce(force) => {
            world.depot.require_mut::<Body3D>(target)?.apply_force(force);
        }
        CommandKind::MoveBy(offset) => {
            let body = world.depot.require_mut::<Body3D>(target)?;
            let pos = body.position() + Vec3::new(offset.x, offset.y, 0.0);
            body.teleport(pos, now);
        }
        CommandKind::Hop { force } => hop(world, target, force)?,
        CommandKind::SetMoveState(state) => {
            world.depot.require_mut::<crate::entity::Entity>(target)?.move_state = state;
        }
        CommandKind::SetDirection(offset) => {
            world.depot.require_mut::<Sprite>(target)?.set_direction(offset);
        }
        CommandKind::SelectSlot(slot) => {
            let inventory = world.depot.require_mut::<Inventory>(target)?;
            if inventory.slot(slot).is_none() || slot == SlotId::CURSOR {
                return Err(CommandError::Rejected {
                    entity: target,
                    reason: "slot cannot be selected",
                });
            }
            inventory.selected_slot = slot;
        }
        CommandKind::StartAttack { duration } => {
            let pools = world.depot.pools_mut();
            let combat = pools.combat.find_mut(target).ok_or(DepotError::MissingFacet {
                entity: target,
                facet_type: slimefield_ecs::facet::FacetType::Combat,
            })?;
            if combat.is_dead() {
                return Err(CommandError::Rejected {
                    entity: target,
                    reason: "dead entities cannot attack",
                });
            }
            combat.attack_started_at = world.clock.stamp();
            combat.attack_duration = duration;
            if let Some(entity) = pools.entity.find_mut(target) {
                entity.action_state = ActionState::Attack;
            }
            // Counts as movement so idle animations stop.
            if let Some(body) = pools.body.find_mut(target) {
                let pos = body.position();
                body.teleport(pos, now);
            }
        }
        CommandKind::DealDamage { attacker, amount } => {
            world.deal_damage(attacker, target, amount)?;
        }
        CommandKind::Combine { other } => {
            if !world.combine_slimes(target, other)? {
                return Err(CommandError::CombineRejected { a: target, b: other });
            }
        }
        CommandKind::Despawn => world.despawn(target)?,
    }
    Ok(())
}

fn hop(world: &mut World, target: EntityId, force: Vec3) -> Result<(), CommandError> {
    let scale = world.depot.require::<Sprite>(target)?.scale.max(f32::EPSILON);
    if !world.depot.require::<Body3D>(target)?.on_ground() {
        return Err(CommandError::Rejected {
            entity: target,
            reason: "cannot hop while airborne",
        });
    }
    if world.depot.require::<Combat>(target)?.is_dead() {
        return Err(CommandError::Rejected {
            entity: target,
            reason: "dead slimes do not hop",
        });
    }

    let idle = f64::from(world.rng.gen_range(0.5f32..1.5) / scale);
    let pools = world.depot.pools_mut();
    if let Some(body) = pools.body.find_mut(target) {
        body.apply_force(force);
    }
    if let Some(sprite) = pools.sprite.find_mut(target) {
        sprite.set_direction(Vec2::new(force.x, force.y));
    }
    if let Some(entity) = pools.entity.find_mut(target) {
        entity.move_state = MoveState::Jump;
        if let EntityState::Slime { rand_jump_idle } = &mut entity.state {
            *rand_jump_idle = idle;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::entity::{Entity, EntityType};

    fn world() -> World {
        World::new(SimConfig::default()).unwrap()
    }

    #[test]
    fn empty_buffer_applies_nothing() {
        let mut world = world();
        let mut cmds = CommandBuffer::new();
        assert!(cmds.is_empty());
        assert!(cmds.apply(&mut world).is_empty());
        assert_eq!(cmds.last_apply_report(), &ApplyReport::default());
    }

    #[test]
    fn commands_are_indexed_and_attributed() {
        let mut cmds = CommandBuffer::new();
        let e = EntityId::from_raw(1);
        cmds.set_issuer("slime");
        cmds.despawn(e);
        cmds.set_issuer("player");
        cmds.apply_force(e, Vec3::ONE);

        let queued = cmds.commands();
        assert_eq!(queued[0].command_index, 0);
        assert_eq!(queued[0].issued_by, "slime");
        assert_eq!(queued[1].command_index, 1);
        assert_eq!(queued[1].issued_by, "player");
    }

    #[test]
    fn apply_is_fifo_last_write_wins() {
        let mut world = world();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();

        let mut cmds = CommandBuffer::new();
        cmds.set_move_state(p, MoveState::Walk);
        cmds.set_move_state(p, MoveState::Run);
        let applied = cmds.apply(&mut world);

        assert_eq!(applied.len(), 2);
        assert_eq!(world.depot.entity_find(p).unwrap().move_state, MoveState::Run);
        let report = cmds.last_apply_report();
        assert_eq!(report.conflict_count, 1);
        assert_eq!(report.success_count, 2);
        assert!(cmds.is_empty());
    }

    #[test]
    fn stale_target_fails_without_stopping_the_rest() {
        let mut world = world();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();

        let mut cmds = CommandBuffer::new();
        cmds.apply_force(EntityId::from_raw(99), Vec3::ONE);
        cmds.apply_force(p, Vec3::new(0.0, 0.0, 10.0));
        let applied = cmds.apply(&mut world);

        assert!(!applied[0].applied_successfully);
        assert!(applied[1].applied_successfully);
        assert_eq!(cmds.last_apply_report().failed_count, 1);
        assert_eq!(
            world.depot.find::<Body3D>(p).unwrap().velocity,
            Vec3::new(0.0, 0.0, 10.0)
        );
    }

    #[test]
    fn despawned_targets_reject_commands() {
        let mut world = world();
        let s = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();

        let mut cmds = CommandBuffer::new();
        cmds.despawn(s);
        cmds.apply_force(s, Vec3::ONE);
        let applied = cmds.apply(&mut world);

        assert!(applied[0].applied_successfully);
        assert!(!applied[1].applied_successfully);
        assert!(world.depot.require::<Entity>(s).unwrap().is_despawned());
    }

    #[test]
    fn hop_rerolls_idle_timer_and_faces_the_hop() {
        let mut world = world();
        let s = world.spawn(EntityType::Slime, Vec3::ZERO).unwrap();

        let mut cmds = CommandBuffer::new();
        cmds.hop(s, Vec3::new(-10.0, 0.0, 320.0));
        cmds.apply(&mut world);

        let entity = world.depot.require::<Entity>(s).unwrap();
        assert_eq!(entity.move_state, MoveState::Jump);
        match entity.state {
            EntityState::Slime { rand_jump_idle } => {
                assert!((0.5..=1.5).contains(&rand_jump_idle));
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(
            world.depot.require::<Sprite>(s).unwrap().direction,
            crate::sprite::Direction::West
        );
        assert_eq!(world.depot.require::<Body3D>(s).unwrap().velocity.z, 320.0);
    }

    #[test]
    fn start_attack_sets_action_and_timer() {
        let mut world = world();
        let p = world.spawn(EntityType::Player, Vec3::ZERO).unwrap();
        world.clock.advance(0.5, 1.0);

        let mut cmds = CommandBuffer::new();
        cmds.start_attack(p, 0.2);
        cmds.select_slot(p, SlotId::hotbar(3));
        cmds.apply(&mut world);

        let combat = world.depot.require::<Combat>(p).unwrap();
        assert_eq!(combat.attack_started_at, 0.5);
        assert!(combat.attacking(0.6));
        assert_eq!(
            world.depot.require::<Entity>(p).unwrap().action_state,
            ActionState::Attack
        );
        assert_eq!(
            world.depot.require::<Inventory>(p).unwrap().selected_slot,
            SlotId::hotbar(3)
        );
    }
}
