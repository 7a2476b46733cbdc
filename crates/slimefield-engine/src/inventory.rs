//! `Inventory` facet and the slot transfer protocol.
//!
//! An inventory is a fixed array of [`Slot`]s addressed by [`SlotId`]: a
//! 4x10 grid of regular slots, three currency slots, ten hotbar slots, and the
//! cursor slot that holds whatever the player is dragging.
//!
//! Every operation is driven by player input and must be safe to retry every
//! frame, so nothing here returns an error: an illegal move is a `false`
//! return and leaves the slots untouched. With [`Inventory::skip_update`]
//! set, operations report whether they *would* succeed without mutating
//! anything, which is how a client predicts the server's answer.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use slimefield_ecs::facet::{FacetHeader, FacetType};

use crate::items::{Currency, ItemCatalog, ItemClass, ItemStack};

// ---------------------------------------------------------------------------
// SlotId
// ---------------------------------------------------------------------------

pub const INV_ROWS: u8 = 4;
pub const INV_COLS: u8 = 10;
/// Number of regular (grid) slots. Sort and combine only touch these.
pub const INV_REGULAR_COUNT: u8 = INV_ROWS * INV_COLS;

/// Index of a slot within an [`Inventory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SlotId(pub u8);

impl SlotId {
    pub const COIN_COPPER: SlotId = SlotId(INV_REGULAR_COUNT);
    pub const COIN_SILVER: SlotId = SlotId(INV_REGULAR_COUNT + 1);
    pub const COIN_GILDED: SlotId = SlotId(INV_REGULAR_COUNT + 2);
    pub const HOTBAR_0: SlotId = SlotId(INV_REGULAR_COUNT + 3);
    pub const CURSOR: SlotId = SlotId(INV_REGULAR_COUNT + 13);
    /// Total number of slots, cursor included.
    pub const COUNT: usize = INV_REGULAR_COUNT as usize + 14;

    /// Hotbar slot `n` (0..=9).
    pub const fn hotbar(n: u8) -> SlotId {
        SlotId(Self::HOTBAR_0.0 + n)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_regular(self) -> bool {
        self.0 < INV_REGULAR_COUNT
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Which items a slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlotFilter {
    #[default]
    Any,
    Weapon,
    Currency(Currency),
}

impl SlotFilter {
    /// Whether `stack` may be placed in a slot with this filter.
    pub fn accepts(self, catalog: &ItemCatalog, stack: &ItemStack) -> bool {
        if stack.is_empty() {
            return true;
        }
        match self {
            SlotFilter::Any => true,
            SlotFilter::Weapon => catalog
                .find(stack.item)
                .is_some_and(|p| p.class == ItemClass::Weapon),
            SlotFilter::Currency(currency) => catalog
                .find(stack.item)
                .is_some_and(|p| p.currency == Some(currency)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Slot {
    pub filter: SlotFilter,
    pub stack: ItemStack,
}

impl Slot {
    /// A filterless slot holding `stack`, for stacks outside any inventory.
    pub fn detached(stack: ItemStack) -> Self {
        Self {
            filter: SlotFilter::Any,
            stack,
        }
    }
}

/// Result of a single slot-to-slot transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferOutcome {
    /// Units moved (or that would move, in a dry run).
    pub moved: u32,
    /// Destination is at its stack limit afterwards.
    pub dst_full: bool,
}

impl TransferOutcome {
    #[inline]
    pub fn transferred(&self) -> bool {
        self.moved > 0
    }
}

/// Move units from `src` into `dst` following the stacking rules.
///
/// `limit == 0` means unbounded. With `dry_run` nothing is mutated.
fn transfer(
    catalog: &ItemCatalog,
    src: &mut Slot,
    dst: &mut Slot,
    limit: u32,
    skip_full: bool,
    dry_run: bool,
) -> TransferOutcome {
    if src.stack.count == 0 {
        return TransferOutcome::default();
    }
    let item = src.stack.item;
    if dst.stack.count > 0 && dst.stack.item != item {
        return TransferOutcome::default();
    }
    if !dst.filter.accepts(catalog, &src.stack) {
        return TransferOutcome::default();
    }

    let stack_limit = catalog.stack_limit(item);
    if dst.stack.count >= stack_limit {
        return TransferOutcome {
            moved: 0,
            dst_full: true,
        };
    }
    if skip_full && src.stack.count == stack_limit {
        return TransferOutcome::default();
    }

    let free_space = stack_limit - dst.stack.count;
    let mut moved = src.stack.count.min(free_space);
    if limit > 0 {
        moved = moved.min(limit);
    }

    let dst_count = dst.stack.count + moved;
    if !dry_run {
        src.stack = ItemStack::new(item, src.stack.count - moved);
        dst.stack = ItemStack::new(item, dst_count);
    }
    TransferOutcome {
        moved,
        dst_full: dst_count == stack_limit,
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// A player's slots plus replication bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InventoryRecord")]
pub struct Inventory {
    pub header: FacetHeader,
    /// Hotbar selection.
    pub selected_slot: SlotId,
    slots: Vec<Slot>,
    /// Contents changed since the replication layer last looked.
    pub dirty: bool,
    /// Dry-run mode: operations report success without mutating.
    pub skip_update: bool,
}

impl Default for Inventory {
    fn default() -> Self {
        let mut slots = vec![Slot::default(); SlotId::COUNT];
        slots[SlotId::COIN_COPPER.index()].filter = SlotFilter::Currency(Currency::Copper);
        slots[SlotId::COIN_SILVER.index()].filter = SlotFilter::Currency(Currency::Silver);
        slots[SlotId::COIN_GILDED.index()].filter = SlotFilter::Currency(Currency::Gilded);
        Self {
            header: FacetHeader {
                facet_type: FacetType::Inventory,
                ..FacetHeader::default()
            },
            selected_slot: SlotId::HOTBAR_0,
            slots,
            dirty: true,
            skip_update: false,
        }
    }
}

crate::impl_facet!(Inventory, FacetType::Inventory);

/// Unchecked wire form of [`Inventory`].
#[derive(Deserialize)]
struct InventoryRecord {
    header: FacetHeader,
    selected_slot: SlotId,
    slots: Vec<Slot>,
    dirty: bool,
    skip_update: bool,
}

impl TryFrom<InventoryRecord> for Inventory {
    type Error = String;

    fn try_from(record: InventoryRecord) -> Result<Self, Self::Error> {
        let inv = Inventory {
            header: record.header,
            selected_slot: record.selected_slot,
            slots: record.slots,
            dirty: record.dirty,
            skip_update: record.skip_update,
        };
        if !inv.is_well_formed() {
            return Err(format!(
                "inventory needs {} slots and a selection inside them, got {} slots with slot {} selected",
                SlotId::COUNT,
                inv.slots.len(),
                inv.selected_slot.0,
            ));
        }
        Ok(inv)
    }
}

impl Inventory {
    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id.index())
    }

    /// Contents of `id`, or the empty stack for an invalid id.
    pub fn stack(&self, id: SlotId) -> ItemStack {
        self.slot(id).map(|s| s.stack).unwrap_or_default()
    }

    pub fn cursor(&self) -> ItemStack {
        self.stack(SlotId::CURSOR)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Exactly [`SlotId::COUNT`] slots with the selection inside them.
    /// Sort and combine index the grid directly and rely on this.
    pub fn is_well_formed(&self) -> bool {
        self.slots.len() == SlotId::COUNT && self.selected_slot.index() < SlotId::COUNT
    }

    pub fn selected_stack(&self) -> ItemStack {
        self.stack(self.selected_slot)
    }

    /// Overwrite a slot's contents, e.g. from a replicated snapshot.
    ///
    /// Ignores the slot filter. Returns `false` for an invalid id.
    pub fn set_stack(&mut self, id: SlotId, stack: ItemStack) -> bool {
        match self.slots.get_mut(id.index()) {
            Some(slot) => {
                slot.stack = ItemStack::new(stack.item, stack.count);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Read and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Total units of `item` held across all slots, cursor included.
    pub fn count_of(&self, item: crate::items::ItemId) -> u64 {
        self.slots
            .iter()
            .filter(|s| s.stack.item == item)
            .map(|s| u64::from(s.stack.count))
            .sum()
    }

    fn slot_pair(&mut self, a: SlotId, b: SlotId) -> Option<(&mut Slot, &mut Slot)> {
        let (ia, ib) = (a.index(), b.index());
        if ia == ib || ia >= self.slots.len() || ib >= self.slots.len() {
            return None;
        }
        if ia < ib {
            let (lo, hi) = self.slots.split_at_mut(ib);
            Some((&mut lo[ia], &mut hi[0]))
        } else {
            let (lo, hi) = self.slots.split_at_mut(ia);
            Some((&mut hi[0], &mut lo[ib]))
        }
    }

    // -- transfer primitive -------------------------------------------------

    /// Move units from `src` to `dst`; see [`Inventory::transfer_slot_outcome`].
    pub fn transfer_slot(
        &mut self,
        catalog: &ItemCatalog,
        src: SlotId,
        dst: SlotId,
        limit: u32,
        skip_full: bool,
    ) -> bool {
        self.transfer_slot_outcome(catalog, src, dst, limit, skip_full)
            .transferred()
    }

    /// Move up to `limit` units (`0` = as many as fit) from `src` to `dst`.
    ///
    /// Nothing moves when `src` is empty, `dst` holds a different item, `dst`
    /// is full, `dst`'s filter rejects the item, or `skip_full` is set and
    /// `src` is a full stack.
    pub fn transfer_slot_outcome(
        &mut self,
        catalog: &ItemCatalog,
        src: SlotId,
        dst: SlotId,
        limit: u32,
        skip_full: bool,
    ) -> TransferOutcome {
        let dry_run = self.skip_update;
        let Some((src, dst)) = self.slot_pair(src, dst) else {
            return TransferOutcome::default();
        };
        let outcome = transfer(catalog, src, dst, limit, skip_full, dry_run);
        if outcome.transferred() && !dry_run {
            self.dirty = true;
        }
        outcome
    }

    /// Move units from a stack outside the inventory into slot `dst`.
    ///
    /// `stack` keeps whatever did not fit.
    pub fn transfer_from_stack(
        &mut self,
        catalog: &ItemCatalog,
        stack: &mut ItemStack,
        dst: SlotId,
        limit: u32,
    ) -> bool {
        let dry_run = self.skip_update;
        let Some(dst) = self.slots.get_mut(dst.index()) else {
            return false;
        };
        let mut src = Slot::detached(*stack);
        let outcome = transfer(catalog, &mut src, dst, limit, false, dry_run);
        if outcome.transferred() && !dry_run {
            *stack = src.stack;
            self.dirty = true;
        }
        outcome.transferred()
    }

    /// Exchange the contents of two slots.
    ///
    /// Refused in dry-run mode, for the same slot twice, and when either
    /// slot's filter rejects the incoming stack.
    pub fn swap_slots(&mut self, catalog: &ItemCatalog, a: SlotId, b: SlotId) -> bool {
        if self.skip_update {
            return false;
        }
        let Some((a, b)) = self.slot_pair(a, b) else {
            return false;
        };
        if !a.filter.accepts(catalog, &b.stack) || !b.filter.accepts(catalog, &a.stack) {
            return false;
        }
        std::mem::swap(&mut a.stack, &mut b.stack);
        self.dirty = true;
        true
    }

    // -- UI gestures --------------------------------------------------------

    /// Click on `slot_id`.
    ///
    /// A single click merges the cursor into the slot when both hold the same
    /// item, and otherwise swaps them. A double click gathers every other
    /// matching, non-full stack into the cursor (after first picking up the
    /// clicked slot if the cursor was empty), stopping once the cursor is full.
    pub fn slot_click(&mut self, catalog: &ItemCatalog, slot_id: SlotId, double_click: bool) -> bool {
        if slot_id == SlotId::CURSOR || self.slot(slot_id).is_none() {
            return false;
        }

        if !double_click {
            return if self.stack(slot_id).item == self.cursor().item {
                self.transfer_slot(catalog, SlotId::CURSOR, slot_id, 0, false)
            } else {
                self.swap_slots(catalog, SlotId::CURSOR, slot_id)
            };
        }

        if self.cursor().is_empty() {
            if self.stack(slot_id).is_empty() {
                return false;
            }
            self.swap_slots(catalog, SlotId::CURSOR, slot_id);
        }

        let mut success = false;
        for other in (0..SlotId::COUNT as u8).rev().map(SlotId) {
            if other == SlotId::CURSOR {
                continue;
            }
            let outcome = self.transfer_slot_outcome(catalog, other, SlotId::CURSOR, 0, true);
            success |= outcome.transferred();
            if outcome.dst_full {
                break;
            }
        }
        success
    }

    /// Scroll over `slot_id`: positive moves units from the cursor into the
    /// slot, negative moves them back into the cursor.
    pub fn slot_scroll(&mut self, catalog: &ItemCatalog, slot_id: SlotId, scroll: i32) -> bool {
        match scroll.cmp(&0) {
            Ordering::Equal => false,
            Ordering::Greater => {
                self.transfer_slot(catalog, SlotId::CURSOR, slot_id, scroll.unsigned_abs(), false)
            }
            Ordering::Less => {
                self.transfer_slot(catalog, slot_id, SlotId::CURSOR, scroll.unsigned_abs(), false)
            }
        }
    }

    /// Remove up to `count` units from `slot_id` into a detached stack.
    ///
    /// Returns the removed stack (empty if nothing moved, if `count` is zero,
    /// or in dry-run mode).
    pub fn slot_drop(&mut self, catalog: &ItemCatalog, slot_id: SlotId, count: u32) -> ItemStack {
        if count == 0 || self.skip_update {
            return ItemStack::EMPTY;
        }
        let Some(src) = self.slots.get_mut(slot_id.index()) else {
            return ItemStack::EMPTY;
        };
        let mut dropped = Slot::default();
        let outcome = transfer(catalog, src, &mut dropped, count, false, false);
        if outcome.transferred() {
            self.dirty = true;
        }
        dropped.stack
    }

    /// Stow a ground stack into whichever slots accept it, lowest id first.
    ///
    /// `stack` keeps the remainder. Returns `true` if anything was taken.
    pub fn pick_up(&mut self, catalog: &ItemCatalog, stack: &mut ItemStack) -> bool {
        if stack.is_empty() {
            return false;
        }
        let before = stack.count;
        for dst in (0..SlotId::COUNT as u8).map(SlotId) {
            if dst == SlotId::CURSOR {
                continue;
            }
            self.transfer_from_stack(catalog, stack, dst, 0);
            if stack.is_empty() {
                break;
            }
        }
        stack.count != before
    }

    // -- sort / combine -----------------------------------------------------

    /// Order two slots by item id with empty slots last.
    ///
    /// With `ignore_empty`, empty slots compare equal to everything.
    pub fn compare(a: &Slot, b: &Slot, ignore_empty: bool) -> Ordering {
        let (a, b) = (a.stack.item, b.stack.item);
        if a == b {
            Ordering::Equal
        } else if a.is_empty() {
            if ignore_empty {
                Ordering::Equal
            } else {
                Ordering::Greater
            }
        } else if b.is_empty() {
            if ignore_empty {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        } else {
            a.cmp(&b)
        }
    }

    /// Selection-sort the regular slots by item id.
    pub fn sort(&mut self, catalog: &ItemCatalog, ignore_empty: bool) {
        for a in 0..INV_REGULAR_COUNT {
            for b in (a + 1)..INV_REGULAR_COUNT {
                let order = Self::compare(
                    &self.slots[a as usize],
                    &self.slots[b as usize],
                    ignore_empty,
                );
                if order == Ordering::Greater {
                    self.swap_slots(catalog, SlotId(a), SlotId(b));
                }
            }
        }
    }

    /// Merge matching stacks in the regular slots toward the lowest slot.
    pub fn combine(&mut self, catalog: &ItemCatalog, ignore_empty: bool) {
        for a in 0..INV_REGULAR_COUNT {
            if ignore_empty && self.slots[a as usize].stack.is_empty() {
                continue;
            }
            for b in (a + 1)..INV_REGULAR_COUNT {
                if ignore_empty && self.slots[b as usize].stack.is_empty() {
                    continue;
                }
                self.transfer_slot(catalog, SlotId(b), SlotId(a), 0, false);
            }
        }
    }

    pub fn sort_and_combine(&mut self, catalog: &ItemCatalog, ignore_empty: bool) {
        self.sort(catalog, ignore_empty);
        self.combine(catalog, ignore_empty);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
