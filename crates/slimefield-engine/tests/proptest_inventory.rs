//! Property tests for inventory slot operations.
//!
//! Random sequences of pick-up, click, scroll, transfer, swap, drop, and
//! sort must never create or destroy items, overfill a stack, or put an item
//! into a slot whose filter rejects it.

use std::collections::BTreeMap;

use proptest::prelude::*;
use slimefield_engine::prelude::*;

const ITEMS: [ItemId; 6] = [
    ItemCatalog::COPPER,
    ItemCatalog::SILVER,
    ItemCatalog::GILDED,
    ItemCatalog::GEM,
    ItemCatalog::SWORD,
    ItemCatalog::SLIME_GOO,
];

#[derive(Debug, Clone)]
enum InvOp {
    PickUp(usize, u32),
    Click(u8, bool),
    Scroll(u8, i32),
    Transfer(u8, u8, u32),
    Swap(u8, u8),
    Drop(u8, u32),
    SortCombine(bool),
}

fn slot_strategy() -> impl Strategy<Value = u8> {
    0..SlotId::COUNT as u8
}

fn inv_op_strategy() -> impl Strategy<Value = InvOp> {
    prop_oneof![
        3 => (0..ITEMS.len(), 1..250u32).prop_map(|(i, n)| InvOp::PickUp(i, n)),
        2 => (slot_strategy(), any::<bool>()).prop_map(|(s, d)| InvOp::Click(s, d)),
        1 => (slot_strategy(), -20..20i32).prop_map(|(s, n)| InvOp::Scroll(s, n)),
        2 => (slot_strategy(), slot_strategy(), 0..60u32).prop_map(|(a, b, n)| InvOp::Transfer(a, b, n)),
        1 => (slot_strategy(), slot_strategy()).prop_map(|(a, b)| InvOp::Swap(a, b)),
        1 => (slot_strategy(), 0..60u32).prop_map(|(s, n)| InvOp::Drop(s, n)),
        1 => any::<bool>().prop_map(InvOp::SortCombine),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1_000))]

    #[test]
    fn slot_operations_conserve_items(ops in prop::collection::vec(inv_op_strategy(), 1..120)) {
        let catalog = ItemCatalog::builtin();
        let mut inv = Inventory::default();
        let mut held: BTreeMap<ItemId, u64> = BTreeMap::new();

        for op in ops {
            match op {
                InvOp::PickUp(i, n) => {
                    let mut stack = ItemStack::new(ITEMS[i], n);
                    inv.pick_up(&catalog, &mut stack);
                    prop_assert!(stack.count <= n);
                    *held.entry(ITEMS[i]).or_default() += u64::from(n - stack.count);
                }
                InvOp::Click(s, double) => {
                    inv.slot_click(&catalog, SlotId(s), double);
                }
                InvOp::Scroll(s, n) => {
                    inv.slot_scroll(&catalog, SlotId(s), n);
                }
                InvOp::Transfer(a, b, n) => {
                    inv.transfer_slot(&catalog, SlotId(a), SlotId(b), n, false);
                }
                InvOp::Swap(a, b) => {
                    inv.swap_slots(&catalog, SlotId(a), SlotId(b));
                }
                InvOp::Drop(s, n) => {
                    let dropped = inv.slot_drop(&catalog, SlotId(s), n);
                    prop_assert!(dropped.count <= n);
                    if !dropped.is_empty() {
                        let entry = held.entry(dropped.item).or_default();
                        prop_assert!(*entry >= u64::from(dropped.count));
                        *entry -= u64::from(dropped.count);
                    }
                }
                InvOp::SortCombine(ignore_empty) => {
                    inv.sort_and_combine(&catalog, ignore_empty);
                }
            }

            for item in ITEMS {
                prop_assert_eq!(inv.count_of(item), held.get(&item).copied().unwrap_or(0));
            }
            for slot in inv.slots() {
                if slot.stack.is_empty() {
                    continue;
                }
                prop_assert!(slot.stack.count <= catalog.stack_limit(slot.stack.item));
                prop_assert!(slot.filter.accepts(&catalog, &slot.stack));
            }
        }
    }

    #[test]
    fn sort_leaves_regular_slots_ordered(
        picks in prop::collection::vec((0..ITEMS.len(), 1..80u32), 1..40),
    ) {
        let catalog = ItemCatalog::builtin();
        let mut inv = Inventory::default();
        for (i, n) in picks {
            let mut stack = ItemStack::new(ITEMS[i], n);
            inv.pick_up(&catalog, &mut stack);
        }
        inv.sort(&catalog, false);

        let regular = &inv.slots()[..SlotId::COIN_COPPER.index()];
        for pair in regular.windows(2) {
            prop_assert_ne!(
                Inventory::compare(&pair[0], &pair[1], false),
                std::cmp::Ordering::Greater
            );
        }
    }
}
