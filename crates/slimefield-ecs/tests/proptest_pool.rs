//! Property tests for facet pool operations.
//!
//! Random interleavings of alloc/free against a `BTreeMap` model: after every
//! step the pool must agree with the model on membership and payload, and the
//! id -> slot index must point at records owned by the right entity.

use std::collections::BTreeMap;

use proptest::prelude::*;
use slimefield_ecs::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
struct Payload {
    header: FacetHeader,
    value: i64,
}

impl Facet for Payload {
    const TYPE: FacetType = FacetType::Combat;

    fn header(&self) -> &FacetHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut FacetHeader {
        &mut self.header
    }
}

#[derive(Debug, Clone)]
enum PoolOp {
    Alloc(u32, i64),
    Free(u32),
}

fn pool_op_strategy() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        (1..64u32, any::<i64>()).prop_map(|(id, v)| PoolOp::Alloc(id, v)),
        (1..64u32).prop_map(PoolOp::Free),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn random_alloc_free_matches_model(ops in prop::collection::vec(pool_op_strategy(), 1..200)) {
        let mut pool = FacetPool::<Payload>::new();
        let mut model: BTreeMap<u32, i64> = BTreeMap::new();

        for op in ops {
            match op {
                PoolOp::Alloc(raw, value) => {
                    let id = EntityId::from_raw(raw);
                    match pool.alloc(id) {
                        Ok(record) => {
                            prop_assert!(!model.contains_key(&raw));
                            record.value = value;
                            model.insert(raw, value);
                        }
                        Err(DepotError::Duplicate { entity, facet_type }) => {
                            prop_assert!(model.contains_key(&raw));
                            prop_assert_eq!(entity, id);
                            prop_assert_eq!(facet_type, FacetType::Combat);
                        }
                        Err(other) => prop_assert!(false, "unexpected error {other}"),
                    }
                }
                PoolOp::Free(raw) => {
                    let removed = pool.free(EntityId::from_raw(raw));
                    let expected = model.remove(&raw);
                    prop_assert_eq!(removed.map(|r| r.value), expected);
                }
            }

            prop_assert!(pool.is_consistent());
            prop_assert_eq!(pool.len(), model.len());
        }

        for (&raw, &value) in &model {
            let id = EntityId::from_raw(raw);
            let record = pool.find(id);
            prop_assert!(record.is_some());
            let record = record.unwrap();
            prop_assert_eq!(record.entity_id(), id);
            prop_assert_eq!(record.header.facet_type, FacetType::Combat);
            prop_assert_eq!(record.value, value);
        }
    }

    #[test]
    fn allocator_never_reuses_live_ids(ops in prop::collection::vec(any::<bool>(), 1..300)) {
        let mut ids = EntityIdAllocator::new();
        let mut live: Vec<EntityId> = Vec::new();

        for alloc in ops {
            if alloc || live.is_empty() {
                let id = ids.allocate();
                prop_assert!(!id.is_none());
                prop_assert!(!live.contains(&id));
                live.push(id);
            } else {
                let id = live.swap_remove(0);
                prop_assert!(ids.deallocate(id));
            }
            prop_assert_eq!(ids.alive_count(), live.len());
        }
    }
}
