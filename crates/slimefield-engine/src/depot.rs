//! The facet depot: one [`FacetPool`] per facet type plus per-entity-type id
//! lists.
//!
//! All facet access goes through the depot by entity id. References it hands
//! out borrow the depot, so they cannot outlive an `alloc`/`free` on the same
//! pool; re-resolve the id instead of caching a reference.

use serde::{Deserialize, Serialize};
use slimefield_ecs::prelude::*;
use tracing::{debug, warn};

use crate::attach::Attach;
use crate::body::Body3D;
use crate::combat::Combat;
use crate::entity::{Entity, EntityState, EntityType};
use crate::inventory::Inventory;
use crate::sprite::Sprite;

// ---------------------------------------------------------------------------
// Pool lookup by facet type
// ---------------------------------------------------------------------------

/// A facet type stored in the [`FacetDepot`].
pub trait DepotFacet: Facet + Sized {
    fn pool(depot: &FacetDepot) -> &FacetPool<Self>;
    fn pool_mut(depot: &mut FacetDepot) -> &mut FacetPool<Self>;
}

macro_rules! depot_facet {
    ($ty:ty, $field:ident) => {
        impl DepotFacet for $ty {
            #[inline]
            fn pool(depot: &FacetDepot) -> &FacetPool<Self> {
                &depot.$field
            }
            #[inline]
            fn pool_mut(depot: &mut FacetDepot) -> &mut FacetPool<Self> {
                &mut depot.$field
            }
        }
    };
}

depot_facet!(Attach, attach);
depot_facet!(Body3D, body);
depot_facet!(Combat, combat);
depot_facet!(Entity, entity);
depot_facet!(Inventory, inventory);
depot_facet!(Sprite, sprite);

// ---------------------------------------------------------------------------
// FacetDepot
// ---------------------------------------------------------------------------

/// Owner of every facet record in a world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacetDepot {
    attach: FacetPool<Attach>,
    body: FacetPool<Body3D>,
    combat: FacetPool<Combat>,
    entity: FacetPool<Entity>,
    inventory: FacetPool<Inventory>,
    sprite: FacetPool<Sprite>,
    /// Ids of live entities, per [`EntityType`], in spawn order.
    entity_ids_by_type: [Vec<EntityId>; EntityType::COUNT],
}

/// Disjoint mutable borrows of every pool, for code that needs to touch
/// several facet types of the same entity at once.
pub struct DepotPoolsMut<'a> {
    pub attach: &'a mut FacetPool<Attach>,
    pub body: &'a mut FacetPool<Body3D>,
    pub combat: &'a mut FacetPool<Combat>,
    pub entity: &'a mut FacetPool<Entity>,
    pub inventory: &'a mut FacetPool<Inventory>,
    pub sprite: &'a mut FacetPool<Sprite>,
}

impl FacetDepot {
    pub fn new() -> Self {
        Self::default()
    }

    // -- typed facet access -------------------------------------------------

    /// Allocate a zeroed `T` facet for `id`.
    ///
    /// A second allocation of the same type fails with
    /// [`DepotError::Duplicate`] and leaves the existing facet untouched.
    pub fn alloc<T: DepotFacet>(&mut self, id: EntityId) -> Result<&mut T, DepotError> {
        match T::pool_mut(self).alloc(id) {
            Ok(facet) => Ok(facet),
            Err(err) => {
                warn!(entity = %id, facet = %T::TYPE, error = %err, "facet alloc failed");
                Err(err)
            }
        }
    }

    #[inline]
    pub fn find<T: DepotFacet>(&self, id: EntityId) -> Option<&T> {
        T::pool(self).find(id)
    }

    #[inline]
    pub fn find_mut<T: DepotFacet>(&mut self, id: EntityId) -> Option<&mut T> {
        T::pool_mut(self).find_mut(id)
    }

    /// Like [`find`](Self::find), but a missing facet is an error.
    pub fn require<T: DepotFacet>(&self, id: EntityId) -> Result<&T, DepotError> {
        self.find(id).ok_or(DepotError::MissingFacet {
            entity: id,
            facet_type: T::TYPE,
        })
    }

    /// Like [`find_mut`](Self::find_mut), but a missing facet is an error.
    pub fn require_mut<T: DepotFacet>(&mut self, id: EntityId) -> Result<&mut T, DepotError> {
        self.find_mut(id).ok_or(DepotError::MissingFacet {
            entity: id,
            facet_type: T::TYPE,
        })
    }

    /// Remove the `T` facet of `id`, if present.
    #[inline]
    pub fn free<T: DepotFacet>(&mut self, id: EntityId) -> Option<T> {
        T::pool_mut(self).free(id)
    }

    #[inline]
    pub fn pool<T: DepotFacet>(&self) -> &FacetPool<T> {
        T::pool(self)
    }

    #[inline]
    pub fn pool_mut<T: DepotFacet>(&mut self) -> &mut FacetPool<T> {
        T::pool_mut(self)
    }

    pub fn pools_mut(&mut self) -> DepotPoolsMut<'_> {
        DepotPoolsMut {
            attach: &mut self.attach,
            body: &mut self.body,
            combat: &mut self.combat,
            entity: &mut self.entity,
            inventory: &mut self.inventory,
            sprite: &mut self.sprite,
        }
    }

    // -- dynamic facet access -----------------------------------------------

    /// Whether `id` owns a facet of type `ty`.
    pub fn contains(&self, id: EntityId, ty: FacetType) -> bool {
        match ty {
            FacetType::Attach => self.attach.contains(id),
            FacetType::Body3D => self.body.contains(id),
            FacetType::Combat => self.combat.contains(id),
            FacetType::Entity => self.entity.contains(id),
            FacetType::Inventory => self.inventory.contains(id),
            FacetType::Sprite => self.sprite.contains(id),
        }
    }

    /// Free the facet of type `ty` owned by `id`. Returns `false` if absent.
    pub fn free_type(&mut self, id: EntityId, ty: FacetType) -> bool {
        match ty {
            FacetType::Attach => self.attach.free(id).is_some(),
            FacetType::Body3D => self.body.free(id).is_some(),
            FacetType::Combat => self.combat.free(id).is_some(),
            FacetType::Entity => self.entity.free(id).is_some(),
            FacetType::Inventory => self.inventory.free(id).is_some(),
            FacetType::Sprite => self.sprite.free(id).is_some(),
        }
    }

    // -- entities -----------------------------------------------------------

    /// Allocate the `Entity` facet for `id` and index it under `entity_type`.
    pub fn entity_alloc(
        &mut self,
        id: EntityId,
        entity_type: EntityType,
    ) -> Result<&mut Entity, DepotError> {
        self.alloc::<Entity>(id)?.state = EntityState::for_type(entity_type);
        self.entity_ids_by_type[entity_type.index()].push(id);
        debug!(entity = %id, kind = %entity_type, "entity allocated");
        self.require_mut::<Entity>(id)
    }

    #[inline]
    pub fn entity_find(&self, id: EntityId) -> Option<&Entity> {
        self.entity.find(id)
    }

    #[inline]
    pub fn entity_find_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entity.find_mut(id)
    }

    /// Free the entity and every facet it owns.
    ///
    /// An id without an `Entity` facet is logged and its other facets are
    /// still freed. Returns `true` if the `Entity` facet existed.
    pub fn entity_free(&mut self, id: EntityId) -> bool {
        let had_entity = match self.entity.find(id) {
            Some(entity) => {
                let list = &mut self.entity_ids_by_type[entity.entity_type().index()];
                if let Some(pos) = list.iter().position(|&e| e == id) {
                    list.remove(pos);
                }
                true
            }
            None => {
                warn!(entity = %id, "freeing entity that has no entity facet");
                false
            }
        };
        for ty in FacetType::ALL {
            self.free_type(id, ty);
        }
        had_entity
    }

    /// Live entities of `entity_type`, in spawn order.
    #[inline]
    pub fn entity_ids(&self, entity_type: EntityType) -> &[EntityId] {
        &self.entity_ids_by_type[entity_type.index()]
    }

    /// Number of live entities across all types.
    pub fn entity_count(&self) -> usize {
        self.entity.len()
    }

    /// Every pool agrees with its index, and the per-type lists match the
    /// `Entity` pool.
    pub fn is_consistent(&self) -> bool {
        let pools_ok = self.attach.is_consistent()
            && self.body.is_consistent()
            && self.combat.is_consistent()
            && self.entity.is_consistent()
            && self.inventory.is_consistent()
            && self.sprite.is_consistent()
            && self.inventory.iter().all(Inventory::is_well_formed);
        let listed: usize = self.entity_ids_by_type.iter().map(Vec::len).sum();
        let lists_ok = listed == self.entity.len()
            && EntityType::ALL.iter().all(|&ty| {
                self.entity_ids(ty).iter().all(|&id| {
                    self.entity
                        .find(id)
                        .map(|e| e.entity_type() == ty)
                        .unwrap_or(false)
                })
            });
        pools_ok && lists_ok
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn id(raw: u32) -> EntityId {
        EntityId::from_raw(raw)
    }

    #[test]
    fn alloc_then_find_has_owner_and_type() {
        let mut depot = FacetDepot::new();
        depot.alloc::<Body3D>(id(7)).unwrap().speed = 2.0;

        let body = depot.find::<Body3D>(id(7)).unwrap();
        assert_eq!(body.entity_id(), id(7));
        assert_eq!(body.header.facet_type, FacetType::Body3D);
        assert_eq!(body.speed, 2.0);
        assert!(depot.contains(id(7), FacetType::Body3D));
        assert!(!depot.contains(id(7), FacetType::Combat));
    }

    #[test]
    fn duplicate_alloc_keeps_first_facet() {
        let mut depot = FacetDepot::new();
        depot.alloc::<Combat>(id(1)).unwrap().set_hit_points(10.0);

        let err = depot.alloc::<Combat>(id(1)).unwrap_err();
        assert_eq!(
            err,
            DepotError::Duplicate {
                entity: id(1),
                facet_type: FacetType::Combat
            }
        );
        assert_eq!(depot.find::<Combat>(id(1)).unwrap().hit_points, 10.0);
    }

    #[test]
    fn freeing_one_facet_keeps_others_findable() {
        let mut depot = FacetDepot::new();
        for raw in 1..=4 {
            depot
                .alloc::<Body3D>(id(raw))
                .unwrap()
                .teleport(Vec3::splat(raw as f32), 0.0);
        }
        // id 4 sits in the last slot and moves into id 1's slot.
        assert!(depot.free_type(id(1), FacetType::Body3D));
        assert!(!depot.free_type(id(1), FacetType::Body3D));

        for raw in 2..=4 {
            let body = depot.find::<Body3D>(id(raw)).unwrap();
            assert_eq!(body.entity_id(), id(raw));
            assert_eq!(body.position(), Vec3::splat(raw as f32));
        }
        assert!(depot.is_consistent());
    }

    #[test]
    fn entity_alloc_indexes_by_type() {
        let mut depot = FacetDepot::new();
        depot.entity_alloc(id(1), EntityType::Slime).unwrap();
        depot.entity_alloc(id(2), EntityType::Player).unwrap();
        depot.entity_alloc(id(3), EntityType::Slime).unwrap();

        assert_eq!(depot.entity_ids(EntityType::Slime), &[id(1), id(3)]);
        assert_eq!(depot.entity_ids(EntityType::Player), &[id(2)]);
        assert!(matches!(
            depot.entity_find(id(1)).unwrap().state,
            EntityState::Slime { .. }
        ));
        assert!(depot.entity_alloc(id(3), EntityType::Townfolk).is_err());
        assert_eq!(depot.entity_ids(EntityType::Townfolk), &[] as &[EntityId]);
        assert!(depot.is_consistent());
    }

    #[test]
    fn entity_free_removes_every_facet() {
        let mut depot = FacetDepot::new();
        depot.entity_alloc(id(5), EntityType::Player).unwrap();
        depot.alloc::<Body3D>(id(5)).unwrap();
        depot.alloc::<Inventory>(id(5)).unwrap();
        depot.alloc::<Sprite>(id(5)).unwrap();

        assert!(depot.entity_free(id(5)));
        for ty in FacetType::ALL {
            assert!(!depot.contains(id(5), ty));
        }
        assert!(depot.entity_ids(EntityType::Player).is_empty());
        assert!(depot.is_consistent());
    }

    #[test]
    fn entity_free_without_entity_facet_still_cleans_up() {
        let mut depot = FacetDepot::new();
        depot.alloc::<Combat>(id(9)).unwrap();
        depot.alloc::<Attach>(id(9)).unwrap();

        assert!(!depot.entity_free(id(9)));
        assert!(!depot.contains(id(9), FacetType::Combat));
        assert!(!depot.contains(id(9), FacetType::Attach));
    }

    #[test]
    fn require_reports_missing_facet() {
        let depot = FacetDepot::new();
        assert_eq!(
            depot.require::<Sprite>(id(3)).unwrap_err(),
            DepotError::MissingFacet {
                entity: id(3),
                facet_type: FacetType::Sprite
            }
        );
    }

    #[test]
    fn serialized_depot_roundtrips() {
        let mut depot = FacetDepot::new();
        depot.entity_alloc(id(1), EntityType::Townfolk).unwrap().set_name("Ada");
        depot.alloc::<Combat>(id(1)).unwrap().set_hit_points(1.0);

        let json = serde_json::to_string(&depot).unwrap();
        let restored: FacetDepot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.entity_find(id(1)).unwrap().name(), "Ada");
        assert_eq!(restored.entity_ids(EntityType::Townfolk), &[id(1)]);
        assert!(restored.is_consistent());
    }
}
