//! `Attach` facet: named offsets from an entity's center.

use serde::{Deserialize, Serialize};
use slimefield_ecs::facet::{FacetHeader, FacetType};

use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachPoint {
    Gut,
    Head,
    Hand,
}

impl AttachPoint {
    pub const COUNT: usize = 3;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attach {
    pub header: FacetHeader,
    /// Offset of each [`AttachPoint`] from the entity's world center.
    pub points: [Vec3; AttachPoint::COUNT],
}

crate::impl_facet!(Attach, FacetType::Attach);

impl Attach {
    #[inline]
    pub fn offset(&self, point: AttachPoint) -> Vec3 {
        self.points[point.index()]
    }

    #[inline]
    pub fn set(&mut self, point: AttachPoint, offset: Vec3) {
        self.points[point.index()] = offset;
    }
}
