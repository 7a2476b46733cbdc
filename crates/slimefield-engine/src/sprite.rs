//! `Sprite` facet: which sprite an entity shows, how big, and facing where.
//!
//! Sprite definitions live in an external catalog; the facet only stores the
//! definition id plus the frame height the simulation needs for centers and
//! attach points.

use serde::{Deserialize, Serialize};
use slimefield_ecs::facet::{FacetHeader, FacetType};

use crate::math::{Vec2, Vec3};

/// Eight-way facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    #[default]
    South,
    West,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

impl Direction {
    /// Facing for a ground-plane offset (`+y` is south). A zero offset, or a
    /// NaN component, yields `None`.
    pub fn from_offset(offset: Vec2) -> Option<Direction> {
        let (x, y) = (offset.x, offset.y);
        let dir = if x > 0.0 {
            if y > 0.0 {
                Direction::SouthEast
            } else if y < 0.0 {
                Direction::NorthEast
            } else {
                Direction::East
            }
        } else if x < 0.0 {
            if y > 0.0 {
                Direction::SouthWest
            } else if y < 0.0 {
                Direction::NorthWest
            } else {
                Direction::West
            }
        } else if y > 0.0 {
            Direction::South
        } else if y < 0.0 {
            Direction::North
        } else {
            return None;
        };
        Some(dir)
    }
}

/// Opaque id of a sprite definition in the external catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpriteDefId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub header: FacetHeader,
    pub sprite_def: Option<SpriteDefId>,
    pub scale: f32,
    /// Unscaled frame height in pixels.
    pub height: f32,
    pub direction: Direction,
    pub anim_frame: u32,
    pub anim_frame_started_at: f64,
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            header: FacetHeader {
                facet_type: FacetType::Sprite,
                ..FacetHeader::default()
            },
            sprite_def: None,
            scale: 1.0,
            height: 0.0,
            direction: Direction::default(),
            anim_frame: 0,
            anim_frame_started_at: 0.0,
        }
    }
}

crate::impl_facet!(Sprite, FacetType::Sprite);

impl Sprite {
    /// Offset of the sprite's visual center from the body's ground position.
    pub fn center(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.height * self.scale * 0.5)
    }

    /// Offset of the top of the sprite from the body's ground position.
    pub fn top_center(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.height * self.scale)
    }

    /// Turn toward `offset`. Changing direction restarts the animation.
    ///
    /// Returns `true` if the facing changed.
    pub fn set_direction(&mut self, offset: Vec2) -> bool {
        match Direction::from_offset(offset) {
            Some(dir) if dir != self.direction => {
                self.direction = dir;
                self.anim_frame = 0;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_way_facing() {
        let cases = [
            (Vec2::new(1.0, 0.0), Direction::East),
            (Vec2::new(-1.0, 0.0), Direction::West),
            (Vec2::new(0.0, 1.0), Direction::South),
            (Vec2::new(0.0, -1.0), Direction::North),
            (Vec2::new(1.0, 1.0), Direction::SouthEast),
            (Vec2::new(1.0, -1.0), Direction::NorthEast),
            (Vec2::new(-1.0, 1.0), Direction::SouthWest),
            (Vec2::new(-1.0, -1.0), Direction::NorthWest),
        ];
        for (offset, expected) in cases {
            assert_eq!(Direction::from_offset(offset), Some(expected));
        }
        assert_eq!(Direction::from_offset(Vec2::ZERO), None);
    }

    #[test]
    fn turning_resets_animation() {
        let mut sprite = Sprite {
            anim_frame: 3,
            ..Sprite::default()
        };
        assert!(sprite.set_direction(Vec2::new(-2.0, 0.0)));
        assert_eq!(sprite.direction, Direction::West);
        assert_eq!(sprite.anim_frame, 0);

        sprite.anim_frame = 2;
        assert!(!sprite.set_direction(Vec2::new(-5.0, 0.0)));
        assert_eq!(sprite.anim_frame, 2);
        assert!(!sprite.set_direction(Vec2::ZERO));
    }

    #[test]
    fn center_scales_with_sprite() {
        let sprite = Sprite {
            height: 32.0,
            scale: 2.0,
            ..Sprite::default()
        };
        assert_eq!(sprite.center(), Vec3::new(0.0, 0.0, 32.0));
        assert_eq!(sprite.top_center(), Vec3::new(0.0, 0.0, 64.0));
    }
}
