//! Block-space geometry: offsets, absolute locations, facings and the four
//! yaw rotations about the vertical axis.
//!
//! Blueprint vectors are written facing [`Facing::East`] (+x is "forward").
//! Rotating a vector by [`BlockRotation::Rotate90`] turns it clockwise when
//! seen from above, so forward becomes [`Facing::South`] (+z).

use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};

// ---------------------------------------------------------------------------
// Facing
// ---------------------------------------------------------------------------

/// The six faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl Facing {
    /// Unit offset for this face.
    pub fn vector(self) -> BlockVector {
        match self {
            Facing::North => BlockVector::new(0, 0, -1),
            Facing::East => BlockVector::new(1, 0, 0),
            Facing::South => BlockVector::new(0, 0, 1),
            Facing::West => BlockVector::new(-1, 0, 0),
            Facing::Up => BlockVector::new(0, 1, 0),
            Facing::Down => BlockVector::new(0, -1, 0),
        }
    }

    pub fn opposite(self) -> Facing {
        match self {
            Facing::North => Facing::South,
            Facing::East => Facing::West,
            Facing::South => Facing::North,
            Facing::West => Facing::East,
            Facing::Up => Facing::Down,
            Facing::Down => Facing::Up,
        }
    }
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Yaw rotation applied to a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockRotation {
    /// Facing east, the orientation blueprints are authored in.
    #[default]
    Rotate0,
    /// 90 degrees clockwise, facing south.
    Rotate90,
    /// 180 degrees, facing west.
    Rotate180,
    /// 270 degrees clockwise, facing north.
    Rotate270,
}

impl BlockRotation {
    /// All four rotations, in detection order.
    pub fn all() -> [BlockRotation; 4] {
        [
            BlockRotation::Rotate0,
            BlockRotation::Rotate90,
            BlockRotation::Rotate180,
            BlockRotation::Rotate270,
        ]
    }

    /// Position of this rotation in [`BlockRotation::all`].
    pub fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Self {
        Self::all()[index % 4]
    }

    /// The direction a blueprint's forward (+x) axis points under this rotation.
    pub fn yaw_facing(self) -> Facing {
        match self {
            BlockRotation::Rotate0 => Facing::East,
            BlockRotation::Rotate90 => Facing::South,
            BlockRotation::Rotate180 => Facing::West,
            BlockRotation::Rotate270 => Facing::North,
        }
    }

    /// The rotation whose yaw facing is the given horizontal face.
    pub fn from_facing(facing: Facing) -> Option<Self> {
        match facing {
            Facing::East => Some(BlockRotation::Rotate0),
            Facing::South => Some(BlockRotation::Rotate90),
            Facing::West => Some(BlockRotation::Rotate180),
            Facing::North => Some(BlockRotation::Rotate270),
            Facing::Up | Facing::Down => None,
        }
    }

    pub fn opposite(self) -> Self {
        self.compose(BlockRotation::Rotate180)
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        self.compose(BlockRotation::Rotate90)
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_ccw(self) -> Self {
        self.compose(BlockRotation::Rotate270)
    }

    /// Apply `other` after `self`.
    pub fn compose(self, other: BlockRotation) -> Self {
        Self::from_index(self.index() + other.index())
    }

    /// The rotation `r` such that `base.compose(r) == self`.
    pub fn relative_to(self, base: BlockRotation) -> Self {
        Self::from_index(self.index() + 4 - base.index())
    }
}

// ---------------------------------------------------------------------------
// Vectors and locations
// ---------------------------------------------------------------------------

/// A relative offset between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockVector {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockVector {
    pub const ZERO: BlockVector = BlockVector { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn scaled(self, n: i32) -> Self {
        Self::new(self.x * n, self.y * n, self.z * n)
    }

    /// Rotate about the vertical axis.
    pub fn rotated(self, rotation: BlockRotation) -> Self {
        let BlockVector { x, y, z } = self;
        match rotation {
            BlockRotation::Rotate0 => self,
            BlockRotation::Rotate90 => Self::new(-z, y, x),
            BlockRotation::Rotate180 => Self::new(-x, y, -z),
            BlockRotation::Rotate270 => Self::new(z, y, -x),
        }
    }
}

impl From<Facing> for BlockVector {
    fn from(facing: Facing) -> Self {
        facing.vector()
    }
}

impl Add for BlockVector {
    type Output = BlockVector;

    fn add(self, rhs: BlockVector) -> BlockVector {
        BlockVector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for BlockVector {
    type Output = BlockVector;

    fn sub(self, rhs: BlockVector) -> BlockVector {
        BlockVector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for BlockVector {
    type Output = BlockVector;

    fn neg(self) -> BlockVector {
        BlockVector::new(-self.x, -self.y, -self.z)
    }
}

/// An absolute block coordinate in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockLocation {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockLocation {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn relative(self, v: BlockVector) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }

    /// Step `n` blocks towards a face.
    pub fn step(self, facing: Facing, n: i32) -> Self {
        self.relative(facing.vector().scaled(n))
    }

    /// The vector that takes `origin` to `self`.
    pub fn offset_from(self, origin: BlockLocation) -> BlockVector {
        BlockVector::new(self.x - origin.x, self.y - origin.y, self.z - origin.z)
    }
}

impl Add<BlockVector> for BlockLocation {
    type Output = BlockLocation;

    fn add(self, rhs: BlockVector) -> BlockLocation {
        self.relative(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_cycle() {
        let r = BlockRotation::Rotate0;
        assert_eq!(r.rotate_cw(), BlockRotation::Rotate90);
        assert_eq!(r.rotate_cw().rotate_cw().rotate_cw().rotate_cw(), r);
        assert_eq!(r.rotate_ccw(), BlockRotation::Rotate270);
    }

    #[test]
    fn yaw_facing_matches_rotated_forward() {
        for rotation in BlockRotation::all() {
            let forward = BlockVector::new(1, 0, 0).rotated(rotation);
            assert_eq!(forward, rotation.yaw_facing().vector());
            assert_eq!(BlockRotation::from_facing(rotation.yaw_facing()), Some(rotation));
        }
    }

    #[test]
    fn opposite_faces_backwards() {
        for rotation in BlockRotation::all() {
            assert_eq!(rotation.opposite().yaw_facing(), rotation.yaw_facing().opposite());
        }
    }

    #[test]
    fn relative_to_inverts_compose() {
        for a in BlockRotation::all() {
            for b in BlockRotation::all() {
                assert_eq!(b.compose(a.relative_to(b)), a);
            }
        }
    }

    #[test]
    fn rotation_keeps_height() {
        let v = BlockVector::new(2, -1, 1);
        for rotation in BlockRotation::all() {
            assert_eq!(v.rotated(rotation).y, -1);
        }
        assert_eq!(v.rotated(BlockRotation::Rotate90), BlockVector::new(-1, -1, 2));
    }

    #[test]
    fn location_arithmetic() {
        let a = BlockLocation::new(10, 64, -3);
        let b = a.step(Facing::West, 2);
        assert_eq!(b, BlockLocation::new(8, 64, -3));
        assert_eq!(b.offset_from(a), BlockVector::new(-2, 0, 0));
        assert_eq!(a + BlockVector::new(0, 1, 0), a.step(Facing::Up, 1));
    }

    #[test]
    fn vertical_facings_have_no_rotation() {
        assert_eq!(BlockRotation::from_facing(Facing::Up), None);
        assert_eq!(BlockRotation::from_facing(Facing::Down), None);
    }
}
