//! # Chunk Coordinates
//!
//! The world is an infinite grid of chunk columns. A [`ChunkCoord`] names
//! one column and is the only key used by the active registry, the
//! eviction cache and the persistence store.
//!
//! ## Axes
//!
//! Y is up. `y = 0` is the world floor and `y = CHUNK_HEIGHT - 1` the sky.
//! Chunks tile the X/Z plane only.

// Block and chunk coordinates convert between i32 and usize
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

/// Chunk width (X) in blocks.
pub const CHUNK_WIDTH: usize = 16;

/// Chunk depth (Z) in blocks.
pub const CHUNK_DEPTH: usize = 16;

/// Chunk height (Y) in blocks.
pub const CHUNK_HEIGHT: usize = 256;

/// Total cells per chunk.
pub const CELLS_PER_CHUNK: usize = CHUNK_WIDTH * CHUNK_DEPTH * CHUNK_HEIGHT;

/// Chunk coordinate (identifies a chunk column in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Z coordinate (in chunks, not blocks).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Converts world block coordinates to the chunk containing them.
    #[inline]
    #[must_use]
    pub const fn from_block(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(CHUNK_WIDTH as i32),
            z: block_z.div_euclid(CHUNK_DEPTH as i32),
        }
    }

    /// Converts a continuous world position to the chunk containing it.
    ///
    /// Uses floor division, so `-0.5` lands in chunk `-1`.
    #[inline]
    #[must_use]
    pub fn from_world(world_x: f64, world_z: f64) -> Self {
        Self::from_block(world_x.floor() as i32, world_z.floor() as i32)
    }

    /// World X of the chunk's origin corner.
    #[inline]
    #[must_use]
    pub const fn origin_x(self) -> i32 {
        self.x * CHUNK_WIDTH as i32
    }

    /// World Z of the chunk's origin corner.
    #[inline]
    #[must_use]
    pub const fn origin_z(self) -> i32 {
        self.z * CHUNK_DEPTH as i32
    }

    /// Returns the lateral neighbor on the given side.
    #[inline]
    #[must_use]
    pub const fn neighbor(self, side: Side) -> Self {
        let (dx, dz) = side.offset();
        Self::new(self.x + dx, self.z + dz)
    }

    /// Chebyshev distance in chunks.
    #[inline]
    #[must_use]
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        if dx > dz { dx } else { dz }
    }
}

/// One of the four lateral sides of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Toward +Z.
    Front = 0,
    /// Toward -Z.
    Back = 1,
    /// Toward -X.
    Left = 2,
    /// Toward +X.
    Right = 3,
}

impl Side {
    /// All four sides, in link-slot order.
    pub const ALL: [Self; 4] = [Self::Front, Self::Back, Self::Left, Self::Right];

    /// Chunk offset `(dx, dz)` toward this side.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Front => (0, 1),
            Self::Back => (0, -1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// The side facing back at this one.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Slot index for per-side arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_block_floors_negative() {
        assert_eq!(ChunkCoord::from_block(0, 0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_block(15, 15), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_block(16, -1), ChunkCoord::new(1, -1));
        assert_eq!(ChunkCoord::from_block(-16, -17), ChunkCoord::new(-1, -2));
    }

    #[test]
    fn test_from_world_floors_fractions() {
        assert_eq!(ChunkCoord::from_world(-0.5, 0.5), ChunkCoord::new(-1, 0));
        assert_eq!(ChunkCoord::from_world(31.99, -16.0), ChunkCoord::new(1, -1));
    }

    #[test]
    fn test_origin() {
        let coord = ChunkCoord::new(-2, 3);
        assert_eq!(coord.origin_x(), -32);
        assert_eq!(coord.origin_z(), 48);
    }

    #[test]
    fn test_neighbors_are_symmetric() {
        let coord = ChunkCoord::new(4, -7);
        for side in Side::ALL {
            let other = coord.neighbor(side);
            assert_eq!(other.neighbor(side.opposite()), coord);
            assert_eq!(coord.chebyshev(other), 1);
        }
    }
}
