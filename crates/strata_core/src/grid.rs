//! # Block Grid
//!
//! A chunk's cells: `CHUNK_WIDTH x CHUNK_HEIGHT x CHUNK_DEPTH` optional
//! block kinds, stored flat in `[y][z][x]` order.
//!
//! Out-of-range reads return `None` and out-of-range writes are ignored.
//! Neighbor lookups routinely read one cell past an edge.

// Block and chunk coordinates convert between i32 and usize
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use crate::block::BlockKind;
use crate::coord::{CELLS_PER_CHUNK, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH};
use thiserror::Error;

/// The full cell array of one chunk.
#[derive(Clone, PartialEq, Eq)]
pub struct BlockGrid {
    cells: Box<[Option<BlockKind>]>,
}

impl BlockGrid {
    /// Creates an all-empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: vec![None; CELLS_PER_CHUNK].into_boxed_slice(),
        }
    }

    /// Builds a grid from a flat `[y][z][x]` cell vector.
    ///
    /// Returns `None` unless the vector holds exactly one chunk of cells.
    #[must_use]
    pub fn from_cells(cells: Vec<Option<BlockKind>>) -> Option<Self> {
        (cells.len() == CELLS_PER_CHUNK).then(|| Self {
            cells: cells.into_boxed_slice(),
        })
    }

    /// Flat index of an in-range cell.
    #[inline]
    #[must_use]
    pub const fn index(x: usize, y: usize, z: usize) -> usize {
        (y * CHUNK_DEPTH + z) * CHUNK_WIDTH + x
    }

    /// Whether local coordinates address a cell.
    #[inline]
    #[must_use]
    pub const fn in_bounds(x: usize, y: usize, z: usize) -> bool {
        x < CHUNK_WIDTH && y < CHUNK_HEIGHT && z < CHUNK_DEPTH
    }

    /// Reads a cell. Out of range reads as empty.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<BlockKind> {
        if Self::in_bounds(x, y, z) {
            self.cells[Self::index(x, y, z)]
        } else {
            None
        }
    }

    /// Reads a cell from signed coordinates. Negative reads as empty.
    #[inline]
    #[must_use]
    pub fn get_signed(&self, x: i32, y: i32, z: i32) -> Option<BlockKind> {
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        self.get(x as usize, y as usize, z as usize)
    }

    /// Writes a cell. Returns `true` if the stored value changed.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: Option<BlockKind>) -> bool {
        if !Self::in_bounds(x, y, z) {
            return false;
        }
        let cell = &mut self.cells[Self::index(x, y, z)];
        let changed = *cell != block;
        *cell = block;
        changed
    }

    /// Highest non-empty `y` in a column.
    #[must_use]
    pub fn surface_height(&self, x: usize, z: usize) -> Option<usize> {
        (0..CHUNK_HEIGHT).rev().find(|&y| self.get(x, y, z).is_some())
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Counts cells of one kind.
    #[must_use]
    pub fn count(&self, kind: BlockKind) -> usize {
        self.cells.iter().filter(|cell| **cell == Some(kind)).count()
    }

    /// Raw `[y][z][x]` cells.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Option<BlockKind>] {
        &self.cells
    }

    /// Raw mutable `[y][z][x]` cells.
    #[inline]
    pub fn cells_mut(&mut self) -> &mut [Option<BlockKind>] {
        &mut self.cells
    }

    /// Encodes every cell as its block id (`0` for empty).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells
            .iter()
            .map(|cell| cell.map_or(0, BlockKind::id))
            .collect()
    }

    /// Decodes the output of [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`GridDecodeError`] on a wrong length or an unknown block id.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GridDecodeError> {
        if bytes.len() != CELLS_PER_CHUNK {
            return Err(GridDecodeError::Length(bytes.len()));
        }
        let mut cells = Vec::with_capacity(CELLS_PER_CHUNK);
        for (offset, &id) in bytes.iter().enumerate() {
            if id == 0 {
                cells.push(None);
                continue;
            }
            match BlockKind::from_id(id) {
                Some(kind) => cells.push(Some(kind)),
                None => return Err(GridDecodeError::UnknownBlock { offset, id }),
            }
        }
        Ok(Self {
            cells: cells.into_boxed_slice(),
        })
    }
}

impl Default for BlockGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BlockGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockGrid")
            .field("occupied", &self.occupied())
            .finish()
    }
}

/// Why a byte buffer is not a valid grid.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum GridDecodeError {
    /// The buffer does not hold exactly one chunk of cells.
    #[error("expected {CELLS_PER_CHUNK} cells, found {0}")]
    Length(usize),
    /// A cell names no known block kind.
    #[error("unknown block id {id} at cell {offset}")]
    UnknownBlock {
        /// Cell offset in the buffer.
        offset: usize,
        /// The offending id.
        id: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_silent() {
        let mut grid = BlockGrid::new();
        assert!(!grid.set(CHUNK_WIDTH, 0, 0, Some(BlockKind::Stone)));
        assert!(!grid.set(0, CHUNK_HEIGHT, 0, Some(BlockKind::Stone)));
        assert_eq!(grid.get(0, 0, CHUNK_DEPTH), None);
        assert_eq!(grid.get_signed(-1, 5, 5), None);
        assert_eq!(grid.occupied(), 0);
    }

    #[test]
    fn test_set_reports_change() {
        let mut grid = BlockGrid::new();
        assert!(grid.set(3, 10, 4, Some(BlockKind::Dirt)));
        assert!(!grid.set(3, 10, 4, Some(BlockKind::Dirt)));
        assert!(grid.set(3, 10, 4, None));
    }

    #[test]
    fn test_surface_height() {
        let mut grid = BlockGrid::new();
        assert_eq!(grid.surface_height(0, 0), None);
        grid.set(0, 0, 0, Some(BlockKind::Bedrock));
        grid.set(0, 70, 0, Some(BlockKind::Grass));
        assert_eq!(grid.surface_height(0, 0), Some(70));
    }

    #[test]
    fn test_bytes_reject_bad_input() {
        assert_eq!(
            BlockGrid::from_bytes(&[0; 10]).err(),
            Some(GridDecodeError::Length(10))
        );
        let mut bytes = BlockGrid::new().to_bytes();
        bytes[42] = 99;
        assert_eq!(
            BlockGrid::from_bytes(&bytes).err(),
            Some(GridDecodeError::UnknownBlock { offset: 42, id: 99 })
        );
        assert_eq!(GridDecodeError::Length(10).to_string(), "expected 65536 cells, found 10");
        assert_eq!(
            GridDecodeError::UnknownBlock { offset: 42, id: 99 }.to_string(),
            "unknown block id 99 at cell 42"
        );
    }

    #[test]
    fn test_bytes_preserve_every_kind() {
        let mut grid = BlockGrid::new();
        for (i, kind) in BlockKind::ALL.iter().enumerate() {
            grid.set(i % CHUNK_WIDTH, i, i / CHUNK_WIDTH, Some(*kind));
        }
        let decoded = BlockGrid::from_bytes(&grid.to_bytes()).expect("valid grid");
        assert!(decoded == grid);
    }

    #[test]
    fn test_from_cells_checks_length() {
        assert!(BlockGrid::from_cells(vec![None; 3]).is_none());
        assert!(BlockGrid::from_cells(vec![None; CELLS_PER_CHUNK]).is_some());
    }
}
