//! # Region Decoration
//!
//! Ore veins, trees and water all need to see across chunk edges. They run
//! over a [`Region`]: the grids of a contiguous group of active chunks
//! copied into one buffer, addressed in region-local coordinates.
//!
//! ```text
//!   active chunks          region buffer            active chunks
//!   ┌───┬───┐              ┌───────┐                ┌───┬───┐
//!   │ A │ B │  ── merge ─> │ A   B │ ── scatter ─>  │ A'│ B'│
//!   ├───┼───┘              │ C     │                ├───┼───┘
//!   │ C │                  └───────┘                │ C'│
//!   └───┘                   pass runs here          └───┘
//! ```
//!
//! The region is the bounding rectangle of its group. Columns inside that
//! rectangle that belong to no member chunk read as empty, ignore writes
//! and are reported by [`Region::is_covered`].

// Block and chunk coordinates convert between i32 and usize
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

pub mod ore;
pub mod tree;
pub mod water;

use std::collections::{HashMap, HashSet, VecDeque};

use strata_core::{BlockGrid, BlockKind, ChunkCoord, Side, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH};

use crate::chunk::Chunk;

pub use ore::OreDecorator;
pub use tree::TreeDecorator;
pub use water::WaterFlowSimulator;

/// A merged block buffer spanning several adjacent chunks.
pub struct Region {
    origin: ChunkCoord,
    chunks_x: usize,
    chunks_z: usize,
    covered: Vec<bool>,
    members: Vec<ChunkCoord>,
    cells: Vec<Option<BlockKind>>,
}

impl Region {
    /// Region height in cells.
    pub const HEIGHT: usize = CHUNK_HEIGHT;

    /// Copies a group of chunk grids into one buffer.
    ///
    /// Returns `None` for an empty group.
    #[must_use]
    pub fn merge<'a>(chunks: impl IntoIterator<Item = (ChunkCoord, &'a BlockGrid)>) -> Option<Self> {
        let chunks: Vec<_> = chunks.into_iter().collect();
        let min_x = chunks.iter().map(|(c, _)| c.x).min()?;
        let max_x = chunks.iter().map(|(c, _)| c.x).max()?;
        let min_z = chunks.iter().map(|(c, _)| c.z).min()?;
        let max_z = chunks.iter().map(|(c, _)| c.z).max()?;

        let chunks_x = (max_x - min_x + 1) as usize;
        let chunks_z = (max_z - min_z + 1) as usize;
        let width = chunks_x * CHUNK_WIDTH;
        let depth = chunks_z * CHUNK_DEPTH;

        let mut region = Self {
            origin: ChunkCoord::new(min_x, min_z),
            chunks_x,
            chunks_z,
            covered: vec![false; chunks_x * chunks_z],
            members: Vec::with_capacity(chunks.len()),
            cells: vec![None; width * depth * CHUNK_HEIGHT],
        };

        for (coord, grid) in chunks {
            let (cx, cz) = region.slot(coord);
            region.covered[cz * chunks_x + cx] = true;
            region.members.push(coord);

            let source = grid.cells();
            for y in 0..CHUNK_HEIGHT {
                for z in 0..CHUNK_DEPTH {
                    let from = BlockGrid::index(0, y, z);
                    let to = region.index(cx * CHUNK_WIDTH, y, cz * CHUNK_DEPTH + z);
                    region.cells[to..to + CHUNK_WIDTH]
                        .copy_from_slice(&source[from..from + CHUNK_WIDTH]);
                }
            }
        }

        Some(region)
    }

    /// Extracts one member chunk's grid.
    #[must_use]
    pub fn scatter(&self, coord: ChunkCoord) -> Option<BlockGrid> {
        if !self.members.contains(&coord) {
            return None;
        }
        let (cx, cz) = self.slot(coord);
        let mut cells = Vec::with_capacity(strata_core::CELLS_PER_CHUNK);
        for y in 0..CHUNK_HEIGHT {
            for z in 0..CHUNK_DEPTH {
                let from = self.index(cx * CHUNK_WIDTH, y, cz * CHUNK_DEPTH + z);
                cells.extend_from_slice(&self.cells[from..from + CHUNK_WIDTH]);
            }
        }
        BlockGrid::from_cells(cells)
    }

    /// Chunk at the region's minimum corner.
    #[must_use]
    pub const fn origin(&self) -> ChunkCoord {
        self.origin
    }

    /// Chunks copied into the region.
    #[must_use]
    pub fn members(&self) -> &[ChunkCoord] {
        &self.members
    }

    /// Width (X) in cells.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.chunks_x * CHUNK_WIDTH
    }

    /// Depth (Z) in cells.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.chunks_z * CHUNK_DEPTH
    }

    /// World X of a region-local X.
    #[must_use]
    pub const fn world_x(&self, x: usize) -> i32 {
        self.origin.origin_x() + x as i32
    }

    /// World Z of a region-local Z.
    #[must_use]
    pub const fn world_z(&self, z: usize) -> i32 {
        self.origin.origin_z() + z as i32
    }

    /// Whether a column lies inside a member chunk.
    #[must_use]
    pub fn is_covered(&self, x: i32, z: i32) -> bool {
        if x < 0 || z < 0 || x as usize >= self.width() || z as usize >= self.depth() {
            return false;
        }
        let cx = x as usize / CHUNK_WIDTH;
        let cz = z as usize / CHUNK_DEPTH;
        self.covered[cz * self.chunks_x + cx]
    }

    /// Reads a cell. Anything outside member chunks reads as empty.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<BlockKind> {
        if y < 0 || y >= CHUNK_HEIGHT as i32 || !self.is_covered(x, z) {
            return None;
        }
        self.cells[self.index(x as usize, y as usize, z as usize)]
    }

    /// Writes a cell. Returns `false` (and does nothing) outside member
    /// chunks.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, z: i32, block: Option<BlockKind>) -> bool {
        if y < 0 || y >= CHUNK_HEIGHT as i32 || !self.is_covered(x, z) {
            return false;
        }
        let index = self.index(x as usize, y as usize, z as usize);
        self.cells[index] = block;
        true
    }

    /// Highest non-empty `y` in a column.
    #[must_use]
    pub fn surface_height(&self, x: i32, z: i32) -> Option<usize> {
        if !self.is_covered(x, z) {
            return None;
        }
        (0..CHUNK_HEIGHT).rev().find(|&y| self.get(x, y as i32, z).is_some())
    }

    /// Flat index of a region-local cell.
    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.depth() + z) * self.width() + x
    }

    /// Chunk slot of a member coordinate.
    #[inline]
    fn slot(&self, coord: ChunkCoord) -> (usize, usize) {
        ((coord.x - self.origin.x) as usize, (coord.z - self.origin.z) as usize)
    }
}

/// Splits coordinates into 4-connected groups, each sorted.
#[must_use]
pub fn contiguous_groups(coords: &[ChunkCoord]) -> Vec<Vec<ChunkCoord>> {
    let mut remaining: HashSet<ChunkCoord> = coords.iter().copied().collect();
    let mut ordered: Vec<ChunkCoord> = remaining.iter().copied().collect();
    ordered.sort_unstable();

    let mut groups = Vec::new();
    for start in ordered {
        if !remaining.remove(&start) {
            continue;
        }
        let mut group = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(coord) = queue.pop_front() {
            for side in Side::ALL {
                let next = coord.neighbor(side);
                if remaining.remove(&next) {
                    group.push(next);
                    queue.push_back(next);
                }
            }
        }
        group.sort_unstable();
        groups.push(group);
    }
    groups
}

/// Merges every contiguous group of active chunks accepted by `filter`,
/// runs `pass` on each merged region, and writes the results back.
///
/// Works from a snapshot of the matching coordinates. Returns the
/// coordinates that went through the pass.
pub fn decorate(
    active: &mut HashMap<ChunkCoord, Chunk>,
    filter: impl Fn(&Chunk) -> bool,
    mut pass: impl FnMut(&mut Region),
) -> Vec<ChunkCoord> {
    let snapshot: Vec<ChunkCoord> = active
        .values()
        .filter(|chunk| filter(chunk))
        .map(Chunk::coord)
        .collect();

    let mut touched = Vec::with_capacity(snapshot.len());
    for group in contiguous_groups(&snapshot) {
        let region = Region::merge(
            group
                .iter()
                .filter_map(|coord| active.get(coord).map(|chunk| (*coord, chunk.blocks()))),
        );
        let Some(mut region) = region else {
            continue;
        };

        pass(&mut region);

        for &coord in region.members() {
            if let (Some(chunk), Some(grid)) = (active.get_mut(&coord), region.scatter(coord)) {
                chunk.set_blocks(grid);
                touched.push(coord);
            }
        }
    }
    touched
}
