//! # Chunk
//!
//! One active column of the world: its block grid, a dirty flag, decoration
//! flags, lateral neighbor links, and the mesh state handed to the renderer.
//!
//! ## Neighbor Links
//!
//! A link is the neighbor's *coordinate*, never a reference. Meshing
//! resolves it through a [`ChunkView`] (the world's active registry), so a
//! link to a chunk that has since left the registry reads as empty instead
//! of dangling. The world keeps links symmetric.

// Block and chunk coordinates convert between i32, usize and floats
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use std::collections::HashMap;

use strata_core::{BlockGrid, BlockKind, ChunkCoord, Side, CHUNK_DEPTH, CHUNK_WIDTH};

use crate::mesh::{ChunkMesh, ChunkVertex, MeshBackend, MeshHandle, MeshLayer, UploadedMesh};

/// Read access to active chunks by coordinate.
pub trait ChunkView {
    /// The active chunk at `coord`, if any.
    fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk>;
}

impl ChunkView for HashMap<ChunkCoord, Chunk> {
    fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.get(&coord)
    }
}

/// Block data plus the one-shot decoration state that must survive a
/// trip through the cache or the disk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkData {
    /// The cells.
    pub blocks: BlockGrid,
    /// Ore veins already placed.
    pub ore_decorated: bool,
    /// Trees already placed.
    pub tree_decorated: bool,
}

impl ChunkData {
    /// Freshly generated, undecorated data.
    #[must_use]
    pub const fn generated(blocks: BlockGrid) -> Self {
        Self {
            blocks,
            ore_decorated: false,
            tree_decorated: false,
        }
    }
}

/// A resident chunk.
#[derive(Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    blocks: BlockGrid,
    dirty: bool,
    ore_decorated: bool,
    tree_decorated: bool,
    neighbors: [Option<ChunkCoord>; 4],
    mesh: ChunkMesh,
    opaque: Option<UploadedMesh>,
    liquid: Option<UploadedMesh>,
}

impl Chunk {
    /// Wraps a grid as a freshly activated chunk (dirty, undecorated).
    #[must_use]
    pub fn new(coord: ChunkCoord, blocks: BlockGrid) -> Self {
        Self {
            coord,
            blocks,
            dirty: true,
            ore_decorated: false,
            tree_decorated: false,
            neighbors: [None; 4],
            mesh: ChunkMesh::default(),
            opaque: None,
            liquid: None,
        }
    }

    /// Restores a chunk from cached or stored data. The mesh starts dirty.
    #[must_use]
    pub fn from_data(coord: ChunkCoord, data: ChunkData) -> Self {
        let mut chunk = Self::new(coord, data.blocks);
        chunk.ore_decorated = data.ore_decorated;
        chunk.tree_decorated = data.tree_decorated;
        chunk
    }

    /// Copies out what the cache and the disk keep.
    #[must_use]
    pub fn to_data(&self) -> ChunkData {
        ChunkData {
            blocks: self.blocks.clone(),
            ore_decorated: self.ore_decorated,
            tree_decorated: self.tree_decorated,
        }
    }

    /// Chunk position in the world.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// The block grid.
    #[inline]
    #[must_use]
    pub fn blocks(&self) -> &BlockGrid {
        &self.blocks
    }

    /// Reads a cell in local coordinates. Out of range reads as empty.
    #[inline]
    #[must_use]
    pub fn block_at(&self, x: usize, y: usize, z: usize) -> Option<BlockKind> {
        self.blocks.get(x, y, z)
    }

    /// Writes a cell in local coordinates; marks dirty if it changed.
    pub fn set_block_at(&mut self, x: usize, y: usize, z: usize, block: Option<BlockKind>) -> bool {
        let changed = self.blocks.set(x, y, z, block);
        self.dirty |= changed;
        changed
    }

    /// Replaces the whole grid; marks dirty if any cell changed.
    pub fn set_blocks(&mut self, blocks: BlockGrid) -> bool {
        if self.blocks == blocks {
            return false;
        }
        self.blocks = blocks;
        self.dirty = true;
        true
    }

    /// Whether the mesh is stale.
    #[inline]
    #[must_use]
    pub const fn needs_remesh(&self) -> bool {
        self.dirty
    }

    /// Forces a rebuild on the next `build_mesh`.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether ore veins have been placed.
    #[inline]
    #[must_use]
    pub const fn is_ore_decorated(&self) -> bool {
        self.ore_decorated
    }

    /// Records that ore veins have been placed.
    #[inline]
    pub fn mark_ore_decorated(&mut self) {
        self.ore_decorated = true;
    }

    /// Whether trees have been placed.
    #[inline]
    #[must_use]
    pub const fn is_tree_decorated(&self) -> bool {
        self.tree_decorated
    }

    /// Records that trees have been placed.
    #[inline]
    pub fn mark_tree_decorated(&mut self) {
        self.tree_decorated = true;
    }

    /// Linked neighbor on a side.
    #[inline]
    #[must_use]
    pub const fn neighbor(&self, side: Side) -> Option<ChunkCoord> {
        self.neighbors[side.index()]
    }

    /// Links or unlinks a side. Any change marks the chunk dirty, since
    /// boundary faces may appear or disappear.
    pub fn set_neighbor(&mut self, side: Side, neighbor: Option<ChunkCoord>) -> bool {
        let slot = &mut self.neighbors[side.index()];
        if *slot == neighbor {
            return false;
        }
        *slot = neighbor;
        self.dirty = true;
        true
    }

    /// Unlinks every side.
    pub fn clear_neighbors(&mut self) {
        for side in Side::ALL {
            self.set_neighbor(side, None);
        }
    }

    /// Reads a cell at local coordinates that may lie one step past a
    /// lateral edge, resolving the far side through the neighbor link.
    #[must_use]
    pub fn sample<V: ChunkView + ?Sized>(&self, view: &V, x: i32, y: i32, z: i32) -> Option<BlockKind> {
        let width = CHUNK_WIDTH as i32;
        let depth = CHUNK_DEPTH as i32;
        let side = if x < 0 {
            Side::Left
        } else if x >= width {
            Side::Right
        } else if z < 0 {
            Side::Back
        } else if z >= depth {
            Side::Front
        } else {
            return self.blocks.get_signed(x, y, z);
        };

        let neighbor = view.chunk(self.neighbor(side)?)?;
        neighbor
            .blocks
            .get_signed(x.rem_euclid(width), y, z.rem_euclid(depth))
    }

    /// Rebuilds and re-uploads the mesh if dirty. Returns whether it ran.
    pub fn build_mesh<V: ChunkView + ?Sized>(&mut self, view: &V, backend: &mut dyn MeshBackend) -> bool {
        if !self.dirty {
            return false;
        }
        self.release_mesh(backend);

        let mut mesh = std::mem::take(&mut self.mesh);
        mesh.build(|x, y, z| self.sample(view, x, y, z));
        self.mesh = mesh;

        self.opaque = upload(backend, self.coord, MeshLayer::Opaque, &self.mesh.opaque);
        self.liquid = upload(backend, self.coord, MeshLayer::Liquid, &self.mesh.liquid);
        self.dirty = false;
        true
    }

    /// Releases uploaded buffers, if any.
    pub fn release_mesh(&mut self, backend: &mut dyn MeshBackend) {
        for handle in self.take_mesh_handles() {
            backend.release(handle);
        }
    }

    /// Detaches uploaded buffer handles for deferred release.
    pub fn take_mesh_handles(&mut self) -> Vec<MeshHandle> {
        [self.opaque.take(), self.liquid.take()]
            .into_iter()
            .flatten()
            .map(|mesh| mesh.handle)
            .collect()
    }

    /// Uploaded opaque buffer.
    #[inline]
    #[must_use]
    pub const fn opaque_mesh(&self) -> Option<UploadedMesh> {
        self.opaque
    }

    /// Uploaded liquid buffer.
    #[inline]
    #[must_use]
    pub const fn liquid_mesh(&self) -> Option<UploadedMesh> {
        self.liquid
    }

    /// Last built opaque vertices.
    #[must_use]
    pub fn opaque_vertices(&self) -> &[ChunkVertex] {
        &self.mesh.opaque
    }

    /// Last built liquid vertices.
    #[must_use]
    pub fn liquid_vertices(&self) -> &[ChunkVertex] {
        &self.mesh.liquid
    }

    /// World translation of the chunk's local origin.
    #[must_use]
    pub fn transform(&self) -> [f32; 3] {
        [self.coord.origin_x() as f32, 0.0, self.coord.origin_z() as f32]
    }

    /// Consumes the chunk, keeping what the cache and the disk keep.
    #[must_use]
    pub fn into_data(self) -> ChunkData {
        ChunkData {
            blocks: self.blocks,
            ore_decorated: self.ore_decorated,
            tree_decorated: self.tree_decorated,
        }
    }
}

fn upload(
    backend: &mut dyn MeshBackend,
    coord: ChunkCoord,
    layer: MeshLayer,
    vertices: &[ChunkVertex],
) -> Option<UploadedMesh> {
    (!vertices.is_empty()).then(|| UploadedMesh {
        handle: backend.upload(coord, layer, vertices),
        vertex_count: vertices.len(),
    })
}
