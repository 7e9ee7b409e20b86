//! # Chunk Meshing
//!
//! Turns a block grid into two vertex lists, one opaque and one liquid,
//! emitting only faces that can be seen.
//!
//! ## Culling
//!
//! - Opaque cells hide a face behind a present, solid neighbor.
//! - Liquid cells hide a face only behind another liquid cell.
//! - Anything the lookup cannot resolve counts as empty, so the face is
//!   drawn. Above the sky and below the floor are always empty.
//!
//! ## Vertex Format
//!
//! Positions are chunk-local; the renderer places a chunk with
//! [`Chunk::transform`](crate::chunk::Chunk::transform). Each quad is two
//! triangles (six vertices, no index buffer).

// Block and chunk coordinates convert between i32, usize and floats
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use strata_core::{BlockKind, ChunkCoord, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH};

// =============================================================================
// VERTEX FORMAT
// =============================================================================

/// One mesh vertex, laid out for direct upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ChunkVertex {
    /// Chunk-local position.
    pub position: [f32; 3],
    /// Atlas texture coordinate.
    pub uv: [f32; 2],
    /// Tint multiplied into the texture.
    pub color: [f32; 3],
}

/// Vertices emitted per visible face.
pub const VERTICES_PER_FACE: usize = 6;

/// Tint applied to foliage.
pub const FOLIAGE_TINT: [f32; 3] = [0.3, 0.8, 0.3];

/// Tint applied to everything else.
pub const NO_TINT: [f32; 3] = [1.0, 1.0, 1.0];

// =============================================================================
// FACES
// =============================================================================

/// The six faces of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    /// +Y
    Top,
    /// -Y
    Bottom,
    /// +Z
    Front,
    /// -Z
    Back,
    /// +X
    Right,
    /// -X
    Left,
}

impl Face {
    /// All faces.
    pub const ALL: [Self; 6] = [
        Self::Top,
        Self::Bottom,
        Self::Front,
        Self::Back,
        Self::Right,
        Self::Left,
    ];

    /// Offset to the cell this face looks at.
    #[must_use]
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Top => (0, 1, 0),
            Self::Bottom => (0, -1, 0),
            Self::Front => (0, 0, 1),
            Self::Back => (0, 0, -1),
            Self::Right => (1, 0, 0),
            Self::Left => (-1, 0, 0),
        }
    }

    /// Corners counter-clockwise seen from outside, starting bottom-left.
    const fn corners(self) -> [[f32; 3]; 4] {
        match self {
            Self::Top => [[0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]],
            Self::Bottom => [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            Self::Front => [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
            Self::Back => [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
            Self::Right => [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]],
            Self::Left => [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]],
        }
    }
}

/// Whether a face of `block` toward `neighbor` is visible.
#[inline]
#[must_use]
pub fn face_visible(block: BlockKind, neighbor: Option<BlockKind>) -> bool {
    match neighbor {
        None => true,
        Some(other) if block.is_liquid() => !other.is_liquid(),
        Some(other) => !other.is_solid(),
    }
}

// =============================================================================
// MESH OUTPUT
// =============================================================================

/// Vertex lists for one chunk, split by render pass.
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
    /// Drawn first, without blending.
    pub opaque: Vec<ChunkVertex>,
    /// Drawn second, with blending.
    pub liquid: Vec<ChunkVertex>,
}

impl ChunkMesh {
    /// Empties both lists, keeping their allocations.
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.liquid.clear();
    }

    /// Total visible faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        (self.opaque.len() + self.liquid.len()) / VERTICES_PER_FACE
    }

    /// Fills both lists from a cell lookup in chunk-local coordinates.
    ///
    /// `lookup` must resolve `-1` and `CHUNK_WIDTH`/`CHUNK_DEPTH` on the
    /// lateral axes (or return `None`); the vertical range is handled here.
    pub fn build(&mut self, lookup: impl Fn(i32, i32, i32) -> Option<BlockKind>) {
        self.clear();

        let sample = |x: i32, y: i32, z: i32| {
            if y < 0 || y >= CHUNK_HEIGHT as i32 {
                None
            } else {
                lookup(x, y, z)
            }
        };

        for y in 0..CHUNK_HEIGHT as i32 {
            for x in 0..CHUNK_WIDTH as i32 {
                for z in 0..CHUNK_DEPTH as i32 {
                    let Some(block) = sample(x, y, z) else {
                        continue;
                    };
                    let target = if block.is_liquid() {
                        &mut self.liquid
                    } else {
                        &mut self.opaque
                    };
                    for face in Face::ALL {
                        let (dx, dy, dz) = face.offset();
                        if face_visible(block, sample(x + dx, y + dy, z + dz)) {
                            push_face(target, block, face, [x as f32, y as f32, z as f32]);
                        }
                    }
                }
            }
        }
    }
}

fn push_face(target: &mut Vec<ChunkVertex>, block: BlockKind, face: Face, origin: [f32; 3]) {
    let faces = block.faces();
    let tile = match face {
        Face::Top => faces.top,
        Face::Bottom => faces.bottom,
        _ => faces.side,
    };
    let [u0, v0, u1, v1] = tile.uv_rect();
    let uvs = [[u0, v1], [u1, v1], [u1, v0], [u0, v0]];
    let color = if block.is_foliage() { FOLIAGE_TINT } else { NO_TINT };
    let corners = face.corners();

    for corner in [0, 1, 2, 0, 2, 3] {
        let offset = corners[corner];
        target.push(ChunkVertex {
            position: [origin[0] + offset[0], origin[1] + offset[1], origin[2] + offset[2]],
            uv: uvs[corner],
            color,
        });
    }
}

// =============================================================================
// BACKEND - the renderer side of an upload
// =============================================================================

/// Opaque handle to an uploaded vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Which pass a buffer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshLayer {
    /// Drawn without blending.
    Opaque,
    /// Drawn with blending, after opaque.
    Liquid,
}

/// A buffer the renderer holds for a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadedMesh {
    /// Backend handle.
    pub handle: MeshHandle,
    /// Vertices to draw.
    pub vertex_count: usize,
}

/// Receives finished vertex lists and owns the resulting buffers.
pub trait MeshBackend {
    /// Uploads vertices and returns a handle to draw them with.
    fn upload(&mut self, coord: ChunkCoord, layer: MeshLayer, vertices: &[ChunkVertex]) -> MeshHandle;

    /// Frees a buffer returned by `upload`.
    fn release(&mut self, handle: MeshHandle);
}

/// Backend with no GPU: tracks live buffers and their sizes.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    live: HashMap<MeshHandle, (ChunkCoord, MeshLayer, usize)>,
    uploads: u64,
    releases: u64,
}

impl HeadlessBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers uploaded and not yet released.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Vertex count of a live buffer.
    #[must_use]
    pub fn vertex_count(&self, handle: MeshHandle) -> Option<usize> {
        self.live.get(&handle).map(|&(_, _, count)| count)
    }

    /// Live buffers belonging to one chunk.
    #[must_use]
    pub fn live_for(&self, coord: ChunkCoord) -> usize {
        self.live.values().filter(|(owner, _, _)| *owner == coord).count()
    }

    /// Total uploads so far.
    #[must_use]
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Total releases so far.
    #[must_use]
    pub fn releases(&self) -> u64 {
        self.releases
    }
}

impl MeshBackend for HeadlessBackend {
    fn upload(&mut self, coord: ChunkCoord, layer: MeshLayer, vertices: &[ChunkVertex]) -> MeshHandle {
        self.next_id += 1;
        let handle = MeshHandle(self.next_id);
        self.live.insert(handle, (coord, layer, vertices.len()));
        self.uploads += 1;
        handle
    }

    fn release(&mut self, handle: MeshHandle) {
        if self.live.remove(&handle).is_some() {
            self.releases += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(kind: BlockKind) -> impl Fn(i32, i32, i32) -> Option<BlockKind> {
        move |x, y, z| (x == 4 && y == 10 && z == 4).then_some(kind)
    }

    #[test]
    fn test_lone_block_has_six_faces() {
        let mut mesh = ChunkMesh::default();
        mesh.build(single(BlockKind::Stone));
        assert_eq!(mesh.opaque.len(), 6 * VERTICES_PER_FACE);
        assert!(mesh.liquid.is_empty());
    }

    #[test]
    fn test_liquid_goes_to_liquid_list() {
        let mut mesh = ChunkMesh::default();
        mesh.build(single(BlockKind::Water));
        assert!(mesh.opaque.is_empty());
        assert_eq!(mesh.liquid.len(), 6 * VERTICES_PER_FACE);
    }

    #[test]
    fn test_adjacent_solids_hide_shared_face() {
        let mut mesh = ChunkMesh::default();
        mesh.build(|x, y, z| {
            (y == 10 && z == 4 && (x == 4 || x == 5)).then_some(BlockKind::Stone)
        });
        assert_eq!(mesh.face_count(), 10);
    }

    #[test]
    fn test_solid_face_shows_through_water() {
        assert!(face_visible(BlockKind::Stone, Some(BlockKind::Water)));
        assert!(!face_visible(BlockKind::Stone, Some(BlockKind::Leaves)));
        assert!(!face_visible(BlockKind::Water, Some(BlockKind::Water)));
        assert!(face_visible(BlockKind::Water, Some(BlockKind::Stone)));
        assert!(face_visible(BlockKind::Water, None));
    }

    #[test]
    fn test_vertical_edges_are_empty() {
        let mut mesh = ChunkMesh::default();
        // The lookup claims solid everywhere; only the sky and floor faces survive
        mesh.build(|x, _, z| {
            (x >= 0 && z >= 0 && x < 16 && z < 16).then_some(BlockKind::Stone)
        });
        let lateral = 4 * 16 * CHUNK_HEIGHT;
        assert_eq!(mesh.face_count(), 2 * 16 * 16 + lateral);
    }

    #[test]
    fn test_foliage_is_tinted() {
        let mut mesh = ChunkMesh::default();
        mesh.build(single(BlockKind::Leaves));
        assert!(mesh.opaque.iter().all(|v| v.color == FOLIAGE_TINT));

        mesh.build(single(BlockKind::Dirt));
        assert!(mesh.opaque.iter().all(|v| v.color == NO_TINT));
    }

    #[test]
    fn test_headless_backend_tracks_handles() {
        let mut backend = HeadlessBackend::new();
        let coord = ChunkCoord::new(0, 0);
        let a = backend.upload(coord, MeshLayer::Opaque, &[ChunkVertex::default(); 6]);
        let b = backend.upload(coord, MeshLayer::Liquid, &[]);
        assert_ne!(a, b);
        assert_eq!(backend.vertex_count(a), Some(6));
        assert_eq!(backend.live_for(coord), 2);

        backend.release(a);
        backend.release(a);
        assert_eq!(backend.live_count(), 1);
        assert_eq!(backend.releases(), 1);
    }
}
