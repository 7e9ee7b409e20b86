//! # STRATA Core
//!
//! Plain data for an infinite voxel world: no I/O, no threads.
//!
//! ## Core Components
//!
//! - `GradientNoise`: Seeded 2D/3D noise and fractal sums
//! - `BlockKind`: The fixed block catalog (atlas tiles, solidity)
//! - `ChunkCoord`: Key of a 16x256x16 chunk column
//! - `BlockGrid`: The cells of one chunk
//!
//! ## Example
//!
//! ```rust
//! use strata_core::{BlockGrid, BlockKind, ChunkCoord};
//!
//! let coord = ChunkCoord::from_world(-3.5, 40.0);
//! assert_eq!(coord, ChunkCoord::new(-1, 2));
//!
//! let mut grid = BlockGrid::new();
//! grid.set(0, 0, 0, Some(BlockKind::Bedrock));
//! assert_eq!(grid.surface_height(0, 0), Some(0));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod coord;
pub mod grid;
pub mod noise;

pub use block::{AtlasTile, BlockFaces, BlockKind, ATLAS_SIZE, TILE_SIZE};
pub use coord::{ChunkCoord, Side, CELLS_PER_CHUNK, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH};
pub use grid::{BlockGrid, GridDecodeError};
pub use noise::{GradientNoise, Octaves, SeedStream, WorldSeed};
