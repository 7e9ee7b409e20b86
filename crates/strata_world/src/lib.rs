//! # STRATA World
//!
//! An infinite voxel world that streams around a moving player.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed and same edits always produce the same world
//! 2. **Non-blocking**: Disk reads and generation run on the loader thread
//! 3. **Bounded**: Active chunks form a fixed square, evicted chunks a fixed LRU
//! 4. **Durable**: Evicted and shut-down chunks reach disk, edits included
//!
//! ## Core Components
//!
//! - `TerrainGenerator`: Biome-blended height maps, strata and caves
//! - `OreDecorator`, `TreeDecorator`, `WaterFlowSimulator`: Cross-chunk passes
//! - `ChunkStore`: One compressed file per chunk
//! - `ChunkCache`: LRU of recently evicted chunks, persisted on overflow
//! - `ChunkLoader`: Background disk-or-generate worker
//! - `World`: Membership, activation, decoration and meshing
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use strata_world::{HeadlessBackend, World, WorldConfig};
//!
//! let mut world = World::new(WorldConfig::default().with_view_radius(2))?;
//! world.update_player_position(100.0, -40.0);
//! world.flush_loads(Duration::from_secs(10));
//!
//! let mut backend = HeadlessBackend::new();
//! world.build_meshes(&mut backend);
//! world.shutdown();
//! # Ok::<(), strata_world::WorldError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod biome;
pub mod cache;
pub mod chunk;
pub mod config;
pub mod decoration;
pub mod error;
pub mod loader;
pub mod mesh;
pub mod persistence;
pub mod terrain;
pub mod world;

pub use biome::{Biome, BiomeParameters};
pub use cache::{CacheStats, ChunkCache};
pub use chunk::{Chunk, ChunkData, ChunkView};
pub use config::{TerrainConfig, WorldConfig};
pub use decoration::{OreDecorator, Region, TreeDecorator, WaterFlowSimulator};
pub use error::{WorldError, WorldResult};
pub use loader::{ChunkLoader, LoadResult, LoadSource, LoaderStats};
pub use mesh::{ChunkVertex, HeadlessBackend, MeshBackend, MeshHandle, MeshLayer};
pub use persistence::ChunkStore;
pub use terrain::TerrainGenerator;
pub use world::{required_coords, World, WorldStats};
