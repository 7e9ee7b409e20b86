//! # World
//!
//! Keeps the chunks around the player resident and consistent.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                            WORLD                              │
//! ├───────────────────────────────────────────────────────────────┤
//! │  player position ──> required set (square of radius r)        │
//! │                             │                                 │
//! │          ┌──────────────────┼───────────────────┐             │
//! │          ▼                  ▼                   ▼             │
//! │   leaving chunks      missing chunks      loader results      │
//! │   └> eviction cache   ├> cache hit        └> cache + activate │
//! │                       └> ChunkLoader                          │
//! │                             │                                 │
//! │              relink neighbors, ore -> trees -> water          │
//! │                             │                                 │
//! │                 build_meshes (budgeted, nearest first)        │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here runs on the caller's thread and never waits on disk:
//! the cache is consulted in memory only, and disk reads happen on the
//! loader thread. The one exception is [`World::flush_loads`], which
//! blocks on purpose.

// Block and chunk coordinates convert between i32 and usize
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use strata_core::{BlockKind, ChunkCoord, Side, WorldSeed, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH};

use crate::cache::{CacheStats, ChunkCache};
use crate::chunk::{Chunk, ChunkData};
use crate::config::WorldConfig;
use crate::decoration::{OreDecorator, TreeDecorator, WaterFlowSimulator};
use crate::error::WorldResult;
use crate::loader::{ChunkLoader, LoadResult, LoadSource};
use crate::mesh::{MeshBackend, MeshHandle};
use crate::persistence::ChunkStore;
use crate::terrain::TerrainGenerator;

/// Chunk coordinates within `radius` of `center` (Chebyshev distance),
/// enumerated as an outward square spiral.
///
/// Always exactly `(2r + 1)²` coordinates.
#[must_use]
pub fn required_coords(center: ChunkCoord, radius: u32) -> HashSet<ChunkCoord> {
    // Right, up, left, down
    const TURNS: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

    let side = 2 * radius as usize + 1;
    let target = side * side;
    let mut coords = HashSet::with_capacity(target);
    coords.insert(center);

    let (mut x, mut z) = (center.x, center.z);
    let mut run = 1;
    let mut turn = 0;
    while coords.len() < target {
        let (dx, dz) = TURNS[turn % TURNS.len()];
        for _ in 0..run {
            x += dx;
            z += dz;
            coords.insert(ChunkCoord::new(x, z));
            if coords.len() == target {
                return coords;
            }
        }
        turn += 1;
        if turn % 2 == 0 {
            run += 1;
        }
    }
    coords
}

/// World counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Chunks currently active.
    pub active: usize,
    /// Loads requested and not yet received.
    pub pending_loads: usize,
    /// Chunks held by the eviction cache.
    pub cached: usize,
    /// Loads the loader answered from disk.
    pub loaded_from_disk: u64,
    /// Loads the loader generated.
    pub generated: u64,
    /// Activations answered by the eviction cache.
    pub served_from_cache: u64,
    /// Chunks moved out of the active set.
    pub evicted: u64,
    /// Chunk mesh rebuilds.
    pub meshes_built: u64,
    /// Eviction cache counters.
    pub cache: CacheStats,
}

#[derive(Debug, Default)]
struct Counters {
    served_from_cache: u64,
    evicted: u64,
    meshes_built: u64,
}

/// The streaming voxel world.
pub struct World {
    config: WorldConfig,
    player: ChunkCoord,
    radius: u32,
    required: HashSet<ChunkCoord>,
    active: HashMap<ChunkCoord, Chunk>,
    pending: HashSet<ChunkCoord>,
    fresh: HashSet<ChunkCoord>,
    released: Vec<MeshHandle>,
    cache: ChunkCache,
    loader: ChunkLoader,
    ore: OreDecorator,
    trees: TreeDecorator,
    water: WaterFlowSimulator,
    counters: Counters,
    shut_down: bool,
}

impl World {
    /// Opens the session directory, starts the loader and requests the
    /// chunks around the origin.
    ///
    /// # Errors
    ///
    /// Fails on an invalid config, an unusable session directory, or if
    /// the loader thread cannot start.
    pub fn new(config: WorldConfig) -> WorldResult<Self> {
        config.validate()?;
        let seed = WorldSeed::new(config.seed);
        let store = ChunkStore::open(config.session_dir())?;
        let cache = ChunkCache::new(config.cache_capacity(), store.clone());
        let loader = ChunkLoader::spawn(store, TerrainGenerator::new(seed, config.terrain.clone()))?;

        tracing::info!(
            "World created: seed {:#x}, radius {}, session {:?}",
            config.seed,
            config.view_radius,
            config.session
        );

        let mut world = Self {
            player: ChunkCoord::new(0, 0),
            radius: config.view_radius,
            required: HashSet::new(),
            active: HashMap::new(),
            pending: HashSet::new(),
            fresh: HashSet::new(),
            released: Vec::new(),
            cache,
            loader,
            ore: OreDecorator::new(seed),
            trees: TreeDecorator::new(seed),
            water: WaterFlowSimulator::new(),
            counters: Counters::default(),
            shut_down: false,
            config,
        };
        world.refresh_membership();
        Ok(world)
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Moves the player. Membership is recomputed only when the player
    /// crosses into another chunk.
    pub fn update_player_position(&mut self, x: f64, z: f64) {
        let coord = ChunkCoord::from_world(x, z);
        if coord != self.player {
            self.player = coord;
            self.refresh_membership();
        }
    }

    /// Changes the view radius, resizes the eviction cache to match and
    /// recomputes membership.
    pub fn set_view_radius(&mut self, radius: u32) {
        if radius == self.radius {
            return;
        }
        tracing::info!("View radius {} -> {}", self.radius, radius);
        self.radius = radius;
        self.config.view_radius = radius;
        self.cache.set_capacity(self.config.cache_capacity());
        self.refresh_membership();
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Collects finished loads without blocking, then links and decorates
    /// whatever became active. Returns the number of chunks activated.
    pub fn tick(&mut self) -> usize {
        let mut activated = 0;
        while let Some(result) = self.loader.poll_result() {
            activated += usize::from(self.accept(result));
        }
        if activated > 0 {
            self.settle();
        }
        activated
    }

    /// Blocks until every pending load has arrived or `timeout` passes,
    /// then settles like [`tick`](Self::tick). Meant for tools and tests.
    pub fn flush_loads(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut activated = 0;
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.loader.wait_result(remaining) {
                Some(result) => activated += usize::from(self.accept(result)),
                None => break,
            }
        }
        while let Some(result) = self.loader.poll_result() {
            activated += usize::from(self.accept(result));
        }
        if activated > 0 {
            self.settle();
        }
        activated
    }

    /// Rebuilds up to `mesh_budget_per_tick` dirty chunks, nearest to the
    /// player first. Buffers of chunks that left the world are released
    /// before anything is uploaded. Returns the number rebuilt.
    pub fn build_meshes(&mut self, backend: &mut dyn MeshBackend) -> usize {
        for handle in self.released.drain(..) {
            backend.release(handle);
        }

        let player = self.player;
        let mut dirty: Vec<ChunkCoord> = self
            .active
            .values()
            .filter(|chunk| chunk.needs_remesh())
            .map(Chunk::coord)
            .collect();
        dirty.sort_unstable_by_key(|coord| (coord.chebyshev(player), *coord));
        dirty.truncate(self.config.mesh_budget_per_tick);

        let mut built = 0;
        for coord in dirty {
            let Some(mut chunk) = self.active.remove(&coord) else {
                continue;
            };
            if chunk.build_mesh(&self.active, backend) {
                built += 1;
            }
            self.active.insert(coord, chunk);
        }

        self.counters.meshes_built += built as u64;
        if built > 0 {
            tracing::debug!("Rebuilt {} chunk meshes", built);
        }
        built
    }

    /// Releases every uploaded buffer, for renderer teardown. Chunks stay
    /// active and will rebuild on the next [`build_meshes`](Self::build_meshes).
    pub fn release_meshes(&mut self, backend: &mut dyn MeshBackend) {
        for handle in self.released.drain(..) {
            backend.release(handle);
        }
        for chunk in self.active.values_mut() {
            chunk.release_mesh(backend);
            chunk.mark_dirty();
        }
    }

    /// Runs a water pass over every active chunk. Returns the number of
    /// cells that became liquid.
    pub fn simulate_water(&mut self) -> usize {
        self.water.simulate(&mut self.active)
    }

    // =========================================================================
    // BLOCK ACCESS
    // =========================================================================

    /// Block at world coordinates. Inactive chunks and out-of-range
    /// heights read as empty.
    #[must_use]
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockKind> {
        let (coord, lx, ly, lz) = split(x, y, z)?;
        self.active.get(&coord)?.block_at(lx, ly, lz)
    }

    /// Edits a block at world coordinates. Returns whether anything
    /// changed; edits to inactive chunks are ignored.
    ///
    /// An edit on a chunk edge also marks the chunk across that edge
    /// dirty, since its boundary faces may change.
    pub fn set_block_at(&mut self, x: i32, y: i32, z: i32, block: Option<BlockKind>) -> bool {
        let Some((coord, lx, ly, lz)) = split(x, y, z) else {
            return false;
        };
        let Some(chunk) = self.active.get_mut(&coord) else {
            return false;
        };
        if !chunk.set_block_at(lx, ly, lz, block) {
            return false;
        }

        let mut edges = Vec::with_capacity(2);
        if lx == 0 {
            edges.push(Side::Left);
        } else if lx == CHUNK_WIDTH - 1 {
            edges.push(Side::Right);
        }
        if lz == 0 {
            edges.push(Side::Back);
        } else if lz == CHUNK_DEPTH - 1 {
            edges.push(Side::Front);
        }
        for side in edges {
            if let Some(neighbor) = self.active.get_mut(&coord.neighbor(side)) {
                neighbor.mark_dirty();
            }
        }
        true
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// An active chunk.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.active.get(&coord)
    }

    /// All active chunks, in no particular order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.active.values()
    }

    /// Active coordinates, sorted.
    #[must_use]
    pub fn active_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.active.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Coordinates that should be active.
    #[must_use]
    pub fn required(&self) -> &HashSet<ChunkCoord> {
        &self.required
    }

    /// The player's chunk.
    #[must_use]
    pub const fn player_chunk(&self) -> ChunkCoord {
        self.player
    }

    /// Current view radius.
    #[must_use]
    pub const fn view_radius(&self) -> u32 {
        self.radius
    }

    /// The configuration the world was built with, with the view radius
    /// kept current.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// How many inactive chunks the eviction cache holds before writing
    /// to disk.
    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        let loader = self.loader.stats();
        WorldStats {
            active: self.active.len(),
            pending_loads: self.pending.len(),
            cached: self.cache.len(),
            loaded_from_disk: loader.from_disk,
            generated: loader.generated,
            served_from_cache: self.counters.served_from_cache,
            evicted: self.counters.evicted,
            meshes_built: self.counters.meshes_built,
            cache: self.cache.stats(),
        }
    }

    // =========================================================================
    // SHUTDOWN
    // =========================================================================

    /// Stops the loader and writes every cached and active chunk to disk.
    /// Write failures are logged and skipped. Safe to call more than once;
    /// also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.loader.stop();
        self.pending.clear();

        let cached = self.cache.flush();
        let mut saved = 0;
        for (coord, chunk) in &self.active {
            match self.cache.store().save(*coord, &chunk.to_data()) {
                Ok(()) => saved += 1,
                Err(e) => tracing::warn!("Chunk ({}, {}) not saved: {}", coord.x, coord.z, e),
            }
        }
        tracing::info!("World shut down: {} active and {} cached chunks saved", saved, cached);
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    fn refresh_membership(&mut self) {
        self.required = required_coords(self.player, self.radius);

        let leaving: Vec<ChunkCoord> = self
            .active
            .keys()
            .filter(|coord| !self.required.contains(coord))
            .copied()
            .collect();
        for &coord in &leaving {
            self.deactivate(coord);
        }

        let player = self.player;
        let mut missing: Vec<ChunkCoord> = self
            .required
            .iter()
            .filter(|coord| !self.active.contains_key(coord) && !self.pending.contains(coord))
            .copied()
            .collect();
        missing.sort_unstable_by_key(|coord| (coord.chebyshev(player), *coord));

        let mut from_cache = 0;
        let mut requested = 0;
        for coord in missing {
            if let Some(data) = self.cache.get_cached(coord).cloned() {
                self.activate(coord, data);
                from_cache += 1;
                continue;
            }
            match self.loader.request_load(coord) {
                Ok(()) => {
                    self.pending.insert(coord);
                    requested += 1;
                }
                Err(e) => tracing::warn!("Load of ({}, {}) not queued: {}", coord.x, coord.z, e),
            }
        }
        self.counters.served_from_cache += from_cache;

        tracing::debug!(
            "Membership around ({}, {}) r={}: -{} chunks, +{} from cache, {} requested",
            player.x,
            player.z,
            self.radius,
            leaving.len(),
            from_cache,
            requested
        );
        self.settle();
    }

    /// Takes a loader result. Returns whether it became active.
    fn accept(&mut self, result: LoadResult) -> bool {
        let LoadResult { coord, data, source } = result;
        self.pending.remove(&coord);

        // Active chunks reach the cache on deactivation, decorated
        let wanted = self.required.contains(&coord) && !self.active.contains_key(&coord);
        if wanted {
            self.activate(coord, data);
        } else {
            self.cache.put(coord, data);
        }
        if source == LoadSource::Disk {
            tracing::trace!("Chunk ({}, {}) came from disk", coord.x, coord.z);
        }
        wanted
    }

    fn activate(&mut self, coord: ChunkCoord, data: ChunkData) {
        self.active.insert(coord, Chunk::from_data(coord, data));
        self.fresh.insert(coord);
    }

    fn deactivate(&mut self, coord: ChunkCoord) {
        let Some(mut chunk) = self.active.remove(&coord) else {
            return;
        };
        self.released.extend(chunk.take_mesh_handles());
        self.fresh.remove(&coord);
        self.cache.put(coord, chunk.into_data());
        self.counters.evicted += 1;
    }

    /// Relinks neighbors, then decorates and floods the new arrivals.
    fn settle(&mut self) {
        self.relink_neighbors();
        if self.fresh.is_empty() {
            return;
        }

        self.ore.decorate(&mut self.active);
        self.trees.decorate(&mut self.active);
        let fresh = std::mem::take(&mut self.fresh);
        self.water
            .simulate_where(&mut self.active, |chunk| fresh.contains(&chunk.coord()));
    }

    fn relink_neighbors(&mut self) {
        let coords: Vec<ChunkCoord> = self.active.keys().copied().collect();
        for coord in coords {
            for side in Side::ALL {
                let target = coord.neighbor(side);
                let link = self.active.contains_key(&target).then_some(target);
                if let Some(chunk) = self.active.get_mut(&coord) {
                    chunk.set_neighbor(side, link);
                }
            }
        }
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Splits world coordinates into a chunk and local cell.
fn split(x: i32, y: i32, z: i32) -> Option<(ChunkCoord, usize, usize, usize)> {
    if y < 0 || y >= CHUNK_HEIGHT as i32 {
        return None;
    }
    let coord = ChunkCoord::from_block(x, z);
    let lx = x.rem_euclid(CHUNK_WIDTH as i32) as usize;
    let lz = z.rem_euclid(CHUNK_DEPTH as i32) as usize;
    Some((coord, lx, y as usize, lz))
}
