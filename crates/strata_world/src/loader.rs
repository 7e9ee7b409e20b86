//! # Chunk Loader
//!
//! One background thread that turns coordinates into chunk data: from
//! disk if the chunk was saved, otherwise from the terrain generator.
//!
//! ```text
//!  main thread                         strata-chunk-loader
//!  ───────────                         ───────────────────
//!  request_load ──── requests ──────>  disk? ─ yes ─> ChunkData
//!                                        │ no
//!                                        └──> generate
//!  poll_result  <─── results ────────  LoadResult
//! ```
//!
//! The worker owns its store handle and generator and never sees world
//! state. Stopping wakes a blocked worker through a dedicated channel;
//! requests still queued are abandoned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use strata_core::ChunkCoord;

use crate::chunk::ChunkData;
use crate::error::{WorldError, WorldResult};
use crate::persistence::ChunkStore;
use crate::terrain::TerrainGenerator;

/// Name of the worker thread.
pub const THREAD_NAME: &str = "strata-chunk-loader";

/// A chunk the world wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    /// Chunk to load.
    pub coord: ChunkCoord,
}

/// Where a loaded chunk came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadSource {
    /// Read from the session directory.
    Disk,
    /// Produced by the terrain generator.
    Generated,
}

/// A finished load.
#[derive(Clone, Debug)]
pub struct LoadResult {
    /// Chunk that was requested.
    pub coord: ChunkCoord,
    /// Its contents.
    pub data: ChunkData,
    /// Where they came from.
    pub source: LoadSource,
}

/// Worker counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Requests taken off the queue.
    pub processed: u64,
    /// Served from disk.
    pub from_disk: u64,
    /// Generated from scratch.
    pub generated: u64,
    /// Disk reads that failed and fell back to generation.
    pub disk_errors: u64,
}

/// Handle to the loader thread.
pub struct ChunkLoader {
    requests: Sender<LoadRequest>,
    results: Receiver<LoadResult>,
    stop: Option<Sender<()>>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Mutex<LoaderStats>>,
    pending: usize,
    worker: Option<JoinHandle<()>>,
}

impl ChunkLoader {
    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LoaderSpawn`] if the thread cannot be created.
    pub fn spawn(store: ChunkStore, generator: TerrainGenerator) -> WorldResult<Self> {
        let (request_tx, request_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(LoaderStats::default()));

        let worker = Worker {
            requests: request_rx,
            results: result_tx,
            stop: stop_rx,
            shutdown: Arc::clone(&shutdown),
            stats: Arc::clone(&stats),
            store,
            generator,
        };
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || worker.run())
            .map_err(WorldError::LoaderSpawn)?;

        Ok(Self {
            requests: request_tx,
            results: result_rx,
            stop: Some(stop_tx),
            shutdown,
            stats,
            pending: 0,
            worker: Some(handle),
        })
    }

    /// Queues a load. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::LoaderDisconnected`] once the worker has
    /// stopped.
    pub fn request_load(&mut self, coord: ChunkCoord) -> WorldResult<()> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(WorldError::LoaderDisconnected);
        }
        self.requests
            .send(LoadRequest { coord })
            .map_err(|_| WorldError::LoaderDisconnected)?;
        self.pending += 1;
        tracing::trace!("Load requested: ({}, {})", coord.x, coord.z);
        Ok(())
    }

    /// Next finished load, if one is ready. Never blocks.
    pub fn poll_result(&mut self) -> Option<LoadResult> {
        let result = self.results.try_recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(result)
    }

    /// Next finished load, waiting up to `timeout`.
    pub fn wait_result(&mut self, timeout: Duration) -> Option<LoadResult> {
        let result = self.results.recv_timeout(timeout).ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(result)
    }

    /// Requests not yet collected.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.pending
    }

    /// Worker counters so far.
    #[must_use]
    pub fn stats(&self) -> LoaderStats {
        *self.stats.lock()
    }

    /// Whether the worker is still accepting requests.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
            && self.worker.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the worker and waits for it. Queued requests are dropped.
    /// Safe to call more than once.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        // Disconnecting the stop channel wakes a worker blocked on `select!`
        drop(self.stop.take());

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!("Chunk loader thread panicked");
            }
            self.pending = 0;
        }
    }
}

impl Drop for ChunkLoader {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    requests: Receiver<LoadRequest>,
    results: Sender<LoadResult>,
    stop: Receiver<()>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Mutex<LoaderStats>>,
    store: ChunkStore,
    generator: TerrainGenerator,
}

impl Worker {
    fn run(self) {
        tracing::info!("Chunk loader started");
        while !self.shutdown.load(Ordering::Acquire) {
            let request = select! {
                recv(self.stop) -> _ => None,
                recv(self.requests) -> msg => msg.ok(),
            };
            let Some(request) = request else {
                break;
            };
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            let result = self.load(request.coord);
            if self.results.send(result).is_err() {
                break;
            }
        }
        tracing::info!("Chunk loader stopped");
    }

    fn load(&self, coord: ChunkCoord) -> LoadResult {
        let stored = match self.store.load(coord) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Chunk ({}, {}) unreadable, regenerating: {}", coord.x, coord.z, e);
                self.stats.lock().disk_errors += 1;
                None
            }
        };

        let (data, source) = match stored {
            Some(data) => (data, LoadSource::Disk),
            None => (ChunkData::generated(self.generator.generate(coord)), LoadSource::Generated),
        };

        let mut stats = self.stats.lock();
        stats.processed += 1;
        match source {
            LoadSource::Disk => stats.from_disk += 1,
            LoadSource::Generated => stats.generated += 1,
        }
        LoadResult { coord, data, source }
    }
}
