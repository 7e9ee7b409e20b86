//! # Eviction Cache
//!
//! Bounded LRU of chunks that recently left the active set, backed by
//! the [`ChunkStore`]. Overflow writes the least recently used entry to
//! disk instead of dropping it.
//!
//! ## Layout
//!
//! Entries live in an arena (`Vec`) with a free list, linked into a
//! doubly linked recency list by index. Slots 0 and 1 are the head and
//! tail sentinels, so link and unlink never branch on an empty list.
//!
//! ```text
//! HEAD <-> most recent <-> ... <-> least recent <-> TAIL
//! ```

use std::collections::HashMap;

use strata_core::ChunkCoord;

use crate::chunk::ChunkData;
use crate::persistence::ChunkStore;

const HEAD: usize = 0;
const TAIL: usize = 1;

/// Cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from memory.
    pub hits: u64,
    /// Lookups not in memory.
    pub misses: u64,
    /// Misses answered from disk.
    pub disk_loads: u64,
    /// Entries pushed out by overflow.
    pub evictions: u64,
    /// Successful disk writes.
    pub writes: u64,
    /// Disk writes that failed and were skipped.
    pub write_failures: u64,
}

struct Entry {
    coord: ChunkCoord,
    data: Option<ChunkData>,
    prev: usize,
    next: usize,
}

impl Entry {
    const fn sentinel(prev: usize, next: usize) -> Self {
        Self {
            coord: ChunkCoord::new(0, 0),
            data: None,
            prev,
            next,
        }
    }
}

/// LRU chunk cache with write-back to disk.
pub struct ChunkCache {
    capacity: usize,
    store: ChunkStore,
    index: HashMap<ChunkCoord, usize>,
    entries: Vec<Entry>,
    free_list: Vec<usize>,
    stats: CacheStats,
}

impl ChunkCache {
    /// Creates an empty cache. A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize, store: ChunkStore) -> Self {
        let capacity = capacity.max(1);
        let mut entries = Vec::with_capacity(capacity + 2);
        entries.push(Entry::sentinel(HEAD, TAIL));
        entries.push(Entry::sentinel(HEAD, TAIL));
        Self {
            capacity,
            store,
            index: HashMap::with_capacity(capacity + 1),
            entries,
            free_list: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    /// Maximum entries held in memory.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity. Shrinking writes the least recently used
    /// entries to disk until the cache fits. Returns the number evicted.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        let capacity = capacity.max(1);
        if capacity != self.capacity {
            tracing::debug!("Cache capacity {} -> {}", self.capacity, capacity);
        }
        self.capacity = capacity;

        let mut evicted = 0;
        while self.index.len() > self.capacity {
            self.evict_lru();
            evicted += 1;
        }
        evicted
    }

    /// Entries held in memory.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether nothing is held in memory.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether a chunk is held in memory.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.index.contains_key(&coord)
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Looks a chunk up, falling back to disk on a miss. A chunk found on
    /// disk is inserted as most recently used.
    ///
    /// Disk errors are logged and read as "not found".
    pub fn get(&mut self, coord: ChunkCoord) -> Option<&ChunkData> {
        if self.index.contains_key(&coord) {
            return self.get_cached(coord);
        }
        self.stats.misses += 1;

        match self.store.load(coord) {
            Ok(Some(data)) => {
                self.stats.disk_loads += 1;
                self.insert(coord, data);
                self.peek(coord)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Chunk ({}, {}) unreadable, regenerating: {}", coord.x, coord.z, e);
                None
            }
        }
    }

    /// Looks a chunk up in memory only, marking it most recently used.
    /// Never touches the disk.
    pub fn get_cached(&mut self, coord: ChunkCoord) -> Option<&ChunkData> {
        let Some(&slot) = self.index.get(&coord) else {
            return None;
        };
        self.stats.hits += 1;
        self.unlink(slot);
        self.link_front(slot);
        self.entries[slot].data.as_ref()
    }

    /// Reads an entry without changing its recency.
    #[must_use]
    pub fn peek(&self, coord: ChunkCoord) -> Option<&ChunkData> {
        let slot = *self.index.get(&coord)?;
        self.entries[slot].data.as_ref()
    }

    /// Inserts or replaces a chunk as most recently used. If that
    /// overflows the cache, the least recently used entry is written to
    /// disk and dropped.
    pub fn put(&mut self, coord: ChunkCoord, data: ChunkData) {
        self.insert(coord, data);
    }

    /// Least recently used coordinate.
    #[must_use]
    pub fn lru(&self) -> Option<ChunkCoord> {
        let last = self.entries[TAIL].prev;
        (last != HEAD).then(|| self.entries[last].coord)
    }

    /// Coordinates from most to least recently used.
    #[must_use]
    pub fn coords_by_recency(&self) -> Vec<ChunkCoord> {
        let mut coords = Vec::with_capacity(self.len());
        let mut slot = self.entries[HEAD].next;
        while slot != TAIL {
            coords.push(self.entries[slot].coord);
            slot = self.entries[slot].next;
        }
        coords
    }

    /// Writes every entry to disk without evicting. Returns the number
    /// written.
    pub fn flush(&mut self) -> usize {
        let mut written = 0;
        let mut slot = self.entries[HEAD].next;
        while slot != TAIL {
            let coord = self.entries[slot].coord;
            if let Some(data) = &self.entries[slot].data {
                written += usize::from(persist(&self.store, &mut self.stats, coord, data));
            }
            slot = self.entries[slot].next;
        }
        tracing::debug!("Cache flushed: {} of {} chunks written", written, self.len());
        written
    }

    fn insert(&mut self, coord: ChunkCoord, data: ChunkData) {
        if let Some(&slot) = self.index.get(&coord) {
            self.release(slot);
        }

        let slot = self.allocate(coord, data);
        self.link_front(slot);
        self.index.insert(coord, slot);

        if self.index.len() > self.capacity {
            self.evict_lru();
        }
    }

    fn evict_lru(&mut self) {
        let slot = self.entries[TAIL].prev;
        if slot == HEAD {
            return;
        }
        let coord = self.entries[slot].coord;
        if let Some(data) = self.release(slot) {
            persist(&self.store, &mut self.stats, coord, &data);
        }
        self.stats.evictions += 1;
        tracing::trace!("Evicted chunk ({}, {}) to disk", coord.x, coord.z);
    }

    fn allocate(&mut self, coord: ChunkCoord, data: ChunkData) -> usize {
        let entry = Entry {
            coord,
            data: Some(data),
            prev: HEAD,
            next: TAIL,
        };
        if let Some(slot) = self.free_list.pop() {
            self.entries[slot] = entry;
            slot
        } else {
            self.entries.push(entry);
            self.entries.len() - 1
        }
    }

    /// Unlinks a slot, returns it to the free list and hands back its data.
    fn release(&mut self, slot: usize) -> Option<ChunkData> {
        self.unlink(slot);
        self.index.remove(&self.entries[slot].coord);
        self.free_list.push(slot);
        self.entries[slot].data.take()
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.entries[slot].prev, self.entries[slot].next);
        self.entries[prev].next = next;
        self.entries[next].prev = prev;
    }

    fn link_front(&mut self, slot: usize) {
        let first = self.entries[HEAD].next;
        self.entries[slot].prev = HEAD;
        self.entries[slot].next = first;
        self.entries[first].prev = slot;
        self.entries[HEAD].next = slot;
    }
}

/// Best-effort write. Returns whether it succeeded.
fn persist(store: &ChunkStore, stats: &mut CacheStats, coord: ChunkCoord, data: &ChunkData) -> bool {
    match store.save(coord, data) {
        Ok(()) => {
            stats.writes += 1;
            true
        }
        Err(e) => {
            stats.write_failures += 1;
            tracing::warn!("Chunk ({}, {}) not saved: {}", coord.x, coord.z, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::testing::temp_store;
    use strata_core::{BlockGrid, BlockKind};

    fn tagged(tag: usize) -> ChunkData {
        let mut blocks = BlockGrid::new();
        blocks.set(tag % 16, 1, tag / 16 % 16, Some(BlockKind::Gravel));
        ChunkData::generated(blocks)
    }

    fn coord(i: usize) -> ChunkCoord {
        ChunkCoord::new(i as i32, -(i as i32))
    }

    #[test]
    fn test_overflow_writes_exactly_one() {
        let store = temp_store("cache_overflow");
        let mut cache = ChunkCache::new(4, store.clone());

        for i in 0..5 {
            cache.put(coord(i), tagged(i));
        }

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.stats().writes, 1);
        assert_eq!(cache.stats().evictions, 1);
        assert!(!cache.contains(coord(0)));
        assert!(store.load(coord(0)).unwrap().expect("evicted to disk") == tagged(0));
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_lookup_refreshes_recency() {
        let store = temp_store("cache_recency");
        let mut cache = ChunkCache::new(3, store.clone());
        for i in 0..3 {
            cache.put(coord(i), tagged(i));
        }
        assert_eq!(cache.lru(), Some(coord(0)));

        assert!(cache.get_cached(coord(0)).is_some());
        assert_eq!(cache.coords_by_recency(), vec![coord(0), coord(2), coord(1)]);

        cache.put(coord(3), tagged(3));
        assert!(cache.contains(coord(0)));
        assert!(!cache.contains(coord(1)), "Oldest untouched entry goes first");
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_put_existing_replaces_in_place() {
        let store = temp_store("cache_replace");
        let mut cache = ChunkCache::new(2, store.clone());
        cache.put(coord(0), tagged(0));
        cache.put(coord(1), tagged(1));
        cache.put(coord(0), tagged(7));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().writes, 0);
        assert!(cache.peek(coord(0)) == Some(&tagged(7)));
        assert_eq!(cache.lru(), Some(coord(1)));
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_get_falls_back_to_disk() {
        let store = temp_store("cache_disk");
        let mut data = tagged(5);
        data.tree_decorated = true;
        store.save(coord(5), &data).unwrap();

        let mut cache = ChunkCache::new(2, store.clone());
        assert!(cache.get_cached(coord(5)).is_none(), "Memory-only lookup skips disk");
        assert!(cache.get(coord(5)) == Some(&data));
        assert!(cache.contains(coord(5)));
        assert!(cache.get(coord(9)).is_none());

        let stats = cache.stats();
        assert_eq!(stats.disk_loads, 1);
        assert_eq!(stats.misses, 2);
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_corrupt_file_reads_as_miss() {
        let store = temp_store("cache_corrupt");
        std::fs::write(store.path_for(coord(2)), b"not a chunk").unwrap();
        let mut cache = ChunkCache::new(2, store.clone());
        assert!(cache.get(coord(2)).is_none());
        assert!(cache.is_empty());
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_slots_are_reused() {
        let store = temp_store("cache_slots");
        let mut cache = ChunkCache::new(2, store.clone());
        for i in 0..20 {
            cache.put(coord(i), tagged(i));
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.entries.len() <= 2 + 3);
        assert_eq!(cache.coords_by_recency(), vec![coord(19), coord(18)]);
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_set_capacity_grows_and_shrinks() {
        let store = temp_store("cache_resize");
        let mut cache = ChunkCache::new(2, store.clone());

        assert_eq!(cache.set_capacity(6), 0);
        for i in 0..6 {
            cache.put(coord(i), tagged(i));
        }
        assert_eq!(cache.len(), 6);
        assert_eq!(cache.stats().writes, 0);

        // Oldest entries go to disk first
        assert_eq!(cache.set_capacity(4), 2);
        assert_eq!(cache.capacity(), 4);
        assert_eq!(cache.coords_by_recency(), vec![coord(5), coord(4), coord(3), coord(2)]);
        assert_eq!(store.stored_coords().unwrap().len(), 2);
        assert!(store.load(coord(0)).unwrap().expect("written on shrink") == tagged(0));

        assert_eq!(cache.set_capacity(0), 3);
        assert_eq!(cache.capacity(), 1);
        std::fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_flush_writes_everything() {
        let store = temp_store("cache_flush");
        let mut cache = ChunkCache::new(8, store.clone());
        for i in 0..3 {
            cache.put(coord(i), tagged(i));
        }
        assert_eq!(cache.flush(), 3);
        assert_eq!(cache.len(), 3);
        assert_eq!(store.stored_coords().unwrap().len(), 3);
        std::fs::remove_dir_all(store.dir()).ok();
    }
}
