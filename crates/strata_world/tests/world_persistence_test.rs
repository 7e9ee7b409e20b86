//! # World Persistence Integration Test
//!
//! Edits survive shutdown, reopened sessions read from disk, and the
//! eviction cache writes exactly what it pushes out.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use strata_core::{BlockGrid, BlockKind, ChunkCoord};
use strata_world::{ChunkCache, ChunkData, ChunkStore, World, WorldConfig};

const WAIT: Duration = Duration::from_secs(60);

fn temp_root(name: &str) -> PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("test_strata_{name}_{id}"))
}

fn config(root: &Path) -> WorldConfig {
    WorldConfig::default()
        .with_seed(99)
        .with_view_radius(1)
        .with_storage(root, "survival")
}

#[test]
fn test_edits_survive_a_restart() {
    let root = temp_root("restart");

    let mut world = World::new(config(&root)).unwrap();
    world.flush_loads(WAIT);
    assert!(world.set_block_at(5, 240, 5, Some(BlockKind::Obsidian)));
    assert!(world.set_block_at(-3, 241, -7, Some(BlockKind::Leaves)));
    world.shutdown();
    world.shutdown();
    drop(world);

    let store = ChunkStore::open(config(&root).session_dir()).unwrap();
    assert_eq!(store.stored_coords().unwrap().len(), 9);

    let mut world = World::new(config(&root)).unwrap();
    world.flush_loads(WAIT);
    let stats = world.stats();
    assert_eq!(stats.loaded_from_disk, 9);
    assert_eq!(stats.generated, 0);

    assert_eq!(world.block_at(5, 240, 5), Some(BlockKind::Obsidian));
    assert_eq!(world.block_at(-3, 241, -7), Some(BlockKind::Leaves));
    for chunk in world.chunks() {
        assert!(chunk.is_ore_decorated(), "Flags come back from disk");
        assert!(chunk.is_tree_decorated());
    }

    drop(world);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_sessions_are_isolated() {
    let root = temp_root("sessions");

    let mut world = World::new(config(&root)).unwrap();
    world.flush_loads(WAIT);
    assert!(world.set_block_at(1, 240, 1, Some(BlockKind::Obsidian)));
    drop(world);

    let other = config(&root).with_storage(&root, "creative");
    let mut world = World::new(other).unwrap();
    world.flush_loads(WAIT);
    assert_eq!(world.stats().generated, 9);
    assert_ne!(world.block_at(1, 240, 1), Some(BlockKind::Obsidian));

    drop(world);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_corrupt_chunk_is_regenerated() {
    let root = temp_root("corrupt");
    let cfg = config(&root);
    let store = ChunkStore::open(cfg.session_dir()).unwrap();
    std::fs::write(store.path_for(ChunkCoord::new(0, 0)), b"not a chunk").unwrap();

    let mut world = World::new(cfg).unwrap();
    world.flush_loads(WAIT);
    assert_eq!(world.active_coords().len(), 9);
    assert_eq!(world.stats().generated, 9);
    assert_eq!(world.block_at(3, 0, 3), Some(BlockKind::Bedrock));

    drop(world);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_cache_overflow_writes_exactly_one_chunk() {
    let root = temp_root("overflow");
    let store = ChunkStore::open(&root).unwrap();
    let capacity = 4;
    let mut cache = ChunkCache::new(capacity, store.clone());

    for i in 0..=capacity as i32 {
        let mut blocks = BlockGrid::new();
        blocks.set(0, 0, 0, Some(BlockKind::Stone));
        cache.put(ChunkCoord::new(i, 0), ChunkData::generated(blocks));
    }

    assert_eq!(cache.len(), capacity);
    assert_eq!(cache.stats().writes, 1);
    assert_eq!(cache.stats().evictions, 1);
    assert_eq!(store.stored_coords().unwrap(), vec![ChunkCoord::new(0, 0)]);
    assert!(!cache.contains(ChunkCoord::new(0, 0)));

    // A later miss is answered from disk
    let data = cache.get(ChunkCoord::new(0, 0)).cloned().expect("on disk");
    assert_eq!(data.blocks.get(0, 0, 0), Some(BlockKind::Stone));
    assert_eq!(cache.stats().disk_loads, 1);

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_edit_survives_cache_overflow_and_return() {
    let root = temp_root("overflow_return");
    let cfg = WorldConfig {
        cache_multiplier: 1,
        ..config(&root)
    };
    let store = ChunkStore::open(cfg.session_dir()).unwrap();
    let mut world = World::new(cfg).unwrap();
    assert_eq!(world.cache_capacity(), 9);
    world.flush_loads(WAIT);

    let edited = ChunkCoord::new(-1, 0);
    assert!(world.set_block_at(-5, 240, 3, Some(BlockKind::Obsidian)));

    // Five columns leave; the first two overflow the nine-chunk cache
    for cx in 1..=5 {
        world.update_player_position(f64::from(cx * 16) + 0.5, 0.5);
        world.flush_loads(WAIT);
    }
    let away = world.stats();
    assert_eq!(away.cached, 9);
    assert_eq!(away.cache.evictions, 6);
    assert_eq!(away.cache.writes, 6);
    let on_disk = store.load(edited).unwrap().expect("pushed out to disk");
    assert_eq!(on_disk.blocks.get(11, 240, 3), Some(BlockKind::Obsidian));

    for cx in (0..=4).rev() {
        world.update_player_position(f64::from(cx * 16) + 0.5, 0.5);
        world.flush_loads(WAIT);
    }
    assert_eq!(world.active_coords().len(), 9);
    let back = world.stats();
    assert!(back.loaded_from_disk >= away.loaded_from_disk + 6, "Columns -1 and 0 come from disk");

    assert_eq!(world.block_at(-5, 240, 3), Some(BlockKind::Obsidian));
    let chunk = world.chunk(edited).expect("active again");
    assert!(chunk.is_ore_decorated());
    assert!(chunk.is_tree_decorated());

    drop(world);
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn test_config_from_toml_drives_the_world() {
    let root = temp_root("toml");
    let source = format!(
        "seed = 7\nview_radius = 0\nsession = \"tiny\"\nstorage_root = {:?}\n",
        root.display().to_string()
    );
    let cfg = WorldConfig::from_toml_str(&source).unwrap();
    assert_eq!(cfg.session_dir(), root.join("tiny"));

    let mut world = World::new(cfg).unwrap();
    world.flush_loads(WAIT);
    assert_eq!(world.active_coords(), vec![ChunkCoord::new(0, 0)]);
    assert_eq!(world.view_radius(), 0);

    drop(world);
    std::fs::remove_dir_all(&root).ok();
}
