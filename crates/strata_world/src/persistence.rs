//! # Chunk Persistence
//!
//! One directory per world session, one file per chunk:
//!
//! ```text
//! saves/
//! └── default/
//!     ├── 0_0.chunk
//!     ├── -1_0.chunk
//!     └── 3_-7.chunk
//! ```
//!
//! ## File Format
//!
//! ```text
//! ┌──────────┬─────────┬─────────┬──────────────────────────────────────┐
//! │ "STRK"   │ version │ flags   │ LZ4 (size-prepended) block id bytes  │
//! │ 4 bytes  │ 1 byte  │ 1 byte  │ 65536 ids after decompression        │
//! └──────────┴─────────┴─────────┴──────────────────────────────────────┘
//! ```
//!
//! Flags: bit 0 = ore placed, bit 1 = trees placed. Id 0 is an empty
//! cell. The little-endian size prefix must read 65536. Writes go to a
//! temporary file that is renamed into place, so a crash never leaves a
//! half-written chunk behind.

use std::fs;
use std::path::{Path, PathBuf};

use lz4_flex::block::decompress_into;
use lz4_flex::compress_prepend_size;
use strata_core::{BlockGrid, ChunkCoord, CELLS_PER_CHUNK};

use crate::chunk::ChunkData;
use crate::error::{WorldError, WorldResult};

/// Magic bytes at the start of every chunk file.
pub const MAGIC: [u8; 4] = *b"STRK";

/// Current chunk file version.
pub const FORMAT_VERSION: u8 = 1;

const EXTENSION: &str = "chunk";
const HEADER_LEN: usize = MAGIC.len() + 2;
const SIZE_PREFIX_LEN: usize = 4;
const FLAG_ORE: u8 = 1;
const FLAG_TREE: u8 = 1 << 1;

/// Disk store for one world session.
#[derive(Clone, Debug)]
pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    /// Opens (and creates if needed) a session directory.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> WorldResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| WorldError::io(&dir, e))?;
        tracing::info!("Chunk store opened at {}", dir.display());
        Ok(Self { dir })
    }

    /// The session directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds a chunk.
    #[must_use]
    pub fn path_for(&self, coord: ChunkCoord) -> PathBuf {
        self.dir.join(format!("{}_{}.{EXTENSION}", coord.x, coord.z))
    }

    /// Whether a chunk has been saved.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.path_for(coord).is_file()
    }

    /// Saves a chunk, replacing any previous copy.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Io`] if writing or renaming fails.
    pub fn save(&self, coord: ChunkCoord, data: &ChunkData) -> WorldResult<()> {
        let path = self.path_for(coord);
        let tmp = path.with_extension("chunk.tmp");
        let bytes = encode(data);

        fs::write(&tmp, &bytes).map_err(|e| WorldError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| WorldError::io(&path, e))?;
        tracing::trace!("Saved chunk ({}, {}): {} bytes", coord.x, coord.z, bytes.len());
        Ok(())
    }

    /// Loads a chunk. `Ok(None)` means it was never saved.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Io`] on read failure and
    /// [`WorldError::CorruptChunk`] if the file cannot be decoded.
    pub fn load(&self, coord: ChunkCoord) -> WorldResult<Option<ChunkData>> {
        let path = self.path_for(coord);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WorldError::io(&path, e)),
        };
        decode(coord, &bytes).map(Some)
    }

    /// Deletes a saved chunk. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Io`] if the file exists but cannot be removed.
    pub fn remove(&self, coord: ChunkCoord) -> WorldResult<bool> {
        let path = self.path_for(coord);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(WorldError::io(&path, e)),
        }
    }

    /// Every chunk saved in this session, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Io`] if the directory cannot be listed.
    pub fn stored_coords(&self) -> WorldResult<Vec<ChunkCoord>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| WorldError::io(&self.dir, e))?;
        let mut coords: Vec<ChunkCoord> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| parse_file_name(&entry.path()))
            .collect();
        coords.sort_unstable();
        Ok(coords)
    }
}

fn encode(data: &ChunkData) -> Vec<u8> {
    let mut flags = 0;
    if data.ore_decorated {
        flags |= FLAG_ORE;
    }
    if data.tree_decorated {
        flags |= FLAG_TREE;
    }

    let compressed = compress_prepend_size(&data.blocks.to_bytes());
    let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.push(flags);
    bytes.extend_from_slice(&compressed);
    bytes
}

fn decode(coord: ChunkCoord, bytes: &[u8]) -> WorldResult<ChunkData> {
    let corrupt = |reason: String| WorldError::CorruptChunk { coord, reason };

    if bytes.len() < HEADER_LEN || bytes[..MAGIC.len()] != MAGIC {
        return Err(corrupt("missing magic".to_string()));
    }
    let version = bytes[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported version {version}")));
    }
    let flags = bytes[MAGIC.len() + 1];

    // The stored size must match a chunk before anything is allocated
    if bytes.len() < HEADER_LEN + SIZE_PREFIX_LEN {
        return Err(corrupt("missing size prefix".to_string()));
    }
    let (prefix, compressed) = bytes[HEADER_LEN..].split_at(SIZE_PREFIX_LEN);
    let size = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if size != CELLS_PER_CHUNK {
        return Err(corrupt(format!("declared {size} cells, expected {CELLS_PER_CHUNK}")));
    }
    let mut raw = vec![0u8; CELLS_PER_CHUNK];
    let written = decompress_into(compressed, &mut raw).map_err(|e| corrupt(e.to_string()))?;
    if written != CELLS_PER_CHUNK {
        return Err(corrupt(format!("decompressed {written} cells, expected {CELLS_PER_CHUNK}")));
    }
    let blocks = BlockGrid::from_bytes(&raw).map_err(|e| corrupt(e.to_string()))?;
    Ok(ChunkData {
        blocks,
        ore_decorated: flags & FLAG_ORE != 0,
        tree_decorated: flags & FLAG_TREE != 0,
    })
}

fn parse_file_name(path: &Path) -> Option<ChunkCoord> {
    if path.extension()? != EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (x, z) = stem.split_once('_')?;
    Some(ChunkCoord::new(x.parse().ok()?, z.parse().ok()?))
}


#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::BlockKind;

    fn temp_store() -> ChunkStore {
        testing::temp_store("store")
    }

    fn sample_data() -> ChunkData {
        ChunkData {
            blocks: sample_grid(),
            ore_decorated: true,
            tree_decorated: false,
        }
    }

    fn sample_grid() -> BlockGrid {
        let mut grid = BlockGrid::new();
        for x in 0..16 {
            grid.set(x, 0, 3, Some(BlockKind::Bedrock));
            grid.set(x, 100, x, Some(BlockKind::ALL[x % BlockKind::ALL.len()]));
        }
        grid.set(15, 255, 15, Some(BlockKind::Water));
        grid
    }

    #[test]
    fn test_round_trip() {
        let store = temp_store();
        let coord = ChunkCoord::new(-3, 7);
        let data = sample_data();

        store.save(coord, &data).unwrap();
        assert!(store.contains(coord));
        let loaded = store.load(coord).unwrap().expect("saved");
        assert!(loaded.blocks == data.blocks);
        assert!(loaded.ore_decorated);
        assert!(!loaded.tree_decorated);

        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_missing_chunk_is_none() {
        let store = temp_store();
        assert!(store.load(ChunkCoord::new(1, 1)).unwrap().is_none());
        assert!(!store.remove(ChunkCoord::new(1, 1)).unwrap());
        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_file_naming() {
        let store = temp_store();
        let path = store.path_for(ChunkCoord::new(-1, 12));
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("-1_12.chunk"));
        assert_eq!(parse_file_name(&path), Some(ChunkCoord::new(-1, 12)));
        assert_eq!(parse_file_name(Path::new("notes.txt")), None);
        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_overwrite_replaces() {
        let store = temp_store();
        let coord = ChunkCoord::new(0, 0);
        store.save(coord, &ChunkData::default()).unwrap();
        store.save(coord, &sample_data()).unwrap();

        assert!(store.load(coord).unwrap().expect("saved") == sample_data());
        assert_eq!(store.stored_coords().unwrap(), vec![coord]);
        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_corrupt_files_are_reported() {
        let store = temp_store();
        let coord = ChunkCoord::new(2, 2);

        fs::write(store.path_for(coord), b"garbage").unwrap();
        assert!(matches!(store.load(coord), Err(WorldError::CorruptChunk { .. })));

        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[FORMAT_VERSION, 0]);
        bytes.extend_from_slice(&compress_prepend_size(&[0u8; 10]));
        fs::write(store.path_for(coord), &bytes).unwrap();
        assert!(matches!(store.load(coord), Err(WorldError::CorruptChunk { .. })));

        // A forged size is refused without allocating it
        let mut forged = encode(&ChunkData::default());
        forged[HEADER_LEN..HEADER_LEN + SIZE_PREFIX_LEN].copy_from_slice(&u32::MAX.to_le_bytes());
        fs::write(store.path_for(coord), &forged).unwrap();
        let err = store.load(coord).unwrap_err();
        assert!(err.to_string().contains("4294967295"), "{err}");

        // Header and size only
        fs::write(store.path_for(coord), &forged[..HEADER_LEN + SIZE_PREFIX_LEN - 1]).unwrap();
        assert!(matches!(store.load(coord), Err(WorldError::CorruptChunk { .. })));

        fs::remove_dir_all(store.dir()).ok();
    }

    #[test]
    fn test_stored_coords_lists_sorted() {
        let store = temp_store();
        for coord in [ChunkCoord::new(4, 0), ChunkCoord::new(-2, 5), ChunkCoord::new(0, 0)] {
            store.save(coord, &ChunkData::default()).unwrap();
        }
        assert_eq!(
            store.stored_coords().unwrap(),
            vec![ChunkCoord::new(-2, 5), ChunkCoord::new(0, 0), ChunkCoord::new(4, 0)]
        );
        assert!(store.remove(ChunkCoord::new(0, 0)).unwrap());
        assert_eq!(store.stored_coords().unwrap().len(), 2);
        fs::remove_dir_all(store.dir()).ok();
    }
}
