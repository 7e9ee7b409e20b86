//! # World Configuration
//!
//! Loaded once at startup, from TOML or built in code.
//!
//! ```toml
//! seed = 1337
//! view_radius = 4
//! session = "survival-01"
//! storage_root = "saves"
//!
//! [terrain]
//! height_octaves = 5
//! cave_threshold = 0.35
//! ```
//!
//! Every field has a default, so an empty document is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_core::noise::Octaves;

use crate::error::{WorldError, WorldResult};

/// Top-level world configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed. Same seed, same terrain.
    pub seed: u64,
    /// Chunks kept active in each direction around the player.
    pub view_radius: u32,
    /// Session name. Chunk files live in `storage_root/session`.
    pub session: String,
    /// Directory holding all sessions.
    pub storage_root: PathBuf,
    /// Eviction cache capacity as a multiple of the active chunk count.
    pub cache_multiplier: usize,
    /// Chunk meshes rebuilt per call to `World::build_meshes`.
    pub mesh_budget_per_tick: usize,
    /// Terrain shaping parameters.
    pub terrain: TerrainConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0x5742_A7A5_0000_0001,
            view_radius: 3,
            session: "default".to_owned(),
            storage_root: PathBuf::from("saves"),
            cache_multiplier: 2,
            mesh_budget_per_tick: 4,
            terrain: TerrainConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] on malformed TOML or
    /// out-of-range values.
    pub fn from_toml_str(source: &str) -> WorldResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| WorldError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> WorldResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| WorldError::io(path, e))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> WorldResult<()> {
        let mut components = Path::new(&self.session).components();
        let single_component = matches!(
            (components.next(), components.next()),
            (Some(std::path::Component::Normal(_)), None)
        );
        if !single_component {
            return Err(WorldError::InvalidConfig(format!(
                "session must be a plain directory name, got {:?}",
                self.session
            )));
        }
        if self.cache_multiplier == 0 {
            return Err(WorldError::InvalidConfig(
                "cache_multiplier must be at least 1".to_owned(),
            ));
        }
        self.terrain.validate()
    }

    /// Directory holding this session's chunk files.
    #[must_use]
    pub fn session_dir(&self) -> PathBuf {
        self.storage_root.join(&self.session)
    }

    /// Number of chunks active at the current radius.
    #[must_use]
    pub fn active_chunk_count(&self) -> usize {
        let side = 2 * self.view_radius as usize + 1;
        side * side
    }

    /// Eviction cache capacity.
    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.active_chunk_count() * self.cache_multiplier.max(1)
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the view radius.
    #[must_use]
    pub fn with_view_radius(mut self, radius: u32) -> Self {
        self.view_radius = radius;
        self
    }

    /// Sets where chunk files go.
    #[must_use]
    pub fn with_storage(mut self, root: impl Into<PathBuf>, session: impl Into<String>) -> Self {
        self.storage_root = root.into();
        self.session = session.into();
        self
    }
}

/// Terrain shaping parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Height map fBM layers.
    pub height_octaves: u32,
    /// Height map amplitude decay per layer.
    pub height_persistence: f64,
    /// Height map frequency growth per layer.
    pub height_lacunarity: f64,
    /// Height map base frequency (per block).
    pub height_frequency: f64,
    /// Cave fBM layers.
    pub cave_octaves: u32,
    /// Cave amplitude decay per layer.
    pub cave_persistence: f64,
    /// Cave frequency growth per layer.
    pub cave_lacunarity: f64,
    /// Cave base frequency (per block).
    pub cave_frequency: f64,
    /// Cells with cave noise above this are carved out.
    pub cave_threshold: f64,
    /// Oceans fill with water up to this height.
    pub sea_level: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height_octaves: 4,
            height_persistence: 0.5,
            height_lacunarity: 2.0,
            height_frequency: 0.125,
            cave_octaves: 3,
            cave_persistence: 0.5,
            cave_lacunarity: 2.0,
            cave_frequency: 0.01,
            cave_threshold: 0.3,
            sea_level: 60,
        }
    }
}

impl TerrainConfig {
    /// Octave parameters of the height map.
    #[must_use]
    pub const fn height_octaves(&self) -> Octaves {
        Octaves::new(self.height_octaves, self.height_persistence, self.height_lacunarity)
    }

    /// Octave parameters of the cave field.
    #[must_use]
    pub const fn cave_octaves(&self) -> Octaves {
        Octaves::new(self.cave_octaves, self.cave_persistence, self.cave_lacunarity)
    }

    fn validate(&self) -> WorldResult<()> {
        if self.height_octaves == 0 || self.cave_octaves == 0 {
            return Err(WorldError::InvalidConfig(
                "octave counts must be at least 1".to_owned(),
            ));
        }
        if self.sea_level >= strata_core::CHUNK_HEIGHT {
            return Err(WorldError::InvalidConfig(format!(
                "sea_level {} is above the world",
                self.sea_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = WorldConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, WorldConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = WorldConfig::from_toml_str(
            "seed = 7\nview_radius = 5\nsession = \"alpha\"\n[terrain]\ncave_threshold = 0.4\n",
        )
        .expect("valid config");
        assert_eq!(config.seed, 7);
        assert_eq!(config.view_radius, 5);
        assert_eq!(config.session_dir(), PathBuf::from("saves").join("alpha"));
        assert!((config.terrain.cave_threshold - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.terrain.height_octaves, 4);
    }

    #[test]
    fn test_rejects_bad_session() {
        for session in ["", "../escape", "a/b"] {
            let source = format!("session = {session:?}");
            assert!(
                matches!(
                    WorldConfig::from_toml_str(&source),
                    Err(WorldError::InvalidConfig(_))
                ),
                "session {session:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_zero_octaves() {
        let result = WorldConfig::from_toml_str("[terrain]\nheight_octaves = 0");
        assert!(matches!(result, Err(WorldError::InvalidConfig(_))));
    }

    #[test]
    fn test_cache_capacity_tracks_radius() {
        let config = WorldConfig::default().with_view_radius(1);
        assert_eq!(config.active_chunk_count(), 9);
        assert_eq!(config.cache_capacity(), 18);
    }
}
