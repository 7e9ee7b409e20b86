//! # Terrain Generator
//!
//! Synthesizes the full block grid of one chunk from its coordinate and the
//! world seed alone. No other chunk is consulted, so any chunk can be
//! generated on any thread, in any order, any number of times.
//!
//! ## Pipeline (per column)
//!
//! 1. Biome noise (its own frequency modulated by a slower noise) is
//!    blended into [`BiomeParameters`].
//! 2. Height fBM scaled by the blended amplitude gives the surface.
//! 3. Ocean columns sink by a depth from a very slow "ocean scale" noise.
//! 4. Bands are derived from the surface; cells are assigned per biome.
//! 5. 3D cave fBM clears cells below the surface.

// Block and chunk coordinates convert between i32, usize and floats
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use strata_core::noise::{GradientNoise, Octaves, SeedStream, WorldSeed};
use strata_core::{BlockGrid, BlockKind, ChunkCoord, CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH};

use crate::biome::{assign_block, Bands, BiomeParameters};
use crate::config::TerrainConfig;

/// Everything the generator knows about one column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnProfile {
    /// Blended biome parameters.
    pub params: BiomeParameters,
    /// Surface height (highest terrain cell before carving).
    pub surface: usize,
    /// Band limits derived from `surface`.
    pub bands: Bands,
}

/// Chunk generator using procedural noise.
pub struct TerrainGenerator {
    config: TerrainConfig,
    height_noise: GradientNoise,
    biome_noise: GradientNoise,
    biome_scale_noise: GradientNoise,
    ocean_noise: GradientNoise,
    cave_noise: GradientNoise,
}

impl TerrainGenerator {
    /// Base frequency of the biome noise.
    const BIOME_FREQUENCY: f64 = 0.005;
    /// Frequency of the noise that stretches biome sizes.
    const BIOME_SCALE_FREQUENCY: f64 = 0.01;
    /// Smallest biome frequency multiplier.
    const BIOME_SCALE_MIN: f64 = 0.5;
    /// Span of the biome frequency multiplier.
    const BIOME_SCALE_SPAN: f64 = 1.5;
    /// Biome noise layers.
    const BIOME_OCTAVES: Octaves = Octaves::new(3, 0.5, 2.0);
    /// Ocean depth noise frequency.
    const OCEAN_FREQUENCY: f64 = 0.0001;
    /// Shallowest extra ocean depth.
    const OCEAN_MIN_DEPTH: f64 = 4.0;
    /// Deepest extra ocean depth.
    const OCEAN_MAX_DEPTH: f64 = 40.0;
    /// Ocean scale at which the depth curve bends.
    const OCEAN_KNEE: f64 = 0.3;

    /// Creates a new terrain generator.
    #[must_use]
    pub fn new(seed: WorldSeed, config: TerrainConfig) -> Self {
        Self {
            config,
            height_noise: GradientNoise::new(seed.stream(SeedStream::Height)),
            biome_noise: GradientNoise::new(seed.stream(SeedStream::Biome)),
            biome_scale_noise: GradientNoise::new(seed.stream(SeedStream::BiomeScale)),
            ocean_noise: GradientNoise::new(seed.stream(SeedStream::Ocean)),
            cave_noise: GradientNoise::new(seed.stream(SeedStream::Cave)),
        }
    }

    /// Terrain parameters in use.
    #[must_use]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Blended biome parameters at a world column.
    #[must_use]
    pub fn biome_parameters(&self, world_x: i32, world_z: i32) -> BiomeParameters {
        let (x, z) = (f64::from(world_x), f64::from(world_z));

        let scale_sample = self.biome_scale_noise.fbm2(
            x * Self::BIOME_SCALE_FREQUENCY,
            z * Self::BIOME_SCALE_FREQUENCY,
            Octaves::new(2, 0.5, 2.0),
        );
        let scale = unit(scale_sample);
        let frequency = Self::BIOME_FREQUENCY * (Self::BIOME_SCALE_MIN + scale * Self::BIOME_SCALE_SPAN);

        let value = self
            .biome_noise
            .fbm2(x * frequency, z * frequency, Self::BIOME_OCTAVES);
        BiomeParameters::blend(value)
    }

    /// Full profile of a world column.
    #[must_use]
    pub fn column(&self, world_x: i32, world_z: i32) -> ColumnProfile {
        let params = self.biome_parameters(world_x, world_z);
        let (x, z) = (f64::from(world_x), f64::from(world_z));

        let frequency = self.config.height_frequency;
        let noise = self
            .height_noise
            .fbm2(x * frequency, z * frequency, self.config.height_octaves());
        let mut surface = params.base_height + noise * params.amplitude;

        if params.ocean_share > 0.0 {
            let depressed = surface - self.ocean_depth(x, z);
            surface = surface * (1.0 - params.ocean_share) + depressed * params.ocean_share;
        }

        let surface = (surface.round().max(1.0) as usize).min(CHUNK_HEIGHT - 2);
        ColumnProfile {
            params,
            surface,
            bands: Bands::from_surface(surface),
        }
    }

    /// Extra depth of an ocean floor, continuous in the ocean scale noise.
    fn ocean_depth(&self, x: f64, z: f64) -> f64 {
        let sample = self.ocean_noise.fbm2(
            x * Self::OCEAN_FREQUENCY,
            z * Self::OCEAN_FREQUENCY,
            Octaves::new(1, 1.0, 2.0),
        );
        let scale = unit(sample);

        // Shallow shelves below the knee, the deep half above it
        let fraction = if scale < Self::OCEAN_KNEE {
            0.5 * scale / Self::OCEAN_KNEE
        } else {
            0.5 + 0.5 * (scale - Self::OCEAN_KNEE) / (1.0 - Self::OCEAN_KNEE)
        };
        Self::OCEAN_MIN_DEPTH + (Self::OCEAN_MAX_DEPTH - Self::OCEAN_MIN_DEPTH) * fraction
    }

    /// Whether the cave field clears a world cell.
    #[must_use]
    pub fn is_cave(&self, world_x: i32, y: usize, world_z: i32) -> bool {
        let frequency = self.config.cave_frequency;
        let value = self.cave_noise.fbm3(
            f64::from(world_x) * frequency,
            y as f64 * frequency,
            f64::from(world_z) * frequency,
            self.config.cave_octaves(),
        );
        value > self.config.cave_threshold
    }

    /// Generates the block grid of a chunk.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord) -> BlockGrid {
        let mut grid = BlockGrid::new();
        let sea_level = self.config.sea_level;

        for local_z in 0..CHUNK_DEPTH {
            for local_x in 0..CHUNK_WIDTH {
                let world_x = coord.origin_x() + local_x as i32;
                let world_z = coord.origin_z() + local_z as i32;
                let profile = self.column(world_x, world_z);
                let top = profile.surface.max(sea_level);

                for y in 0..=top {
                    let mut block =
                        assign_block(y, &profile.params, profile.surface, &profile.bands, sea_level);
                    if let Some(kind) = block {
                        let carvable = y < profile.surface
                            && kind != BlockKind::Bedrock
                            && !kind.is_liquid();
                        if carvable && self.is_cave(world_x, y, world_z) {
                            block = None;
                        }
                    }
                    grid.set(local_x, y, local_z, block);
                }
            }
        }

        grid
    }
}

/// Maps a roughly `[-1, 1]` sample to `[0, 1]`.
#[inline]
fn unit(sample: f64) -> f64 {
    ((sample + 1.0) * 0.5).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> TerrainGenerator {
        TerrainGenerator::new(WorldSeed::new(seed), TerrainConfig::default())
    }

    #[test]
    fn test_determinism() {
        let a = generator(42).generate(ChunkCoord::new(3, -7));
        let b = generator(42).generate(ChunkCoord::new(3, -7));
        assert!(a.to_bytes() == b.to_bytes(), "Same seed and coord must match byte for byte");
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generator(1).generate(ChunkCoord::new(0, 0));
        let b = generator(2).generate(ChunkCoord::new(0, 0));
        assert!(a != b);
    }

    #[test]
    fn test_bedrock_floor_everywhere() {
        let grid = generator(7).generate(ChunkCoord::new(-2, 5));
        for z in 0..CHUNK_DEPTH {
            for x in 0..CHUNK_WIDTH {
                assert_eq!(
                    grid.get(x, 0, z),
                    Some(BlockKind::Bedrock),
                    "Missing bedrock at ({x}, 0, {z})"
                );
                assert_eq!(grid.get(x, 1, z), Some(BlockKind::Bedrock));
            }
        }
    }

    #[test]
    fn test_surface_matches_profile() {
        let gen = generator(99);
        let coord = ChunkCoord::new(1, 1);
        let grid = gen.generate(coord);
        let sea_level = gen.config().sea_level;

        for z in 0..CHUNK_DEPTH {
            for x in 0..CHUNK_WIDTH {
                let profile = gen.column(coord.origin_x() + x as i32, coord.origin_z() + z as i32);
                let top = grid.surface_height(x, z).expect("column has bedrock");
                assert_eq!(top, profile.surface.max(sea_level), "Column ({x}, {z})");
                assert!(profile.surface < CHUNK_HEIGHT - 1);
            }
        }
    }

    #[test]
    fn test_generation_is_order_independent() {
        let gen = generator(5);
        let first = gen.generate(ChunkCoord::new(10, 10));
        let _ = gen.generate(ChunkCoord::new(-4, 2));
        let again = gen.generate(ChunkCoord::new(10, 10));
        assert!(first == again);
    }

    #[test]
    fn test_caves_respect_threshold() {
        let mut config = TerrainConfig::default();
        config.cave_threshold = 10.0;
        let gen = TerrainGenerator::new(WorldSeed::new(3), config);
        let grid = gen.generate(ChunkCoord::new(0, 0));

        // Nothing exceeds the threshold, so every column is solid to the surface
        for z in 0..CHUNK_DEPTH {
            for x in 0..CHUNK_WIDTH {
                let surface = gen.column(x as i32, z as i32).surface;
                for y in 0..=surface {
                    assert!(grid.get(x, y, z).is_some(), "Hole at ({x}, {y}, {z})");
                }
            }
        }
    }
}
