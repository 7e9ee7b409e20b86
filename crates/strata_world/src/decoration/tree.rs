//! # Trees
//!
//! Runs once per chunk. A tree grows on a grass or dirt column whose
//! placement noise passes a threshold and is a strict local maximum over
//! its eight neighbors, which spaces trees apart without a distance check.
//!
//! Trunk height, canopy depth and canopy radius each come from their own
//! noise field, sampled at the same world column.

// Block and chunk coordinates convert between i32, usize and floats
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use std::collections::HashMap;

use strata_core::noise::{GradientNoise, Octaves};
use strata_core::{BlockKind, ChunkCoord, SeedStream, WorldSeed, CHUNK_HEIGHT};

use super::{decorate, Region};
use crate::chunk::Chunk;

/// Dimensions of one tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeShape {
    /// Trunk blocks above the surface.
    pub trunk_height: usize,
    /// Leaf layers above the trunk.
    pub canopy_layers: usize,
    /// Half-width of the lowest leaf layer.
    pub canopy_radius: usize,
}

impl TreeShape {
    /// Cells above the surface the tree needs empty.
    #[must_use]
    pub const fn clearance(&self) -> usize {
        self.trunk_height + self.canopy_layers
    }
}

/// Places trees on eligible surfaces.
pub struct TreeDecorator {
    placement: GradientNoise,
    trunk: GradientNoise,
    canopy: GradientNoise,
    threshold: f64,
}

impl TreeDecorator {
    const PLACEMENT_FREQUENCY: f64 = 0.05;
    const PLACEMENT_OCTAVES: Octaves = Octaves::new(2, 0.5, 2.0);
    const TRUNK_FREQUENCY: f64 = 0.1;
    const CANOPY_FREQUENCY: f64 = 0.2;
    const MIN_TRUNK: usize = 4;
    const MAX_TRUNK: usize = 6;
    const BASE_CANOPY_LAYERS: usize = 3;
    const BASE_CANOPY_RADIUS: usize = 2;
    const MAX_CANOPY_EXTRA: usize = 2;

    /// Default placement threshold.
    pub const DEFAULT_THRESHOLD: f64 = 0.4;

    /// Creates a decorator for a world seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            placement: GradientNoise::new(seed.stream(SeedStream::TreePlacement)),
            trunk: GradientNoise::new(seed.stream(SeedStream::TreeTrunk)),
            canopy: GradientNoise::new(seed.stream(SeedStream::TreeCanopy)),
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }

    /// Overrides the placement threshold (lower = more trees).
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Decorates every active chunk that has no trees yet. Returns the
    /// number of trees planted.
    pub fn decorate(&self, active: &mut HashMap<ChunkCoord, Chunk>) -> usize {
        let mut trees = 0;
        let touched = decorate(active, |chunk| !chunk.is_tree_decorated(), |region| {
            trees += self.decorate_region(region);
        });
        for coord in &touched {
            if let Some(chunk) = active.get_mut(coord) {
                chunk.mark_tree_decorated();
            }
        }
        if !touched.is_empty() {
            tracing::debug!("Tree pass: {} chunks, {} trees", touched.len(), trees);
        }
        trees
    }

    /// Plants trees in one merged region. Returns the number planted.
    pub fn decorate_region(&self, region: &mut Region) -> usize {
        let mut trees = 0;
        for z in 0..region.depth() as i32 {
            for x in 0..region.width() as i32 {
                let Some(surface) = region.surface_height(x, z) else {
                    continue;
                };
                if !matches!(
                    region.get(x, surface as i32, z),
                    Some(BlockKind::Grass | BlockKind::Dirt)
                ) {
                    continue;
                }

                let world_x = region.world_x(x as usize);
                let world_z = region.world_z(z as usize);
                if !self.is_tree_site(world_x, world_z) {
                    continue;
                }

                let shape = self.shape(world_x, world_z);
                if plant(region, x, surface, z, shape) {
                    trees += 1;
                }
            }
        }
        trees
    }

    fn placement_value(&self, world_x: i32, world_z: i32) -> f64 {
        self.placement.fbm2(
            f64::from(world_x) * Self::PLACEMENT_FREQUENCY,
            f64::from(world_z) * Self::PLACEMENT_FREQUENCY,
            Self::PLACEMENT_OCTAVES,
        )
    }

    /// Passes the threshold and beats all eight neighbors.
    #[must_use]
    pub fn is_tree_site(&self, world_x: i32, world_z: i32) -> bool {
        let value = self.placement_value(world_x, world_z);
        if value < self.threshold {
            return false;
        }
        for dz in -1..=1 {
            for dx in -1..=1 {
                if (dx, dz) != (0, 0) && self.placement_value(world_x + dx, world_z + dz) >= value {
                    return false;
                }
            }
        }
        true
    }

    /// Tree dimensions at a world column.
    #[must_use]
    pub fn shape(&self, world_x: i32, world_z: i32) -> TreeShape {
        let (x, z) = (f64::from(world_x), f64::from(world_z));
        let trunk = unit(self.trunk.sample2(x * Self::TRUNK_FREQUENCY, z * Self::TRUNK_FREQUENCY));
        let canopy = unit(self.canopy.sample2(x * Self::CANOPY_FREQUENCY, z * Self::CANOPY_FREQUENCY));

        let span = (Self::MAX_TRUNK - Self::MIN_TRUNK) as f64;
        let extra = (canopy * Self::MAX_CANOPY_EXTRA as f64).round() as usize;
        TreeShape {
            trunk_height: Self::MIN_TRUNK + (trunk * span).round() as usize,
            canopy_layers: Self::BASE_CANOPY_LAYERS + extra,
            canopy_radius: Self::BASE_CANOPY_RADIUS + extra,
        }
    }
}

/// Writes one tree if the column above `surface` is clear.
fn plant(region: &mut Region, x: i32, surface: usize, z: i32, shape: TreeShape) -> bool {
    if surface + shape.clearance() >= CHUNK_HEIGHT {
        return false;
    }
    let clear = (1..=shape.clearance()).all(|dy| region.get(x, (surface + dy) as i32, z).is_none());
    if !clear {
        return false;
    }

    for dy in 1..=shape.trunk_height {
        region.set(x, (surface + dy) as i32, z, Some(BlockKind::OakWood));
    }

    let canopy_base = surface + shape.trunk_height + 1;
    for layer in 0..shape.canopy_layers {
        let y = (canopy_base + layer) as i32;
        let radius = shape.canopy_radius.saturating_sub(layer) as i32;
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                if region.get(x + dx, y, z + dz).is_none() {
                    region.set(x + dx, y, z + dz, Some(BlockKind::Leaves));
                }
            }
        }
    }
    true
}

#[inline]
fn unit(sample: f64) -> f64 {
    ((sample + 1.0) * 0.5).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{BlockGrid, CHUNK_DEPTH, CHUNK_WIDTH};

    const GROUND: usize = 64;

    fn meadow(top: BlockKind) -> BlockGrid {
        let mut grid = BlockGrid::new();
        for z in 0..CHUNK_DEPTH {
            for x in 0..CHUNK_WIDTH {
                for y in 0..GROUND {
                    grid.set(x, y, z, Some(BlockKind::Dirt));
                }
                grid.set(x, GROUND, z, Some(top));
            }
        }
        grid
    }

    fn world(side: i32, top: BlockKind) -> HashMap<ChunkCoord, Chunk> {
        let mut active = HashMap::new();
        for z in 0..side {
            for x in 0..side {
                let coord = ChunkCoord::new(x, z);
                active.insert(coord, Chunk::new(coord, meadow(top)));
            }
        }
        active
    }

    fn count(active: &HashMap<ChunkCoord, Chunk>, kind: BlockKind) -> usize {
        active.values().map(|chunk| chunk.blocks().count(kind)).sum()
    }

    #[test]
    fn test_shape_bounds() {
        let decorator = TreeDecorator::new(WorldSeed::new(1));
        for i in -50..50 {
            let shape = decorator.shape(i * 7, i * 13);
            assert!((4..=6).contains(&shape.trunk_height));
            assert!((3..=5).contains(&shape.canopy_layers));
            assert!((2..=4).contains(&shape.canopy_radius));
        }
    }

    #[test]
    fn test_sites_are_strict_local_maxima() {
        let decorator = TreeDecorator::new(WorldSeed::new(5)).with_threshold(-1.0);
        for z in -20..20 {
            for x in -20..20 {
                if decorator.is_tree_site(x, z) {
                    for (dx, dz) in [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (-1, -1)] {
                        assert!(!decorator.is_tree_site(x + dx, z + dz), "Adjacent sites at ({x}, {z})");
                    }
                }
            }
        }
    }

    #[test]
    fn test_trees_grow_on_grass() {
        let mut active = world(3, BlockKind::Grass);
        let decorator = TreeDecorator::new(WorldSeed::new(42)).with_threshold(-1.0);
        let trees = decorator.decorate(&mut active);

        assert!(trees > 0, "A 48x48 meadow has local maxima");
        let logs = count(&active, BlockKind::OakWood);
        assert!(logs >= trees * 4 && logs <= trees * 6);
        assert!(count(&active, BlockKind::Leaves) > 0);
        assert!(active.values().all(Chunk::is_tree_decorated));
    }

    #[test]
    fn test_no_trees_on_sand() {
        let mut active = world(2, BlockKind::Sand);
        let decorator = TreeDecorator::new(WorldSeed::new(42)).with_threshold(-1.0);
        assert_eq!(decorator.decorate(&mut active), 0);
        assert_eq!(count(&active, BlockKind::OakWood), 0);
    }

    #[test]
    fn test_second_run_is_noop() {
        let mut active = world(2, BlockKind::Grass);
        let decorator = TreeDecorator::new(WorldSeed::new(9)).with_threshold(-1.0);
        decorator.decorate(&mut active);
        let logs = count(&active, BlockKind::OakWood);
        let leaves = count(&active, BlockKind::Leaves);

        assert_eq!(decorator.decorate(&mut active), 0);
        assert_eq!(count(&active, BlockKind::OakWood), logs);
        assert_eq!(count(&active, BlockKind::Leaves), leaves);
    }

    #[test]
    fn test_blocked_column_is_skipped() {
        let grids = [meadow(BlockKind::Grass)];
        let coords = [ChunkCoord::new(0, 0)];
        let mut region = Region::merge(coords.iter().copied().zip(grids.iter())).expect("region");
        region.set(8, (GROUND + 3) as i32, 8, Some(BlockKind::Stone));

        let shape = TreeShape { trunk_height: 4, canopy_layers: 3, canopy_radius: 2 };
        assert!(!plant(&mut region, 8, GROUND, 8, shape));
        assert!(plant(&mut region, 3, GROUND, 3, shape));
        assert_eq!(region.get(3, (GROUND + 4) as i32, 3), Some(BlockKind::OakWood));
        assert_eq!(region.get(3, (GROUND + 5) as i32, 3), Some(BlockKind::Leaves));
        assert_eq!(region.get(5, (GROUND + 5) as i32, 5), Some(BlockKind::Leaves));
        assert_eq!(region.get(5, (GROUND + 6) as i32, 5), None, "Second layer shrinks");
    }

    #[test]
    fn test_leaves_never_overwrite() {
        let grids = [meadow(BlockKind::Grass)];
        let coords = [ChunkCoord::new(0, 0)];
        let mut region = Region::merge(coords.iter().copied().zip(grids.iter())).expect("region");
        region.set(4, (GROUND + 5) as i32, 3, Some(BlockKind::Cobblestone));

        let shape = TreeShape { trunk_height: 4, canopy_layers: 3, canopy_radius: 2 };
        assert!(plant(&mut region, 3, GROUND, 3, shape));
        assert_eq!(region.get(4, (GROUND + 5) as i32, 3), Some(BlockKind::Cobblestone));
    }
}
