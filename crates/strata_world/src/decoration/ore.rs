//! # Ore Veins
//!
//! Runs once per chunk, over every newly active group of chunks. Each
//! host cell (stone, dirt or sand) below the surface may seed a vein;
//! the vein grows as a bounded flood fill.
//!
//! ## Bands
//!
//! | Band    | Limit            | Ores (cumulative roll)                       |
//! |---------|------------------|----------------------------------------------|
//! | deep    | `deep_ore_top`   | diamond 5%, gold 10%, iron 35%, coal rest    |
//! | middle  | `middle_ore_top` | gold 10%, iron 35%, coal rest                |
//! | upper   | `upper_ore_top`  | coal                                         |

// Block and chunk coordinates convert between i32 and usize
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use std::collections::{HashMap, HashSet, VecDeque};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_core::{BlockKind, ChunkCoord, SeedStream, WorldSeed};

use super::{decorate, Region};
use crate::biome::Bands;
use crate::chunk::Chunk;

/// Shape of one vein kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VeinSpec {
    /// Ore placed.
    pub kind: BlockKind,
    /// Upper bound of the random vein size.
    pub max_size: usize,
    /// Maximum Manhattan distance from the seed cell.
    pub radius: i32,
}

impl VeinSpec {
    const DIAMOND: Self = Self::new(BlockKind::DiamondOre, 6, 2);
    const GOLD: Self = Self::new(BlockKind::GoldOre, 10, 3);
    const IRON: Self = Self::new(BlockKind::IronOre, 12, 3);
    const COAL: Self = Self::new(BlockKind::CoalOre, 20, 4);

    const fn new(kind: BlockKind, max_size: usize, radius: i32) -> Self {
        Self { kind, max_size, radius }
    }

    /// Picks a vein for a seed at height `y` from a uniform roll in `[0, 1)`.
    #[must_use]
    pub fn for_band(y: usize, bands: &Bands, roll: f64) -> Option<Self> {
        if y < bands.deep_ore_top {
            Some(if roll < 0.05 {
                Self::DIAMOND
            } else if roll < 0.15 {
                Self::GOLD
            } else if roll < 0.5 {
                Self::IRON
            } else {
                Self::COAL
            })
        } else if y < bands.middle_ore_top {
            Some(if roll < 0.10 {
                Self::GOLD
            } else if roll < 0.45 {
                Self::IRON
            } else {
                Self::COAL
            })
        } else if y < bands.upper_ore_top {
            Some(Self::COAL)
        } else {
            None
        }
    }
}

/// Whether ore may replace this cell.
#[inline]
#[must_use]
pub fn is_ore_host(block: Option<BlockKind>) -> bool {
    matches!(
        block,
        Some(BlockKind::Stone | BlockKind::Dirt | BlockKind::Sand)
    )
}

const DIRECTIONS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Seeds and grows ore veins.
pub struct OreDecorator {
    seed: WorldSeed,
}

impl OreDecorator {
    /// Chance that a host cell seeds a vein.
    pub const SEED_PROBABILITY: f64 = 0.001;
    /// Chance that an accepted vein cell keeps spreading.
    pub const PROPAGATION_PROBABILITY: f64 = 0.3;

    /// Creates a decorator for a world seed.
    #[must_use]
    pub const fn new(seed: WorldSeed) -> Self {
        Self { seed }
    }

    /// Decorates every active chunk that has no ore yet. Returns the
    /// number of veins placed.
    pub fn decorate(&self, active: &mut HashMap<ChunkCoord, Chunk>) -> usize {
        let mut veins = 0;
        let touched = decorate(active, |chunk| !chunk.is_ore_decorated(), |region| {
            veins += self.decorate_region(region);
        });
        for coord in &touched {
            if let Some(chunk) = active.get_mut(coord) {
                chunk.mark_ore_decorated();
            }
        }
        if !touched.is_empty() {
            tracing::debug!("Ore pass: {} chunks, {} veins", touched.len(), veins);
        }
        veins
    }

    /// Places veins in one merged region. Returns the number placed.
    pub fn decorate_region(&self, region: &mut Region) -> usize {
        let mut rng = self.rng_for(region);
        let mut veins = 0;

        for z in 0..region.depth() as i32 {
            for x in 0..region.width() as i32 {
                let Some(surface) = region.surface_height(x, z) else {
                    continue;
                };
                let bands = Bands::from_surface(surface);

                for y in 0..surface as i32 {
                    if !is_ore_host(region.get(x, y, z)) {
                        continue;
                    }
                    if rng.gen::<f64>() >= Self::SEED_PROBABILITY {
                        continue;
                    }
                    let roll = rng.gen::<f64>();
                    if let Some(spec) = VeinSpec::for_band(y as usize, &bands, roll) {
                        grow_vein(region, (x, y, z), spec, &mut rng);
                        veins += 1;
                    }
                }
            }
        }
        veins
    }

    /// Reproducible stream per region: same seed and same region, same veins.
    fn rng_for(&self, region: &Region) -> ChaCha8Rng {
        let origin = region.origin();
        let key = (u64::from(origin.x as u32) << 32) | u64::from(origin.z as u32);
        let stream = self.seed.stream(SeedStream::Ore).derive(key);
        ChaCha8Rng::seed_from_u64(stream.value() ^ region.members().len() as u64)
    }
}

/// Bounded flood fill from a seed cell. Returns cells converted.
fn grow_vein(region: &mut Region, seed: (i32, i32, i32), spec: VeinSpec, rng: &mut impl Rng) -> usize {
    let budget = rng.gen_range(1..=spec.max_size);
    let mut visited = HashSet::from([seed]);
    let mut queue = VecDeque::from([seed]);

    region.set(seed.0, seed.1, seed.2, Some(spec.kind));
    let mut placed = 1;

    while let Some((x, y, z)) = queue.pop_front() {
        for (dx, dy, dz) in DIRECTIONS {
            if placed >= budget {
                return placed;
            }
            let next = (x + dx, y + dy, z + dz);
            let distance = (next.0 - seed.0).abs() + (next.1 - seed.1).abs() + (next.2 - seed.2).abs();
            if distance > spec.radius || !visited.insert(next) {
                continue;
            }
            if !is_ore_host(region.get(next.0, next.1, next.2)) {
                continue;
            }
            region.set(next.0, next.1, next.2, Some(spec.kind));
            placed += 1;
            if rng.gen::<f64>() < OreDecorator::PROPAGATION_PROBABILITY {
                queue.push_back(next);
            }
        }
    }
    placed
}
