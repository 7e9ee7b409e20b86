//! # Gradient Noise
//!
//! Seeded, deterministic gradient (Perlin-style) noise in 2D and 3D, plus
//! fractal sums (fBM) built from it.
//!
//! ## Determinism Guarantee
//!
//! Given the same `WorldSeed`, every sample is bit-identical on any
//! platform, any run. Terrain persistence depends on this: a chunk that was
//! never saved must regenerate exactly as it was first seen.

// Lattice math converts between floats and table indices
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The independent random streams a world draws from.
///
/// Each stream gets its own sub-seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeedStream {
    /// Terrain surface height.
    Height,
    /// Biome selection.
    Biome,
    /// Biome blend scale.
    BiomeScale,
    /// Ocean basins.
    Ocean,
    /// Cave carving.
    Cave,
    /// Tree site selection.
    TreePlacement,
    /// Trunk heights.
    TreeTrunk,
    /// Canopy shapes.
    TreeCanopy,
    /// Ore vein RNG.
    Ore,
}

impl SeedStream {
    /// Every stream, in a fixed order.
    pub const ALL: [Self; 9] = [
        Self::Height,
        Self::Biome,
        Self::BiomeScale,
        Self::Ocean,
        Self::Cave,
        Self::TreePlacement,
        Self::TreeTrunk,
        Self::TreeCanopy,
        Self::Ore,
    ];

    /// Tag mixed into the world seed. Changing one changes every world.
    const fn tag(self) -> u64 {
        match self {
            Self::Height => 0x4845_4947,
            Self::Biome => 0x4249_4F4D,
            Self::BiomeScale => 0x4253_434C,
            Self::Ocean => 0x4F43_454E,
            Self::Cave => 0x4341_5645,
            Self::TreePlacement => 0x5452_5050,
            Self::TreeTrunk => 0x5452_544B,
            Self::TreeCanopy => 0x5452_434E,
            Self::Ore => 0x4F52_4553,
        }
    }
}

/// The seed a world is generated from.
///
/// Generators never read it directly; they take a [`SeedStream`] sub-seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Wraps a raw seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Sub-seed for one generator.
    #[inline]
    #[must_use]
    pub const fn stream(self, stream: SeedStream) -> Self {
        self.derive(stream.tag())
    }

    /// Mixes an arbitrary key into the seed (splitmix64 finalizer).
    /// Used for per-region streams below a [`SeedStream`].
    #[inline]
    #[must_use]
    pub const fn derive(self, key: u64) -> Self {
        let mut z = self.0 ^ key.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self(z ^ (z >> 31))
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0x5742_A7A5_0000_0001)
    }
}

/// Octave parameters for a fractal noise sum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Octaves {
    /// Number of layers (at least 1).
    pub count: u32,
    /// Amplitude multiplier per layer.
    pub persistence: f64,
    /// Frequency multiplier per layer.
    pub lacunarity: f64,
}

impl Octaves {
    /// Creates octave parameters.
    #[inline]
    #[must_use]
    pub const fn new(count: u32, persistence: f64, lacunarity: f64) -> Self {
        Self { count, persistence, lacunarity }
    }
}

/// Permutation table shuffled from the seed.
struct PermutationTable {
    /// 256 entries, doubled so `perm[i + perm[j]]` never wraps.
    perm: [u8; 512],
}

impl PermutationTable {
    fn new(seed: WorldSeed) -> Self {
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().take(256).enumerate() {
            *slot = i as u8;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed.value());
        perm[..256].shuffle(&mut rng);

        for i in 0..256 {
            perm[256 + i] = perm[i];
        }

        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> usize {
        usize::from(self.perm[index & 511])
    }

    #[inline]
    fn hash2(&self, x: usize, z: usize) -> usize {
        self.get(self.get(x) + z)
    }

    #[inline]
    fn hash3(&self, x: usize, y: usize, z: usize) -> usize {
        self.get(self.get(self.get(x) + y) + z)
    }
}

/// Seeded gradient noise generator.
///
/// Single samples lie roughly in `[-1, 1]`; fractal sums are normalized by
/// their total amplitude and stay in the same range.
///
/// # Example
///
/// ```rust
/// use strata_core::noise::{GradientNoise, Octaves, WorldSeed};
///
/// let noise = GradientNoise::new(WorldSeed::new(42));
/// let height = noise.fbm2(100.5, 200.25, Octaves::new(4, 0.5, 2.0));
/// assert!(height.abs() < 1.5);
/// ```
pub struct GradientNoise {
    table: PermutationTable,
}

impl GradientNoise {
    /// Creates a noise generator from a seed.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            table: PermutationTable::new(seed),
        }
    }

    /// Samples 2D noise.
    #[must_use]
    pub fn sample2(&self, x: f64, z: f64) -> f64 {
        let (xi, xf) = split(x);
        let (zi, zf) = split(z);
        let u = fade(xf);
        let v = fade(zf);

        let t = &self.table;
        let aa = t.hash2(xi, zi);
        let ab = t.hash2(xi, zi + 1);
        let ba = t.hash2(xi + 1, zi);
        let bb = t.hash2(xi + 1, zi + 1);

        let x1 = lerp(u, grad2(aa, xf, zf), grad2(ba, xf - 1.0, zf));
        let x2 = lerp(u, grad2(ab, xf, zf - 1.0), grad2(bb, xf - 1.0, zf - 1.0));
        lerp(v, x1, x2)
    }

    /// Samples 3D noise.
    #[must_use]
    pub fn sample3(&self, x: f64, y: f64, z: f64) -> f64 {
        let (xi, xf) = split(x);
        let (yi, yf) = split(y);
        let (zi, zf) = split(z);
        let u = fade(xf);
        let v = fade(yf);
        let w = fade(zf);

        let t = &self.table;
        let corner = |dx: usize, dy: usize, dz: usize| {
            let hash = t.hash3(xi + dx, yi + dy, zi + dz);
            grad3(hash, xf - dx as f64, yf - dy as f64, zf - dz as f64)
        };

        let x00 = lerp(u, corner(0, 0, 0), corner(1, 0, 0));
        let x10 = lerp(u, corner(0, 1, 0), corner(1, 1, 0));
        let x01 = lerp(u, corner(0, 0, 1), corner(1, 0, 1));
        let x11 = lerp(u, corner(0, 1, 1), corner(1, 1, 1));
        lerp(w, lerp(v, x00, x10), lerp(v, x01, x11))
    }

    /// Fractal sum of 2D samples, normalized to the single-sample range.
    #[must_use]
    pub fn fbm2(&self, x: f64, z: f64, octaves: Octaves) -> f64 {
        fractal(octaves, |frequency| self.sample2(x * frequency, z * frequency))
    }

    /// Fractal sum of 3D samples, normalized to the single-sample range.
    #[must_use]
    pub fn fbm3(&self, x: f64, y: f64, z: f64, octaves: Octaves) -> f64 {
        fractal(octaves, |frequency| {
            self.sample3(x * frequency, y * frequency, z * frequency)
        })
    }
}

fn fractal(octaves: Octaves, mut sample: impl FnMut(f64) -> f64) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_amplitude = 0.0;

    for _ in 0..octaves.count.max(1) {
        total += sample(frequency) * amplitude;
        max_amplitude += amplitude;
        amplitude *= octaves.persistence;
        frequency *= octaves.lacunarity;
    }

    total / max_amplitude
}

/// Lattice cell (wrapped to the table) and fractional offset.
#[inline]
fn split(value: f64) -> (usize, f64) {
    let floor = value.floor();
    ((floor as i64 & 255) as usize, value - floor)
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

/// Eight unit-ish gradients around the circle.
#[inline]
fn grad2(hash: usize, x: f64, z: f64) -> f64 {
    match hash & 7 {
        0 => x + z,
        1 => x - z,
        2 => -x + z,
        3 => -x - z,
        4 => x,
        5 => -x,
        6 => z,
        _ => -z,
    }
}

/// The twelve cube-edge gradients (padded to sixteen).
#[inline]
fn grad3(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}
