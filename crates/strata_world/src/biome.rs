//! # Biome Blending
//!
//! Every column samples one low-frequency "biome" noise value. Each biome
//! owns a center on that noise axis and a falloff range; its weight is
//! `max(0, 1 - |value - center| / range)`.
//!
//! - Numeric parameters (base height, amplitude) are weighted averages.
//! - Categorical parameters (block kinds, identity) come from the single
//!   heaviest biome. Blending "grass" with "sand" means nothing.
//!
//! Vertical bands are derived from the surface height modulo small
//! constants, so band edges wobble per column instead of forming flat
//! world-wide planes.

use strata_core::BlockKind;

/// Biome types in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Biome {
    /// Sea floor under water.
    Ocean = 0,
    /// Grassland.
    Plains = 1,
    /// Sand dunes.
    Desert = 2,
    /// High, rough terrain with rocky peaks.
    Mountain = 3,
}

impl Biome {
    /// All biomes.
    pub const ALL: [Self; 4] = [Self::Ocean, Self::Plains, Self::Desert, Self::Mountain];

    /// Preset parameters of this biome.
    #[must_use]
    pub const fn preset(self) -> BiomePreset {
        match self {
            Self::Ocean => BiomePreset {
                center: -0.5,
                range: 0.3,
                base_height: 60.0,
                amplitude: 3.0,
                surface: BlockKind::Water,
                subsurface: BlockKind::Sand,
                inner: BlockKind::Stone,
            },
            Self::Plains => BiomePreset {
                center: -0.1,
                range: 0.3,
                base_height: 60.0,
                amplitude: 6.0,
                surface: BlockKind::Grass,
                subsurface: BlockKind::Dirt,
                inner: BlockKind::Stone,
            },
            Self::Desert => BiomePreset {
                center: 0.2,
                range: 0.3,
                base_height: 60.0,
                amplitude: 4.0,
                surface: BlockKind::Sand,
                subsurface: BlockKind::Sand,
                inner: BlockKind::Stone,
            },
            Self::Mountain => BiomePreset {
                center: 0.6,
                range: 0.3,
                base_height: 85.0,
                amplitude: 15.0,
                surface: BlockKind::Grass,
                subsurface: BlockKind::Dirt,
                inner: BlockKind::Stone,
            },
        }
    }
}

/// Fixed parameters of one biome option.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiomePreset {
    /// Position on the biome noise axis.
    pub center: f64,
    /// Distance at which the weight reaches zero.
    pub range: f64,
    /// Terrain height at zero height noise.
    pub base_height: f64,
    /// Height noise scale.
    pub amplitude: f64,
    /// Top block (water for oceans).
    pub surface: BlockKind,
    /// Blocks between the surface and the inner band.
    pub subsurface: BlockKind,
    /// Deep fill, eligible for ore.
    pub inner: BlockKind,
}

impl BiomePreset {
    /// Linear falloff weight at a biome noise value.
    #[inline]
    #[must_use]
    pub fn weight(&self, value: f64) -> f64 {
        (1.0 - (value - self.center).abs() / self.range).max(0.0)
    }
}

/// Blended per-column parameters. Derived, never stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiomeParameters {
    /// Dominant biome.
    pub biome: Biome,
    /// Weighted base height.
    pub base_height: f64,
    /// Weighted amplitude.
    pub amplitude: f64,
    /// Dominant biome's top block.
    pub surface: BlockKind,
    /// Dominant biome's subsurface block.
    pub subsurface: BlockKind,
    /// Dominant biome's inner block.
    pub inner: BlockKind,
    /// Ocean's share of the total weight, in `[0, 1]`.
    pub ocean_share: f64,
}

impl BiomeParameters {
    /// Blends all biomes at a biome noise value.
    ///
    /// Values outside every range fall back to pure plains.
    #[must_use]
    pub fn blend(value: f64) -> Self {
        let mut total = 0.0;
        let mut base_height = 0.0;
        let mut amplitude = 0.0;
        let mut ocean = 0.0;
        let mut dominant = (Biome::Plains, 0.0);

        for biome in Biome::ALL {
            let preset = biome.preset();
            let weight = preset.weight(value);
            if weight <= 0.0 {
                continue;
            }
            total += weight;
            base_height += preset.base_height * weight;
            amplitude += preset.amplitude * weight;
            if biome == Biome::Ocean {
                ocean = weight;
            }
            if weight > dominant.1 {
                dominant = (biome, weight);
            }
        }

        if total <= 0.0 {
            return Self::pure(Biome::Plains);
        }

        let preset = dominant.0.preset();
        Self {
            biome: dominant.0,
            base_height: base_height / total,
            amplitude: amplitude / total,
            surface: preset.surface,
            subsurface: preset.subsurface,
            inner: preset.inner,
            ocean_share: ocean / total,
        }
    }

    /// Unblended parameters of one biome.
    #[must_use]
    pub fn pure(biome: Biome) -> Self {
        let preset = biome.preset();
        Self {
            biome,
            base_height: preset.base_height,
            amplitude: preset.amplitude,
            surface: preset.surface,
            subsurface: preset.subsurface,
            inner: preset.inner,
            ocean_share: if biome == Biome::Ocean { 1.0 } else { 0.0 },
        }
    }
}

/// Vertical band limits of one column, measured up from the world floor.
///
/// Each limit is exclusive: a cell at `y < bedrock_top` is bedrock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bands {
    /// Top of the bedrock floor.
    pub bedrock_top: usize,
    /// Ocean columns switch from inner to subsurface fill here.
    pub subsurface_top: usize,
    /// Land columns switch from inner to subsurface fill here; also the
    /// top of the coal band.
    pub upper_ore_top: usize,
    /// Top of the gold/iron/coal band.
    pub middle_ore_top: usize,
    /// Top of the diamond band.
    pub deep_ore_top: usize,
}

impl Bands {
    /// Derives band limits from a surface height.
    #[must_use]
    pub const fn from_surface(surface: usize) -> Self {
        let bedrock_top = surface % 5 + 2;
        Self {
            bedrock_top,
            subsurface_top: bedrock_top + surface % 15 + 32,
            upper_ore_top: bedrock_top + surface % 10 + 42,
            middle_ore_top: bedrock_top + surface % 10 + 25,
            deep_ore_top: bedrock_top + surface % 10 + 12,
        }
    }
}

/// Blocks of subsurface fill kept between the surface and the inner band.
const MIN_SUBSURFACE_DEPTH: usize = 3;

/// Mountain columns above this height expose bare rock.
const PEAK_HEIGHT: usize = 100;

/// Picks the block for one cell of a column. Caves are carved afterwards.
#[must_use]
pub fn assign_block(
    y: usize,
    params: &BiomeParameters,
    surface: usize,
    bands: &Bands,
    sea_level: usize,
) -> Option<BlockKind> {
    if y < bands.bedrock_top {
        return Some(BlockKind::Bedrock);
    }
    if y > surface {
        return (y <= sea_level).then_some(BlockKind::Water);
    }

    let inner_top = |limit: usize| limit.min(surface.saturating_sub(MIN_SUBSURFACE_DEPTH));

    match params.biome {
        Biome::Ocean => {
            if y < inner_top(bands.subsurface_top) {
                Some(params.inner)
            } else {
                Some(params.subsurface)
            }
        }
        Biome::Plains => {
            if y == surface {
                Some(params.surface)
            } else if y < inner_top(bands.upper_ore_top) {
                Some(params.inner)
            } else {
                Some(params.subsurface)
            }
        }
        Biome::Desert => {
            let top = inner_top(bands.upper_ore_top);
            if y == surface {
                Some(params.surface)
            } else if y < top {
                Some(params.inner)
            } else if y == top {
                Some(BlockKind::Clay)
            } else {
                Some(params.subsurface)
            }
        }
        Biome::Mountain => {
            let top = inner_top(bands.upper_ore_top);
            if surface > PEAK_HEIGHT && y + MIN_SUBSURFACE_DEPTH > surface {
                Some(params.inner)
            } else if y == surface {
                Some(params.surface)
            } else if y < top {
                Some(params.inner)
            } else {
                Some(params.subsurface)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_is_dominant() {
        for biome in Biome::ALL {
            let params = BiomeParameters::blend(biome.preset().center);
            assert_eq!(params.biome, biome);
        }
    }

    #[test]
    fn test_outside_every_range_falls_back_to_plains() {
        let params = BiomeParameters::blend(-5.0);
        assert_eq!(params, BiomeParameters::pure(Biome::Plains));
    }

    #[test]
    fn test_numeric_parameters_blend() {
        // Halfway between desert (0.2) and mountain (0.6): equal weights
        let params = BiomeParameters::blend(0.4);
        assert!((params.base_height - 72.5).abs() < 1e-9);
        assert!((params.amplitude - 9.5).abs() < 1e-9);
        assert!(params.ocean_share.abs() < f64::EPSILON);
    }

    #[test]
    fn test_categorical_parameters_do_not_blend() {
        let params = BiomeParameters::blend(0.45);
        assert_eq!(params.biome, Biome::Mountain);
        assert_eq!(params.surface, BlockKind::Grass);
        assert!(params.base_height < 85.0, "numeric part is still blended");
    }

    #[test]
    fn test_bands_vary_with_surface() {
        let a = Bands::from_surface(60);
        let b = Bands::from_surface(63);
        assert_ne!(a.bedrock_top, b.bedrock_top);
        for bands in [a, b] {
            assert!(bands.bedrock_top >= 2 && bands.bedrock_top <= 6);
            assert!(bands.deep_ore_top < bands.middle_ore_top);
            assert!(bands.middle_ore_top < bands.upper_ore_top);
        }
    }

    #[test]
    fn test_plains_column() {
        let params = BiomeParameters::pure(Biome::Plains);
        let surface = 64;
        let bands = Bands::from_surface(surface);
        let column: Vec<_> = (0..80)
            .map(|y| assign_block(y, &params, surface, &bands, 60))
            .collect();

        assert_eq!(column[0], Some(BlockKind::Bedrock));
        assert_eq!(column[bands.bedrock_top], Some(BlockKind::Stone));
        assert_eq!(column[surface - 1], Some(BlockKind::Dirt));
        assert_eq!(column[surface], Some(BlockKind::Grass));
        assert_eq!(column[surface + 1], None);
    }

    #[test]
    fn test_ocean_column_fills_to_sea_level() {
        let params = BiomeParameters::pure(Biome::Ocean);
        let surface = 40;
        let bands = Bands::from_surface(surface);

        assert_eq!(assign_block(surface, &params, surface, &bands, 60), Some(BlockKind::Sand));
        assert_eq!(assign_block(41, &params, surface, &bands, 60), Some(BlockKind::Water));
        assert_eq!(assign_block(60, &params, surface, &bands, 60), Some(BlockKind::Water));
        assert_eq!(assign_block(61, &params, surface, &bands, 60), None);
    }

    #[test]
    fn test_mountain_peaks_are_rock() {
        let params = BiomeParameters::pure(Biome::Mountain);
        let surface = 110;
        let bands = Bands::from_surface(surface);
        assert_eq!(assign_block(surface, &params, surface, &bands, 60), Some(BlockKind::Stone));

        let low = 80;
        let bands = Bands::from_surface(low);
        assert_eq!(assign_block(low, &params, low, &bands, 60), Some(BlockKind::Grass));
    }
}
