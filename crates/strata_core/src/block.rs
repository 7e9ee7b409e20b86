//! # Block Registry
//!
//! The fixed catalog of block kinds. Every attribute is a `const fn` of the
//! kind itself: there is no per-instance state, so solidity or texture can
//! never drift between two cells of the same kind.
//!
//! ## Atlas
//!
//! Faces reference tiles of a shared texture atlas, [`ATLAS_SIZE`] pixels
//! square, cut into [`TILE_SIZE`] pixel tiles. A tile is addressed by
//! `(column, row)`.

// Atlas math converts tile indices to UV floats
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

/// Atlas edge length in pixels.
pub const ATLAS_SIZE: u32 = 256;

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 16;

/// A tile position in the texture atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AtlasTile {
    /// Tile column (pixels / `TILE_SIZE`).
    pub column: u8,
    /// Tile row (pixels / `TILE_SIZE`).
    pub row: u8,
}

impl AtlasTile {
    /// Creates a tile reference.
    #[inline]
    #[must_use]
    pub const fn new(column: u8, row: u8) -> Self {
        Self { column, row }
    }

    /// Normalized `(u_min, v_min, u_max, v_max)` texture rectangle.
    #[inline]
    #[must_use]
    pub fn uv_rect(self) -> [f32; 4] {
        let atlas = ATLAS_SIZE as f32;
        let u0 = (u32::from(self.column) * TILE_SIZE) as f32 / atlas;
        let v0 = (u32::from(self.row) * TILE_SIZE) as f32 / atlas;
        let step = TILE_SIZE as f32 / atlas;
        [u0, v0, u0 + step, v0 + step]
    }
}

/// Atlas tiles for the three face classes of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockFaces {
    /// Face pointing +Y.
    pub top: AtlasTile,
    /// Face pointing -Y.
    pub bottom: AtlasTile,
    /// The four lateral faces.
    pub side: AtlasTile,
}

impl BlockFaces {
    /// Same tile on every face.
    #[inline]
    #[must_use]
    pub const fn uniform(column: u8, row: u8) -> Self {
        let tile = AtlasTile::new(column, row);
        Self { top: tile, bottom: tile, side: tile }
    }

    /// Distinct top, bottom and side tiles.
    #[inline]
    #[must_use]
    pub const fn new(top: AtlasTile, bottom: AtlasTile, side: AtlasTile) -> Self {
        Self { top, bottom, side }
    }
}

/// Block kinds in the world.
///
/// The discriminant is the stable on-disk identifier. `0` is reserved for
/// an empty cell and never names a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BlockKind {
    /// Grass-topped soil.
    Grass = 1,
    /// Dirt
    Dirt = 2,
    /// Clay
    Clay = 3,
    /// Gravel
    Gravel = 4,
    /// Sand
    Sand = 5,
    /// Stone
    Stone = 6,
    /// Unbreakable floor.
    Bedrock = 7,
    /// Obsidian
    Obsidian = 8,
    /// Cobblestone
    Cobblestone = 9,
    /// Mossy cobblestone
    MossCobblestone = 10,
    /// Gold ore
    GoldOre = 11,
    /// Iron ore
    IronOre = 12,
    /// Coal ore
    CoalOre = 13,
    /// Diamond ore
    DiamondOre = 14,
    /// Lapis ore
    LapisOre = 15,
    /// Redstone ore
    RedstoneOre = 16,
    /// Oak log (tree trunks).
    OakWood = 17,
    /// Leaves (tree canopies).
    Leaves = 18,
    /// Water. The only liquid, and the only non-solid kind.
    Water = 19,
}

impl BlockKind {
    /// The whole catalog in id order.
    pub const ALL: [Self; 19] = [
        Self::Grass,
        Self::Dirt,
        Self::Clay,
        Self::Gravel,
        Self::Sand,
        Self::Stone,
        Self::Bedrock,
        Self::Obsidian,
        Self::Cobblestone,
        Self::MossCobblestone,
        Self::GoldOre,
        Self::IronOre,
        Self::CoalOre,
        Self::DiamondOre,
        Self::LapisOre,
        Self::RedstoneOre,
        Self::OakWood,
        Self::Leaves,
        Self::Water,
    ];

    /// Stable identifier (never 0).
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Looks a kind up by identifier. `0` and unknown ids yield `None`.
    #[inline]
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        if id == 0 || id as usize > Self::ALL.len() {
            None
        } else {
            Some(Self::ALL[id as usize - 1])
        }
    }

    /// Whether the kind blocks sight and flow.
    #[inline]
    #[must_use]
    pub const fn is_solid(self) -> bool {
        !matches!(self, Self::Water)
    }

    /// Whether the kind is a liquid.
    #[inline]
    #[must_use]
    pub const fn is_liquid(self) -> bool {
        matches!(self, Self::Water)
    }

    /// Whether the kind is foliage (tinted by the mesher).
    #[inline]
    #[must_use]
    pub const fn is_foliage(self) -> bool {
        matches!(self, Self::Leaves)
    }

    /// Whether the kind is an ore.
    #[inline]
    #[must_use]
    pub const fn is_ore(self) -> bool {
        matches!(
            self,
            Self::GoldOre
                | Self::IronOre
                | Self::CoalOre
                | Self::DiamondOre
                | Self::LapisOre
                | Self::RedstoneOre
        )
    }

    /// Atlas tiles for each face class.
    #[must_use]
    pub const fn faces(self) -> BlockFaces {
        match self {
            Self::Grass => BlockFaces::new(
                AtlasTile::new(14, 1),
                AtlasTile::new(2, 0),
                AtlasTile::new(3, 0),
            ),
            Self::Dirt => BlockFaces::uniform(2, 0),
            Self::Clay => BlockFaces::uniform(8, 4),
            Self::Gravel => BlockFaces::uniform(3, 1),
            Self::Sand => BlockFaces::uniform(2, 1),
            Self::Stone => BlockFaces::uniform(1, 0),
            Self::Bedrock => BlockFaces::uniform(1, 1),
            Self::Obsidian => BlockFaces::uniform(5, 2),
            Self::Cobblestone => BlockFaces::uniform(0, 1),
            Self::MossCobblestone => BlockFaces::uniform(4, 2),
            Self::GoldOre => BlockFaces::uniform(0, 2),
            Self::IronOre => BlockFaces::uniform(1, 2),
            Self::CoalOre => BlockFaces::uniform(2, 2),
            Self::DiamondOre => BlockFaces::uniform(2, 3),
            Self::LapisOre => BlockFaces::uniform(0, 10),
            Self::RedstoneOre => BlockFaces::uniform(3, 3),
            Self::OakWood => BlockFaces::new(
                AtlasTile::new(5, 1),
                AtlasTile::new(5, 1),
                AtlasTile::new(4, 1),
            ),
            Self::Leaves => BlockFaces::uniform(4, 3),
            Self::Water => BlockFaces::uniform(13, 12),
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Dirt => "dirt",
            Self::Clay => "clay",
            Self::Gravel => "gravel",
            Self::Sand => "sand",
            Self::Stone => "stone",
            Self::Bedrock => "bedrock",
            Self::Obsidian => "obsidian",
            Self::Cobblestone => "cobblestone",
            Self::MossCobblestone => "moss_cobblestone",
            Self::GoldOre => "gold_ore",
            Self::IronOre => "iron_ore",
            Self::CoalOre => "coal_ore",
            Self::DiamondOre => "diamond_ore",
            Self::LapisOre => "lapis_ore",
            Self::RedstoneOre => "redstone_ore",
            Self::OakWood => "oak_wood",
            Self::Leaves => "leaves",
            Self::Water => "water",
        }
    }
}
