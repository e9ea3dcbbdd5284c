//! Static resource, rarity and recipe tables.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Every tradeable good in the economy, raw and refined.
///
/// Tiles without a resource are modelled as `Option::<ResourceKind>::None`
/// rather than with a dedicated empty variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    /// Raw timber.
    Wood,
    /// Raw stone.
    Stone,
    /// Raw iron ore.
    IronOre,
    /// Raw copper ore.
    CopperOre,
    /// Raw gold ore.
    GoldOre,
    /// Raw coal, the common processing fuel.
    Coal,
    /// Raw clay.
    Clay,
    /// Smelted iron.
    IronIngot,
    /// Smelted copper.
    CopperIngot,
    /// Smelted gold.
    GoldIngot,
    /// Fired clay.
    Brick,
    /// Sawn timber.
    Planks,
    /// Iron alloyed with coal.
    Steel,
    /// Gold worked with copper.
    Jewelry,
}

impl ResourceKind {
    /// Every resource kind in catalogue order.
    pub const ALL: [ResourceKind; 14] = [
        Self::Wood,
        Self::Stone,
        Self::IronOre,
        Self::CopperOre,
        Self::GoldOre,
        Self::Coal,
        Self::Clay,
        Self::IronIngot,
        Self::CopperIngot,
        Self::GoldIngot,
        Self::Brick,
        Self::Planks,
        Self::Steel,
        Self::Jewelry,
    ];

    /// Resources that can occur naturally on a tile.
    pub const RAW: [ResourceKind; 7] = [
        Self::Wood,
        Self::Stone,
        Self::IronOre,
        Self::CopperOre,
        Self::GoldOre,
        Self::Coal,
        Self::Clay,
    ];

    /// Reference market value used to seed and bound prices.
    #[must_use]
    pub const fn base_value(self) -> f64 {
        match self {
            Self::Wood => 10.0,
            Self::Stone => 15.0,
            Self::IronOre => 25.0,
            Self::CopperOre => 30.0,
            Self::GoldOre => 50.0,
            Self::Coal => 20.0,
            Self::Clay => 10.0,
            Self::IronIngot => 50.0,
            Self::CopperIngot => 60.0,
            Self::GoldIngot => 100.0,
            Self::Brick => 25.0,
            Self::Planks => 18.0,
            Self::Steel => 120.0,
            Self::Jewelry => 260.0,
        }
    }

    /// Production tier: 0 for raw, 1 for single-step refined, 2 for advanced goods.
    #[must_use]
    pub const fn tier(self) -> u8 {
        match self {
            Self::Wood
            | Self::Stone
            | Self::IronOre
            | Self::CopperOre
            | Self::GoldOre
            | Self::Coal
            | Self::Clay => 0,
            Self::IronIngot | Self::CopperIngot | Self::GoldIngot | Self::Brick | Self::Planks => 1,
            Self::Steel | Self::Jewelry => 2,
        }
    }

    /// Reports whether the resource is produced by a processing recipe.
    #[must_use]
    pub const fn is_refined(self) -> bool {
        self.tier() > 0
    }

    /// Rarity class a raw resource belongs to unless configuration overrides it.
    #[must_use]
    pub const fn default_rarity(self) -> Option<Rarity> {
        match self {
            Self::Wood | Self::Stone | Self::Clay => Some(Rarity::Common),
            Self::Coal | Self::IronOre => Some(Rarity::Normal),
            Self::CopperOre => Some(Rarity::Rare),
            Self::GoldOre => Some(Rarity::VeryRare),
            _ => None,
        }
    }

    /// Canonical upper-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wood => "WOOD",
            Self::Stone => "STONE",
            Self::IronOre => "IRON_ORE",
            Self::CopperOre => "COPPER_ORE",
            Self::GoldOre => "GOLD_ORE",
            Self::Coal => "COAL",
            Self::Clay => "CLAY",
            Self::IronIngot => "IRON_INGOT",
            Self::CopperIngot => "COPPER_INGOT",
            Self::GoldIngot => "GOLD_INGOT",
            Self::Brick => "BRICK",
            Self::Planks => "PLANKS",
            Self::Steel => "STEEL",
            Self::Jewelry => "JEWELRY",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rarity class that drives terrain generation weights, durability and land value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rarity {
    /// Abundant deposits.
    Common,
    /// Regular deposits.
    Normal,
    /// Scarce deposits.
    Rare,
    /// Very scarce deposits.
    VeryRare,
}

impl Rarity {
    /// Relative draw weight during terrain generation.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Common => 4.0,
            Self::Normal => 2.0,
            Self::Rare => 1.0,
            Self::VeryRare => 0.5,
        }
    }

    /// Inclusive durability bounds drawn for a freshly generated tile.
    #[must_use]
    pub const fn durability_range(self) -> (u32, u32) {
        match self {
            Self::Common => (80, 150),
            Self::Normal => (50, 100),
            Self::Rare => (25, 60),
            Self::VeryRare => (10, 30),
        }
    }

    /// Multiplier applied to the base land price of a tile carrying this rarity.
    #[must_use]
    pub const fn land_price_factor(self) -> f64 {
        match self {
            Self::Common => 1.0,
            Self::Normal => 1.3,
            Self::Rare => 1.8,
            Self::VeryRare => 2.5,
        }
    }
}

/// Identifier of a processing recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeId {
    /// Iron ore and coal into an iron ingot.
    IronIngot,
    /// Copper ore and coal into a copper ingot.
    CopperIngot,
    /// Gold ore and coal into a gold ingot.
    GoldIngot,
    /// Clay into bricks.
    Brick,
    /// Wood into planks.
    Planks,
    /// Iron ingot and coal into steel.
    Steel,
    /// Gold ingot and copper ingot into jewelry.
    Jewelry,
}

impl RecipeId {
    /// Every recipe in catalogue order.
    pub const ALL: [RecipeId; 7] = [
        Self::IronIngot,
        Self::CopperIngot,
        Self::GoldIngot,
        Self::Brick,
        Self::Planks,
        Self::Steel,
        Self::Jewelry,
    ];

    /// Resolves the static recipe definition.
    #[must_use]
    pub fn recipe(self) -> &'static Recipe {
        match self {
            Self::IronIngot => &IRON_INGOT,
            Self::CopperIngot => &COPPER_INGOT,
            Self::GoldIngot => &GOLD_INGOT,
            Self::Brick => &BRICK,
            Self::Planks => &PLANKS,
            Self::Steel => &STEEL,
            Self::Jewelry => &JEWELRY,
        }
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.recipe().output.name())
    }
}

/// Single input requirement of a recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecipeInput {
    /// Resource consumed.
    pub resource: ResourceKind,
    /// Units consumed per cycle.
    pub amount: u32,
}

/// Fixed conversion performed by a processing building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recipe {
    /// Identifier of the recipe.
    pub id: RecipeId,
    /// One or two inputs consumed per cycle.
    pub inputs: &'static [RecipeInput],
    /// Resource produced.
    pub output: ResourceKind,
    /// Units produced per cycle.
    pub output_amount: u32,
    /// Processing time per cycle, excluding transport.
    pub duration: Duration,
}

impl Recipe {
    /// Reports whether the recipe consumes the provided resource.
    #[must_use]
    pub fn consumes(&self, resource: ResourceKind) -> bool {
        self.inputs.iter().any(|input| input.resource == resource)
    }
}

const fn input(resource: ResourceKind, amount: u32) -> RecipeInput {
    RecipeInput { resource, amount }
}

static IRON_INGOT: Recipe = Recipe {
    id: RecipeId::IronIngot,
    inputs: &[input(ResourceKind::IronOre, 1), input(ResourceKind::Coal, 1)],
    output: ResourceKind::IronIngot,
    output_amount: 1,
    duration: Duration::from_secs(8),
};

static COPPER_INGOT: Recipe = Recipe {
    id: RecipeId::CopperIngot,
    inputs: &[input(ResourceKind::CopperOre, 1), input(ResourceKind::Coal, 1)],
    output: ResourceKind::CopperIngot,
    output_amount: 1,
    duration: Duration::from_secs(8),
};

static GOLD_INGOT: Recipe = Recipe {
    id: RecipeId::GoldIngot,
    inputs: &[input(ResourceKind::GoldOre, 1), input(ResourceKind::Coal, 1)],
    output: ResourceKind::GoldIngot,
    output_amount: 1,
    duration: Duration::from_secs(12),
};

static BRICK: Recipe = Recipe {
    id: RecipeId::Brick,
    inputs: &[input(ResourceKind::Clay, 1)],
    output: ResourceKind::Brick,
    output_amount: 2,
    duration: Duration::from_secs(4),
};

static PLANKS: Recipe = Recipe {
    id: RecipeId::Planks,
    inputs: &[input(ResourceKind::Wood, 1)],
    output: ResourceKind::Planks,
    output_amount: 2,
    duration: Duration::from_secs(3),
};

static STEEL: Recipe = Recipe {
    id: RecipeId::Steel,
    inputs: &[input(ResourceKind::IronIngot, 1), input(ResourceKind::Coal, 1)],
    output: ResourceKind::Steel,
    output_amount: 1,
    duration: Duration::from_secs(12),
};

static JEWELRY: Recipe = Recipe {
    id: RecipeId::Jewelry,
    inputs: &[
        input(ResourceKind::GoldIngot, 1),
        input(ResourceKind::CopperIngot, 1),
    ],
    output: ResourceKind::Jewelry,
    output_amount: 1,
    duration: Duration::from_secs(15),
};
