use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_tycoon_core::{Difficulty, Money};
use tile_tycoon_system_market::MarketTuning;
use tile_tycoon_system_opponent::OpponentTuning;
use tile_tycoon_system_pricing::PricingTuning;
use tile_tycoon_world::WorldTuning;

/// Most opponents a session supports.
pub const MAX_OPPONENTS: usize = 5;
/// Smallest grid edge that leaves room for a homestead.
pub const MIN_EDGE: u32 = 5;

/// Grid size presets offered to players.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldSize {
    /// 20 by 15 tiles.
    Small,
    /// 30 by 20 tiles.
    #[default]
    Medium,
    /// 50 by 35 tiles.
    Large,
}

impl WorldSize {
    /// Width and height of the preset.
    #[must_use]
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Small => (20, 15),
            Self::Medium => (30, 20),
            Self::Large => (50, 35),
        }
    }
}

/// Everything needed to build a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Grid width in tiles.
    pub width: u32,
    /// Grid height in tiles.
    pub height: u32,
    /// Number of computer opponents.
    pub opponents: usize,
    /// Opponent pace and inflation pressure.
    pub difficulty: Difficulty,
    /// Seed for every random stream of the session.
    pub seed: u64,
    /// Money every actor starts with.
    pub initial_money: Money,
    /// Money that wins the game.
    pub win_money: Money,
    /// World constants.
    pub world: WorldTuning,
    /// Market constants.
    pub market: MarketTuning,
    /// Price manager constants.
    pub pricing: PricingTuning,
    /// Opponent constants.
    pub opponent: OpponentTuning,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let (width, height) = WorldSize::default().dimensions();
        Self {
            width,
            height,
            opponents: 2,
            difficulty: Difficulty::default(),
            seed: 0,
            initial_money: 1_000,
            win_money: 1_000_000,
            world: WorldTuning::default(),
            market: MarketTuning::default(),
            pricing: PricingTuning::default(),
            opponent: OpponentTuning::default(),
        }
    }
}

impl SessionConfig {
    /// Applies a size preset.
    #[must_use]
    pub fn with_size(mut self, size: WorldSize) -> Self {
        (self.width, self.height) = size.dimensions();
        self
    }

    /// Checks the values a session cannot start from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < MIN_EDGE || self.height < MIN_EDGE {
            return Err(ConfigError::GridTooSmall {
                width: self.width,
                height: self.height,
            });
        }
        if !(1..=MAX_OPPONENTS).contains(&self.opponents) {
            return Err(ConfigError::OpponentCount(self.opponents));
        }
        if self.initial_money < 0 {
            return Err(ConfigError::NegativeMoney(self.initial_money));
        }
        if self.win_money <= self.initial_money {
            return Err(ConfigError::UnreachableGoal {
                win_money: self.win_money,
                initial_money: self.initial_money,
            });
        }
        Ok(())
    }
}

/// Reasons a configuration is refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The grid cannot hold a homestead.
    #[error("grid of {width}x{height} is too small, both edges need at least {MIN_EDGE} tiles")]
    GridTooSmall {
        /// Configured width.
        width: u32,
        /// Configured height.
        height: u32,
    },
    /// The opponent count is outside the supported range.
    #[error("{0} opponents requested, between 1 and {MAX_OPPONENTS} are supported")]
    OpponentCount(usize),
    /// Actors cannot start in debt.
    #[error("initial money must not be negative, got {0}")]
    NegativeMoney(Money),
    /// The goal would already be met at the start.
    #[error("win money {win_money} must exceed initial money {initial_money}")]
    UnreachableGoal {
        /// Configured goal.
        win_money: Money,
        /// Configured starting money.
        initial_money: Money,
    },
}
