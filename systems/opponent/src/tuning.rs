use std::time::Duration;

use serde::{Deserialize, Serialize};
use tile_tycoon_core::{Difficulty, Money};

/// Pace and temperament of an opponent at one difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyProfile {
    /// Shortest pause between two decisions, in seconds.
    pub min_delay_secs: f64,
    /// Longest pause between two decisions, in seconds.
    pub max_delay_secs: f64,
    /// Probability that a decision tries to buy land before building.
    pub expansion_rate: f64,
    /// Probability that a decision commissions a survey.
    pub survey_probability: f64,
}

impl DifficultyProfile {
    /// Built-in profile for the difficulty.
    #[must_use]
    pub const fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                min_delay_secs: 3.0,
                max_delay_secs: 6.0,
                expansion_rate: 0.3,
                survey_probability: 0.2,
            },
            Difficulty::Normal => Self {
                min_delay_secs: 1.5,
                max_delay_secs: 3.5,
                expansion_rate: 0.5,
                survey_probability: 0.35,
            },
            Difficulty::Hard => Self {
                min_delay_secs: 0.5,
                max_delay_secs: 1.5,
                expansion_rate: 0.7,
                survey_probability: 0.5,
            },
        }
    }

    pub(crate) fn delay_bounds(&self) -> (Duration, Duration) {
        let low = secs(self.min_delay_secs);
        let high = secs(self.max_delay_secs).max(low);
        (low, high)
    }
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Self::for_difficulty(Difficulty::Normal)
    }
}

/// Thresholds shared by every opponent regardless of difficulty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpponentTuning {
    /// Profile used on easy.
    pub easy: DifficultyProfile,
    /// Profile used on normal.
    pub normal: DifficultyProfile,
    /// Profile used on hard.
    pub hard: DifficultyProfile,
    /// Probability that a decision even looks at player offers.
    pub commerce_check_probability: f64,
    /// Stock of one resource that triggers a sell-off.
    pub sell_threshold: u32,
    /// Money needed before processing is considered.
    pub processing_money_threshold: Money,
    /// Owned tiles needed, with the money threshold, for the advanced phase.
    pub advanced_tile_count: usize,
    /// Most units bought from one offer at a time.
    pub max_commerce_purchase: u32,
    /// Most units put up in one automatic offer.
    pub max_commerce_offer: u32,
    /// Collections one deposit is expected to serve.
    pub collections_per_deposit: usize,
    /// Collections beyond the expected share at which a deposit may go anywhere.
    pub severe_imbalance: usize,
    /// Distance within which a tile counts as near a building.
    pub near_distance: u32,
    /// Base value from which goods are offered above market price.
    pub valuable_base_value: f64,
    /// Markup applied to valuable goods.
    pub valuable_markup: f64,
    /// Markdown applied to common goods.
    pub common_markdown: f64,
    /// Score multiplier for refined goods when choosing what to offer.
    pub refined_offer_bonus: f64,
    /// Score multiplier for recipes producing the highest tier.
    pub top_tier_recipe_bonus: f64,
}

impl Default for OpponentTuning {
    fn default() -> Self {
        Self {
            easy: DifficultyProfile::for_difficulty(Difficulty::Easy),
            normal: DifficultyProfile::for_difficulty(Difficulty::Normal),
            hard: DifficultyProfile::for_difficulty(Difficulty::Hard),
            commerce_check_probability: 0.1,
            sell_threshold: 10,
            processing_money_threshold: 600,
            advanced_tile_count: 8,
            max_commerce_purchase: 10,
            max_commerce_offer: 20,
            collections_per_deposit: 3,
            severe_imbalance: 3,
            near_distance: 2,
            valuable_base_value: 50.0,
            valuable_markup: 1.15,
            common_markdown: 0.9,
            refined_offer_bonus: 1.5,
            top_tier_recipe_bonus: 1.5,
        }
    }
}

impl OpponentTuning {
    /// Profile for the difficulty.
    #[must_use]
    pub const fn profile(&self, difficulty: Difficulty) -> &DifficultyProfile {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Normal => &self.normal,
            Difficulty::Hard => &self.hard,
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
