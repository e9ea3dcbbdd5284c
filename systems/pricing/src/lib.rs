#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Escalating acquisition costs for surveys, land and buildings.
//!
//! The [`PriceManager`] owns three multipliers that start at the lower bound
//! and creep upward on a fixed cadence as the economy grows. Every purchase
//! price in the game is read through it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tile_tycoon_core::{BuildingKind, Difficulty, Money};
use tracing::debug;

/// Relative influence of each economic factor on one multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    /// Weight of the time-driven base inflation.
    pub base: f64,
    /// Weight of the aggregate building count.
    pub buildings: f64,
    /// Weight of the aggregate owned and surveyed tile count.
    pub land: f64,
    /// Weight of the log-damped economy size.
    pub economy: f64,
}

impl FactorWeights {
    fn blend(&self, factors: &Factors) -> f64 {
        self.base * factors.base
            + self.buildings * factors.buildings
            + self.land * factors.land
            + self.economy * factors.economy
    }
}

/// Tuning knobs for the price manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingTuning {
    /// Seconds between two multiplier updates.
    pub update_interval_secs: f64,
    /// Lower bound of every multiplier.
    pub min_multiplier: f64,
    /// Upper bound of every multiplier.
    pub max_multiplier: f64,
    /// Survey price before the survey multiplier.
    pub base_survey_cost: Money,
    /// Inflation added per update before scaling.
    pub base_inflation: f64,
    /// Growth of the base inflation per completed update.
    pub per_update_scaling: f64,
    /// Growth of the base inflation per simulated minute.
    pub per_minute_scaling: f64,
    /// Contribution of a single building.
    pub per_building: f64,
    /// Contribution of a single owned or surveyed tile.
    pub per_tile: f64,
    /// Scale of the log-damped economy factor.
    pub economy_scale: f64,
    /// Money at which the economy factor reaches `ln 2`.
    pub economy_reference: f64,
    /// Weights applied to the survey multiplier.
    pub survey: FactorWeights,
    /// Weights applied to the tile multiplier.
    pub tile: FactorWeights,
    /// Weights applied to the building multiplier.
    pub building: FactorWeights,
}

impl Default for PricingTuning {
    fn default() -> Self {
        Self {
            update_interval_secs: 10.0,
            min_multiplier: 1.0,
            max_multiplier: 5.0,
            base_survey_cost: 50,
            base_inflation: 0.002,
            per_update_scaling: 0.01,
            per_minute_scaling: 0.02,
            per_building: 0.0008,
            per_tile: 0.0004,
            economy_scale: 0.002,
            economy_reference: 1_000.0,
            survey: FactorWeights {
                base: 0.5,
                buildings: 0.2,
                land: 0.4,
                economy: 0.3,
            },
            tile: FactorWeights {
                base: 0.8,
                buildings: 0.5,
                land: 0.7,
                economy: 0.6,
            },
            building: FactorWeights {
                base: 1.2,
                buildings: 1.0,
                land: 1.0,
                economy: 1.0,
            },
        }
    }
}

/// Aggregate statistics the multipliers react to.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EconomicIndicators {
    /// Money ever generated by the player and every opponent combined.
    pub total_money_generated: Money,
    /// Buildings standing across the whole world.
    pub buildings: usize,
    /// Tiles owned by anyone.
    pub tiles_owned: usize,
    /// Surveys performed by anyone.
    pub tiles_surveyed: usize,
    /// Session difficulty.
    pub difficulty: Difficulty,
}

struct Factors {
    base: f64,
    buildings: f64,
    land: f64,
    economy: f64,
}

/// Owner of the survey, tile and building cost multipliers.
#[derive(Clone, Debug)]
pub struct PriceManager {
    tuning: PricingTuning,
    survey: f64,
    tile: f64,
    building: f64,
    since_update: Duration,
    elapsed: Duration,
    updates: u64,
}

impl PriceManager {
    /// Creates a price manager with every multiplier at its lower bound.
    #[must_use]
    pub fn new(tuning: PricingTuning) -> Self {
        let start = tuning.min_multiplier;
        Self {
            tuning,
            survey: start,
            tile: start,
            building: start,
            since_update: Duration::ZERO,
            elapsed: Duration::ZERO,
            updates: 0,
        }
    }

    /// Advances the clock and escalates the multipliers once per interval.
    ///
    /// Returns `true` when the multipliers were recomputed.
    pub fn update(&mut self, dt: Duration, indicators: &EconomicIndicators) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt);
        let Ok(interval) = Duration::try_from_secs_f64(self.tuning.update_interval_secs) else {
            return false;
        };
        if interval.is_zero() {
            return false;
        }

        self.since_update = self.since_update.saturating_add(dt);
        if self.since_update < interval {
            return false;
        }
        while self.since_update >= interval {
            self.since_update -= interval;
        }

        self.updates = self.updates.saturating_add(1);
        let factors = self.factors(indicators);
        let (low, high) = (self.tuning.min_multiplier, self.tuning.max_multiplier);
        self.survey = clamp(self.survey + self.tuning.survey.blend(&factors), low, high);
        self.tile = clamp(self.tile + self.tuning.tile.blend(&factors), low, high);
        self.building = clamp(
            self.building + self.tuning.building.blend(&factors),
            low,
            high,
        );

        debug!(
            survey = self.survey,
            tile = self.tile,
            building = self.building,
            "cost multipliers updated"
        );
        true
    }

    fn factors(&self, indicators: &EconomicIndicators) -> Factors {
        let tuning = &self.tuning;
        let minutes = self.elapsed.as_secs_f64() / 60.0;
        let base = tuning.base_inflation
            * indicators.difficulty.inflation_coefficient()
            * (1.0 + self.updates as f64 * tuning.per_update_scaling)
            * (1.0 + minutes * tuning.per_minute_scaling);
        let money = indicators.total_money_generated.max(0) as f64;
        let reference = tuning.economy_reference.max(1.0);

        Factors {
            base,
            buildings: indicators.buildings as f64 * tuning.per_building,
            land: (indicators.tiles_owned + indicators.tiles_surveyed) as f64 * tuning.per_tile,
            economy: (1.0 + money / reference).ln() * tuning.economy_scale,
        }
    }

    /// Multiplier applied to survey prices.
    #[must_use]
    pub const fn survey_multiplier(&self) -> f64 {
        self.survey
    }

    /// Multiplier applied to land prices.
    #[must_use]
    pub const fn tile_cost_multiplier(&self) -> f64 {
        self.tile
    }

    /// Multiplier applied to construction prices.
    #[must_use]
    pub const fn building_multiplier(&self) -> f64 {
        self.building
    }

    /// Number of multiplier updates performed so far.
    #[must_use]
    pub const fn updates(&self) -> u64 {
        self.updates
    }

    /// Current construction price of a building kind.
    #[must_use]
    pub fn building_cost(&self, kind: BuildingKind) -> Money {
        scale(kind.base_cost(), self.building)
    }

    /// Current price of a survey.
    #[must_use]
    pub fn survey_cost(&self) -> Money {
        scale(self.tuning.base_survey_cost, self.survey)
    }

    /// Current purchase price of a tile with the given generated land price.
    #[must_use]
    pub fn tile_cost(&self, base_price: u64) -> Money {
        (base_price as f64 * self.tile).round() as Money
    }
}

fn scale(base: Money, multiplier: f64) -> Money {
    (base as f64 * multiplier).round() as Money
}

fn clamp(value: f64, low: f64, high: f64) -> f64 {
    value.max(low).min(high)
}
