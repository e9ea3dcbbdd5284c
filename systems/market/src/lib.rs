#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Market price discovery for every tradeable resource.
//!
//! The market keeps one price per [`ResourceKind`], bounded to a band around
//! the resource's base value. Prices drift on a fixed cadence from the
//! supply/demand balance and the buy/sell volume accumulated since the last
//! update, with seeded randomness so a session replays identically.

use std::{collections::BTreeMap, time::Duration};

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tile_tycoon_core::{Money, ResourceKind};
use tracing::{debug, info};

/// Tuning knobs for the market's price model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketTuning {
    /// Seconds between two price updates.
    pub update_interval_secs: f64,
    /// Lowest price allowed, as a multiple of the base value.
    pub min_price_multiplier: f64,
    /// Highest price allowed, as a multiple of the base value.
    pub max_price_multiplier: f64,
    /// Largest fractional move either signal may contribute per update.
    pub max_change: f64,
    /// Share of the price move driven by the supply/demand ratio.
    pub supply_demand_weight: f64,
    /// Share of the price move driven by buy/sell trading pressure.
    pub trading_pressure_weight: f64,
    /// Lower bound of the per-update volatility factor.
    pub min_volatility: f64,
    /// Upper bound of the per-update volatility factor.
    pub max_volatility: f64,
    /// Standard deviation of the per-resource price noise.
    pub noise_std_dev: f64,
    /// Absolute cap applied to the per-resource price noise.
    pub noise_limit: f64,
    /// Fractional random walk applied to supply and demand after every update.
    pub drift: f64,
    /// Probability that an update is followed by a market shock.
    pub shock_probability: f64,
    /// Smallest fractional price move of a shock.
    pub min_shock: f64,
    /// Largest fractional price move of a shock.
    pub max_shock: f64,
    /// Most resources a single shock can hit.
    pub max_shocked_resources: usize,
}

impl Default for MarketTuning {
    fn default() -> Self {
        Self {
            update_interval_secs: 5.0,
            min_price_multiplier: 0.5,
            max_price_multiplier: 2.0,
            max_change: 0.1,
            supply_demand_weight: 0.7,
            trading_pressure_weight: 0.3,
            min_volatility: 0.8,
            max_volatility: 1.2,
            noise_std_dev: 0.01,
            noise_limit: 0.02,
            drift: 0.05,
            shock_probability: 0.02,
            min_shock: 0.1,
            max_shock: 0.3,
            max_shocked_resources: 3,
        }
    }
}

/// Price and trading state of a single resource.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarketEntry {
    price: f64,
    supply: f64,
    demand: f64,
    bought: u64,
    sold: u64,
}

impl MarketEntry {
    /// Current price per unit.
    #[must_use]
    pub const fn price(&self) -> f64 {
        self.price
    }

    /// Units the market can sell.
    #[must_use]
    pub const fn supply(&self) -> f64 {
        self.supply
    }

    /// Outstanding appetite for the resource.
    #[must_use]
    pub const fn demand(&self) -> f64 {
        self.demand
    }

    /// Units bought from the market since the last price update.
    #[must_use]
    pub const fn bought(&self) -> u64 {
        self.bought
    }

    /// Units sold to the market since the last price update.
    #[must_use]
    pub const fn sold(&self) -> u64 {
        self.sold
    }
}

/// Global resource market shared by the player and every opponent.
#[derive(Clone, Debug)]
pub struct Market {
    tuning: MarketTuning,
    entries: BTreeMap<ResourceKind, MarketEntry>,
    since_update: Duration,
    updates: u64,
    rng: ChaCha8Rng,
    noise: Option<Normal<f64>>,
}

impl Market {
    /// Opens a market at base prices with seeded supply and demand.
    #[must_use]
    pub fn new(tuning: MarketTuning, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let entries = ResourceKind::ALL
            .iter()
            .map(|&resource| {
                let (low, high) = if resource.is_refined() {
                    (5, 50)
                } else {
                    (10, 100)
                };
                let entry = MarketEntry {
                    price: resource.base_value(),
                    supply: f64::from(rng.gen_range(low..=high)),
                    demand: f64::from(rng.gen_range(low..=high)),
                    bought: 0,
                    sold: 0,
                };
                (resource, entry)
            })
            .collect();
        let noise = Normal::new(0.0, tuning.noise_std_dev.abs()).ok();

        Self {
            tuning,
            entries,
            since_update: Duration::ZERO,
            updates: 0,
            rng,
            noise,
        }
    }

    /// Tuning the market was opened with.
    #[must_use]
    pub fn tuning(&self) -> &MarketTuning {
        &self.tuning
    }

    /// Current price per unit of the resource.
    #[must_use]
    pub fn price(&self, resource: ResourceKind) -> f64 {
        self.entries
            .get(&resource)
            .map_or_else(|| resource.base_value(), MarketEntry::price)
    }

    /// Full trading state of the resource.
    #[must_use]
    pub fn entry(&self, resource: ResourceKind) -> Option<&MarketEntry> {
        self.entries.get(&resource)
    }

    /// Current price table in catalogue order.
    pub fn prices(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        self.entries
            .iter()
            .map(|(&resource, entry)| (resource, entry.price))
    }

    /// Inclusive price band the resource is held within.
    #[must_use]
    pub fn price_bounds(&self, resource: ResourceKind) -> (f64, f64) {
        let base = resource.base_value();
        (
            base * self.tuning.min_price_multiplier,
            base * self.tuning.max_price_multiplier,
        )
    }

    /// Number of price updates performed so far.
    #[must_use]
    pub const fn updates(&self) -> u64 {
        self.updates
    }

    /// Overrides the price, supply and demand of one resource.
    ///
    /// The price is clamped into the resource's band.
    pub fn set_conditions(&mut self, resource: ResourceKind, price: f64, supply: f64, demand: f64) {
        let (low, high) = self.price_bounds(resource);
        let entry = self.entries.entry(resource).or_insert(MarketEntry {
            price,
            supply,
            demand,
            bought: 0,
            sold: 0,
        });
        entry.price = clamp_to_band(price, low, high);
        entry.supply = supply.max(0.0);
        entry.demand = demand.max(0.0);
    }

    /// Advances the market clock, updating prices whenever the interval elapses.
    ///
    /// Returns `true` when at least one update ran.
    pub fn maybe_update(&mut self, dt: Duration) -> bool {
        let Ok(interval) = Duration::try_from_secs_f64(self.tuning.update_interval_secs) else {
            return false;
        };
        if interval.is_zero() {
            return false;
        }

        self.since_update = self.since_update.saturating_add(dt);
        let mut updated = false;
        while self.since_update >= interval {
            self.since_update -= interval;
            self.update_prices();
            let _ = self.apply_random_shock();
            updated = true;
        }
        updated
    }

    /// Recomputes every price from supply, demand and trading pressure.
    pub fn update_prices(&mut self) {
        let tuning = &self.tuning;
        let volatility = lerp(
            tuning.min_volatility,
            tuning.max_volatility,
            self.rng.gen::<f64>(),
        );

        for (resource, entry) in &mut self.entries {
            let supply = entry.supply.max(1.0);
            let demand = entry.demand.max(1.0);
            let balance = bounded(demand / supply - 1.0, tuning.max_change);
            let pressure = (entry.bought as f64 + 1.0) / (entry.sold as f64 + 1.0);
            let pressure = bounded(pressure - 1.0, tuning.max_change);

            let noise = self
                .noise
                .map_or(0.0, |normal| normal.sample(&mut self.rng));
            let change = (balance * tuning.supply_demand_weight
                + pressure * tuning.trading_pressure_weight)
                * volatility
                + bounded(noise, tuning.noise_limit);

            let base = resource.base_value();
            entry.price = clamp_to_band(
                entry.price * (1.0 + change),
                base * tuning.min_price_multiplier,
                base * tuning.max_price_multiplier,
            );

            entry.bought = 0;
            entry.sold = 0;
            let supply_walk = self.rng.gen_range(-1.0..=1.0) * tuning.drift;
            let demand_walk = self.rng.gen_range(-1.0..=1.0) * tuning.drift;
            entry.supply = (entry.supply * (1.0 + supply_walk)).max(1.0);
            entry.demand = (entry.demand * (1.0 + demand_walk)).max(1.0);
        }

        self.updates = self.updates.saturating_add(1);
        debug!(updates = self.updates, volatility, "market prices updated");
    }

    /// Rolls for a market shock and applies one when the roll succeeds.
    ///
    /// Returns `true` when a shock was applied.
    pub fn apply_random_shock(&mut self) -> bool {
        if self.rng.gen::<f64>() >= self.tuning.shock_probability {
            return false;
        }
        self.shock();
        true
    }

    /// Moves between one and the configured maximum of random resources by a
    /// large fraction in a random direction.
    pub fn shock(&mut self) {
        let count = self
            .rng
            .gen_range(1..=self.tuning.max_shocked_resources.max(1))
            .min(ResourceKind::ALL.len());
        let mut targets: Vec<ResourceKind> = ResourceKind::ALL
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();
        targets.sort();

        for resource in targets {
            let magnitude = lerp(
                self.tuning.min_shock,
                self.tuning.max_shock,
                self.rng.gen::<f64>(),
            );
            let direction = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let (low, high) = self.price_bounds(resource);
            if let Some(entry) = self.entries.get_mut(&resource) {
                let before = entry.price;
                entry.price = clamp_to_band(before * (1.0 + direction * magnitude), low, high);
                info!(
                    resource = %resource,
                    before,
                    after = entry.price,
                    "market shock"
                );
            }
        }
    }

    /// Value of selling the units at the current price, without trading.
    #[must_use]
    pub fn quote(&self, resource: ResourceKind, amount: u32) -> Money {
        to_money(self.price(resource) * f64::from(amount))
    }

    /// Sells units to the market and returns the revenue.
    pub fn sell(&mut self, resource: ResourceKind, amount: u32) -> Money {
        let Some(entry) = self.entries.get_mut(&resource) else {
            return 0;
        };
        entry.supply += f64::from(amount);
        entry.sold = entry.sold.saturating_add(u64::from(amount));
        to_money(entry.price * f64::from(amount))
    }

    /// Units the market can currently sell of the resource.
    #[must_use]
    pub fn available(&self, resource: ResourceKind) -> u32 {
        self.entries
            .get(&resource)
            .map_or(0, |entry| entry.supply.max(0.0).floor().min(f64::from(u32::MAX)) as u32)
    }

    /// Buys up to `amount` units limited by supply; returns the cost and the
    /// units actually bought.
    pub fn buy(&mut self, resource: ResourceKind, amount: u32) -> (Money, u32) {
        let actual = amount.min(self.available(resource));
        let Some(entry) = self.entries.get_mut(&resource) else {
            return (0, 0);
        };
        if actual > 0 {
            entry.supply -= f64::from(actual);
            entry.demand += f64::from(actual);
            entry.bought = entry.bought.saturating_add(u64::from(actual));
        }
        (to_money(entry.price * f64::from(actual)), actual)
    }
}

fn bounded(value: f64, limit: f64) -> f64 {
    value.max(-limit).min(limit)
}

fn clamp_to_band(value: f64, low: f64, high: f64) -> f64 {
    value.max(low).min(high)
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

fn to_money(value: f64) -> Money {
    value.round() as Money
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_at_base_prices() {
        let market = Market::new(MarketTuning::default(), 7);
        for resource in ResourceKind::ALL {
            assert_eq!(market.price(resource), resource.base_value());
        }
    }

    #[test]
    fn waits_for_the_full_interval() {
        let mut market = Market::new(MarketTuning::default(), 7);
        assert!(!market.maybe_update(Duration::from_secs(4)));
        assert_eq!(market.updates(), 0);
        assert!(market.maybe_update(Duration::from_secs(1)));
        assert_eq!(market.updates(), 1);
    }

    #[test]
    fn buying_is_limited_by_supply() {
        let mut market = Market::new(MarketTuning::default(), 3);
        market.set_conditions(ResourceKind::Coal, 20.0, 4.0, 10.0);
        let (cost, bought) = market.buy(ResourceKind::Coal, 10);
        assert_eq!(bought, 4);
        assert_eq!(cost, 80);
        assert_eq!(market.available(ResourceKind::Coal), 0);
        assert_eq!(market.entry(ResourceKind::Coal).map(MarketEntry::bought), Some(4));
    }

    #[test]
    fn selling_raises_supply_and_records_volume() {
        let mut market = Market::new(MarketTuning::default(), 3);
        market.set_conditions(ResourceKind::Wood, 10.0, 50.0, 50.0);
        assert_eq!(market.sell(ResourceKind::Wood, 5), 50);
        let entry = market.entry(ResourceKind::Wood).copied();
        assert_eq!(entry.map(|entry| entry.supply()), Some(55.0));
        assert_eq!(entry.map(|entry| entry.sold()), Some(5));
    }

    #[test]
    fn update_resets_trading_volume() {
        let mut market = Market::new(MarketTuning::default(), 11);
        let _ = market.sell(ResourceKind::Stone, 12);
        let _ = market.buy(ResourceKind::Stone, 2);
        market.update_prices();
        let entry = market.entry(ResourceKind::Stone).copied();
        assert_eq!(entry.map(|entry| entry.sold()), Some(0));
        assert_eq!(entry.map(|entry| entry.bought()), Some(0));
    }
}
