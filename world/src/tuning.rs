use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing, capacity and terrain constants of the world simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    /// Seconds a collection building needs to extract one unit.
    pub collection_secs: f64,
    /// Seconds goods spend in transit per tile of Manhattan distance.
    pub transport_secs_per_tile: f64,
    /// Total units a deposit can store.
    pub deposit_capacity: u32,
    /// Distinct resource types a deposit can store at once.
    pub deposit_max_types: usize,
    /// Seconds an idle collection building waits before searching for a deposit again.
    pub deposit_search_retry_secs: f64,
    /// Seconds between two autosell passes of a deposit.
    pub autosell_interval_secs: f64,
    /// Stock at which an opponent's deposit liquidates a resource.
    pub opponent_liquidation_threshold: u32,
    /// Minimum seconds between two stall signals of the same building.
    pub error_log_cooldown_secs: f64,
    /// Seconds between two announcements of a player's commerce offer.
    pub commerce_check_interval_secs: f64,
    /// Probability that a generated tile carries no resource.
    pub empty_probability: f64,
    /// Land price of an empty tile before premiums.
    pub tile_base_price: u64,
    /// Manhattan radius over which resource tiles raise neighbouring land prices.
    pub land_premium_radius: u32,
    /// Share of a resource tile's land value added to the first ring around it.
    pub land_premium_share: f64,
    /// Fraction of the premium kept per further ring of distance.
    pub land_premium_decay: f64,
    /// Relative random spread applied to every generated land price.
    pub land_price_noise: f64,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            collection_secs: 2.0,
            transport_secs_per_tile: 0.5,
            deposit_capacity: 100,
            deposit_max_types: 3,
            deposit_search_retry_secs: 5.0,
            autosell_interval_secs: 5.0,
            opponent_liquidation_threshold: 10,
            error_log_cooldown_secs: 10.0,
            commerce_check_interval_secs: 3.0,
            empty_probability: 0.3,
            tile_base_price: 100,
            land_premium_radius: 3,
            land_premium_share: 0.2,
            land_premium_decay: 0.5,
            land_price_noise: 0.1,
        }
    }
}

impl WorldTuning {
    pub(crate) fn collection_duration(&self) -> Duration {
        secs(self.collection_secs)
    }

    pub(crate) fn transport_time(&self, distance: u32) -> Duration {
        secs(self.transport_secs_per_tile * f64::from(distance))
    }

    pub(crate) fn deposit_search_retry(&self) -> Duration {
        secs(self.deposit_search_retry_secs)
    }

    pub(crate) fn autosell_interval(&self) -> Duration {
        secs(self.autosell_interval_secs)
    }

    pub(crate) fn error_log_cooldown(&self) -> Duration {
        secs(self.error_log_cooldown_secs)
    }

    pub(crate) fn commerce_check_interval(&self) -> Duration {
        secs(self.commerce_check_interval_secs)
    }
}

/// Converts configured seconds into a duration, treating invalid values as zero.
pub(crate) fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
