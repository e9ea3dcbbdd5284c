use std::{collections::BTreeMap, time::Duration};

use tile_tycoon_core::{CommandError, Event, Owner, ResourceKind, TileCoord};
use tracing::{debug, info};

use crate::buildings::TickContext;

/// Passive storage bounded by total units and by distinct resource types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deposit {
    resources: BTreeMap<ResourceKind, u32>,
    autosell: BTreeMap<ResourceKind, bool>,
    capacity: u32,
    max_types: usize,
    since_autosell: Duration,
}

impl Deposit {
    pub(crate) fn new(capacity: u32, max_types: usize) -> Self {
        Self {
            resources: BTreeMap::new(),
            autosell: BTreeMap::new(),
            capacity,
            max_types,
            since_autosell: Duration::ZERO,
        }
    }

    /// Units of the resource in storage.
    #[must_use]
    pub fn stock(&self, resource: ResourceKind) -> u32 {
        self.resources.get(&resource).copied().unwrap_or(0)
    }

    /// Stocked resources in catalogue order.
    pub fn resources(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.resources
            .iter()
            .map(|(resource, amount)| (*resource, *amount))
    }

    /// Units stored across every resource.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.resources.values().sum()
    }

    /// Maximum units the deposit can hold.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Units that still fit, ignoring the type limit.
    #[must_use]
    pub fn free_space(&self) -> u32 {
        self.capacity.saturating_sub(self.total())
    }

    /// Whether the resource is sold automatically.
    #[must_use]
    pub fn autosell(&self, resource: ResourceKind) -> bool {
        self.autosell.get(&resource).copied().unwrap_or(false)
    }

    /// Reports whether `amount` units of the resource fit under both limits.
    #[must_use]
    pub fn can_accept(&self, resource: ResourceKind, amount: u32) -> bool {
        amount <= self.accept_limit(resource)
    }

    /// Most units of the resource the deposit could take right now.
    pub(crate) fn accept_limit(&self, resource: ResourceKind) -> u32 {
        if !self.resources.contains_key(&resource) && self.resources.len() >= self.max_types {
            return 0;
        }
        self.free_space()
    }

    pub(crate) fn store(
        &mut self,
        resource: ResourceKind,
        amount: u32,
    ) -> Result<(), CommandError> {
        if !self.can_accept(resource, amount) {
            return Err(CommandError::CapacityExceeded);
        }
        if amount > 0 {
            *self.resources.entry(resource).or_insert(0) += amount;
        }
        Ok(())
    }

    pub(crate) fn withdraw(
        &mut self,
        resource: ResourceKind,
        amount: u32,
    ) -> Result<(), CommandError> {
        let stock = self.stock(resource);
        if stock < amount {
            return Err(CommandError::InvalidAmount);
        }
        if stock == amount {
            let _ = self.resources.remove(&resource);
        } else if let Some(entry) = self.resources.get_mut(&resource) {
            *entry -= amount;
        }
        Ok(())
    }

    pub(crate) fn set_autosell(&mut self, resource: ResourceKind, enabled: bool) {
        let _ = self.autosell.insert(resource, enabled);
    }

    /// Sells flagged stock on the autosell cadence; opponent deposits also
    /// liquidate anything piled up past the threshold.
    pub(crate) fn tick(
        &mut self,
        coord: TileCoord,
        owner: Owner,
        dt: Duration,
        ctx: &mut TickContext<'_>,
    ) {
        let interval = ctx.tuning.autosell_interval();
        if interval.is_zero() {
            return;
        }
        self.since_autosell = self.since_autosell.saturating_add(dt);
        if self.since_autosell < interval {
            return;
        }
        self.since_autosell = Duration::ZERO;

        let threshold = ctx.tuning.opponent_liquidation_threshold;
        let to_sell: Vec<(ResourceKind, u32)> = self
            .resources()
            .filter(|(resource, amount)| {
                self.autosell(*resource) || (owner.is_opponent() && *amount >= threshold)
            })
            .collect();

        for (resource, amount) in to_sell {
            if self.withdraw(resource, amount).is_err() {
                continue;
            }
            let revenue = ctx.market.sell(resource, amount);
            ctx.ledger.earn(owner, revenue);
            ctx.events.push(Event::ResourcesSold {
                owner,
                tile: coord,
                resource,
                amount,
                revenue,
            });
            if self.autosell(resource) {
                debug!(owner = %owner, %resource, amount, revenue, "autosold");
            } else {
                info!(owner = %owner, %resource, amount, revenue, "liquidated stockpile");
            }
        }
    }
}
