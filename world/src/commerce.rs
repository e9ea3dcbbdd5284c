use std::time::Duration;

use serde::{Deserialize, Serialize};
use tile_tycoon_core::{Event, Money, Owner, ResourceKind, TileCoord};

use crate::buildings::TickContext;

/// Standing offer posted on a commerce building.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Resource for sale.
    pub resource: ResourceKind,
    /// Units left.
    pub amount: u32,
    /// Asking price per unit.
    pub unit_price: f64,
}

impl Offer {
    /// Price of buying `amount` units, rounded to whole money.
    #[must_use]
    pub fn total(&self, amount: u32) -> Money {
        (f64::from(amount) * self.unit_price).round() as Money
    }
}

/// Storefront holding at most one offer.
#[derive(Clone, Debug, Default)]
pub struct Commerce {
    offer: Option<Offer>,
    since_check: Duration,
}

impl Commerce {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Offer currently posted.
    #[must_use]
    pub const fn offer(&self) -> Option<&Offer> {
        self.offer.as_ref()
    }

    pub(crate) fn post(&mut self, offer: Offer) {
        self.offer = Some(offer);
        self.since_check = Duration::ZERO;
    }

    pub(crate) fn clear(&mut self) -> Option<Offer> {
        self.offer.take()
    }

    /// Removes sold units; returns `true` when the offer sold out.
    pub(crate) fn consume(&mut self, amount: u32) -> bool {
        let Some(offer) = self.offer.as_mut() else {
            return false;
        };
        offer.amount = offer.amount.saturating_sub(amount);
        if offer.amount == 0 {
            self.offer = None;
            return true;
        }
        false
    }

    /// Announces player offers to opponents on the commerce check cadence.
    pub(crate) fn tick(
        &mut self,
        coord: TileCoord,
        owner: Owner,
        dt: Duration,
        ctx: &mut TickContext<'_>,
    ) {
        if owner != Owner::Player {
            return;
        }
        let Some(offer) = self.offer.filter(|offer| offer.amount > 0) else {
            self.since_check = Duration::ZERO;
            return;
        };
        let interval = ctx.tuning.commerce_check_interval();
        if interval.is_zero() {
            return;
        }
        self.since_check = self.since_check.saturating_add(dt);
        if self.since_check < interval {
            return;
        }
        self.since_check -= interval;

        ctx.events.push(Event::CommerceOfferAvailable {
            tile: coord,
            seller: owner,
            resource: offer.resource,
            amount: offer.amount,
            unit_price: offer.unit_price,
        });
    }
}
