#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Computer-controlled rivals for Tile Tycoon.
//!
//! An [`Opponent`] never touches the world directly. It reads the world and
//! the economy, then emits [`Command`]s carrying its own [`Owner`] tag, which
//! the host applies like any player command.

mod construction;
mod trading;
mod tuning;

use std::time::Duration;

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tile_tycoon_core::{
    Command, Difficulty, Event, Money, OpponentId, Owner, ResourceKind, TileCoord,
};
use tile_tycoon_world::{query, Economy, World};
use tracing::{debug, info};

pub use construction::Phase;
pub use trading::decides_to_buy;
pub use tuning::{DifficultyProfile, OpponentTuning};

use construction::Holdings;

/// One rival actor and its decision loop.
#[derive(Clone, Debug)]
pub struct Opponent {
    id: OpponentId,
    profile: DifficultyProfile,
    tuning: OpponentTuning,
    rng: ChaCha8Rng,
    phase: Phase,
    since_decision: Duration,
    delay: Duration,
    stuck: u32,
    decisions: u64,
}

impl Opponent {
    /// Creates an opponent whose pace follows the difficulty.
    #[must_use]
    pub fn new(id: OpponentId, difficulty: Difficulty, tuning: OpponentTuning, seed: u64) -> Self {
        let profile = *tuning.profile(difficulty);
        let mut opponent = Self {
            id,
            profile,
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            phase: Phase::Initial,
            since_decision: Duration::ZERO,
            delay: Duration::ZERO,
            stuck: 0,
            decisions: 0,
        };
        opponent.delay = opponent.draw_delay();
        opponent
    }

    /// Identifier of the opponent.
    #[must_use]
    pub const fn id(&self) -> OpponentId {
        self.id
    }

    /// Ownership tag used for the opponent's tiles and commands.
    #[must_use]
    pub const fn owner(&self) -> Owner {
        Owner::Opponent(self.id)
    }

    /// Current development phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Consecutive decisions that found nothing to do.
    #[must_use]
    pub const fn stuck(&self) -> u32 {
        self.stuck
    }

    /// Decisions taken so far.
    #[must_use]
    pub const fn decisions(&self) -> u64 {
        self.decisions
    }

    /// Reacts to offer announcements by buying from the announced storefront.
    pub fn handle_events(
        &mut self,
        events: &[Event],
        world: &World,
        economy: &Economy,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            let Event::CommerceOfferAvailable { tile, seller, .. } = event else {
                continue;
            };
            if let Some(command) = self.consider_offer(*tile, *seller, world, economy) {
                out.push(command);
            }
        }
    }

    /// Runs one decision once the randomized delay has elapsed.
    ///
    /// Returns whether a decision was taken.
    pub fn maybe_decide(
        &mut self,
        dt: Duration,
        world: &World,
        economy: &Economy,
        out: &mut Vec<Command>,
    ) -> bool {
        self.since_decision = self.since_decision.saturating_add(dt);
        if self.since_decision < self.delay {
            return false;
        }
        self.since_decision = Duration::ZERO;
        self.delay = self.draw_delay();
        self.decide(world, economy, out);
        true
    }

    fn decide(&mut self, world: &World, economy: &Economy, out: &mut Vec<Command>) {
        self.decisions = self.decisions.saturating_add(1);
        let holdings = Holdings::survey(world, self.owner());
        self.advance_phase(&holdings);
        self.configure_buildings(world, economy, out);

        match self.choose_action(world, economy, &holdings) {
            Some(command) => {
                self.stuck = 0;
                out.push(command);
            }
            None => {
                self.stuck = self.stuck.saturating_add(1);
                debug!(
                    owner = %self.owner(),
                    stuck = self.stuck,
                    money = holdings.money,
                    "opponent found nothing to do"
                );
            }
        }
    }

    fn advance_phase(&mut self, holdings: &Holdings) {
        let next = construction::next_phase(self.phase, holdings, &self.tuning);
        if next != self.phase {
            info!(owner = %self.owner(), from = ?self.phase, to = ?next, "opponent phase changed");
            self.phase = next;
        }
    }

    fn choose_action(
        &mut self,
        world: &World,
        economy: &Economy,
        holdings: &Holdings,
    ) -> Option<Command> {
        if self.chance(self.tuning.commerce_check_probability) {
            if let Some(command) = self.browse_offers(world, economy) {
                return Some(command);
            }
        }
        if let Some(command) = self.sell_off(world) {
            return Some(command);
        }
        if self.chance(self.profile.survey_probability) {
            if let Some(command) = self.survey(world, economy, holdings.money) {
                return Some(command);
            }
        }

        let (first, second) = if self.chance(self.profile.expansion_rate) {
            (
                self.purchase(world, economy, holdings.money),
                self.build(economy, holdings),
            )
        } else {
            (
                self.build(economy, holdings),
                self.purchase(world, economy, holdings.money),
            )
        };
        first
            .or(second)
            .or_else(|| self.survey(world, economy, holdings.money))
    }

    fn browse_offers(&mut self, world: &World, economy: &Economy) -> Option<Command> {
        query::commerce_offers(world)
            .into_iter()
            .find_map(|listing| self.consider_offer(listing.tile, listing.seller, world, economy))
    }

    /// Buys from a player storefront when the current offer tempts the opponent.
    fn consider_offer(
        &mut self,
        tile: TileCoord,
        seller: Owner,
        world: &World,
        economy: &Economy,
    ) -> Option<Command> {
        if seller != Owner::Player {
            return None;
        }
        let offer = query::tile(world, tile)?
            .commerce()?
            .offer()
            .copied()
            .filter(|offer| offer.amount > 0)?;
        let owner = self.owner();
        let money = query::money(world, owner);
        let feeds_recipe = feeds_recipe(world, owner, offer.resource);
        let market_price = economy.market.price(offer.resource);
        if !decides_to_buy(&offer, market_price, money, feeds_recipe, &mut self.rng) {
            return None;
        }

        let room = storage_room(world, owner, offer.resource);
        let amount =
            trading::purchase_amount(&offer, money, room, self.tuning.max_commerce_purchase);
        if amount == 0 {
            return None;
        }
        debug!(owner = %owner, x = tile.x(), y = tile.y(), amount, "opponent takes player offer");
        Some(Command::BuyFromCommerce {
            buyer: owner,
            tile,
            amount: Some(amount),
        })
    }

    fn sell_off(&self, world: &World) -> Option<Command> {
        let owner = self.owner();
        query::tiles(world)
            .filter(|tile| tile.is_owned_by(owner))
            .find_map(|tile| {
                let (resource, amount) = tile
                    .deposit()?
                    .resources()
                    .find(|(_, amount)| *amount >= self.tuning.sell_threshold)?;
                Some(Command::SellDepositResource {
                    actor: owner,
                    tile: tile.coord(),
                    resource,
                    amount,
                })
            })
    }

    fn survey(&mut self, world: &World, economy: &Economy, money: Money) -> Option<Command> {
        if economy.pricing.survey_cost() > money {
            return None;
        }
        let owner = self.owner();
        let candidates: Vec<TileCoord> = query::purchasable_tiles(world, owner)
            .into_iter()
            .filter(|coord| {
                query::tile(world, *coord).is_some_and(|tile| !tile.is_surveyed_by(owner))
            })
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let tile = candidates[self.rng.gen_range(0..candidates.len())];
        Some(Command::SurveyTile { actor: owner, tile })
    }

    /// Buys adjacent land, favouring tiles already surveyed to hold resources.
    fn purchase(&mut self, world: &World, economy: &Economy, money: Money) -> Option<Command> {
        let owner = self.owner();
        let candidates: Vec<(TileCoord, f64)> = query::purchasable_tiles(world, owner)
            .into_iter()
            .filter(|coord| {
                query::tile_cost(world, economy, *coord).is_some_and(|cost| cost <= money)
            })
            .filter_map(|coord| {
                let tile = query::tile(world, coord)?;
                let weight = match (tile.is_surveyed_by(owner), tile.resource()) {
                    (true, Some(resource)) => 1.0 + resource.base_value() / 10.0,
                    (true, None) => 0.5,
                    (false, _) => 1.0,
                };
                Some((coord, weight))
            })
            .collect();
        let picker = WeightedIndex::new(candidates.iter().map(|(_, weight)| *weight)).ok()?;
        let tile = candidates[picker.sample(&mut self.rng)].0;
        Some(Command::BuyTile { actor: owner, tile })
    }

    fn build(&self, economy: &Economy, holdings: &Holdings) -> Option<Command> {
        construction::wishlist(self.phase, holdings, &self.tuning)
            .into_iter()
            .find(|(_, kind)| economy.pricing.building_cost(*kind) <= holdings.money)
            .map(|(tile, kind)| Command::Build {
                actor: self.owner(),
                tile,
                kind,
            })
    }

    /// Points idle processing at the best recipe in stock and stocks one idle storefront.
    fn configure_buildings(&self, world: &World, economy: &Economy, out: &mut Vec<Command>) {
        let owner = self.owner();
        let stockpile = query::stockpile(world, owner);
        let price = |resource: ResourceKind| economy.market.price(resource);
        let best_recipe = trading::best_recipe(&stockpile, price, &self.tuning);
        let mut storefront_stocked = false;

        for tile in query::tiles(world).filter(|tile| tile.is_owned_by(owner)) {
            let coord = tile.coord();
            if let Some(processing) = tile.processing() {
                let retarget = processing.is_active()
                    && processing.is_idle()
                    && best_recipe.is_some()
                    && processing.recipe() != best_recipe;
                if retarget {
                    out.push(Command::SetProcessingRecipe {
                        actor: owner,
                        tile: coord,
                        recipe: best_recipe,
                    });
                }
            }
            if let Some(commerce) = tile.commerce() {
                if storefront_stocked || commerce.offer().is_some() {
                    continue;
                }
                if let Some(offer) = trading::best_offer(&stockpile, price, &self.tuning) {
                    storefront_stocked = true;
                    info!(
                        owner = %owner,
                        resource = %offer.resource,
                        amount = offer.amount,
                        unit_price = offer.unit_price,
                        "opponent stocks storefront"
                    );
                    out.push(Command::SetupCommerceTrade {
                        actor: owner,
                        tile: coord,
                        resource: offer.resource,
                        amount: offer.amount,
                        unit_price: offer.unit_price,
                    });
                }
            }
        }
    }

    fn chance(&mut self, probability: f64) -> bool {
        if probability.is_nan() {
            return false;
        }
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn draw_delay(&mut self) -> Duration {
        let (low, high) = self.profile.delay_bounds();
        if high <= low {
            return low;
        }
        let secs = self.rng.gen_range(low.as_secs_f64()..=high.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(low)
    }
}

/// Reports whether an active processing building of the owner consumes the resource.
fn feeds_recipe(world: &World, owner: Owner, resource: ResourceKind) -> bool {
    query::tiles(world)
        .filter(|tile| tile.is_owned_by(owner))
        .filter_map(|tile| tile.processing())
        .filter(|processing| processing.is_active())
        .filter_map(|processing| processing.recipe())
        .any(|recipe| recipe.recipe().consumes(resource))
}

/// Units of the resource the owner's deposits could still take.
fn storage_room(world: &World, owner: Owner, resource: ResourceKind) -> u32 {
    query::tiles(world)
        .filter(|tile| tile.is_owned_by(owner))
        .filter_map(|tile| tile.deposit())
        .filter(|deposit| deposit.can_accept(resource, 1))
        .map(|deposit| deposit.free_space())
        .sum()
}
