#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Tile Tycoon.
//!
//! The world owns the tile grid, every building state machine and the money
//! ledgers of all actors. It mutates only through [`apply`], which executes one
//! [`Command`] as an indivisible step and reports what happened as [`Event`]s.
//! Read access goes through the [`query`] module.

mod buildings;
mod collection;
mod commerce;
mod deposit;
mod generation;
mod grid;
mod ledger;
mod processing;
mod tuning;

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tile_tycoon_core::{
    BuildingKind, Command, CommandError, Event, Money, Owner, RecipeId, ResourceKind, TileCoord,
};
use tile_tycoon_system_market::Market;
use tile_tycoon_system_pricing::PriceManager;
use tracing::{debug, info};

pub use buildings::Building;
pub use collection::{Collection, CollectionState};
pub use commerce::{Commerce, Offer};
pub use deposit::Deposit;
pub use grid::Tile;
pub use ledger::Account;
pub use processing::{InputRequest, Processing, ProcessingState};
pub use tuning::WorldTuning;

use grid::Grid;
use ledger::Ledger;

/// Market and price manager threaded through every economic call.
#[derive(Clone, Debug)]
pub struct Economy {
    /// Resource price discovery.
    pub market: Market,
    /// Acquisition cost multipliers.
    pub pricing: PriceManager,
}

impl Economy {
    /// Bundles a market and a price manager.
    #[must_use]
    pub fn new(market: Market, pricing: PriceManager) -> Self {
        Self { market, pricing }
    }
}

/// Represents the authoritative Tile Tycoon world state.
#[derive(Clone, Debug)]
pub struct World {
    grid: Grid,
    ledger: Ledger,
    tuning: WorldTuning,
    rng: ChaCha8Rng,
    elapsed: Duration,
    tick_index: u64,
}

impl World {
    /// Generates terrain for a new world; nobody owns anything yet.
    #[must_use]
    pub fn generate(width: u32, height: u32, tuning: WorldTuning, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = generation::generate_terrain(width, height, &tuning, &mut rng);
        Self {
            grid,
            ledger: Ledger::default(),
            tuning,
            rng,
            elapsed: Duration::ZERO,
            tick_index: 0,
        }
    }

    /// Creates a world of empty land at the base price.
    #[must_use]
    pub fn empty(width: u32, height: u32, tuning: WorldTuning) -> Self {
        Self {
            grid: Grid::new(width, height, tuning.tile_base_price),
            ledger: Ledger::default(),
            tuning,
            rng: ChaCha8Rng::seed_from_u64(0),
            elapsed: Duration::ZERO,
            tick_index: 0,
        }
    }

    /// Opens or resets an account holding the given money.
    pub fn open_account(&mut self, owner: Owner, money: Money) {
        self.ledger.open(owner, money);
    }

    /// Overwrites the resource, durability and land price of a tile.
    pub fn seed_tile(
        &mut self,
        coord: TileCoord,
        resource: Option<ResourceKind>,
        durability: u32,
        price: u64,
    ) -> Result<(), CommandError> {
        let tile = self
            .grid
            .tile_mut(coord)
            .ok_or(CommandError::UnknownTile)?;
        tile.resource = resource;
        tile.durability = if resource.is_some() { durability } else { 0 };
        tile.price = price;
        Ok(())
    }

    /// Hands a tile to an owner without payment and reveals it to them.
    pub fn grant_tile(&mut self, coord: TileCoord, owner: Owner) -> Result<(), CommandError> {
        let tile = self
            .grid
            .tile_mut(coord)
            .ok_or(CommandError::UnknownTile)?;
        tile.owner = Some(owner);
        let _ = tile.surveyed_by.insert(owner);
        Ok(())
    }

    /// Constructs a building on an owned tile without payment.
    pub fn place_building(
        &mut self,
        coord: TileCoord,
        kind: BuildingKind,
    ) -> Result<(), CommandError> {
        let tile = self
            .grid
            .tile_mut(coord)
            .ok_or(CommandError::UnknownTile)?;
        if tile.owner.is_none() {
            return Err(CommandError::NotOwner);
        }
        check_site(tile, kind)?;
        tile.building = Some(
            Building::construct(kind, tile.resource, &self.tuning)
                .ok_or(CommandError::InvalidLocation)?,
        );
        Ok(())
    }

    /// Adds goods straight into a deposit.
    pub fn stock_deposit(
        &mut self,
        coord: TileCoord,
        resource: ResourceKind,
        amount: u32,
    ) -> Result<(), CommandError> {
        match self
            .grid
            .tile_mut(coord)
            .ok_or(CommandError::UnknownTile)?
            .building
            .as_mut()
        {
            Some(Building::Deposit(deposit)) => deposit.store(resource, amount),
            _ => Err(CommandError::WrongBuilding),
        }
    }

    fn tick(&mut self, dt: Duration, market: &mut Market, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });
        buildings::tick_all(
            &mut self.grid,
            &mut self.ledger,
            market,
            &self.tuning,
            dt,
            out_events,
        );
    }

    fn owned_building_mut(
        &mut self,
        actor: Owner,
        coord: TileCoord,
    ) -> Result<&mut Building, CommandError> {
        let tile = self
            .grid
            .tile_mut(coord)
            .ok_or(CommandError::UnknownTile)?;
        if !tile.is_owned_by(actor) {
            return Err(CommandError::NotOwner);
        }
        tile.building.as_mut().ok_or(CommandError::WrongBuilding)
    }

    fn processing_mut(
        &mut self,
        actor: Owner,
        coord: TileCoord,
    ) -> Result<&mut Processing, CommandError> {
        match self.owned_building_mut(actor, coord)? {
            Building::Processing(processing) => Ok(processing),
            _ => Err(CommandError::WrongBuilding),
        }
    }

    fn commerce_mut(
        &mut self,
        actor: Owner,
        coord: TileCoord,
    ) -> Result<&mut Commerce, CommandError> {
        match self.owned_building_mut(actor, coord)? {
            Building::Commerce(commerce) => Ok(commerce),
            _ => Err(CommandError::WrongBuilding),
        }
    }

    fn deposit_mut(
        &mut self,
        actor: Owner,
        coord: TileCoord,
    ) -> Result<&mut Deposit, CommandError> {
        match self.owned_building_mut(actor, coord)? {
            Building::Deposit(deposit) => Ok(deposit),
            _ => Err(CommandError::WrongBuilding),
        }
    }
}

fn check_site(tile: &Tile, kind: BuildingKind) -> Result<(), CommandError> {
    if tile.building.is_some() {
        return Err(CommandError::InvalidLocation);
    }
    match (kind, tile.resource) {
        (BuildingKind::Collection, None) | (BuildingKind::Central, Some(_)) => {
            Err(CommandError::InvalidLocation)
        }
        _ => Ok(()),
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// A rejected command leaves every piece of state untouched; the reason is
/// returned and also broadcast as [`Event::CommandRejected`].
pub fn apply(
    world: &mut World,
    economy: &mut Economy,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    let actor = command.actor();
    let result = match command {
        Command::Tick { dt } => {
            world.tick(dt, &mut economy.market, out_events);
            Ok(())
        }
        Command::BuyTile { actor, tile } => buy_tile(world, economy, actor, tile, out_events),
        Command::SurveyTile { actor, tile } => {
            survey_tile(world, economy, actor, tile, out_events)
        }
        Command::Build { actor, tile, kind } => {
            build(world, economy, actor, tile, kind, out_events)
        }
        Command::SetProcessingRecipe {
            actor,
            tile,
            recipe,
        } => set_processing_recipe(world, actor, tile, recipe, out_events),
        Command::ToggleProcessingActive { actor, tile } => world
            .processing_mut(actor, tile)
            .map(|processing| {
                let voided = processing.toggle();
                out_events.push(Event::ProcessingToggled {
                    tile,
                    active: processing.is_active(),
                    voided,
                });
            }),
        Command::SetupCommerceTrade {
            actor,
            tile,
            resource,
            amount,
            unit_price,
        } => setup_commerce_trade(
            world,
            actor,
            tile,
            Offer {
                resource,
                amount,
                unit_price,
            },
            out_events,
        ),
        Command::BuyFromCommerce {
            buyer,
            tile,
            amount,
        } => buy_from_commerce(world, buyer, tile, amount, out_events),
        Command::ResetCommerce { actor, tile } => reset_commerce(world, actor, tile, out_events),
        Command::SetAutosell {
            actor,
            tile,
            resource,
            enabled,
        } => world.deposit_mut(actor, tile).map(|deposit| {
            deposit.set_autosell(resource, enabled);
            out_events.push(Event::AutosellChanged {
                tile,
                resource,
                enabled,
            });
        }),
        Command::SellDepositResource {
            actor,
            tile,
            resource,
            amount,
        } => sell_deposit_resource(world, economy, actor, tile, resource, amount, out_events),
        Command::BuyFromMarket {
            actor,
            resource,
            amount,
        } => buy_from_market(world, economy, actor, resource, amount, out_events),
    };

    if let Err(reason) = result {
        debug!(actor = ?actor, %reason, "command rejected");
        out_events.push(Event::CommandRejected { actor, reason });
    }
    result
}

fn buy_tile(
    world: &mut World,
    economy: &Economy,
    actor: Owner,
    coord: TileCoord,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    if !world.grid.can_purchase(coord, actor) {
        return Err(match world.grid.tile(coord) {
            Some(_) => CommandError::InvalidLocation,
            None => CommandError::UnknownTile,
        });
    }
    let tile = world
        .grid
        .tile_mut(coord)
        .ok_or(CommandError::UnknownTile)?;
    let cost = economy.pricing.tile_cost(tile.price);
    world.ledger.spend(actor, cost)?;

    tile.owner = Some(actor);
    let _ = tile.surveyed_by.insert(actor);
    info!(owner = %actor, x = coord.x(), y = coord.y(), cost, "tile purchased");
    out_events.push(Event::TilePurchased {
        owner: actor,
        tile: coord,
        cost,
    });
    Ok(())
}

fn survey_tile(
    world: &mut World,
    economy: &Economy,
    actor: Owner,
    coord: TileCoord,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    let tile = world
        .grid
        .tile_mut(coord)
        .ok_or(CommandError::UnknownTile)?;
    if tile.owner.is_some() || tile.is_surveyed_by(actor) {
        return Err(CommandError::InvalidLocation);
    }
    let cost = economy.pricing.survey_cost();
    world.ledger.spend(actor, cost)?;

    let _ = tile.surveyed_by.insert(actor);
    world.ledger.record_survey(actor);
    debug!(owner = %actor, x = coord.x(), y = coord.y(), cost, "tile surveyed");
    out_events.push(Event::TileSurveyed {
        owner: actor,
        tile: coord,
        cost,
        resource: tile.resource,
    });
    Ok(())
}

fn build(
    world: &mut World,
    economy: &Economy,
    actor: Owner,
    coord: TileCoord,
    kind: BuildingKind,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    let tile = world
        .grid
        .tile_mut(coord)
        .ok_or(CommandError::UnknownTile)?;
    if !tile.is_owned_by(actor) {
        return Err(CommandError::NotOwner);
    }
    check_site(tile, kind)?;
    let building = Building::construct(kind, tile.resource, &world.tuning)
        .ok_or(CommandError::InvalidLocation)?;
    let cost = economy.pricing.building_cost(kind);
    world.ledger.spend(actor, cost)?;

    tile.building = Some(building);
    world.ledger.record_build(actor);
    info!(owner = %actor, x = coord.x(), y = coord.y(), %kind, cost, "building placed");
    out_events.push(Event::BuildingPlaced {
        owner: actor,
        tile: coord,
        kind,
        cost,
    });
    Ok(())
}

fn set_processing_recipe(
    world: &mut World,
    actor: Owner,
    coord: TileCoord,
    recipe: Option<RecipeId>,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    world.processing_mut(actor, coord)?.select_recipe(recipe)?;
    out_events.push(Event::RecipeSelected {
        tile: coord,
        recipe,
    });
    Ok(())
}

fn setup_commerce_trade(
    world: &mut World,
    actor: Owner,
    coord: TileCoord,
    offer: Offer,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    if offer.amount == 0 || !offer.unit_price.is_finite() || offer.unit_price <= 0.0 {
        return Err(CommandError::InvalidAmount);
    }
    if world.commerce_mut(actor, coord)?.offer().is_some() {
        return Err(CommandError::OfferActive);
    }
    world
        .grid
        .withdraw_largest_first(actor, offer.resource, offer.amount)?;
    world.commerce_mut(actor, coord)?.post(offer);

    info!(
        owner = %actor,
        x = coord.x(),
        y = coord.y(),
        resource = %offer.resource,
        amount = offer.amount,
        unit_price = offer.unit_price,
        "commerce offer posted"
    );
    out_events.push(Event::CommerceOfferPosted {
        tile: coord,
        seller: actor,
        resource: offer.resource,
        amount: offer.amount,
        unit_price: offer.unit_price,
    });
    Ok(())
}

fn buy_from_commerce(
    world: &mut World,
    buyer: Owner,
    coord: TileCoord,
    requested: Option<u32>,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    let tile = world.grid.tile(coord).ok_or(CommandError::UnknownTile)?;
    let commerce = tile.commerce().ok_or(CommandError::WrongBuilding)?;
    let seller = tile.owner.ok_or(CommandError::InvalidLocation)?;
    if seller == buyer {
        return Err(CommandError::InvalidLocation);
    }
    let offer = commerce
        .offer()
        .copied()
        .filter(|offer| offer.amount > 0)
        .ok_or(CommandError::StaleOffer)?;
    let amount = requested.unwrap_or(offer.amount).min(offer.amount);
    if amount == 0 {
        return Err(CommandError::InvalidAmount);
    }
    let total = offer.total(amount);
    world.ledger.ensure_funds(buyer, total)?;
    let _ = world.grid.place(buyer, offer.resource, amount)?;
    world.ledger.spend(buyer, total)?;
    world.ledger.earn(seller, total);
    let sold_out = world.commerce_mut(seller, coord)?.consume(amount);

    info!(
        seller = %seller,
        buyer = %buyer,
        resource = %offer.resource,
        amount,
        total,
        "commerce trade"
    );
    out_events.push(Event::CommerceTrade {
        tile: coord,
        seller,
        buyer,
        resource: offer.resource,
        amount,
        total,
    });
    if sold_out {
        out_events.push(Event::CommerceOfferCleared { tile: coord });
    }
    Ok(())
}

fn reset_commerce(
    world: &mut World,
    actor: Owner,
    coord: TileCoord,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    let Some(offer) = world.commerce_mut(actor, coord)?.offer().copied() else {
        return Ok(());
    };
    let _ = world.grid.place(actor, offer.resource, offer.amount)?;
    let _ = world.commerce_mut(actor, coord)?.clear();
    debug!(owner = %actor, x = coord.x(), y = coord.y(), "commerce offer withdrawn");
    out_events.push(Event::CommerceOfferCleared { tile: coord });
    Ok(())
}

fn sell_deposit_resource(
    world: &mut World,
    economy: &mut Economy,
    actor: Owner,
    coord: TileCoord,
    resource: ResourceKind,
    amount: u32,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    if amount == 0 {
        return Err(CommandError::InvalidAmount);
    }
    world.deposit_mut(actor, coord)?.withdraw(resource, amount)?;
    let revenue = economy.market.sell(resource, amount);
    world.ledger.earn(actor, revenue);

    info!(owner = %actor, %resource, amount, revenue, "sold to market");
    out_events.push(Event::ResourcesSold {
        owner: actor,
        tile: coord,
        resource,
        amount,
        revenue,
    });
    Ok(())
}

fn buy_from_market(
    world: &mut World,
    economy: &mut Economy,
    actor: Owner,
    resource: ResourceKind,
    amount: u32,
    out_events: &mut Vec<Event>,
) -> Result<(), CommandError> {
    if amount == 0 {
        return Err(CommandError::InvalidAmount);
    }
    let available = economy.market.available(resource).min(amount);
    if available == 0 {
        return Err(CommandError::NoEligibleTarget);
    }
    world
        .ledger
        .ensure_funds(actor, economy.market.quote(resource, available))?;
    let _ = world.grid.placement_plan(actor, resource, available)?;

    let (cost, bought) = economy.market.buy(resource, available);
    let _ = world.grid.place(actor, resource, bought)?;
    world.ledger.spend(actor, cost)?;

    info!(owner = %actor, %resource, amount = bought, cost, "bought from market");
    out_events.push(Event::ResourcesBought {
        owner: actor,
        resource,
        amount: bought,
        cost,
    });
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{collections::BTreeMap, time::Duration};

    use tile_tycoon_core::{
        BuildingKind, Difficulty, Money, Owner, ResourceKind, TileCoord,
    };
    use serde::Serialize;
    use tile_tycoon_system_pricing::EconomicIndicators;

    use super::{Account, Economy, Offer, Tile, World, WorldTuning};

    /// Width and height of the grid in tiles.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        (world.grid.width(), world.grid.height())
    }

    /// Tile at the coordinate.
    #[must_use]
    pub fn tile(world: &World, coord: TileCoord) -> Option<&Tile> {
        world.grid.tile(coord)
    }

    /// Every tile in row-major order.
    pub fn tiles(world: &World) -> impl Iterator<Item = &Tile> {
        world.grid.tiles().iter()
    }

    /// Coordinates owned by the owner, in row-major order.
    #[must_use]
    pub fn owned_tiles(world: &World, owner: Owner) -> Vec<TileCoord> {
        tiles(world)
            .filter(|tile| tile.is_owned_by(owner))
            .map(Tile::coord)
            .collect()
    }

    /// Reports whether the owner may buy the tile: unowned and adjacent to
    /// their territory.
    #[must_use]
    pub fn can_purchase(world: &World, coord: TileCoord, owner: Owner) -> bool {
        world.grid.can_purchase(coord, owner)
    }

    /// Every tile the owner could buy right now, in row-major order.
    #[must_use]
    pub fn purchasable_tiles(world: &World, owner: Owner) -> Vec<TileCoord> {
        tiles(world)
            .map(Tile::coord)
            .filter(|coord| world.grid.can_purchase(*coord, owner))
            .collect()
    }

    /// Money held by the owner; zero for unknown owners.
    #[must_use]
    pub fn money(world: &World, owner: Owner) -> Money {
        world.ledger.money(owner)
    }

    /// Ledger of the owner.
    #[must_use]
    pub fn account(world: &World, owner: Owner) -> Option<&Account> {
        world.ledger.account(owner)
    }

    /// Every actor holding an account.
    #[must_use]
    pub fn owners(world: &World) -> Vec<Owner> {
        world.ledger.accounts().map(|(owner, _)| owner).collect()
    }

    /// Simulated time since the world was created.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Number of ticks applied.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Constants the world was created with.
    #[must_use]
    pub fn tuning(world: &World) -> &WorldTuning {
        &world.tuning
    }

    /// Kinds and locations of the owner's buildings.
    #[must_use]
    pub fn buildings(world: &World, owner: Owner) -> Vec<(TileCoord, BuildingKind)> {
        tiles(world)
            .filter(|tile| tile.is_owned_by(owner))
            .filter_map(|tile| tile.building_kind().map(|kind| (tile.coord(), kind)))
            .collect()
    }

    /// Goods across all of the owner's deposits.
    #[must_use]
    pub fn stockpile(world: &World, owner: Owner) -> BTreeMap<ResourceKind, u32> {
        let mut totals = BTreeMap::new();
        for (_, deposit) in world.grid.owned_deposits(owner) {
            for (resource, amount) in deposit.resources() {
                *totals.entry(resource).or_insert(0) += amount;
            }
        }
        totals
    }

    /// Units of the resource across all of the owner's deposits.
    #[must_use]
    pub fn total_stock(world: &World, owner: Owner, resource: ResourceKind) -> u32 {
        world.grid.total_stock(owner, resource)
    }

    /// Current purchase price of the tile.
    #[must_use]
    pub fn tile_cost(world: &World, economy: &Economy, coord: TileCoord) -> Option<Money> {
        world
            .grid
            .tile(coord)
            .map(|tile| economy.pricing.tile_cost(tile.price()))
    }

    /// Offer posted on a commerce building, with its seller.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct Listing {
        /// Commerce tile.
        pub tile: TileCoord,
        /// Owner of the offer.
        pub seller: Owner,
        /// Terms of the offer.
        pub offer: Offer,
    }

    /// Every open commerce offer in row-major order.
    #[must_use]
    pub fn commerce_offers(world: &World) -> Vec<Listing> {
        tiles(world)
            .filter_map(|tile| {
                let offer = tile.commerce()?.offer().copied()?;
                Some(Listing {
                    tile: tile.coord(),
                    seller: tile.owner()?,
                    offer,
                })
            })
            .collect()
    }

    /// Aggregate counters for one owner or for the whole world.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
    pub struct Stats {
        /// Tiles owned.
        pub tiles_owned: usize,
        /// Surveys commissioned.
        pub tiles_surveyed: usize,
        /// Buildings currently standing.
        pub buildings: usize,
        /// Buildings ever constructed through commands.
        pub buildings_built: usize,
        /// Money held.
        pub money: Money,
        /// Money ever earned.
        pub money_generated: Money,
        /// Money ever spent.
        pub money_spent: Money,
        /// Simulated time.
        pub elapsed: Duration,
    }

    /// Counters of a single owner.
    #[must_use]
    pub fn stats(world: &World, owner: Owner) -> Stats {
        let account = world.ledger.account(owner).cloned().unwrap_or_default();
        Stats {
            tiles_owned: owned_tiles(world, owner).len(),
            tiles_surveyed: account.tiles_surveyed(),
            buildings: buildings(world, owner).len(),
            buildings_built: account.buildings_built(),
            money: account.money(),
            money_generated: account.money_generated(),
            money_spent: account.money_spent(),
            elapsed: world.elapsed,
        }
    }

    /// Counters summed over every actor.
    #[must_use]
    pub fn aggregate_stats(world: &World) -> Stats {
        let mut total = world
            .ledger
            .accounts()
            .fold(Stats::default(), |mut total, (_, account)| {
                total.tiles_surveyed += account.tiles_surveyed();
                total.buildings_built += account.buildings_built();
                total.money += account.money();
                total.money_generated += account.money_generated();
                total.money_spent += account.money_spent();
                total
            });
        total.tiles_owned = tiles(world).filter(|tile| tile.owner().is_some()).count();
        total.buildings = tiles(world)
            .filter(|tile| tile.building().is_some())
            .count();
        total.elapsed = world.elapsed;
        total
    }

    /// Inputs for the price manager drawn from the aggregate counters.
    #[must_use]
    pub fn economic_indicators(world: &World, difficulty: Difficulty) -> EconomicIndicators {
        let totals = aggregate_stats(world);
        EconomicIndicators {
            total_money_generated: totals.money_generated,
            buildings: totals.buildings,
            tiles_owned: totals.tiles_owned,
            tiles_surveyed: totals.tiles_surveyed,
            difficulty,
        }
    }
}
