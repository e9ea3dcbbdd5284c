#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Simulation root tying the world, the economy and the opponents together.
//!
//! A [`Session`] owns every piece of mutable game state and advances it in a
//! fixed order per tick: buildings, market, price manager, then each opponent
//! in id order. Hosts drive it through [`Session::tick`] and the player
//! command methods, and read it through [`Session::world`] or
//! [`Session::summary`].

mod config;

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};
use tile_tycoon_core::{
    BuildingKind, Command, CommandError, Event, Money, OpponentId, Owner, RecipeId, ResourceKind,
    TileCoord,
};
use tile_tycoon_system_market::Market;
use tile_tycoon_system_opponent::{Opponent, Phase};
use tile_tycoon_system_pricing::PriceManager;
use tile_tycoon_world::{self as world, query, Economy, World};
use tracing::{info, warn};

pub use config::{ConfigError, SessionConfig, WorldSize, MAX_OPPONENTS, MIN_EDGE};

const SEED_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// How a finished game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    /// The player reached the money goal.
    PlayerWon,
    /// An opponent reached the money goal first.
    OpponentWon(OpponentId),
}

/// One running game.
#[derive(Clone, Debug)]
pub struct Session {
    config: SessionConfig,
    world: World,
    economy: Economy,
    opponents: Vec<Opponent>,
    player_home: TileCoord,
    outcome: Option<GameOutcome>,
    log: Vec<Event>,
}

impl Session {
    /// Generates the world, grants every starting homestead and seats the opponents.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world = World::generate(
            config.width,
            config.height,
            config.world.clone(),
            config.seed,
        );
        let player_home = world.setup_player_start(config.initial_money);

        let mut opponents = Vec::with_capacity(config.opponents);
        for index in 0..config.opponents {
            let id = OpponentId::new(u32::try_from(index).unwrap_or(u32::MAX));
            if world.setup_opponent_start(id, config.initial_money).is_none() {
                warn!(opponent = index, "no room left for an opponent homestead");
                continue;
            }
            opponents.push(Opponent::new(
                id,
                config.difficulty,
                config.opponent.clone(),
                derive_seed(config.seed, index as u64 + 2),
            ));
        }

        let economy = Economy::new(
            Market::new(config.market.clone(), derive_seed(config.seed, 1)),
            PriceManager::new(config.pricing.clone()),
        );
        info!(
            width = config.width,
            height = config.height,
            opponents = opponents.len(),
            difficulty = ?config.difficulty,
            seed = config.seed,
            "session started"
        );
        Ok(Self {
            config,
            world,
            economy,
            opponents,
            player_home,
            outcome: None,
            log: Vec::new(),
        })
    }

    /// Throws the current game away and starts over from the stored configuration.
    pub fn restart(&mut self) -> Result<(), ConfigError> {
        *self = Self::new(self.config.clone())?;
        Ok(())
    }

    /// Configuration the session was built from.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Authoritative world state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Market and price manager.
    #[must_use]
    pub const fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Computer opponents in id order.
    #[must_use]
    pub fn opponents(&self) -> &[Opponent] {
        &self.opponents
    }

    /// Tile holding the player's Central building.
    #[must_use]
    pub const fn player_home(&self) -> TileCoord {
        self.player_home
    }

    /// Result of the game once someone reached the goal.
    #[must_use]
    pub const fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    /// Hands over every event produced since the previous call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.log)
    }

    /// Advances the whole simulation by `dt`.
    ///
    /// Does nothing once the game is decided.
    pub fn tick(&mut self, dt: Duration) {
        if self.outcome.is_some() {
            return;
        }

        let mut events = Vec::new();
        if let Err(reason) =
            world::apply(&mut self.world, &mut self.economy, Command::Tick { dt }, &mut events)
        {
            warn!(%reason, "world tick rejected");
        }
        let _ = self.economy.market.maybe_update(dt);
        let indicators = query::economic_indicators(&self.world, self.config.difficulty);
        let _ = self.economy.pricing.update(dt, &indicators);

        let mut reactions = Vec::new();
        for opponent in &mut self.opponents {
            let mut commands = Vec::new();
            opponent.handle_events(&events, &self.world, &self.economy, &mut commands);
            let _ = opponent.maybe_decide(dt, &self.world, &self.economy, &mut commands);
            for command in commands {
                let _ = world::apply(&mut self.world, &mut self.economy, command, &mut reactions);
            }
        }
        events.append(&mut reactions);
        self.log.append(&mut events);
        self.settle_outcome();
    }

    /// Executes a command on behalf of the player.
    ///
    /// Commands naming another actor are refused with [`CommandError::NotOwner`].
    pub fn submit(&mut self, command: Command) -> Result<(), CommandError> {
        if command.actor() != Some(Owner::Player) {
            let reason = CommandError::NotOwner;
            self.log.push(Event::CommandRejected {
                actor: command.actor(),
                reason,
            });
            return Err(reason);
        }
        let result = world::apply(&mut self.world, &mut self.economy, command, &mut self.log);
        self.settle_outcome();
        result
    }

    /// Buys a tile bordering the player's territory.
    pub fn buy_tile(&mut self, tile: TileCoord) -> Result<(), CommandError> {
        self.submit(Command::BuyTile {
            actor: Owner::Player,
            tile,
        })
    }

    /// Reveals the resource of an unowned tile.
    pub fn survey_tile(&mut self, tile: TileCoord) -> Result<(), CommandError> {
        self.submit(Command::SurveyTile {
            actor: Owner::Player,
            tile,
        })
    }

    /// Constructs a building on an owned tile.
    pub fn build(&mut self, tile: TileCoord, kind: BuildingKind) -> Result<(), CommandError> {
        self.submit(Command::Build {
            actor: Owner::Player,
            tile,
            kind,
        })
    }

    /// Selects or clears the recipe of a processing building.
    pub fn set_processing_recipe(
        &mut self,
        tile: TileCoord,
        recipe: Option<RecipeId>,
    ) -> Result<(), CommandError> {
        self.submit(Command::SetProcessingRecipe {
            actor: Owner::Player,
            tile,
            recipe,
        })
    }

    /// Pauses or resumes a processing building.
    pub fn toggle_processing_active(&mut self, tile: TileCoord) -> Result<(), CommandError> {
        self.submit(Command::ToggleProcessingActive {
            actor: Owner::Player,
            tile,
        })
    }

    /// Posts an offer on a commerce building, escrowing the goods.
    pub fn setup_commerce_trade(
        &mut self,
        tile: TileCoord,
        resource: ResourceKind,
        amount: u32,
        unit_price: f64,
    ) -> Result<(), CommandError> {
        self.submit(Command::SetupCommerceTrade {
            actor: Owner::Player,
            tile,
            resource,
            amount,
            unit_price,
        })
    }

    /// Buys from an opponent's storefront; `None` takes the whole offer.
    pub fn buy_from_commerce(
        &mut self,
        tile: TileCoord,
        amount: Option<u32>,
    ) -> Result<(), CommandError> {
        self.submit(Command::BuyFromCommerce {
            buyer: Owner::Player,
            tile,
            amount,
        })
    }

    /// Withdraws the player's offer and returns unsold goods to storage.
    pub fn reset_commerce(&mut self, tile: TileCoord) -> Result<(), CommandError> {
        self.submit(Command::ResetCommerce {
            actor: Owner::Player,
            tile,
        })
    }

    /// Flags a resource of a deposit for automatic selling.
    pub fn set_autosell(
        &mut self,
        tile: TileCoord,
        resource: ResourceKind,
        enabled: bool,
    ) -> Result<(), CommandError> {
        self.submit(Command::SetAutosell {
            actor: Owner::Player,
            tile,
            resource,
            enabled,
        })
    }

    /// Sells goods from a deposit at the market price.
    pub fn sell_deposit_resource(
        &mut self,
        tile: TileCoord,
        resource: ResourceKind,
        amount: u32,
    ) -> Result<(), CommandError> {
        self.submit(Command::SellDepositResource {
            actor: Owner::Player,
            tile,
            resource,
            amount,
        })
    }

    /// Buys goods from the market into the player's deposits.
    pub fn buy_from_market(
        &mut self,
        resource: ResourceKind,
        amount: u32,
    ) -> Result<(), CommandError> {
        self.submit(Command::BuyFromMarket {
            actor: Owner::Player,
            resource,
            amount,
        })
    }

    /// Read-only digest of the game for reports and comparisons.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut standings = vec![Standing {
            owner: Owner::Player,
            phase: None,
            stats: query::stats(&self.world, Owner::Player),
        }];
        standings.extend(self.opponents.iter().map(|opponent| Standing {
            owner: opponent.owner(),
            phase: Some(opponent.phase()),
            stats: query::stats(&self.world, opponent.owner()),
        }));

        let territory = query::tiles(&self.world)
            .filter_map(|tile| {
                Some(Claim {
                    tile: tile.coord(),
                    owner: tile.owner()?,
                    building: tile.building_kind(),
                })
            })
            .collect();

        let pricing = &self.economy.pricing;
        Summary {
            elapsed_secs: query::elapsed(&self.world).as_secs_f64(),
            outcome: self.outcome,
            standings,
            prices: self.economy.market.prices().collect(),
            survey_multiplier: pricing.survey_multiplier(),
            tile_multiplier: pricing.tile_cost_multiplier(),
            building_multiplier: pricing.building_multiplier(),
            territory,
        }
    }

    fn settle_outcome(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let goal = self.config.win_money;
        let winner = if query::money(&self.world, Owner::Player) >= goal {
            Some(GameOutcome::PlayerWon)
        } else {
            self.opponents
                .iter()
                .find(|opponent| query::money(&self.world, opponent.owner()) >= goal)
                .map(|opponent| GameOutcome::OpponentWon(opponent.id()))
        };
        if let Some(outcome) = winner {
            info!(?outcome, goal, "game decided");
            self.outcome = Some(outcome);
        }
    }
}

/// Counters and phase of one actor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Standing {
    /// Actor described.
    pub owner: Owner,
    /// Development phase; `None` for the player.
    pub phase: Option<Phase>,
    /// Counters from the world.
    pub stats: query::Stats,
}

/// Ownership record of one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Claim {
    /// Tile claimed.
    pub tile: TileCoord,
    /// Owner of the tile.
    pub owner: Owner,
    /// Building on the tile.
    pub building: Option<BuildingKind>,
}

/// Snapshot of a session at one instant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    /// Simulated seconds.
    pub elapsed_secs: f64,
    /// Result, once decided.
    pub outcome: Option<GameOutcome>,
    /// Player first, then opponents in id order.
    pub standings: Vec<Standing>,
    /// Current market prices.
    pub prices: BTreeMap<ResourceKind, f64>,
    /// Survey cost multiplier.
    pub survey_multiplier: f64,
    /// Tile cost multiplier.
    pub tile_multiplier: f64,
    /// Building cost multiplier.
    pub building_multiplier: f64,
    /// Every owned tile in row-major order.
    pub territory: Vec<Claim>,
}

impl Summary {
    /// Money held by the actor, zero when unknown.
    #[must_use]
    pub fn money(&self, owner: Owner) -> Money {
        self.standings
            .iter()
            .find(|standing| standing.owner == owner)
            .map_or(0, |standing| standing.stats.money)
    }
}

fn derive_seed(seed: u64, stream: u64) -> u64 {
    seed ^ stream.wrapping_mul(SEED_STREAM)
}
