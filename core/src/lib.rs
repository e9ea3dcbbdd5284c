#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tile Tycoon engine.
//!
//! This crate defines the message surface that connects hosts, the
//! authoritative world, and pure systems. Hosts and opponent controllers
//! submit [`Command`] values describing desired mutations, the world executes
//! those commands via its `apply` entry point, and then broadcasts [`Event`]
//! values so systems can react deterministically. Systems consume event
//! streams, query immutable snapshots, and respond exclusively with new
//! command batches.

mod catalogue;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalogue::{Rarity, Recipe, RecipeId, RecipeInput, ResourceKind};

/// Whole-unit currency used by every ledger in the game.
pub type Money = i64;

/// Location of a single tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Orthogonal neighbours that do not underflow the grid origin.
    ///
    /// Upper bounds are not checked; the world filters coordinates beyond its
    /// dimensions.
    pub fn neighbors(self) -> impl Iterator<Item = TileCoord> {
        [
            self.x.checked_add(1).map(|x| Self::new(x, self.y)),
            self.x.checked_sub(1).map(|x| Self::new(x, self.y)),
            self.y.checked_add(1).map(|y| Self::new(self.x, y)),
            self.y.checked_sub(1).map(|y| Self::new(self.x, y)),
        ]
        .into_iter()
        .flatten()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unique identifier assigned to a computer-controlled opponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpponentId(u32);

impl OpponentId {
    /// Creates a new opponent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Economic actor that can own tiles, hold money and issue commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Owner {
    /// The human player.
    Player,
    /// A computer-controlled opponent.
    Opponent(OpponentId),
}

impl Owner {
    /// Reports whether the owner is a computer-controlled opponent.
    #[must_use]
    pub const fn is_opponent(&self) -> bool {
        matches!(self, Self::Opponent(_))
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::Opponent(id) => write!(f, "ai_{}", id.get()),
        }
    }
}

/// Types of buildings that can occupy a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildingKind {
    /// Headquarters tile; inert, placeable only on empty land.
    Central,
    /// Extracts the host tile's resource.
    Collection,
    /// Stores resources pending sale or processing.
    Deposit,
    /// Converts inputs into refined goods through a recipe.
    Processing,
    /// Posts a standing offer other parties can buy from.
    Commerce,
}

impl BuildingKind {
    /// Every building kind.
    pub const ALL: [BuildingKind; 5] = [
        Self::Central,
        Self::Collection,
        Self::Deposit,
        Self::Processing,
        Self::Commerce,
    ];

    /// Construction cost before the price manager's building multiplier.
    #[must_use]
    pub const fn base_cost(self) -> Money {
        match self {
            Self::Central => 0,
            Self::Collection => 50,
            Self::Deposit => 100,
            Self::Processing => 200,
            Self::Commerce => 300,
        }
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Central => "CENTRAL",
            Self::Collection => "COLLECTION",
            Self::Deposit => "DEPOSIT",
            Self::Processing => "PROCESSING",
            Self::Commerce => "COMMERCE",
        };
        f.write_str(name)
    }
}

/// Game difficulty shared by opponents and the price manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Slow opponents and gentle inflation.
    Easy,
    /// Reference tuning.
    #[default]
    Normal,
    /// Fast opponents and steep inflation.
    Hard,
}

impl Difficulty {
    /// Scales the price manager's base inflation rate.
    #[must_use]
    pub const fn inflation_coefficient(self) -> f64 {
        match self {
            Self::Easy => 0.8,
            Self::Normal => 1.0,
            Self::Hard => 1.25,
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Advances every building state machine by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Purchases an unowned tile adjacent to the actor's territory.
    BuyTile {
        /// Party paying for the tile.
        actor: Owner,
        /// Tile being purchased.
        tile: TileCoord,
    },
    /// Pays to reveal an unowned tile's resource.
    SurveyTile {
        /// Party commissioning the survey.
        actor: Owner,
        /// Tile being surveyed.
        tile: TileCoord,
    },
    /// Constructs a building on an owned tile.
    Build {
        /// Party paying for construction.
        actor: Owner,
        /// Tile receiving the building.
        tile: TileCoord,
        /// Kind of building to construct.
        kind: BuildingKind,
    },
    /// Selects or clears the recipe of a processing building.
    SetProcessingRecipe {
        /// Owner of the processing building.
        actor: Owner,
        /// Tile hosting the processing building.
        tile: TileCoord,
        /// Recipe to run, or `None` to clear the selection.
        recipe: Option<RecipeId>,
    },
    /// Flips a processing building between active and inactive.
    ToggleProcessingActive {
        /// Owner of the processing building.
        actor: Owner,
        /// Tile hosting the processing building.
        tile: TileCoord,
    },
    /// Posts a standing offer on a commerce building.
    SetupCommerceTrade {
        /// Owner of the commerce building.
        actor: Owner,
        /// Tile hosting the commerce building.
        tile: TileCoord,
        /// Resource offered.
        resource: ResourceKind,
        /// Units withdrawn from the actor's deposits into the offer.
        amount: u32,
        /// Asking price per unit.
        unit_price: f64,
    },
    /// Buys units from another party's commerce offer.
    BuyFromCommerce {
        /// Party paying for the goods.
        buyer: Owner,
        /// Tile hosting the commerce building.
        tile: TileCoord,
        /// Units requested; `None` buys the whole offer.
        amount: Option<u32>,
    },
    /// Withdraws a commerce offer, returning unsold stock to the owner's deposits.
    ResetCommerce {
        /// Owner of the commerce building.
        actor: Owner,
        /// Tile hosting the commerce building.
        tile: TileCoord,
    },
    /// Enables or disables periodic selling of a deposit resource.
    SetAutosell {
        /// Owner of the deposit.
        actor: Owner,
        /// Tile hosting the deposit.
        tile: TileCoord,
        /// Resource affected.
        resource: ResourceKind,
        /// Whether the resource should be sold automatically.
        enabled: bool,
    },
    /// Sells units from a deposit at the current market price.
    SellDepositResource {
        /// Owner of the deposit.
        actor: Owner,
        /// Tile hosting the deposit.
        tile: TileCoord,
        /// Resource sold.
        resource: ResourceKind,
        /// Units sold.
        amount: u32,
    },
    /// Buys units from the market into the actor's deposits.
    BuyFromMarket {
        /// Party paying for the goods.
        actor: Owner,
        /// Resource bought.
        resource: ResourceKind,
        /// Units requested; the market may fill fewer.
        amount: u32,
    },
}

impl Command {
    /// Party issuing the command, if any.
    #[must_use]
    pub const fn actor(&self) -> Option<Owner> {
        match self {
            Self::Tick { .. } => None,
            Self::BuyTile { actor, .. }
            | Self::SurveyTile { actor, .. }
            | Self::Build { actor, .. }
            | Self::SetProcessingRecipe { actor, .. }
            | Self::ToggleProcessingActive { actor, .. }
            | Self::SetupCommerceTrade { actor, .. }
            | Self::ResetCommerce { actor, .. }
            | Self::SetAutosell { actor, .. }
            | Self::SellDepositResource { actor, .. }
            | Self::BuyFromMarket { actor, .. } => Some(*actor),
            Self::BuyFromCommerce { buyer, .. } => Some(*buyer),
        }
    }
}

/// Reasons a building reports that it cannot make progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StallReason {
    /// No owned deposit can accept the building's goods.
    NoDeposit,
    /// The bound deposit filled up before delivery.
    DepositFull,
    /// No owned deposit holds a required recipe input.
    MissingInputs,
    /// A source deposit lost its stock while inputs were in transit.
    InputsWithdrawn,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms a tile changed hands.
    TilePurchased {
        /// New owner of the tile.
        owner: Owner,
        /// Tile purchased.
        tile: TileCoord,
        /// Money paid.
        cost: Money,
    },
    /// Confirms a survey revealed a tile.
    TileSurveyed {
        /// Party that paid for the survey.
        owner: Owner,
        /// Tile surveyed.
        tile: TileCoord,
        /// Money paid.
        cost: Money,
        /// Resource revealed, `None` for empty land.
        resource: Option<ResourceKind>,
    },
    /// Confirms a building was constructed.
    BuildingPlaced {
        /// Owner of the building.
        owner: Owner,
        /// Tile hosting the building.
        tile: TileCoord,
        /// Kind constructed.
        kind: BuildingKind,
        /// Money paid.
        cost: Money,
    },
    /// A collection building extracted one unit.
    ResourceCollected {
        /// Tile extracted from.
        tile: TileCoord,
        /// Resource extracted.
        resource: ResourceKind,
        /// Units left in the tile.
        remaining_durability: u32,
    },
    /// A collection building delivered its load into a deposit.
    ResourceDelivered {
        /// Collection tile.
        from: TileCoord,
        /// Receiving deposit tile.
        deposit: TileCoord,
        /// Resource delivered.
        resource: ResourceKind,
        /// Units delivered.
        amount: u32,
    },
    /// A tile ran out of resource; its collection building was removed.
    ResourceDepleted {
        /// Tile that became empty.
        tile: TileCoord,
        /// Resource that ran out.
        resource: ResourceKind,
        /// Units the collection building still held when it was removed.
        stranded: u32,
    },
    /// Units were sold to the market.
    ResourcesSold {
        /// Seller credited with the revenue.
        owner: Owner,
        /// Deposit the units came from.
        tile: TileCoord,
        /// Resource sold.
        resource: ResourceKind,
        /// Units sold.
        amount: u32,
        /// Money credited.
        revenue: Money,
    },
    /// Units were bought from the market.
    ResourcesBought {
        /// Buyer debited for the purchase.
        owner: Owner,
        /// Resource bought.
        resource: ResourceKind,
        /// Units received.
        amount: u32,
        /// Money debited.
        cost: Money,
    },
    /// A processing building selected or cleared its recipe.
    RecipeSelected {
        /// Processing tile.
        tile: TileCoord,
        /// Recipe now selected.
        recipe: Option<RecipeId>,
    },
    /// A processing building was activated or deactivated.
    ProcessingToggled {
        /// Processing tile.
        tile: TileCoord,
        /// Whether the building is active after the toggle.
        active: bool,
        /// Whether an in-flight cycle was discarded.
        voided: bool,
    },
    /// Inputs arrived and were debited; processing began.
    ProcessingStarted {
        /// Processing tile.
        tile: TileCoord,
        /// Recipe being run.
        recipe: RecipeId,
    },
    /// A processing cycle finished and its output left for a deposit.
    ProcessingCompleted {
        /// Processing tile.
        tile: TileCoord,
        /// Recipe that completed.
        recipe: RecipeId,
        /// Resource produced.
        output: ResourceKind,
        /// Units produced.
        amount: u32,
    },
    /// Processing output reached a deposit.
    OutputDelivered {
        /// Processing tile.
        tile: TileCoord,
        /// Receiving deposit tile.
        deposit: TileCoord,
        /// Resource delivered.
        resource: ResourceKind,
        /// Units delivered.
        amount: u32,
    },
    /// Processing output could not be placed and stays in the building.
    OutputHeld {
        /// Processing tile.
        tile: TileCoord,
        /// Resource held.
        resource: ResourceKind,
        /// Units held in total.
        amount: u32,
    },
    /// A building cannot make progress; emitted at a throttled rate.
    ProductionStalled {
        /// Tile hosting the stalled building.
        tile: TileCoord,
        /// Kind of the stalled building.
        kind: BuildingKind,
        /// Reason progress is blocked.
        reason: StallReason,
    },
    /// Autosell was switched on or off for a deposit resource.
    AutosellChanged {
        /// Deposit tile.
        tile: TileCoord,
        /// Resource affected.
        resource: ResourceKind,
        /// New autosell flag.
        enabled: bool,
    },
    /// A commerce offer was posted.
    CommerceOfferPosted {
        /// Commerce tile.
        tile: TileCoord,
        /// Owner of the offer.
        seller: Owner,
        /// Resource offered.
        resource: ResourceKind,
        /// Units offered.
        amount: u32,
        /// Asking price per unit.
        unit_price: f64,
    },
    /// Periodic announcement that a player offer is open to opponents.
    CommerceOfferAvailable {
        /// Commerce tile.
        tile: TileCoord,
        /// Owner of the offer.
        seller: Owner,
        /// Resource offered.
        resource: ResourceKind,
        /// Units still offered.
        amount: u32,
        /// Asking price per unit.
        unit_price: f64,
    },
    /// Units changed hands through a commerce offer.
    CommerceTrade {
        /// Commerce tile.
        tile: TileCoord,
        /// Owner of the offer.
        seller: Owner,
        /// Party that paid.
        buyer: Owner,
        /// Resource traded.
        resource: ResourceKind,
        /// Units traded.
        amount: u32,
        /// Money transferred.
        total: Money,
    },
    /// A commerce offer sold out or was withdrawn.
    CommerceOfferCleared {
        /// Commerce tile.
        tile: TileCoord,
    },
    /// A command was refused; no state changed.
    CommandRejected {
        /// Party that issued the command.
        actor: Option<Owner>,
        /// Specific reason the command failed.
        reason: CommandError,
    },
}

/// Reasons a command may be rejected by the world.
///
/// Every rejection is recoverable: the world state is left untouched and the
/// caller may retry on a later tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum CommandError {
    /// The actor cannot pay for the action.
    #[error("insufficient funds: {required} required, {available} available")]
    InsufficientFunds {
        /// Cost of the action.
        required: Money,
        /// Money the actor holds.
        available: Money,
    },
    /// The tile is not adjacent, already owned, or has the wrong resource state.
    #[error("tile cannot be used for this action")]
    InvalidLocation,
    /// A deposit is full or at its distinct resource type limit.
    #[error("deposit capacity or resource type limit exceeded")]
    CapacityExceeded,
    /// No deposit or source qualifies for the transfer.
    #[error("no eligible deposit or source")]
    NoEligibleTarget,
    /// The commerce offer emptied or changed before execution.
    #[error("commerce offer is no longer available")]
    StaleOffer,
    /// The coordinate lies outside the world.
    #[error("tile lies outside the world")]
    UnknownTile,
    /// The actor does not own the tile.
    #[error("actor does not own the tile")]
    NotOwner,
    /// The tile hosts no building or a building of another kind.
    #[error("tile does not host the required building")]
    WrongBuilding,
    /// The processing building is mid-cycle and active.
    #[error("processing building is busy")]
    ProcessingBusy,
    /// Amounts and prices must be positive and covered by stock.
    #[error("amount or price is invalid")]
    InvalidAmount,
    /// The commerce building already holds an offer.
    #[error("commerce building already holds an offer")]
    OfferActive,
}

#[cfg(test)]
mod tests {
    use super::{
        BuildingKind, Command, CommandError, OpponentId, Owner, RecipeId, ResourceKind, TileCoord,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = TileCoord::new(1, 1);
        let destination = TileCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn neighbors_skip_negative_coordinates() {
        let corner: Vec<_> = TileCoord::new(0, 0).neighbors().collect();
        assert_eq!(corner, vec![TileCoord::new(1, 0), TileCoord::new(0, 1)]);
        assert_eq!(TileCoord::new(3, 3).neighbors().count(), 4);
    }

    #[test]
    fn owner_tags_match_ownership_convention() {
        assert_eq!(Owner::Player.to_string(), "player");
        assert_eq!(Owner::Opponent(OpponentId::new(2)).to_string(), "ai_2");
    }

    #[test]
    fn building_costs_escalate_with_capability() {
        assert_eq!(BuildingKind::Central.base_cost(), 0);
        assert!(BuildingKind::Collection.base_cost() < BuildingKind::Deposit.base_cost());
        assert!(BuildingKind::Processing.base_cost() < BuildingKind::Commerce.base_cost());
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn commands_round_trip_through_bincode() {
        assert_round_trip(&Command::SetProcessingRecipe {
            actor: Owner::Opponent(OpponentId::new(1)),
            tile: TileCoord::new(3, 4),
            recipe: Some(RecipeId::Steel),
        });
        assert_round_trip(&Command::SetupCommerceTrade {
            actor: Owner::Player,
            tile: TileCoord::new(0, 2),
            resource: ResourceKind::Wood,
            amount: 20,
            unit_price: 5.0,
        });
    }

    #[test]
    fn command_error_round_trips_through_bincode() {
        assert_round_trip(&CommandError::InsufficientFunds {
            required: 100,
            available: 40,
        });
    }

    #[test]
    fn insufficient_funds_reports_both_amounts() {
        let error = CommandError::InsufficientFunds {
            required: 300,
            available: 120,
        };
        assert_eq!(
            error.to_string(),
            "insufficient funds: 300 required, 120 available"
        );
    }
}
