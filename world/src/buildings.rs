use std::time::Duration;

use tile_tycoon_core::{BuildingKind, Event, ResourceKind, StallReason, TileCoord};
use tile_tycoon_system_market::Market;
use tracing::warn;

use crate::{
    collection::Collection, commerce::Commerce, deposit::Deposit, grid::Grid, ledger::Ledger,
    processing::Processing, tuning::WorldTuning,
};

/// Building standing on a tile, one variant per kind with its own state.
#[derive(Clone, Debug)]
pub enum Building {
    /// Inert headquarters.
    Central,
    /// Extracts the host tile's resource.
    Collection(Collection),
    /// Stores goods.
    Deposit(Deposit),
    /// Runs recipes.
    Processing(Processing),
    /// Holds a standing offer.
    Commerce(Commerce),
}

impl Building {
    /// Constructs a fresh building; collection buildings need the host tile's resource.
    pub(crate) fn construct(
        kind: BuildingKind,
        resource: Option<ResourceKind>,
        tuning: &WorldTuning,
    ) -> Option<Self> {
        let building = match kind {
            BuildingKind::Central => Self::Central,
            BuildingKind::Collection => Self::Collection(Collection::new(resource?)),
            BuildingKind::Deposit => {
                Self::Deposit(Deposit::new(tuning.deposit_capacity, tuning.deposit_max_types))
            }
            BuildingKind::Processing => Self::Processing(Processing::new()),
            BuildingKind::Commerce => Self::Commerce(Commerce::new()),
        };
        Some(building)
    }

    /// Kind of the building.
    #[must_use]
    pub const fn kind(&self) -> BuildingKind {
        match self {
            Self::Central => BuildingKind::Central,
            Self::Collection(_) => BuildingKind::Collection,
            Self::Deposit(_) => BuildingKind::Deposit,
            Self::Processing(_) => BuildingKind::Processing,
            Self::Commerce(_) => BuildingKind::Commerce,
        }
    }
}

/// Shared state a building may touch while it ticks.
pub(crate) struct TickContext<'a> {
    pub(crate) grid: &'a mut Grid,
    pub(crate) ledger: &'a mut Ledger,
    pub(crate) market: &'a mut Market,
    pub(crate) tuning: &'a WorldTuning,
    pub(crate) events: &'a mut Vec<Event>,
}

impl TickContext<'_> {
    /// Emits a stall signal unless the building signalled within the cooldown.
    pub(crate) fn report_stall(
        &mut self,
        throttle: &mut StallThrottle,
        tile: TileCoord,
        kind: BuildingKind,
        reason: StallReason,
    ) {
        if !throttle.is_clear() {
            return;
        }
        throttle.arm(self.tuning.error_log_cooldown());
        warn!(x = tile.x(), y = tile.y(), %kind, ?reason, "production stalled");
        self.events.push(Event::ProductionStalled { tile, kind, reason });
    }
}

/// Per-building cooldown for stall signals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StallThrottle {
    remaining: Duration,
}

impl StallThrottle {
    pub(crate) fn advance(&mut self, dt: Duration) {
        self.remaining = self.remaining.saturating_sub(dt);
    }

    fn is_clear(&self) -> bool {
        self.remaining.is_zero()
    }

    fn arm(&mut self, cooldown: Duration) {
        self.remaining = cooldown;
    }
}

/// Advances every building once, in row-major order.
///
/// Each building is lifted off its tile while it runs so it can mutate other
/// tiles; a collection building that exhausts its tile is not put back.
pub(crate) fn tick_all(
    grid: &mut Grid,
    ledger: &mut Ledger,
    market: &mut Market,
    tuning: &WorldTuning,
    dt: Duration,
    events: &mut Vec<Event>,
) {
    for index in 0..grid.tiles().len() {
        let tile = &mut grid.tiles_mut()[index];
        let coord = tile.coord;
        let Some(owner) = tile.owner else {
            continue;
        };
        let Some(building) = tile.building.take() else {
            continue;
        };

        let mut ctx = TickContext {
            grid: &mut *grid,
            ledger: &mut *ledger,
            market: &mut *market,
            tuning,
            events: &mut *events,
        };
        let survivor = match building {
            Building::Central => Some(Building::Central),
            Building::Collection(mut collection) => collection
                .tick(coord, owner, dt, &mut ctx)
                .then_some(Building::Collection(collection)),
            Building::Deposit(mut deposit) => {
                deposit.tick(coord, owner, dt, &mut ctx);
                Some(Building::Deposit(deposit))
            }
            Building::Processing(mut processing) => {
                processing.tick(coord, owner, dt, &mut ctx);
                Some(Building::Processing(processing))
            }
            Building::Commerce(mut commerce) => {
                commerce.tick(coord, owner, dt, &mut ctx);
                Some(Building::Commerce(commerce))
            }
        };

        grid.tiles_mut()[index].building = survivor;
    }
}
