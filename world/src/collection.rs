use std::time::Duration;

use tile_tycoon_core::{BuildingKind, Event, Owner, ResourceKind, StallReason, TileCoord};
use tracing::{debug, info};

use crate::buildings::{StallThrottle, TickContext};

/// Progress of a collection building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionState {
    /// Looking for a deposit to feed.
    SeekingDeposit,
    /// No deposit qualified; waiting before searching again.
    Idle {
        /// Time spent waiting so far.
        waited: Duration,
    },
    /// Extracting the next unit.
    Collecting {
        /// Time spent on the current unit.
        elapsed: Duration,
    },
    /// Carrying the held units to the target deposit.
    Transporting {
        /// Time until arrival.
        remaining: Duration,
    },
}

/// Extractor bound to the resource of its host tile.
#[derive(Clone, Debug)]
pub struct Collection {
    resource: ResourceKind,
    state: CollectionState,
    target: Option<TileCoord>,
    held: u32,
    throttle: StallThrottle,
}

impl Collection {
    pub(crate) fn new(resource: ResourceKind) -> Self {
        Self {
            resource,
            state: CollectionState::SeekingDeposit,
            target: None,
            held: 0,
            throttle: StallThrottle::default(),
        }
    }

    /// Resource being extracted.
    #[must_use]
    pub const fn resource(&self) -> ResourceKind {
        self.resource
    }

    /// Current progress.
    #[must_use]
    pub const fn state(&self) -> CollectionState {
        self.state
    }

    /// Deposit the building delivers to.
    #[must_use]
    pub const fn target(&self) -> Option<TileCoord> {
        self.target
    }

    /// Units extracted but not yet delivered.
    #[must_use]
    pub const fn held(&self) -> u32 {
        self.held
    }

    /// Advances the building; returns `false` once the host tile is exhausted.
    pub(crate) fn tick(
        &mut self,
        coord: TileCoord,
        owner: Owner,
        dt: Duration,
        ctx: &mut TickContext<'_>,
    ) -> bool {
        self.throttle.advance(dt);
        match self.state {
            CollectionState::SeekingDeposit => self.seek(coord, owner, ctx),
            CollectionState::Idle { waited } => {
                let waited = waited.saturating_add(dt);
                if waited >= ctx.tuning.deposit_search_retry() {
                    self.seek(coord, owner, ctx);
                } else {
                    self.state = CollectionState::Idle { waited };
                }
            }
            CollectionState::Collecting { elapsed } => {
                let elapsed = elapsed.saturating_add(dt);
                if elapsed < ctx.tuning.collection_duration() {
                    self.state = CollectionState::Collecting { elapsed };
                } else {
                    return self.extract(coord, owner, ctx);
                }
            }
            CollectionState::Transporting { remaining } => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    self.deliver(coord, owner, ctx);
                } else {
                    self.state = CollectionState::Transporting { remaining };
                }
            }
        }
        true
    }

    fn seek(&mut self, coord: TileCoord, owner: Owner, ctx: &mut TickContext<'_>) {
        match ctx.grid.collection_target(owner, coord, self.resource) {
            Some(target) => {
                self.target = Some(target);
                self.state = if self.held > 0 {
                    CollectionState::Transporting {
                        remaining: ctx
                            .tuning
                            .transport_time(coord.manhattan_distance(target)),
                    }
                } else {
                    CollectionState::Collecting {
                        elapsed: Duration::ZERO,
                    }
                };
                debug!(
                    x = coord.x(),
                    y = coord.y(),
                    deposit = %target,
                    "collection bound to deposit"
                );
            }
            None => {
                self.target = None;
                self.state = CollectionState::Idle {
                    waited: Duration::ZERO,
                };
                ctx.report_stall(
                    &mut self.throttle,
                    coord,
                    BuildingKind::Collection,
                    StallReason::NoDeposit,
                );
            }
        }
    }

    fn extract(&mut self, coord: TileCoord, owner: Owner, ctx: &mut TickContext<'_>) -> bool {
        let Some(tile) = ctx.grid.tile_mut(coord) else {
            return false;
        };
        if tile.resource != Some(self.resource) || tile.durability == 0 {
            tile.resource = None;
            tile.durability = 0;
            return false;
        }

        tile.durability -= 1;
        self.held += 1;
        let remaining_durability = tile.durability;
        ctx.events.push(Event::ResourceCollected {
            tile: coord,
            resource: self.resource,
            remaining_durability,
        });

        if remaining_durability == 0 {
            tile.resource = None;
            ctx.events.push(Event::ResourceDepleted {
                tile: coord,
                resource: self.resource,
                stranded: self.held,
            });
            info!(
                owner = %owner,
                x = coord.x(),
                y = coord.y(),
                resource = %self.resource,
                stranded = self.held,
                "resource depleted, collection removed"
            );
            return false;
        }

        match self.target {
            Some(target) => {
                self.state = CollectionState::Transporting {
                    remaining: ctx
                        .tuning
                        .transport_time(coord.manhattan_distance(target)),
                };
            }
            None => self.seek(coord, owner, ctx),
        }
        true
    }

    fn deliver(&mut self, coord: TileCoord, owner: Owner, ctx: &mut TickContext<'_>) {
        let resource = self.resource;
        let amount = self.held;
        let delivered = self.target.and_then(|target| {
            let deposit = ctx.grid.owned_deposit_mut(owner, target)?;
            deposit.store(resource, amount).ok().map(|()| target)
        });

        match delivered {
            Some(deposit) => {
                self.held = 0;
                self.state = CollectionState::Collecting {
                    elapsed: Duration::ZERO,
                };
                ctx.events.push(Event::ResourceDelivered {
                    from: coord,
                    deposit,
                    resource,
                    amount,
                });
            }
            None => {
                ctx.report_stall(
                    &mut self.throttle,
                    coord,
                    BuildingKind::Collection,
                    StallReason::DepositFull,
                );
                self.target = None;
                self.seek(coord, owner, ctx);
            }
        }
    }
}
