use std::{collections::BTreeMap, time::Duration};

use tile_tycoon_core::{
    BuildingKind, CommandError, Event, Owner, RecipeId, ResourceKind, StallReason, TileCoord,
};
use tracing::{debug, info};

use crate::{
    buildings::{StallThrottle, TickContext},
    grid::Grid,
};

/// One recipe input travelling from its source deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputRequest {
    /// Resource requested.
    pub resource: ResourceKind,
    /// Units requested.
    pub amount: u32,
    /// Deposit supplying the input.
    pub source: TileCoord,
    /// Time until the input arrives.
    pub remaining: Duration,
}

/// Progress of a processing building through one recipe cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessingState {
    /// Waiting for a recipe, inputs or an output slot.
    Idle,
    /// Inputs are on their way; nothing has been debited yet.
    RequestingResources {
        /// Recipe being prepared.
        recipe: RecipeId,
        /// One request per recipe input.
        inputs: Vec<InputRequest>,
        /// Deposit reserved for the output.
        output_target: TileCoord,
    },
    /// Inputs consumed; the recipe timer is running.
    Processing {
        /// Recipe being run.
        recipe: RecipeId,
        /// Time spent processing.
        elapsed: Duration,
        /// Deposit reserved for the output.
        output_target: TileCoord,
    },
    /// Output is travelling to a deposit.
    DeliveringOutput {
        /// Resource produced.
        resource: ResourceKind,
        /// Units produced.
        amount: u32,
        /// Deposit receiving the output.
        target: TileCoord,
        /// Time until arrival.
        remaining: Duration,
    },
}

/// Recipe-driven converter fed from the owner's deposits.
#[derive(Clone, Debug)]
pub struct Processing {
    recipe: Option<RecipeId>,
    active: bool,
    state: ProcessingState,
    held_output: Option<(ResourceKind, u32)>,
    throttle: StallThrottle,
}

impl Processing {
    pub(crate) fn new() -> Self {
        Self {
            recipe: None,
            active: true,
            state: ProcessingState::Idle,
            held_output: None,
            throttle: StallThrottle::default(),
        }
    }

    /// Selected recipe.
    #[must_use]
    pub const fn recipe(&self) -> Option<RecipeId> {
        self.recipe
    }

    /// Whether the building runs cycles.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Current progress.
    #[must_use]
    pub const fn state(&self) -> &ProcessingState {
        &self.state
    }

    /// Reports whether no cycle is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == ProcessingState::Idle
    }

    /// Output that found no deposit and waits inside the building.
    #[must_use]
    pub const fn held_output(&self) -> Option<(ResourceKind, u32)> {
        self.held_output
    }

    pub(crate) fn select_recipe(&mut self, recipe: Option<RecipeId>) -> Result<(), CommandError> {
        if self.active && !self.is_idle() {
            return Err(CommandError::ProcessingBusy);
        }
        self.recipe = recipe;
        Ok(())
    }

    /// Flips the active flag; deactivating voids an in-flight cycle.
    ///
    /// Output already on its way is kept as held output. Returns whether a
    /// cycle was voided.
    pub(crate) fn toggle(&mut self) -> bool {
        self.active = !self.active;
        if self.active {
            return false;
        }
        match std::mem::replace(&mut self.state, ProcessingState::Idle) {
            ProcessingState::Idle => false,
            ProcessingState::RequestingResources { .. } | ProcessingState::Processing { .. } => {
                true
            }
            ProcessingState::DeliveringOutput {
                resource, amount, ..
            } => {
                self.hold(resource, amount);
                false
            }
        }
    }

    fn hold(&mut self, resource: ResourceKind, amount: u32) {
        self.held_output = match self.held_output {
            Some((held, existing)) if held == resource => Some((held, existing + amount)),
            _ => Some((resource, amount)),
        };
    }

    pub(crate) fn tick(
        &mut self,
        coord: TileCoord,
        owner: Owner,
        dt: Duration,
        ctx: &mut TickContext<'_>,
    ) {
        self.throttle.advance(dt);
        if !self.active {
            return;
        }

        match std::mem::replace(&mut self.state, ProcessingState::Idle) {
            ProcessingState::Idle => self.start_cycle(coord, owner, ctx),
            ProcessingState::RequestingResources {
                recipe,
                inputs,
                output_target,
            } => self.await_inputs(coord, owner, dt, ctx, recipe, inputs, output_target),
            ProcessingState::Processing {
                recipe,
                elapsed,
                output_target,
            } => {
                let elapsed = elapsed.saturating_add(dt);
                let definition = recipe.recipe();
                if elapsed < definition.duration {
                    self.state = ProcessingState::Processing {
                        recipe,
                        elapsed,
                        output_target,
                    };
                    return;
                }
                ctx.events.push(Event::ProcessingCompleted {
                    tile: coord,
                    recipe,
                    output: definition.output,
                    amount: definition.output_amount,
                });
                debug!(x = coord.x(), y = coord.y(), %recipe, "processing completed");
                self.state = ProcessingState::DeliveringOutput {
                    resource: definition.output,
                    amount: definition.output_amount,
                    target: output_target,
                    remaining: ctx
                        .tuning
                        .transport_time(coord.manhattan_distance(output_target)),
                };
            }
            ProcessingState::DeliveringOutput {
                resource,
                amount,
                target,
                remaining,
            } => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    self.deliver(coord, owner, ctx, resource, amount, target);
                } else {
                    self.state = ProcessingState::DeliveringOutput {
                        resource,
                        amount,
                        target,
                        remaining,
                    };
                }
            }
        }
    }

    fn start_cycle(&mut self, coord: TileCoord, owner: Owner, ctx: &mut TickContext<'_>) {
        if let Some((resource, amount)) = self.held_output {
            match output_slot(ctx.grid, owner, coord, resource, amount) {
                Some(target) => {
                    self.held_output = None;
                    self.state = ProcessingState::DeliveringOutput {
                        resource,
                        amount,
                        target,
                        remaining: ctx.tuning.transport_time(coord.manhattan_distance(target)),
                    };
                }
                None => self.stall(coord, ctx, StallReason::NoDeposit),
            }
            return;
        }

        let Some(recipe) = self.recipe else {
            return;
        };
        let definition = recipe.recipe();

        let mut inputs = Vec::with_capacity(definition.inputs.len());
        for input in definition.inputs {
            let amount = input.amount;
            let Some(source) = ctx.grid.nearest_deposit(owner, coord, |deposit| {
                deposit.stock(input.resource) >= amount
            }) else {
                self.stall(coord, ctx, StallReason::MissingInputs);
                return;
            };
            inputs.push(InputRequest {
                resource: input.resource,
                amount,
                source,
                remaining: ctx.tuning.transport_time(coord.manhattan_distance(source)),
            });
        }

        let Some(output_target) = output_slot(
            ctx.grid,
            owner,
            coord,
            definition.output,
            definition.output_amount,
        ) else {
            self.stall(coord, ctx, StallReason::NoDeposit);
            return;
        };

        debug!(x = coord.x(), y = coord.y(), %recipe, "requesting inputs");
        self.state = ProcessingState::RequestingResources {
            recipe,
            inputs,
            output_target,
        };
    }

    #[allow(clippy::too_many_arguments)]
    fn await_inputs(
        &mut self,
        coord: TileCoord,
        owner: Owner,
        dt: Duration,
        ctx: &mut TickContext<'_>,
        recipe: RecipeId,
        mut inputs: Vec<InputRequest>,
        output_target: TileCoord,
    ) {
        if !sources_hold(ctx.grid, owner, &inputs) {
            self.stall(coord, ctx, StallReason::InputsWithdrawn);
            return;
        }

        for input in &mut inputs {
            input.remaining = input.remaining.saturating_sub(dt);
        }
        if inputs.iter().any(|input| !input.remaining.is_zero()) {
            self.state = ProcessingState::RequestingResources {
                recipe,
                inputs,
                output_target,
            };
            return;
        }

        for input in &inputs {
            let withdrawn = ctx
                .grid
                .owned_deposit_mut(owner, input.source)
                .map(|deposit| deposit.withdraw(input.resource, input.amount));
            debug_assert!(matches!(withdrawn, Some(Ok(()))), "inputs were checked");
        }
        ctx.events.push(Event::ProcessingStarted {
            tile: coord,
            recipe,
        });
        self.state = ProcessingState::Processing {
            recipe,
            elapsed: Duration::ZERO,
            output_target,
        };
    }

    fn deliver(
        &mut self,
        coord: TileCoord,
        owner: Owner,
        ctx: &mut TickContext<'_>,
        resource: ResourceKind,
        amount: u32,
        target: TileCoord,
    ) {
        let stored = ctx
            .grid
            .owned_deposit_mut(owner, target)
            .is_some_and(|deposit| deposit.store(resource, amount).is_ok());
        if stored {
            ctx.events.push(Event::OutputDelivered {
                tile: coord,
                deposit: target,
                resource,
                amount,
            });
            return;
        }

        match output_slot(ctx.grid, owner, coord, resource, amount) {
            Some(alternate) => {
                self.state = ProcessingState::DeliveringOutput {
                    resource,
                    amount,
                    target: alternate,
                    remaining: ctx
                        .tuning
                        .transport_time(coord.manhattan_distance(alternate)),
                };
            }
            None => {
                self.hold(resource, amount);
                let held = self.held_output.map_or(amount, |(_, held)| held);
                ctx.events.push(Event::OutputHeld {
                    tile: coord,
                    resource,
                    amount: held,
                });
                info!(x = coord.x(), y = coord.y(), %resource, held, "output held in building");
            }
        }
    }

    fn stall(&mut self, coord: TileCoord, ctx: &mut TickContext<'_>, reason: StallReason) {
        self.state = ProcessingState::Idle;
        ctx.report_stall(&mut self.throttle, coord, BuildingKind::Processing, reason);
    }
}

fn output_slot(
    grid: &Grid,
    owner: Owner,
    from: TileCoord,
    resource: ResourceKind,
    amount: u32,
) -> Option<TileCoord> {
    grid.nearest_deposit(owner, from, |deposit| deposit.can_accept(resource, amount))
}

/// Reports whether every source still holds what was requested from it.
fn sources_hold(grid: &Grid, owner: Owner, inputs: &[InputRequest]) -> bool {
    let mut needed: BTreeMap<(TileCoord, ResourceKind), u32> = BTreeMap::new();
    for input in inputs {
        *needed.entry((input.source, input.resource)).or_insert(0) += input.amount;
    }
    needed.into_iter().all(|((source, resource), amount)| {
        grid.tile(source)
            .filter(|tile| tile.is_owned_by(owner))
            .and_then(|tile| tile.deposit())
            .is_some_and(|deposit| deposit.stock(resource) >= amount)
    })
}
