use std::time::Duration;

use tile_tycoon_core::{
    BuildingKind, Command, CommandError, Event, OpponentId, Owner, RecipeId, ResourceKind,
    TileCoord,
};
use tile_tycoon_system_market::{Market, MarketTuning};
use tile_tycoon_system_pricing::{PriceManager, PricingTuning};
use tile_tycoon_world::{
    self as world, query, Economy, Processing, ProcessingState, World, WorldTuning,
};

fn economy() -> Economy {
    Economy::new(
        Market::new(MarketTuning::default(), 0xfeed),
        PriceManager::new(PricingTuning::default()),
    )
}

fn tick(world: &mut World, economy: &mut Economy, dt: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, economy, Command::Tick { dt }, &mut events).expect("ticks never fail");
    events
}

fn deposit_stock(world: &World, coord: TileCoord, resource: ResourceKind) -> u32 {
    query::tile(world, coord)
        .and_then(|tile| tile.deposit())
        .map_or(0, |deposit| deposit.stock(resource))
}

#[test]
fn opponent_buys_adjacent_iron_tile() {
    let ai = Owner::Opponent(OpponentId::new(0));
    let target = TileCoord::new(5, 5);
    let mut world = World::empty(10, 10, WorldTuning::default());
    let mut economy = economy();
    world
        .seed_tile(target, Some(ResourceKind::IronOre), 3, 100)
        .expect("in bounds");
    world.open_account(ai, 1_000);
    world.grant_tile(TileCoord::new(5, 4), ai).expect("in bounds");

    let mut events = Vec::new();
    let result = world::apply(
        &mut world,
        &mut economy,
        Command::BuyTile {
            actor: ai,
            tile: target,
        },
        &mut events,
    );

    assert_eq!(result, Ok(()));
    let tile = query::tile(&world, target).expect("tile");
    assert_eq!(tile.owner().map(|owner| owner.to_string()).as_deref(), Some("ai_0"));
    assert!(tile.is_surveyed());
    assert_eq!(query::money(&world, ai), 900);
    assert_eq!(
        events,
        vec![Event::TilePurchased {
            owner: ai,
            tile: target,
            cost: 100,
        }]
    );
}

#[test]
fn last_unit_depletes_tile_and_removes_collection() {
    let collector = TileCoord::new(2, 2);
    let store = TileCoord::new(4, 2);
    let mut world = World::empty(8, 8, WorldTuning::default());
    let mut economy = economy();
    world
        .seed_tile(collector, Some(ResourceKind::IronOre), 1, 100)
        .expect("in bounds");
    for coord in [collector, store] {
        world.grant_tile(coord, Owner::Player).expect("in bounds");
    }
    world
        .place_building(store, BuildingKind::Deposit)
        .expect("deposit");
    world
        .place_building(collector, BuildingKind::Collection)
        .expect("collection");

    let binding = tick(&mut world, &mut economy, Duration::ZERO);
    assert!(binding
        .iter()
        .all(|event| !matches!(event, Event::ProductionStalled { .. })));
    let collection = query::tile(&world, collector).and_then(|tile| tile.collection().cloned());
    assert_eq!(collection.and_then(|collection| collection.target()), Some(store));

    let events = tick(&mut world, &mut economy, Duration::from_secs(2));

    assert!(events.contains(&Event::ResourceCollected {
        tile: collector,
        resource: ResourceKind::IronOre,
        remaining_durability: 0,
    }));
    assert!(events.contains(&Event::ResourceDepleted {
        tile: collector,
        resource: ResourceKind::IronOre,
        stranded: 1,
    }));
    let tile = query::tile(&world, collector).expect("tile");
    assert_eq!(tile.resource(), None);
    assert_eq!(tile.durability(), 0);
    assert!(tile.building().is_none());

    let later = tick(&mut world, &mut economy, Duration::from_secs(5));
    assert!(later
        .iter()
        .all(|event| !matches!(event, Event::ResourceDelivered { .. })));
    assert_eq!(deposit_stock(&world, store, ResourceKind::IronOre), 0);
}

#[test]
fn collection_delivers_after_transport() {
    let collector = TileCoord::new(1, 1);
    let store = TileCoord::new(1, 3);
    let mut world = World::empty(5, 5, WorldTuning::default());
    let mut economy = economy();
    world
        .seed_tile(collector, Some(ResourceKind::Wood), 50, 100)
        .expect("in bounds");
    for coord in [collector, store] {
        world.grant_tile(coord, Owner::Player).expect("in bounds");
    }
    world.place_building(store, BuildingKind::Deposit).expect("deposit");
    world
        .place_building(collector, BuildingKind::Collection)
        .expect("collection");

    let _ = tick(&mut world, &mut economy, Duration::ZERO);
    let _ = tick(&mut world, &mut economy, Duration::from_secs(2));
    assert_eq!(deposit_stock(&world, store, ResourceKind::Wood), 0);
    let events = tick(&mut world, &mut economy, Duration::from_secs(1));

    assert!(events.contains(&Event::ResourceDelivered {
        from: collector,
        deposit: store,
        resource: ResourceKind::Wood,
        amount: 1,
    }));
    assert_eq!(deposit_stock(&world, store, ResourceKind::Wood), 1);
    assert_eq!(query::tile(&world, collector).map(|tile| tile.durability()), Some(49));
}

#[test]
fn collection_without_deposit_idles_and_signals_once() {
    let collector = TileCoord::new(0, 0);
    let mut world = World::empty(3, 3, WorldTuning::default());
    let mut economy = economy();
    world
        .seed_tile(collector, Some(ResourceKind::Stone), 10, 100)
        .expect("in bounds");
    world.grant_tile(collector, Owner::Player).expect("in bounds");
    world
        .place_building(collector, BuildingKind::Collection)
        .expect("collection");

    let mut stalls = 0;
    for _ in 0..18 {
        stalls += tick(&mut world, &mut economy, Duration::from_millis(500))
            .iter()
            .filter(|event| matches!(event, Event::ProductionStalled { .. }))
            .count();
    }

    assert_eq!(stalls, 1, "stall signals are rate limited");
    assert_eq!(query::tile(&world, collector).map(|tile| tile.durability()), Some(10));
}

#[test]
fn processing_cycle_conserves_resources() {
    let ore_store = TileCoord::new(1, 2);
    let plant = TileCoord::new(2, 2);
    let coal_store = TileCoord::new(3, 2);
    let mut world = World::empty(6, 6, WorldTuning::default());
    let mut economy = economy();
    for coord in [ore_store, plant, coal_store] {
        world.grant_tile(coord, Owner::Player).expect("in bounds");
    }
    world.place_building(ore_store, BuildingKind::Deposit).expect("deposit");
    world.place_building(coal_store, BuildingKind::Deposit).expect("deposit");
    world.place_building(plant, BuildingKind::Processing).expect("processing");
    world
        .stock_deposit(ore_store, ResourceKind::IronOre, 1)
        .expect("room");
    world.stock_deposit(coal_store, ResourceKind::Coal, 1).expect("room");

    let mut events = Vec::new();
    world::apply(
        &mut world,
        &mut economy,
        Command::SetProcessingRecipe {
            actor: Owner::Player,
            tile: plant,
            recipe: Some(RecipeId::IronIngot),
        },
        &mut events,
    )
    .expect("idle plant accepts a recipe");

    let mut delivered = false;
    let mut started_at = None;
    let mut completed_at = None;
    for step in 0..100u32 {
        let events = tick(&mut world, &mut economy, Duration::from_millis(500));
        for event in &events {
            match event {
                Event::ProcessingStarted { .. } => started_at = Some(step),
                Event::ProcessingCompleted { .. } => completed_at = Some(step),
                Event::OutputDelivered { .. } => delivered = true,
                _ => {}
            }
        }
        if delivered {
            break;
        }
    }

    assert!(delivered, "the cycle should finish");
    let (Some(started), Some(completed)) = (started_at, completed_at) else {
        panic!("processing should start and complete");
    };
    assert_eq!(completed - started, 16, "eight seconds of processing");
    assert_eq!(deposit_stock(&world, ore_store, ResourceKind::IronOre), 0);
    assert_eq!(deposit_stock(&world, coal_store, ResourceKind::Coal), 0);
    assert_eq!(
        query::total_stock(&world, Owner::Player, ResourceKind::IronIngot),
        1
    );
    let state = query::tile(&world, plant)
        .and_then(|tile| tile.processing())
        .map(|processing| processing.state().clone());
    assert_eq!(state, Some(ProcessingState::Idle));
}

#[test]
fn processing_aborts_when_inputs_vanish() {
    let store = TileCoord::new(0, 0);
    let plant = TileCoord::new(3, 0);
    let mut world = World::empty(5, 1, WorldTuning::default());
    let mut economy = economy();
    for coord in [store, plant] {
        world.grant_tile(coord, Owner::Player).expect("in bounds");
    }
    world.place_building(store, BuildingKind::Deposit).expect("deposit");
    world.place_building(plant, BuildingKind::Processing).expect("processing");
    world.stock_deposit(store, ResourceKind::Wood, 1).expect("room");

    let mut events = Vec::new();
    world::apply(
        &mut world,
        &mut economy,
        Command::SetProcessingRecipe {
            actor: Owner::Player,
            tile: plant,
            recipe: Some(RecipeId::Planks),
        },
        &mut events,
    )
    .expect("recipe");
    let _ = tick(&mut world, &mut economy, Duration::from_millis(100));

    world::apply(
        &mut world,
        &mut economy,
        Command::SellDepositResource {
            actor: Owner::Player,
            tile: store,
            resource: ResourceKind::Wood,
            amount: 1,
        },
        &mut events,
    )
    .expect("wood in stock");
    let events = tick(&mut world, &mut economy, Duration::from_millis(100));

    assert!(events.iter().any(|event| matches!(
        event,
        Event::ProductionStalled {
            reason: tile_tycoon_core::StallReason::InputsWithdrawn,
            ..
        }
    )));
    let idle = query::tile(&world, plant)
        .and_then(|tile| tile.processing())
        .is_some_and(|processing| processing.is_idle());
    assert!(idle);
}

#[test]
fn rejected_commands_leave_state_untouched() {
    let home = TileCoord::new(1, 1);
    let empty = TileCoord::new(1, 2);
    let mut world = World::empty(4, 4, WorldTuning::default());
    let mut economy = economy();
    world.open_account(Owner::Player, 500);
    world.grant_tile(home, Owner::Player).expect("in bounds");
    world.grant_tile(empty, Owner::Player).expect("in bounds");
    world.place_building(home, BuildingKind::Central).expect("central");
    let before = query::stats(&world, Owner::Player);

    let attempts = [
        (
            Command::BuyTile {
                actor: Owner::Player,
                tile: home,
            },
            CommandError::InvalidLocation,
        ),
        (
            Command::Build {
                actor: Owner::Player,
                tile: empty,
                kind: BuildingKind::Collection,
            },
            CommandError::InvalidLocation,
        ),
        (
            Command::Build {
                actor: Owner::Player,
                tile: home,
                kind: BuildingKind::Deposit,
            },
            CommandError::InvalidLocation,
        ),
        (
            Command::Build {
                actor: Owner::Player,
                tile: TileCoord::new(3, 3),
                kind: BuildingKind::Deposit,
            },
            CommandError::NotOwner,
        ),
        (
            Command::SurveyTile {
                actor: Owner::Player,
                tile: home,
            },
            CommandError::InvalidLocation,
        ),
    ];

    for (command, expected) in attempts {
        for _ in 0..2 {
            let mut events = Vec::new();
            let result = world::apply(&mut world, &mut economy, command.clone(), &mut events);
            assert_eq!(result, Err(expected));
            assert_eq!(query::stats(&world, Owner::Player), before);
        }
    }
    assert_eq!(
        query::tile(&world, empty).and_then(|tile| tile.building_kind()),
        None
    );
}

#[test]
fn costs_follow_the_price_manager() {
    let home = TileCoord::new(0, 0);
    let mut world = World::empty(3, 3, WorldTuning::default());
    let mut economy = economy();
    world.open_account(Owner::Player, 1_000);
    world.grant_tile(home, Owner::Player).expect("in bounds");

    let busy = tile_tycoon_system_pricing::EconomicIndicators {
        total_money_generated: 1_000_000,
        buildings: 50,
        tiles_owned: 100,
        tiles_surveyed: 40,
        difficulty: tile_tycoon_core::Difficulty::Hard,
    };
    for _ in 0..20 {
        let _ = economy.pricing.update(Duration::from_secs(10), &busy);
    }
    let cost = economy.pricing.building_cost(BuildingKind::Deposit);
    assert!(cost > 100);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        &mut economy,
        Command::Build {
            actor: Owner::Player,
            tile: home,
            kind: BuildingKind::Deposit,
        },
        &mut events,
    )
    .expect("affordable");
    assert_eq!(query::money(&world, Owner::Player), 1_000 - cost);
    assert_eq!(query::stats(&world, Owner::Player).buildings_built, 1);
}

fn planks_plant(
    world: &mut World,
    economy: &mut Economy,
    stores: &[TileCoord],
    plant: TileCoord,
) {
    world.open_account(Owner::Player, 0);
    for coord in stores.iter().chain([&plant]) {
        world.grant_tile(*coord, Owner::Player).expect("in bounds");
    }
    for store in stores {
        world.place_building(*store, BuildingKind::Deposit).expect("deposit");
    }
    world.place_building(plant, BuildingKind::Processing).expect("processing");
    world.stock_deposit(stores[0], ResourceKind::Wood, 1).expect("room");

    let mut events = Vec::new();
    world::apply(
        world,
        economy,
        Command::SetProcessingRecipe {
            actor: Owner::Player,
            tile: plant,
            recipe: Some(RecipeId::Planks),
        },
        &mut events,
    )
    .expect("idle plant accepts a recipe");
}

fn processing_at(world: &World, coord: TileCoord) -> Processing {
    query::tile(world, coord)
        .and_then(|tile| tile.processing())
        .cloned()
        .expect("processing building")
}

fn run_until_started(world: &mut World, economy: &mut Economy) {
    for _ in 0..20 {
        let events = tick(world, economy, Duration::from_millis(500));
        if events
            .iter()
            .any(|event| matches!(event, Event::ProcessingStarted { .. }))
        {
            return;
        }
    }
    panic!("processing should start");
}

#[test]
fn output_reroutes_when_its_deposit_fills_up() {
    let near = TileCoord::new(2, 0);
    let plant = TileCoord::new(3, 0);
    let far = TileCoord::new(5, 0);
    let mut world = World::empty(6, 1, WorldTuning::default());
    let mut economy = economy();
    planks_plant(&mut world, &mut economy, &[near, far], plant);

    run_until_started(&mut world, &mut economy);
    world
        .stock_deposit(near, ResourceKind::Stone, 100)
        .expect("inputs left the deposit empty");

    let mut delivered = Vec::new();
    for _ in 0..20 {
        for event in tick(&mut world, &mut economy, Duration::from_millis(500)) {
            match event {
                Event::OutputDelivered { .. } => delivered.push(event),
                Event::OutputHeld { .. } => panic!("the far deposit has room"),
                _ => {}
            }
        }
        if !delivered.is_empty() {
            break;
        }
    }

    assert_eq!(
        delivered,
        vec![Event::OutputDelivered {
            tile: plant,
            deposit: far,
            resource: ResourceKind::Planks,
            amount: 2,
        }]
    );
    assert_eq!(deposit_stock(&world, far, ResourceKind::Planks), 2);
    assert_eq!(deposit_stock(&world, near, ResourceKind::Planks), 0);
    assert_eq!(deposit_stock(&world, near, ResourceKind::Stone), 100);
}

#[test]
fn output_without_room_is_held_and_flushed_first() {
    let store = TileCoord::new(2, 0);
    let plant = TileCoord::new(3, 0);
    let mut world = World::empty(5, 1, WorldTuning::default());
    let mut economy = economy();
    planks_plant(&mut world, &mut economy, &[store], plant);

    run_until_started(&mut world, &mut economy);
    world
        .stock_deposit(store, ResourceKind::Stone, 100)
        .expect("inputs left the deposit empty");

    let mut held = None;
    for _ in 0..20 {
        let events = tick(&mut world, &mut economy, Duration::from_millis(500));
        held = events
            .into_iter()
            .find(|event| matches!(event, Event::OutputHeld { .. }));
        if held.is_some() {
            break;
        }
    }
    assert_eq!(
        held,
        Some(Event::OutputHeld {
            tile: plant,
            resource: ResourceKind::Planks,
            amount: 2,
        })
    );
    let plant_state = processing_at(&world, plant);
    assert_eq!(plant_state.held_output(), Some((ResourceKind::Planks, 2)));
    assert!(plant_state.is_idle());

    let mut events = Vec::new();
    world::apply(
        &mut world,
        &mut economy,
        Command::SellDepositResource {
            actor: Owner::Player,
            tile: store,
            resource: ResourceKind::Stone,
            amount: 10,
        },
        &mut events,
    )
    .expect("stone in stock");
    world.stock_deposit(store, ResourceKind::Wood, 1).expect("room");

    let mut order = Vec::new();
    for _ in 0..10 {
        for event in tick(&mut world, &mut economy, Duration::from_millis(500)) {
            match event {
                Event::OutputDelivered {
                    deposit, amount, ..
                } => order.push(("delivered", deposit, amount)),
                Event::ProcessingStarted { .. } => order.push(("started", plant, 0)),
                _ => {}
            }
        }
    }
    assert_eq!(order.first(), Some(&("delivered", store, 2)));
    assert_eq!(processing_at(&world, plant).held_output(), None);
    assert!(deposit_stock(&world, store, ResourceKind::Planks) >= 2);
}
