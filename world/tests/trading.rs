use std::time::Duration;

use tile_tycoon_core::{
    BuildingKind, Command, CommandError, Event, OpponentId, Owner, ResourceKind, TileCoord,
};
use tile_tycoon_system_market::{Market, MarketTuning};
use tile_tycoon_system_pricing::{PriceManager, PricingTuning};
use tile_tycoon_world::{self as world, query, Economy, World, WorldTuning};

const PLAYER_STORE: TileCoord = TileCoord::new(0, 0);
const SHOP: TileCoord = TileCoord::new(1, 0);
const RIVAL_STORE: TileCoord = TileCoord::new(5, 5);

fn rival() -> Owner {
    Owner::Opponent(OpponentId::new(0))
}

fn setup() -> (World, Economy) {
    let mut world = World::empty(6, 6, WorldTuning::default());
    world.open_account(Owner::Player, 1_000);
    world.open_account(rival(), 1_000);
    for (coord, owner) in [
        (PLAYER_STORE, Owner::Player),
        (SHOP, Owner::Player),
        (RIVAL_STORE, rival()),
    ] {
        world.grant_tile(coord, owner).expect("in bounds");
    }
    world
        .place_building(PLAYER_STORE, BuildingKind::Deposit)
        .expect("deposit");
    world
        .place_building(SHOP, BuildingKind::Commerce)
        .expect("commerce");
    world
        .place_building(RIVAL_STORE, BuildingKind::Deposit)
        .expect("deposit");
    world
        .stock_deposit(PLAYER_STORE, ResourceKind::Wood, 30)
        .expect("room");

    let economy = Economy::new(
        Market::new(MarketTuning::default(), 3),
        PriceManager::new(PricingTuning::default()),
    );
    (world, economy)
}

fn run(
    world: &mut World,
    economy: &mut Economy,
    command: Command,
) -> (Result<(), CommandError>, Vec<Event>) {
    let mut events = Vec::new();
    let result = world::apply(world, economy, command, &mut events);
    (result, events)
}

fn post_wood(world: &mut World, economy: &mut Economy, amount: u32) -> Result<(), CommandError> {
    run(
        world,
        economy,
        Command::SetupCommerceTrade {
            actor: Owner::Player,
            tile: SHOP,
            resource: ResourceKind::Wood,
            amount,
            unit_price: 5.0,
        },
    )
    .0
}

fn rival_buys(
    world: &mut World,
    economy: &mut Economy,
    amount: Option<u32>,
) -> Result<(), CommandError> {
    run(
        world,
        economy,
        Command::BuyFromCommerce {
            buyer: rival(),
            tile: SHOP,
            amount,
        },
    )
    .0
}

#[test]
fn posting_escrows_goods_and_announces_the_offer() {
    let (mut world, mut economy) = setup();
    assert_eq!(post_wood(&mut world, &mut economy, 20), Ok(()));
    assert_eq!(
        query::total_stock(&world, Owner::Player, ResourceKind::Wood),
        10
    );
    let listings = query::commerce_offers(&world);
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].seller, Owner::Player);
    assert_eq!(listings[0].offer.amount, 20);

    assert_eq!(
        post_wood(&mut world, &mut economy, 5),
        Err(CommandError::OfferActive)
    );

    let (_, quiet) = run(
        &mut world,
        &mut economy,
        Command::Tick {
            dt: Duration::from_secs(2),
        },
    );
    assert!(quiet
        .iter()
        .all(|event| !matches!(event, Event::CommerceOfferAvailable { .. })));
    let (_, events) = run(
        &mut world,
        &mut economy,
        Command::Tick {
            dt: Duration::from_secs(1),
        },
    );
    assert!(events.contains(&Event::CommerceOfferAvailable {
        tile: SHOP,
        seller: Owner::Player,
        resource: ResourceKind::Wood,
        amount: 20,
        unit_price: 5.0,
    }));
}

#[test]
fn posting_more_than_stocked_fails() {
    let (mut world, mut economy) = setup();
    assert_eq!(
        post_wood(&mut world, &mut economy, 31),
        Err(CommandError::NoEligibleTarget)
    );
    assert_eq!(
        query::total_stock(&world, Owner::Player, ResourceKind::Wood),
        30
    );
    assert_eq!(
        post_wood(&mut world, &mut economy, 0),
        Err(CommandError::InvalidAmount)
    );
}

#[test]
fn partial_purchase_moves_money_and_goods() {
    let (mut world, mut economy) = setup();
    post_wood(&mut world, &mut economy, 20).expect("stocked");

    assert_eq!(rival_buys(&mut world, &mut economy, Some(10)), Ok(()));
    assert_eq!(query::money(&world, rival()), 950);
    assert_eq!(query::money(&world, Owner::Player), 1_050);
    assert_eq!(query::total_stock(&world, rival(), ResourceKind::Wood), 10);
    assert_eq!(
        query::commerce_offers(&world)
            .first()
            .map(|listing| listing.offer.amount),
        Some(10)
    );

    let (result, events) = run(
        &mut world,
        &mut economy,
        Command::BuyFromCommerce {
            buyer: rival(),
            tile: SHOP,
            amount: None,
        },
    );
    assert_eq!(result, Ok(()));
    assert!(events.contains(&Event::CommerceOfferCleared { tile: SHOP }));
    assert!(query::commerce_offers(&world).is_empty());
    assert_eq!(
        rival_buys(&mut world, &mut economy, Some(1)),
        Err(CommandError::StaleOffer)
    );
}

#[test]
fn sellers_cannot_buy_their_own_offer() {
    let (mut world, mut economy) = setup();
    post_wood(&mut world, &mut economy, 20).expect("stocked");
    let (result, _) = run(
        &mut world,
        &mut economy,
        Command::BuyFromCommerce {
            buyer: Owner::Player,
            tile: SHOP,
            amount: Some(1),
        },
    );
    assert_eq!(result, Err(CommandError::InvalidLocation));
}

#[test]
fn purchase_needs_funds_and_storage() {
    let (mut world, mut economy) = setup();
    post_wood(&mut world, &mut economy, 20).expect("stocked");

    world.open_account(rival(), 40);
    assert_eq!(
        rival_buys(&mut world, &mut economy, Some(10)),
        Err(CommandError::InsufficientFunds {
            required: 50,
            available: 40,
        })
    );

    world.open_account(rival(), 1_000);
    for resource in [ResourceKind::Stone, ResourceKind::Clay, ResourceKind::Coal] {
        world.stock_deposit(RIVAL_STORE, resource, 1).expect("room");
    }
    assert_eq!(
        rival_buys(&mut world, &mut economy, Some(10)),
        Err(CommandError::CapacityExceeded)
    );
    assert_eq!(query::money(&world, rival()), 1_000);
    assert_eq!(
        query::commerce_offers(&world)
            .first()
            .map(|listing| listing.offer.amount),
        Some(20)
    );
}

#[test]
fn reset_returns_unsold_goods() {
    let (mut world, mut economy) = setup();
    post_wood(&mut world, &mut economy, 20).expect("stocked");
    rival_buys(&mut world, &mut economy, Some(5)).expect("affordable");

    let (result, events) = run(
        &mut world,
        &mut economy,
        Command::ResetCommerce {
            actor: Owner::Player,
            tile: SHOP,
        },
    );
    assert_eq!(result, Ok(()));
    assert_eq!(events, vec![Event::CommerceOfferCleared { tile: SHOP }]);
    assert_eq!(
        query::total_stock(&world, Owner::Player, ResourceKind::Wood),
        25
    );

    let (again, quiet) = run(
        &mut world,
        &mut economy,
        Command::ResetCommerce {
            actor: Owner::Player,
            tile: SHOP,
        },
    );
    assert_eq!(again, Ok(()));
    assert!(quiet.is_empty());
}

#[test]
fn market_sales_and_purchases_settle_against_the_ledger() {
    let (mut world, mut economy) = setup();
    let (result, events) = run(
        &mut world,
        &mut economy,
        Command::SellDepositResource {
            actor: Owner::Player,
            tile: PLAYER_STORE,
            resource: ResourceKind::Wood,
            amount: 10,
        },
    );
    assert_eq!(result, Ok(()));
    let revenue = events
        .iter()
        .find_map(|event| match event {
            Event::ResourcesSold { revenue, .. } => Some(*revenue),
            _ => None,
        })
        .expect("sale event");
    assert!(revenue > 0);
    assert_eq!(query::money(&world, Owner::Player), 1_000 + revenue);
    assert_eq!(
        run(
            &mut world,
            &mut economy,
            Command::SellDepositResource {
                actor: Owner::Player,
                tile: PLAYER_STORE,
                resource: ResourceKind::Wood,
                amount: 21,
            },
        )
        .0,
        Err(CommandError::InvalidAmount)
    );

    let (bought, events) = run(
        &mut world,
        &mut economy,
        Command::BuyFromMarket {
            actor: Owner::Player,
            resource: ResourceKind::Coal,
            amount: 5,
        },
    );
    assert_eq!(bought, Ok(()));
    let (amount, cost) = events
        .iter()
        .find_map(|event| match event {
            Event::ResourcesBought { amount, cost, .. } => Some((*amount, *cost)),
            _ => None,
        })
        .expect("purchase event");
    assert_eq!(amount, 5);
    assert_eq!(
        query::total_stock(&world, Owner::Player, ResourceKind::Coal),
        5
    );
    assert_eq!(query::money(&world, Owner::Player), 1_000 + revenue - cost);
}

#[test]
fn autosell_and_liquidation_run_on_the_cadence() {
    let (mut world, mut economy) = setup();
    world
        .stock_deposit(RIVAL_STORE, ResourceKind::Stone, 12)
        .expect("room");
    world
        .stock_deposit(RIVAL_STORE, ResourceKind::Clay, 3)
        .expect("room");
    let (result, _) = run(
        &mut world,
        &mut economy,
        Command::SetAutosell {
            actor: Owner::Player,
            tile: PLAYER_STORE,
            resource: ResourceKind::Wood,
            enabled: true,
        },
    );
    assert_eq!(result, Ok(()));

    let (_, early) = run(
        &mut world,
        &mut economy,
        Command::Tick {
            dt: Duration::from_secs(4),
        },
    );
    assert!(early
        .iter()
        .all(|event| !matches!(event, Event::ResourcesSold { .. })));

    let (_, events) = run(
        &mut world,
        &mut economy,
        Command::Tick {
            dt: Duration::from_secs(1),
        },
    );
    let sold: Vec<(Owner, ResourceKind, u32)> = events
        .iter()
        .filter_map(|event| match event {
            Event::ResourcesSold {
                owner,
                resource,
                amount,
                ..
            } => Some((*owner, *resource, *amount)),
            _ => None,
        })
        .collect();
    assert_eq!(
        sold,
        vec![
            (Owner::Player, ResourceKind::Wood, 30),
            (rival(), ResourceKind::Stone, 12),
        ]
    );
    assert_eq!(query::total_stock(&world, rival(), ResourceKind::Clay), 3);
    assert!(query::money(&world, Owner::Player) > 1_000);
}
