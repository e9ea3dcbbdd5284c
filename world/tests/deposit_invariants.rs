use std::time::Duration;

use proptest::prelude::*;
use tile_tycoon_core::{BuildingKind, Command, Owner, ResourceKind, TileCoord};
use tile_tycoon_system_market::{Market, MarketTuning};
use tile_tycoon_system_pricing::{PriceManager, PricingTuning};
use tile_tycoon_world::{self as world, query, Economy, World, WorldTuning};

const STORES: [TileCoord; 2] = [TileCoord::new(0, 0), TileCoord::new(3, 0)];
const MINE: TileCoord = TileCoord::new(1, 0);

#[derive(Clone, Debug)]
enum Op {
    Stock(usize, TileCoord, u32),
    Sell(usize, TileCoord, u32),
    Buy(usize, u32),
    Autosell(usize, bool),
    Tick(u64),
}

fn op() -> impl Strategy<Value = Op> {
    let resource = 0..ResourceKind::ALL.len();
    let store = prop::sample::select(STORES.to_vec());
    prop_oneof![
        (resource.clone(), store.clone(), 0u32..60).prop_map(|(r, s, a)| Op::Stock(r, s, a)),
        (resource.clone(), store, 1u32..30).prop_map(|(r, s, a)| Op::Sell(r, s, a)),
        (resource.clone(), 1u32..40).prop_map(|(r, a)| Op::Buy(r, a)),
        (resource, any::<bool>()).prop_map(|(r, on)| Op::Autosell(r, on)),
        (100u64..3_000).prop_map(Op::Tick),
    ]
}

fn setup() -> (World, Economy) {
    let mut world = World::empty(5, 1, WorldTuning::default());
    world.open_account(Owner::Player, 5_000);
    world
        .seed_tile(MINE, Some(ResourceKind::Clay), 500, 100)
        .expect("in bounds");
    for coord in [STORES[0], MINE, STORES[1]] {
        world.grant_tile(coord, Owner::Player).expect("in bounds");
    }
    for store in STORES {
        world
            .place_building(store, BuildingKind::Deposit)
            .expect("deposit");
    }
    world
        .place_building(MINE, BuildingKind::Collection)
        .expect("collection");
    let economy = Economy::new(
        Market::new(MarketTuning::default(), 11),
        PriceManager::new(PricingTuning::default()),
    );
    (world, economy)
}

proptest! {
    #[test]
    fn deposits_never_exceed_capacity_or_type_limit(ops in prop::collection::vec(op(), 1..60)) {
        let (mut world, mut economy) = setup();
        let tuning = query::tuning(&world).clone();
        let mut events = Vec::new();

        for op in ops {
            let money_before = query::money(&world, Owner::Player);
            match op {
                Op::Stock(resource, store, amount) => {
                    let _ = world.stock_deposit(store, ResourceKind::ALL[resource], amount);
                }
                Op::Sell(resource, tile, amount) => {
                    let _ = world::apply(&mut world, &mut economy, Command::SellDepositResource {
                        actor: Owner::Player,
                        tile,
                        resource: ResourceKind::ALL[resource],
                        amount,
                    }, &mut events);
                }
                Op::Buy(resource, amount) => {
                    let result = world::apply(&mut world, &mut economy, Command::BuyFromMarket {
                        actor: Owner::Player,
                        resource: ResourceKind::ALL[resource],
                        amount,
                    }, &mut events);
                    if result.is_err() {
                        prop_assert_eq!(query::money(&world, Owner::Player), money_before);
                    }
                }
                Op::Autosell(resource, enabled) => {
                    let _ = world::apply(&mut world, &mut economy, Command::SetAutosell {
                        actor: Owner::Player,
                        tile: STORES[resource % STORES.len()],
                        resource: ResourceKind::ALL[resource],
                        enabled,
                    }, &mut events);
                }
                Op::Tick(millis) => {
                    let _ = world::apply(&mut world, &mut economy, Command::Tick {
                        dt: Duration::from_millis(millis),
                    }, &mut events);
                }
            }

            prop_assert!(query::money(&world, Owner::Player) >= 0);
            for store in STORES {
                let deposit = query::tile(&world, store).and_then(|tile| tile.deposit());
                prop_assert!(deposit.is_some());
                if let Some(deposit) = deposit {
                    prop_assert!(deposit.total() <= tuning.deposit_capacity);
                    prop_assert!(deposit.resources().count() <= tuning.deposit_max_types);
                    prop_assert!(deposit.resources().all(|(_, amount)| amount > 0));
                }
            }
        }
    }
}
