use std::time::Duration;

use proptest::prelude::*;
use tile_tycoon_core::{BuildingKind, Difficulty};
use tile_tycoon_system_pricing::{EconomicIndicators, PriceManager, PricingTuning};

fn difficulty() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Normal),
        Just(Difficulty::Hard),
    ]
}

fn indicators() -> impl Strategy<Value = EconomicIndicators> {
    (
        0i64..1_000_000_000_000,
        0usize..5_000,
        0usize..5_000,
        0usize..5_000,
        difficulty(),
    )
        .prop_map(
            |(total_money_generated, buildings, tiles_owned, tiles_surveyed, difficulty)| {
                EconomicIndicators {
                    total_money_generated,
                    buildings,
                    tiles_owned,
                    tiles_surveyed,
                    difficulty,
                }
            },
        )
}

proptest! {
    #[test]
    fn multipliers_stay_within_bounds(
        steps in prop::collection::vec((0u64..120_000, indicators()), 1..200)
    ) {
        let tuning = PricingTuning::default();
        let mut prices = PriceManager::new(tuning.clone());
        for (millis, indicators) in steps {
            let _ = prices.update(Duration::from_millis(millis), &indicators);
            for multiplier in [
                prices.survey_multiplier(),
                prices.tile_cost_multiplier(),
                prices.building_multiplier(),
            ] {
                prop_assert!(multiplier >= tuning.min_multiplier);
                prop_assert!(multiplier <= tuning.max_multiplier);
            }
            prop_assert!(prices.survey_multiplier() <= prices.tile_cost_multiplier());
            prop_assert!(prices.tile_cost_multiplier() <= prices.building_multiplier());
        }
    }
}

#[test]
fn runaway_economy_is_damped() {
    let mut small = PriceManager::new(PricingTuning::default());
    let mut huge = PriceManager::new(PricingTuning::default());
    let tick = Duration::from_secs(10);

    let _ = small.update(
        tick,
        &EconomicIndicators {
            total_money_generated: 10_000,
            ..EconomicIndicators::default()
        },
    );
    let _ = huge.update(
        tick,
        &EconomicIndicators {
            total_money_generated: 10_000_000,
            ..EconomicIndicators::default()
        },
    );

    let small_step = small.building_multiplier() - 1.0;
    let huge_step = huge.building_multiplier() - 1.0;
    assert!(huge_step > small_step);
    assert!(huge_step < small_step * 10.0, "growth must stay logarithmic");
}

#[test]
fn long_games_reach_the_ceiling() {
    let tuning = PricingTuning::default();
    let mut prices = PriceManager::new(tuning.clone());
    let busy = EconomicIndicators {
        total_money_generated: 5_000_000,
        buildings: 400,
        tiles_owned: 900,
        tiles_surveyed: 600,
        difficulty: Difficulty::Hard,
    };
    for _ in 0..2_000 {
        let _ = prices.update(Duration::from_secs(10), &busy);
    }
    assert_eq!(prices.building_multiplier(), tuning.max_multiplier);
    assert_eq!(prices.building_cost(BuildingKind::Commerce), 1_500);
}
