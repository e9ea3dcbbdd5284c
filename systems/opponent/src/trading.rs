use std::collections::BTreeMap;

use rand::Rng;
use tile_tycoon_core::{Money, RecipeId, ResourceKind};
use tile_tycoon_world::Offer;

use crate::tuning::OpponentTuning;

const BARGAIN_RATIO: f64 = 0.9;
const FAIR_RATIO: f64 = 1.1;
const STEEP_RATIO: f64 = 1.3;
const FAIR_ODDS: f64 = 0.7;
const STEEP_ODDS: f64 = 0.3;
const RECIPE_INPUT_ODDS: f64 = 0.5;
const BASELINE_ODDS: f64 = 0.1;

/// Decides whether an opponent buys into an offer.
///
/// The price ladder compares the unit price with the market price. Offers
/// below 90% of it are always taken. Up to 110% they are taken 70% of the time
/// and up to 130% 30% of the time. Dearer goods are bought half the time when
/// they feed one of the buyer's active recipes and one time in ten otherwise.
///
/// Two checks run before the ladder and refuse outright: a buyer whose money
/// does not cover a single unit, and a market price that is not positive.
pub fn decides_to_buy<R: Rng + ?Sized>(
    offer: &Offer,
    market_price: f64,
    money: Money,
    feeds_recipe: bool,
    rng: &mut R,
) -> bool {
    if (money as f64) < offer.unit_price || market_price.is_nan() || market_price <= 0.0 {
        return false;
    }
    let ratio = offer.unit_price / market_price;
    if ratio < BARGAIN_RATIO {
        return true;
    }
    if ratio < FAIR_RATIO {
        return rng.gen_bool(FAIR_ODDS);
    }
    if ratio < STEEP_RATIO {
        return rng.gen_bool(STEEP_ODDS);
    }
    if feeds_recipe {
        return rng.gen_bool(RECIPE_INPUT_ODDS);
    }
    rng.gen_bool(BASELINE_ODDS)
}

/// Units of an offer the buyer can pay for and store, capped per purchase.
pub(crate) fn purchase_amount(offer: &Offer, money: Money, room: u32, cap: u32) -> u32 {
    let mut amount = offer.amount.min(room).min(cap);
    while amount > 0 && offer.total(amount) > money {
        amount -= 1;
    }
    amount
}

/// Highest-scoring recipe whose inputs are all in stock.
///
/// Scores are output value per second times output amount, boosted for the
/// top tier of goods.
pub(crate) fn best_recipe(
    stockpile: &BTreeMap<ResourceKind, u32>,
    price: impl Fn(ResourceKind) -> f64,
    tuning: &OpponentTuning,
) -> Option<RecipeId> {
    let top_tier = ResourceKind::ALL
        .iter()
        .map(|resource| resource.tier())
        .max()
        .unwrap_or(0);
    RecipeId::ALL
        .iter()
        .map(|id| (*id, id.recipe()))
        .filter(|(_, recipe)| {
            recipe.inputs.iter().all(|input| {
                stockpile.get(&input.resource).copied().unwrap_or(0) >= input.amount
            })
        })
        .map(|(id, recipe)| {
            let seconds = recipe.duration.as_secs_f64().max(f64::EPSILON);
            let mut score = price(recipe.output) / seconds * f64::from(recipe.output_amount);
            if recipe.output.tier() == top_tier {
                score *= tuning.top_tier_recipe_bonus;
            }
            (id, score)
        })
        .max_by(|left, right| left.1.total_cmp(&right.1))
        .map(|(id, _)| id)
}

/// Offer an opponent would post from its stockpile.
///
/// The resource with the best market value times stock is chosen, refined
/// goods favoured. Valuable goods are priced above market and common ones
/// below it.
pub(crate) fn best_offer(
    stockpile: &BTreeMap<ResourceKind, u32>,
    price: impl Fn(ResourceKind) -> f64,
    tuning: &OpponentTuning,
) -> Option<Offer> {
    let (resource, stock, market_price) = stockpile
        .iter()
        .filter(|(_, stock)| **stock > 0)
        .map(|(resource, stock)| (*resource, *stock, price(*resource)))
        .max_by(|left, right| {
            offer_score(left, tuning).total_cmp(&offer_score(right, tuning))
        })?;
    let factor = if resource.base_value() >= tuning.valuable_base_value {
        tuning.valuable_markup
    } else {
        tuning.common_markdown
    };
    let unit_price = (market_price * factor * 100.0).round() / 100.0;
    let amount = stock.min(tuning.max_commerce_offer);
    (amount > 0 && unit_price > 0.0).then_some(Offer {
        resource,
        amount,
        unit_price,
    })
}

fn offer_score(
    (resource, stock, price): &(ResourceKind, u32, f64),
    tuning: &OpponentTuning,
) -> f64 {
    let bonus = if resource.is_refined() {
        tuning.refined_offer_bonus
    } else {
        1.0
    };
    price * f64::from(*stock) * bonus
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn offer(unit_price: f64) -> Offer {
        Offer {
            resource: ResourceKind::Wood,
            amount: 20,
            unit_price,
        }
    }

    #[test]
    fn bargains_are_always_taken() {
        for seed in 0..64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            assert!(decides_to_buy(&offer(5.0), 10.0, 1_000, false, &mut rng));
        }
    }

    #[test]
    fn broke_buyers_never_buy() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(!decides_to_buy(&offer(5.0), 10.0, 4, false, &mut rng));
    }

    #[test]
    fn unpriced_goods_are_never_bought() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for market_price in [0.0, -3.0, f64::NAN] {
            assert!(!decides_to_buy(&offer(5.0), market_price, 1_000, true, &mut rng));
        }
    }

    #[test]
    fn acceptance_falls_with_the_premium() {
        let accepted = |unit_price: f64, feeds: bool| {
            let mut rng = ChaCha8Rng::seed_from_u64(99);
            (0..2_000)
                .filter(|_| decides_to_buy(&offer(unit_price), 10.0, 1_000, feeds, &mut rng))
                .count()
        };
        let fair = accepted(10.0, false);
        let steep = accepted(12.0, false);
        let gouging = accepted(20.0, false);
        let needed = accepted(20.0, true);
        assert!(fair > steep && steep > gouging);
        assert!(needed > gouging);
        assert!((1_200..1_600).contains(&fair));
        assert!((100..300).contains(&gouging));
    }

    #[test]
    fn purchases_fit_wallet_storage_and_cap() {
        let offer = offer(5.0);
        assert_eq!(purchase_amount(&offer, 1_000, 100, 10), 10);
        assert_eq!(purchase_amount(&offer, 32, 100, 10), 6);
        assert_eq!(purchase_amount(&offer, 1_000, 3, 10), 3);
        assert_eq!(purchase_amount(&offer, 4, 100, 10), 0);
    }

    #[test]
    fn recipes_need_every_input_in_stock() {
        let tuning = OpponentTuning::default();
        let price = |resource: ResourceKind| resource.base_value();
        let mut stock = BTreeMap::from([(ResourceKind::Wood, 4), (ResourceKind::IronOre, 2)]);
        assert_eq!(best_recipe(&stock, price, &tuning), Some(RecipeId::Planks));

        let _ = stock.insert(ResourceKind::Coal, 1);
        assert_eq!(best_recipe(&stock, price, &tuning), Some(RecipeId::Planks));

        stock.clear();
        assert_eq!(best_recipe(&stock, price, &tuning), None);
    }

    #[test]
    fn valuable_goods_are_marked_up() {
        let tuning = OpponentTuning::default();
        let price = |resource: ResourceKind| resource.base_value();

        let gold = BTreeMap::from([(ResourceKind::GoldIngot, 30)]);
        let posted = best_offer(&gold, price, &tuning).expect("stock");
        assert_eq!(posted.amount, 20);
        assert!((posted.unit_price - 115.0).abs() < 1e-9);

        let wood = BTreeMap::from([(ResourceKind::Wood, 5)]);
        let posted = best_offer(&wood, price, &tuning).expect("stock");
        assert_eq!(posted.amount, 5);
        assert!((posted.unit_price - 9.0).abs() < 1e-9);
    }
}
