use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tile_tycoon_core::{BuildingKind, Money, Owner, ResourceKind, TileCoord};
use tile_tycoon_world::{query, World};

use crate::tuning::OpponentTuning;

/// Development stage steering what an opponent builds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// At most one collection and no deposit yet.
    #[default]
    Initial,
    /// Growing the collection and storage network.
    Expanding,
    /// Wealthy enough to refine and trade.
    Advanced,
}

/// Snapshot of one opponent's territory.
#[derive(Clone, Debug, Default)]
pub(crate) struct Holdings {
    pub(crate) money: Money,
    pub(crate) tiles: usize,
    pub(crate) collections: Vec<TileCoord>,
    pub(crate) deposits: Vec<TileCoord>,
    pub(crate) processing: Vec<TileCoord>,
    pub(crate) commerce: Vec<TileCoord>,
    pub(crate) free_resource: Vec<(TileCoord, ResourceKind)>,
    pub(crate) free_empty: Vec<TileCoord>,
}

impl Holdings {
    pub(crate) fn survey(world: &World, owner: Owner) -> Self {
        let mut holdings = Self {
            money: query::money(world, owner),
            ..Self::default()
        };
        for tile in query::tiles(world).filter(|tile| tile.is_owned_by(owner)) {
            holdings.tiles += 1;
            let coord = tile.coord();
            match (tile.building_kind(), tile.resource()) {
                (Some(BuildingKind::Collection), _) => holdings.collections.push(coord),
                (Some(BuildingKind::Deposit), _) => holdings.deposits.push(coord),
                (Some(BuildingKind::Processing), _) => holdings.processing.push(coord),
                (Some(BuildingKind::Commerce), _) => holdings.commerce.push(coord),
                (Some(BuildingKind::Central), _) => {}
                (None, Some(resource)) => holdings.free_resource.push((coord, resource)),
                (None, None) => holdings.free_empty.push(coord),
            }
        }
        holdings
            .free_resource
            .sort_by_key(|(coord, resource)| (Reverse(resource.base_value() as u64), *coord));
        holdings
    }
}

/// Next phase given the current one and the holdings.
pub(crate) fn next_phase(current: Phase, holdings: &Holdings, tuning: &OpponentTuning) -> Phase {
    let established = holdings.collections.len() > 1 || !holdings.deposits.is_empty();
    if current == Phase::Initial && !established {
        return Phase::Initial;
    }
    if holdings.money >= tuning.processing_money_threshold
        && holdings.tiles >= tuning.advanced_tile_count
    {
        Phase::Advanced
    } else {
        Phase::Expanding
    }
}

/// Construction wishes of the phase, most wanted first.
pub(crate) fn wishlist(
    phase: Phase,
    holdings: &Holdings,
    tuning: &OpponentTuning,
) -> Vec<(TileCoord, BuildingKind)> {
    let mut wishes = Vec::new();
    match phase {
        Phase::Initial => {
            if !holdings.collections.is_empty() && holdings.deposits.is_empty() {
                push_near(
                    &mut wishes,
                    holdings,
                    &holdings.collections,
                    None,
                    BuildingKind::Deposit,
                );
            }
            push_collections(&mut wishes, holdings);
            push_near(
                &mut wishes,
                holdings,
                &holdings.collections,
                None,
                BuildingKind::Deposit,
            );
        }
        Phase::Expanding => expanding(&mut wishes, holdings, tuning),
        Phase::Advanced => {
            if holdings.processing.len() > holdings.commerce.len() {
                push_near(
                    &mut wishes,
                    holdings,
                    &holdings.processing,
                    None,
                    BuildingKind::Commerce,
                );
            }
            push_near(
                &mut wishes,
                holdings,
                &holdings.deposits,
                Some(1),
                BuildingKind::Processing,
            );
            expanding(&mut wishes, holdings, tuning);
        }
    }
    wishes
}

fn expanding(
    wishes: &mut Vec<(TileCoord, BuildingKind)>,
    holdings: &Holdings,
    tuning: &OpponentTuning,
) {
    let per_deposit = tuning.collections_per_deposit.max(1);
    let served = holdings.deposits.len() * per_deposit;
    let collections = holdings.collections.len();
    if collections > served {
        let within =
            (collections <= served + tuning.severe_imbalance).then_some(tuning.near_distance);
        push_near(wishes, holdings, &holdings.collections, within, BuildingKind::Deposit);
    }
    push_collections(wishes, holdings);
    if holdings.money >= tuning.processing_money_threshold {
        push_near(
            wishes,
            holdings,
            &holdings.deposits,
            Some(1),
            BuildingKind::Processing,
        );
    }
}

fn push_collections(wishes: &mut Vec<(TileCoord, BuildingKind)>, holdings: &Holdings) {
    wishes.extend(
        holdings
            .free_resource
            .iter()
            .map(|(coord, _)| (*coord, BuildingKind::Collection)),
    );
}

fn push_near(
    wishes: &mut Vec<(TileCoord, BuildingKind)>,
    holdings: &Holdings,
    anchors: &[TileCoord],
    within: Option<u32>,
    kind: BuildingKind,
) {
    if let Some(coord) = nearest_free(&holdings.free_empty, anchors, within) {
        wishes.push((coord, kind));
    }
}

/// Free empty tile closest to any anchor, ties broken in row-major order.
fn nearest_free(
    free: &[TileCoord],
    anchors: &[TileCoord],
    within: Option<u32>,
) -> Option<TileCoord> {
    free.iter()
        .filter_map(|coord| {
            let distance = anchors
                .iter()
                .map(|anchor| anchor.manhattan_distance(*coord))
                .min()?;
            within
                .map_or(true, |limit| distance <= limit)
                .then_some((distance, *coord))
        })
        .min_by_key(|(distance, coord)| (*distance, coord.y(), coord.x()))
        .map(|(_, coord)| coord)
}
