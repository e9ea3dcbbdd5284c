use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};
use rand_chacha::ChaCha8Rng;
use tile_tycoon_core::{Money, OpponentId, Owner, Rarity, ResourceKind, TileCoord};
use tracing::info;

use crate::{buildings::Building, grid::Grid, tuning::WorldTuning, World};

const STARTER_RESOURCES: [ResourceKind; 3] =
    [ResourceKind::Wood, ResourceKind::Stone, ResourceKind::IronOre];
const DIAGONALS: [(i64, i64); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];
const OPPONENT_SPACING: [u32; 5] = [10, 7, 4, 1, 0];

/// Fills a grid with rarity-weighted resources and land prices that rise
/// around valuable deposits.
pub(crate) fn generate_terrain(
    width: u32,
    height: u32,
    tuning: &WorldTuning,
    rng: &mut ChaCha8Rng,
) -> Grid {
    let mut grid = Grid::new(width, height, tuning.tile_base_price);
    let weights: Vec<f64> = ResourceKind::RAW
        .iter()
        .map(|resource| resource.default_rarity().map_or(0.0, Rarity::weight))
        .collect();
    let picker = WeightedIndex::new(&weights).ok();

    for tile in grid.tiles_mut() {
        if rng.gen::<f64>() < tuning.empty_probability {
            continue;
        }
        let Some(index) = picker.as_ref().map(|picker| picker.sample(rng)) else {
            continue;
        };
        let resource = ResourceKind::RAW[index];
        tile.resource = Some(resource);
        tile.durability = draw_durability(resource, rng);
    }

    price_land(&mut grid, tuning, rng);
    grid
}

fn draw_durability(resource: ResourceKind, rng: &mut ChaCha8Rng) -> u32 {
    let (low, high) = resource
        .default_rarity()
        .map_or((1, 1), Rarity::durability_range);
    rng.gen_range(low..=high.max(low))
}

fn land_value(resource: Option<ResourceKind>, base: f64) -> f64 {
    resource
        .and_then(ResourceKind::default_rarity)
        .map_or(base, |rarity| base * rarity.land_price_factor())
}

/// Spreads a share of every resource tile's value over the surrounding rings,
/// halving it per ring by default, then jitters each price.
fn price_land(grid: &mut Grid, tuning: &WorldTuning, rng: &mut ChaCha8Rng) {
    let base = tuning.tile_base_price as f64;
    let radius = tuning.land_premium_radius;
    let intrinsic: Vec<(TileCoord, Option<ResourceKind>)> = grid
        .tiles()
        .iter()
        .map(|tile| (tile.coord, tile.resource))
        .collect();

    let mut prices: Vec<f64> = intrinsic
        .iter()
        .map(|(_, resource)| land_value(*resource, base))
        .collect();

    for (source, resource) in intrinsic.iter().filter(|(_, resource)| resource.is_some()) {
        let value = land_value(*resource, base) * tuning.land_premium_share;
        for (index, (coord, _)) in intrinsic.iter().enumerate() {
            let distance = source.manhattan_distance(*coord);
            if distance == 0 || distance > radius {
                continue;
            }
            let exponent = i32::try_from(distance - 1).unwrap_or(i32::MAX);
            prices[index] += value * tuning.land_premium_decay.powi(exponent);
        }
    }

    let noise = tuning.land_price_noise.abs();
    for (tile, price) in grid.tiles_mut().iter_mut().zip(prices) {
        let jitter = if noise > 0.0 {
            rng.gen_range(-noise..=noise)
        } else {
            0.0
        };
        tile.price = (price * (1.0 + jitter)).round().max(1.0) as u64;
    }
}

/// Scales a generated land price to a new resource, keeping the premium and
/// noise the tile already carries.
fn reprice(price: u64, from: Option<ResourceKind>, to: Option<ResourceKind>, base: f64) -> u64 {
    let previous = land_value(from, base);
    if previous <= 0.0 {
        return price;
    }
    (price as f64 * land_value(to, base) / previous).round().max(1.0) as u64
}

fn offset(coord: TileCoord, (dx, dy): (i64, i64)) -> Option<TileCoord> {
    let x = u32::try_from(i64::from(coord.x()) + dx).ok()?;
    let y = u32::try_from(i64::from(coord.y()) + dy).ok()?;
    Some(TileCoord::new(x, y))
}

impl World {
    /// Grants the player the starting homestead around the grid centre and
    /// opens their account.
    ///
    /// The centre becomes empty land carrying the Central building, all four
    /// neighbours and one diagonal are owned and surveyed, and the first
    /// neighbour is guaranteed a starter resource.
    pub fn setup_player_start(&mut self, money: Money) -> TileCoord {
        let centre = self.centre();
        let owner = Owner::Player;
        self.ledger.open(owner, money);
        self.claim_home(centre, owner);

        let neighbors: Vec<TileCoord> = self.grid.neighbors(centre).collect();
        for (position, coord) in neighbors.into_iter().enumerate() {
            let starter = if position == 0 {
                let index = self.rng.gen_range(0..STARTER_RESOURCES.len());
                Some(STARTER_RESOURCES[index])
            } else {
                None
            };
            let durability = starter.map(|resource| draw_durability(resource, &mut self.rng));
            let base = self.tuning.tile_base_price as f64;
            if let Some(tile) = self.grid.tile_mut(coord) {
                tile.owner = Some(owner);
                let _ = tile.surveyed_by.insert(owner);
                if let (Some(resource), Some(durability)) = (starter, durability) {
                    tile.price = reprice(tile.price, tile.resource, Some(resource), base);
                    tile.resource = Some(resource);
                    tile.durability = durability;
                }
            }
        }

        let diagonal = DIAGONALS
            .iter()
            .filter_map(|step| offset(centre, *step))
            .find(|coord| self.grid.tile(*coord).is_some());
        if let Some(tile) = diagonal.and_then(|coord| self.grid.tile_mut(coord)) {
            tile.owner = Some(owner);
            let _ = tile.surveyed_by.insert(owner);
        }

        info!(x = centre.x(), y = centre.y(), money, "player homestead granted");
        centre
    }

    /// Grants an opponent a Central tile well away from the player plus its
    /// unowned neighbours, and opens its account.
    ///
    /// The spacing requirement relaxes on small grids. Returns `None` when no
    /// free spot is left.
    pub fn setup_opponent_start(&mut self, id: OpponentId, money: Money) -> Option<TileCoord> {
        let player_centre = self.centre();
        let candidates = OPPONENT_SPACING.iter().find_map(|spacing| {
            let found: Vec<TileCoord> = self
                .grid
                .tiles()
                .iter()
                .filter(|tile| tile.owner.is_none())
                .map(|tile| tile.coord)
                .filter(|coord| coord.manhattan_distance(player_centre) > *spacing)
                .filter(|coord| {
                    self.grid.neighbors(*coord).all(|neighbor| {
                        self.grid
                            .tile(neighbor)
                            .is_some_and(|tile| tile.owner.is_none())
                    })
                })
                .collect();
            (!found.is_empty()).then_some(found)
        })?;

        let home = candidates[self.rng.gen_range(0..candidates.len())];
        let owner = Owner::Opponent(id);
        self.ledger.open(owner, money);
        self.claim_home(home, owner);

        let neighbors: Vec<TileCoord> = self.grid.neighbors(home).collect();
        for coord in neighbors {
            if let Some(tile) = self.grid.tile_mut(coord) {
                if tile.owner.is_none() {
                    tile.owner = Some(owner);
                    let _ = tile.surveyed_by.insert(owner);
                }
            }
        }

        info!(owner = %owner, x = home.x(), y = home.y(), money, "opponent homestead granted");
        Some(home)
    }

    fn centre(&self) -> TileCoord {
        TileCoord::new(self.grid.width() / 2, self.grid.height() / 2)
    }

    fn claim_home(&mut self, coord: TileCoord, owner: Owner) {
        let base = self.tuning.tile_base_price as f64;
        if let Some(tile) = self.grid.tile_mut(coord) {
            tile.price = reprice(tile.price, tile.resource, None, base);
            tile.resource = None;
            tile.durability = 0;
            tile.owner = Some(owner);
            let _ = tile.surveyed_by.insert(owner);
            tile.building = Some(Building::Central);
        }
    }
}
