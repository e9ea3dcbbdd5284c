use std::collections::BTreeSet;

use tile_tycoon_core::{BuildingKind, CommandError, Owner, ResourceKind, TileCoord};

use crate::{
    buildings::Building, collection::Collection, commerce::Commerce, deposit::Deposit,
    processing::Processing,
};

/// Single cell of the world: land, its resource and whatever stands on it.
#[derive(Clone, Debug)]
pub struct Tile {
    pub(crate) coord: TileCoord,
    pub(crate) resource: Option<ResourceKind>,
    pub(crate) durability: u32,
    pub(crate) owner: Option<Owner>,
    pub(crate) surveyed_by: BTreeSet<Owner>,
    pub(crate) price: u64,
    pub(crate) building: Option<Building>,
}

impl Tile {
    pub(crate) fn empty(coord: TileCoord, price: u64) -> Self {
        Self {
            coord,
            resource: None,
            durability: 0,
            owner: None,
            surveyed_by: BTreeSet::new(),
            price,
            building: None,
        }
    }

    /// Coordinate of the tile.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Resource in the ground, `None` for empty land.
    #[must_use]
    pub const fn resource(&self) -> Option<ResourceKind> {
        self.resource
    }

    /// Units left to extract.
    #[must_use]
    pub const fn durability(&self) -> u32 {
        self.durability
    }

    /// Current owner, if any.
    #[must_use]
    pub const fn owner(&self) -> Option<Owner> {
        self.owner
    }

    /// Reports whether the tile belongs to the provided owner.
    #[must_use]
    pub fn is_owned_by(&self, owner: Owner) -> bool {
        self.owner == Some(owner)
    }

    /// Reports whether any party has revealed the tile.
    #[must_use]
    pub fn is_surveyed(&self) -> bool {
        !self.surveyed_by.is_empty()
    }

    /// Reports whether the provided party has revealed the tile.
    #[must_use]
    pub fn is_surveyed_by(&self, owner: Owner) -> bool {
        self.surveyed_by.contains(&owner)
    }

    /// Land price fixed at generation, before the tile cost multiplier.
    #[must_use]
    pub const fn price(&self) -> u64 {
        self.price
    }

    /// Building standing on the tile.
    #[must_use]
    pub const fn building(&self) -> Option<&Building> {
        self.building.as_ref()
    }

    /// Kind of the building standing on the tile.
    #[must_use]
    pub fn building_kind(&self) -> Option<BuildingKind> {
        self.building.as_ref().map(Building::kind)
    }

    /// Collection building on the tile.
    #[must_use]
    pub fn collection(&self) -> Option<&Collection> {
        match &self.building {
            Some(Building::Collection(collection)) => Some(collection),
            _ => None,
        }
    }

    /// Deposit on the tile.
    #[must_use]
    pub fn deposit(&self) -> Option<&Deposit> {
        match &self.building {
            Some(Building::Deposit(deposit)) => Some(deposit),
            _ => None,
        }
    }

    /// Processing building on the tile.
    #[must_use]
    pub fn processing(&self) -> Option<&Processing> {
        match &self.building {
            Some(Building::Processing(processing)) => Some(processing),
            _ => None,
        }
    }

    /// Commerce building on the tile.
    #[must_use]
    pub fn commerce(&self) -> Option<&Commerce> {
        match &self.building {
            Some(Building::Commerce(commerce)) => Some(commerce),
            _ => None,
        }
    }
}

/// Dense row-major tile storage with deposit lookups.
#[derive(Clone, Debug)]
pub(crate) struct Grid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl Grid {
    pub(crate) fn new(width: u32, height: u32, price: u64) -> Self {
        let tiles = (0..height)
            .flat_map(|y| (0..width).map(move |x| Tile::empty(TileCoord::new(x, y), price)))
            .collect();
        Self {
            width,
            height,
            tiles,
        }
    }

    pub(crate) const fn width(&self) -> u32 {
        self.width
    }

    pub(crate) const fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if coord.x() >= self.width || coord.y() >= self.height {
            return None;
        }
        Some(coord.y() as usize * self.width as usize + coord.x() as usize)
    }

    pub(crate) fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index(coord).and_then(|index| self.tiles.get(index))
    }

    pub(crate) fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut Tile> {
        self.index(coord).and_then(|index| self.tiles.get_mut(index))
    }

    pub(crate) fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub(crate) fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    /// In-bounds orthogonal neighbours of the coordinate.
    pub(crate) fn neighbors(&self, coord: TileCoord) -> impl Iterator<Item = TileCoord> + '_ {
        coord
            .neighbors()
            .filter(move |neighbor| self.index(*neighbor).is_some())
    }

    /// Unowned and orthogonally adjacent to a tile the owner already holds.
    pub(crate) fn can_purchase(&self, coord: TileCoord, owner: Owner) -> bool {
        let Some(tile) = self.tile(coord) else {
            return false;
        };
        if tile.owner.is_some() {
            return false;
        }
        self.neighbors(coord).any(|neighbor| {
            self.tile(neighbor)
                .is_some_and(|tile| tile.is_owned_by(owner))
        })
    }

    pub(crate) fn owned_deposit_mut(
        &mut self,
        owner: Owner,
        coord: TileCoord,
    ) -> Option<&mut Deposit> {
        let tile = self.tile_mut(coord)?;
        if !tile.is_owned_by(owner) {
            return None;
        }
        match &mut tile.building {
            Some(Building::Deposit(deposit)) => Some(deposit),
            _ => None,
        }
    }

    pub(crate) fn owned_deposits(
        &self,
        owner: Owner,
    ) -> impl Iterator<Item = (TileCoord, &Deposit)> + '_ {
        self.tiles.iter().filter_map(move |tile| {
            if !tile.is_owned_by(owner) {
                return None;
            }
            tile.deposit().map(|deposit| (tile.coord, deposit))
        })
    }

    /// Nearest owned deposit passing the filter; ties resolve in row-major order.
    pub(crate) fn nearest_deposit(
        &self,
        owner: Owner,
        from: TileCoord,
        filter: impl Fn(&Deposit) -> bool,
    ) -> Option<TileCoord> {
        self.owned_deposits(owner)
            .filter(|(_, deposit)| filter(deposit))
            .min_by_key(|(coord, _)| from.manhattan_distance(*coord))
            .map(|(coord, _)| coord)
    }

    /// Deposit a collection building should feed: the nearest one already
    /// storing the resource with room to spare, else the nearest that can take it.
    pub(crate) fn collection_target(
        &self,
        owner: Owner,
        from: TileCoord,
        resource: ResourceKind,
    ) -> Option<TileCoord> {
        self.nearest_deposit(owner, from, |deposit| {
            deposit.stock(resource) > 0 && deposit.can_accept(resource, 1)
        })
        .or_else(|| self.nearest_deposit(owner, from, |deposit| deposit.can_accept(resource, 1)))
    }

    pub(crate) fn total_stock(&self, owner: Owner, resource: ResourceKind) -> u32 {
        self.owned_deposits(owner)
            .map(|(_, deposit)| deposit.stock(resource))
            .sum()
    }

    /// Splits `amount` across the owner's deposits, deposits already holding
    /// the resource first.
    pub(crate) fn placement_plan(
        &self,
        owner: Owner,
        resource: ResourceKind,
        amount: u32,
    ) -> Result<Vec<(TileCoord, u32)>, CommandError> {
        let (holding, others): (Vec<_>, Vec<_>) = self
            .owned_deposits(owner)
            .partition(|(_, deposit)| deposit.stock(resource) > 0);

        let mut remaining = amount;
        let mut plan = Vec::new();
        for (coord, deposit) in holding.into_iter().chain(others) {
            if remaining == 0 {
                break;
            }
            let share = deposit.accept_limit(resource).min(remaining);
            if share > 0 {
                plan.push((coord, share));
                remaining -= share;
            }
        }

        if remaining > 0 {
            return Err(CommandError::CapacityExceeded);
        }
        Ok(plan)
    }

    /// Places goods into the owner's deposits as one step; nothing changes on failure.
    pub(crate) fn place(
        &mut self,
        owner: Owner,
        resource: ResourceKind,
        amount: u32,
    ) -> Result<Vec<(TileCoord, u32)>, CommandError> {
        let plan = self.placement_plan(owner, resource, amount)?;
        for &(coord, share) in &plan {
            if let Some(deposit) = self.owned_deposit_mut(owner, coord) {
                deposit.store(resource, share)?;
            }
        }
        Ok(plan)
    }

    /// Removes goods from the owner's deposits, largest stockpile first, as one step.
    pub(crate) fn withdraw_largest_first(
        &mut self,
        owner: Owner,
        resource: ResourceKind,
        amount: u32,
    ) -> Result<(), CommandError> {
        let mut sources: Vec<(TileCoord, u32)> = self
            .owned_deposits(owner)
            .map(|(coord, deposit)| (coord, deposit.stock(resource)))
            .filter(|(_, stock)| *stock > 0)
            .collect();
        let available: u32 = sources.iter().map(|(_, stock)| stock).sum();
        if available < amount {
            return Err(CommandError::NoEligibleTarget);
        }
        sources.sort_by(|left, right| right.1.cmp(&left.1));

        let mut remaining = amount;
        for (coord, stock) in sources {
            if remaining == 0 {
                break;
            }
            let take = stock.min(remaining);
            if let Some(deposit) = self.owned_deposit_mut(owner, coord) {
                deposit.withdraw(resource, take)?;
                remaining -= take;
            }
        }
        Ok(())
    }
}
