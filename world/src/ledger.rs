use std::collections::BTreeMap;

use tile_tycoon_core::{CommandError, Money, Owner};

/// Money ledger and activity counters of one economic actor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    money: Money,
    money_generated: Money,
    money_spent: Money,
    tiles_surveyed: usize,
    buildings_built: usize,
}

impl Account {
    /// Money currently held.
    #[must_use]
    pub const fn money(&self) -> Money {
        self.money
    }

    /// Money ever earned from sales and trades.
    #[must_use]
    pub const fn money_generated(&self) -> Money {
        self.money_generated
    }

    /// Money ever paid for land, surveys, buildings and goods.
    #[must_use]
    pub const fn money_spent(&self) -> Money {
        self.money_spent
    }

    /// Surveys commissioned.
    #[must_use]
    pub const fn tiles_surveyed(&self) -> usize {
        self.tiles_surveyed
    }

    /// Buildings constructed, including ones later lost to depletion.
    #[must_use]
    pub const fn buildings_built(&self) -> usize {
        self.buildings_built
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Ledger {
    accounts: BTreeMap<Owner, Account>,
}

impl Ledger {
    pub(crate) fn open(&mut self, owner: Owner, money: Money) {
        let _ = self.accounts.insert(
            owner,
            Account {
                money,
                ..Account::default()
            },
        );
    }

    pub(crate) fn account(&self, owner: Owner) -> Option<&Account> {
        self.accounts.get(&owner)
    }

    pub(crate) fn accounts(&self) -> impl Iterator<Item = (Owner, &Account)> {
        self.accounts.iter().map(|(owner, account)| (*owner, account))
    }

    pub(crate) fn money(&self, owner: Owner) -> Money {
        self.accounts.get(&owner).map_or(0, Account::money)
    }

    pub(crate) fn ensure_funds(&self, owner: Owner, required: Money) -> Result<(), CommandError> {
        let available = self.money(owner);
        if available < required {
            return Err(CommandError::InsufficientFunds {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Debits the owner after checking funds; nothing changes on failure.
    pub(crate) fn spend(&mut self, owner: Owner, amount: Money) -> Result<(), CommandError> {
        self.ensure_funds(owner, amount)?;
        let account = self.accounts.entry(owner).or_default();
        account.money -= amount;
        account.money_spent += amount;
        Ok(())
    }

    pub(crate) fn earn(&mut self, owner: Owner, amount: Money) {
        let account = self.accounts.entry(owner).or_default();
        account.money += amount;
        account.money_generated += amount;
    }

    pub(crate) fn record_survey(&mut self, owner: Owner) {
        self.accounts.entry(owner).or_default().tiles_surveyed += 1;
    }

    pub(crate) fn record_build(&mut self, owner: Owner) {
        self.accounts.entry(owner).or_default().buildings_built += 1;
    }
}
