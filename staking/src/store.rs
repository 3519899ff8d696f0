//! Persistence for stakes and their aggregates.

use tradefin_store::{key, StoreError, StoreTxn, Table};
use tradefin_types::Address;

use crate::stake::{Stake, StakePool, StakeTotals, StakerAccount};

const TOTALS_KEY: &[u8] = b"totals";

pub trait StakeStore {
    fn stake(&self, user: &Address, token: &Address) -> Result<Option<Stake>, StoreError>;
    fn put_stake(&mut self, stake: &Stake) -> Result<(), StoreError>;
    /// Every stake record of `user`, in token order.
    fn stakes_of(&self, user: &Address) -> Result<Vec<Stake>, StoreError>;

    fn pool(&self, token: &Address) -> Result<Option<StakePool>, StoreError>;
    fn put_pool(&mut self, token: &Address, pool: &StakePool) -> Result<(), StoreError>;

    fn account(&self, user: &Address) -> Result<Option<StakerAccount>, StoreError>;
    fn put_account(&mut self, user: &Address, account: &StakerAccount) -> Result<(), StoreError>;
    /// Every user that has a stored account, in address order.
    fn staker_addresses(&self) -> Result<Vec<Address>, StoreError>;

    fn totals(&self) -> Result<Option<StakeTotals>, StoreError>;
    fn put_totals(&mut self, totals: &StakeTotals) -> Result<(), StoreError>;
}

fn stake_key(user: &Address, token: &Address) -> Vec<u8> {
    key::compose(&[user.as_bytes(), token.as_bytes()])
}

impl StakeStore for StoreTxn<'_> {
    fn stake(&self, user: &Address, token: &Address) -> Result<Option<Stake>, StoreError> {
        self.get(Table::Stakes, &stake_key(user, token))
    }

    fn put_stake(&mut self, stake: &Stake) -> Result<(), StoreError> {
        self.put(Table::Stakes, stake_key(&stake.user, &stake.token), stake)
    }

    fn stakes_of(&self, user: &Address) -> Result<Vec<Stake>, StoreError> {
        let prefix = key::compose(&[user.as_bytes()]);
        Ok(self
            .scan::<Stake>(Table::Stakes, &prefix)?
            .into_iter()
            .map(|(_, stake)| stake)
            .collect())
    }

    fn pool(&self, token: &Address) -> Result<Option<StakePool>, StoreError> {
        self.get(Table::StakePools, &key::address(token))
    }

    fn put_pool(&mut self, token: &Address, pool: &StakePool) -> Result<(), StoreError> {
        self.put(Table::StakePools, key::address(token), pool)
    }

    fn account(&self, user: &Address) -> Result<Option<StakerAccount>, StoreError> {
        self.get(Table::StakeAccounts, &key::address(user))
    }

    fn put_account(&mut self, user: &Address, account: &StakerAccount) -> Result<(), StoreError> {
        self.put(Table::StakeAccounts, key::address(user), account)
    }

    fn staker_addresses(&self) -> Result<Vec<Address>, StoreError> {
        Ok(self
            .scan::<StakerAccount>(Table::StakeAccounts, &[])?
            .into_iter()
            .filter_map(|(k, _)| <[u8; 20]>::try_from(k.as_slice()).ok().map(Address::new))
            .collect())
    }

    fn totals(&self) -> Result<Option<StakeTotals>, StoreError> {
        self.get(Table::StakeTotals, TOTALS_KEY)
    }

    fn put_totals(&mut self, totals: &StakeTotals) -> Result<(), StoreError> {
        self.put(Table::StakeTotals, TOTALS_KEY.to_vec(), totals)
    }
}
