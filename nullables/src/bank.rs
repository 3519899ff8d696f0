//! Nullable token bank: in-memory balances and platform custody.

use std::collections::HashMap;
use tradefin_types::{Address, Amount, TokenBank, TransferError};

/// Tracks per-party token balances plus the platform's custody balance.
///
/// `transfer_in` moves funds from a party into custody, `transfer_out` from
/// custody to a party. A transfer can be forced to fail to exercise rollback.
#[derive(Default)]
pub struct NullBank {
    balances: HashMap<(Address, Address), Amount>,
    custody: HashMap<Address, Amount>,
    fail_after: Option<usize>,
    transfers: usize,
}

impl NullBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `holder` with `amount` of `token` out of thin air.
    pub fn mint(&mut self, token: Address, holder: Address, amount: Amount) {
        *self.balances.entry((token, holder)).or_default() += amount;
    }

    pub fn balance_of(&self, token: &Address, holder: &Address) -> Amount {
        self.balances.get(&(*token, *holder)).copied().unwrap_or(0)
    }

    pub fn custody_of(&self, token: &Address) -> Amount {
        self.custody.get(token).copied().unwrap_or(0)
    }

    /// Reject the one transfer that follows the next `successes` successful
    /// ones. Later transfers go through again.
    pub fn fail_after(&mut self, successes: usize) {
        self.fail_after = Some(self.transfers + successes);
    }

    pub fn stop_failing(&mut self) {
        self.fail_after = None;
    }

    /// Number of transfers executed so far.
    pub fn transfer_count(&self) -> usize {
        self.transfers
    }

    fn check_armed(&mut self) -> Result<(), TransferError> {
        match self.fail_after {
            Some(limit) if self.transfers >= limit => {
                self.fail_after = None;
                Err(TransferError::Rejected("null bank armed to fail".into()))
            }
            _ => Ok(()),
        }
    }
}

impl TokenBank for NullBank {
    fn transfer_in(
        &mut self,
        token: &Address,
        from: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.check_armed()?;
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                token: *token,
                holder: *from,
                needed: amount,
                available,
            });
        }
        self.balances.insert((*token, *from), available - amount);
        *self.custody.entry(*token).or_default() += amount;
        self.transfers += 1;
        Ok(())
    }

    fn transfer_out(
        &mut self,
        token: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.check_armed()?;
        let held = self.custody_of(token);
        if held < amount {
            return Err(TransferError::InsufficientBalance {
                token: *token,
                holder: Address::ZERO,
                needed: amount,
                available: held,
            });
        }
        self.custody.insert(*token, held - amount);
        *self.balances.entry((*token, *to)).or_default() += amount;
        self.transfers += 1;
        Ok(())
    }
}
