//! Token movements produced by ledger operations.
//!
//! Engines never call the token bank themselves. A money-moving operation
//! returns a [`Settlement`] describing the transfers it implies, and the
//! platform executes it only after every internal write has been staged.

use crate::address::Address;
use crate::amount::Amount;
use serde::{Deserialize, Serialize};

/// A single movement between a party and platform custody.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transfer {
    /// Pull `amount` of `token` from `from` into custody.
    In {
        token: Address,
        from: Address,
        amount: Amount,
    },
    /// Pay `amount` of `token` out of custody to `to`.
    Out {
        token: Address,
        to: Address,
        amount: Amount,
    },
}

impl Transfer {
    pub fn amount(&self) -> Amount {
        match self {
            Self::In { amount, .. } | Self::Out { amount, .. } => *amount,
        }
    }

    /// The transfer that undoes this one.
    pub fn reversed(&self) -> Self {
        match self {
            Self::In {
                token,
                from,
                amount,
            } => Self::Out {
                token: *token,
                to: *from,
                amount: *amount,
            },
            Self::Out { token, to, amount } => Self::In {
                token: *token,
                from: *to,
                amount: *amount,
            },
        }
    }
}

/// Ordered list of transfers an operation requires. Zero-amount legs are
/// dropped on insertion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
    transfers: Vec<Transfer>,
}

impl Settlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pull(mut self, token: Address, from: Address, amount: Amount) -> Self {
        self.push_in(token, from, amount);
        self
    }

    pub fn pay(mut self, token: Address, to: Address, amount: Amount) -> Self {
        self.push_out(token, to, amount);
        self
    }

    pub fn push_in(&mut self, token: Address, from: Address, amount: Amount) {
        if amount > 0 {
            self.transfers.push(Transfer::In {
                token,
                from,
                amount,
            });
        }
    }

    pub fn push_out(&mut self, token: Address, to: Address, amount: Amount) {
        if amount > 0 {
            self.transfers.push(Transfer::Out { token, to, amount });
        }
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Total paid out to `party` across all legs.
    pub fn paid_to(&self, party: &Address) -> Amount {
        self.transfers
            .iter()
            .filter_map(|t| match t {
                Transfer::Out { to, amount, .. } if to == party => Some(*amount),
                _ => None,
            })
            .sum()
    }

    /// Total pulled from `party` across all legs.
    pub fn pulled_from(&self, party: &Address) -> Amount {
        self.transfers
            .iter()
            .filter_map(|t| match t {
                Transfer::In { from, amount, .. } if from == party => Some(*amount),
                _ => None,
            })
            .sum()
    }
}
