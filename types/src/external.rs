//! Interfaces of the collaborators the ledger core consumes.
//!
//! Production deployments plug in real price feeds and token contracts;
//! tests use the deterministic implementations in `tradefin-nullables`.

use crate::address::Address;
use crate::amount::Amount;
use crate::error::{ErrorCode, ErrorKind};
use crate::time::Timestamp;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("no price feed for token {0}")]
    NoFeed(Address),

    #[error("price oracle unavailable: {0}")]
    Unavailable(String),
}

/// Quotes token amounts in USD (smallest USD unit).
pub trait PriceOracle {
    fn quote_usd(&self, token: &Address, amount: Amount) -> Result<Amount, OracleError>;
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("insufficient {token} balance for {holder}: need {needed}, have {available}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

impl ErrorCode for TransferError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::External
    }

    fn code(&self) -> &'static str {
        "TRANSFER_FAILED"
    }
}

/// Moves fungible tokens between parties and platform custody.
pub trait TokenBank {
    fn transfer_in(
        &mut self,
        token: &Address,
        from: &Address,
        amount: Amount,
    ) -> Result<(), TransferError>;

    fn transfer_out(
        &mut self,
        token: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError>;
}

/// Source of the caller-observed current time.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
