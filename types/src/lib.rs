//! Fundamental types for the trade-finance ledger core.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! addresses, document hashes, amounts, timestamps, settlements, error
//! classification, and the interfaces of the external collaborators
//! (price oracle, token bank, clock).

pub mod address;
pub mod amount;
pub mod error;
pub mod external;
pub mod hash;
pub mod time;
pub mod transfer;

pub use address::{Address, AddressParseError};
pub use amount::{apply_bps, Amount, BPS_DENOMINATOR, TOKEN_UNIT};
pub use error::{ErrorCode, ErrorKind};
pub use external::{
    Clock, OracleError, PriceOracle, SystemClock, TokenBank, TransferError,
};
pub use hash::DocHash;
pub use time::{Timestamp, SECS_PER_DAY, SECS_PER_YEAR};
pub use transfer::{Settlement, Transfer};
