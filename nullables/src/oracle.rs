//! Nullable price oracle: fixed, programmable quotes.

use std::cell::Cell;
use std::collections::HashMap;
use tradefin_types::{Address, Amount, OracleError, PriceOracle, TOKEN_UNIT};

/// Quotes every token at a fixed USD price per whole token.
///
/// Tokens without an explicit price quote one-to-one. The oracle can be
/// switched off to exercise the failure path.
pub struct NullOracle {
    prices: HashMap<Address, Amount>,
    unavailable: Cell<bool>,
}

impl NullOracle {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            unavailable: Cell::new(false),
        }
    }

    /// Price of one whole token (`TOKEN_UNIT` base units) in USD base units.
    pub fn with_price(mut self, token: Address, usd_per_token: Amount) -> Self {
        self.prices.insert(token, usd_per_token);
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }
}

impl Default for NullOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceOracle for NullOracle {
    fn quote_usd(&self, token: &Address, amount: Amount) -> Result<Amount, OracleError> {
        if self.unavailable.get() {
            return Err(OracleError::Unavailable("null oracle switched off".into()));
        }
        match self.prices.get(token) {
            None => Ok(amount),
            Some(price) => amount
                .checked_mul(*price)
                .map(|v| v / TOKEN_UNIT)
                .ok_or_else(|| OracleError::Unavailable("quote overflow".into())),
        }
    }
}
