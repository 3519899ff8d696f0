//! Token amounts and basis-point arithmetic.
//!
//! Amounts are fixed-point integers (u128) in the token's smallest unit to
//! avoid floating-point errors.

/// An amount in the smallest unit of some token.
pub type Amount = u128;

/// One whole token, assuming 18 decimals.
pub const TOKEN_UNIT: Amount = 1_000_000_000_000_000_000;

/// Basis points per unit (10000 bps = 100%).
pub const BPS_DENOMINATOR: u128 = 10_000;

/// `amount * bps / 10000`, or `None` on overflow.
pub fn apply_bps(amount: Amount, bps: u32) -> Option<Amount> {
    amount
        .checked_mul(bps as u128)
        .map(|v| v / BPS_DENOMINATOR)
}

/// Serde adapter that writes a `u128` as a decimal string.
///
/// TOML integers are 64-bit, so token amounts in configuration files are
/// written as strings. Plain integers are still accepted on input.
pub mod decimal_string {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = u128;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a non-negative integer or decimal string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
                v.trim()
                    .replace('_', "")
                    .parse::<u128>()
                    .map_err(|e| E::custom(format!("invalid amount {v:?}: {e}")))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
                Ok(v as u128)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
                u128::try_from(v).map_err(|_| E::custom("amount must not be negative"))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
                Ok(v)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bps_of_amount() {
        assert_eq!(apply_bps(1_000, 500), Some(50));
        assert_eq!(apply_bps(1_000, 0), Some(0));
        assert_eq!(apply_bps(u128::MAX, 2), None);
    }

    #[test]
    fn bps_rounds_down() {
        assert_eq!(apply_bps(999, 1), Some(0));
    }
}
