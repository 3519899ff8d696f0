//! Owner-maintained allow-lists: countries, currencies, tokens.

use std::fmt;

use serde::{Deserialize, Serialize};
use tradefin_types::Address;

use crate::error::AccessError;
use crate::gate::AccessGate;
use crate::store::AccessStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Countries,
    Currencies,
    Tokens,
}

impl ListKind {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Countries => 1,
            Self::Currencies => 2,
            Self::Tokens => 3,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Countries => "country",
            Self::Currencies => "currency",
            Self::Tokens => "token",
        })
    }
}

/// ISO 3166 alpha-2 or alpha-3, normalized to upper case.
pub fn normalize_country(code: &str) -> Result<String, AccessError> {
    let upper = code.trim().to_ascii_uppercase();
    if !(2..=3).contains(&upper.len()) || !upper.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(AccessError::InvalidListEntry {
            kind: ListKind::Countries,
            value: code.to_string(),
        });
    }
    Ok(upper)
}

/// Three-letter currency code, normalized to upper case.
pub fn normalize_currency(code: &str) -> Result<String, AccessError> {
    let upper = code.trim().to_ascii_uppercase();
    if upper.len() != 3 || !upper.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(AccessError::InvalidListEntry {
            kind: ListKind::Currencies,
            value: code.to_string(),
        });
    }
    Ok(upper)
}

fn add_entry<S: AccessStore>(
    store: &mut S,
    caller: &Address,
    kind: ListKind,
    entry: &[u8],
    shown: String,
) -> Result<(), AccessError> {
    AccessGate::ensure_owner(store, caller)?;
    if store.list_contains(kind, entry)? {
        return Err(AccessError::AlreadyListed { kind, value: shown });
    }
    store.put_list_entry(kind, entry)?;
    tracing::info!(%kind, entry = %shown, "allow-list entry added");
    Ok(())
}

fn remove_entry<S: AccessStore>(
    store: &mut S,
    caller: &Address,
    kind: ListKind,
    entry: &[u8],
    shown: String,
) -> Result<(), AccessError> {
    AccessGate::ensure_owner(store, caller)?;
    if !store.list_contains(kind, entry)? {
        return Err(AccessError::NotListed { kind, value: shown });
    }
    store.remove_list_entry(kind, entry);
    tracing::info!(%kind, entry = %shown, "allow-list entry removed");
    Ok(())
}

impl AccessGate {
    pub fn add_country<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        code: &str,
    ) -> Result<(), AccessError> {
        let code = normalize_country(code)?;
        add_entry(store, caller, ListKind::Countries, code.as_bytes(), code.clone())
    }

    pub fn remove_country<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        code: &str,
    ) -> Result<(), AccessError> {
        let code = normalize_country(code)?;
        remove_entry(store, caller, ListKind::Countries, code.as_bytes(), code.clone())
    }

    pub fn is_country_supported<S: AccessStore>(store: &S, code: &str) -> Result<bool, AccessError> {
        match normalize_country(code) {
            Ok(code) => Ok(store.list_contains(ListKind::Countries, code.as_bytes())?),
            Err(_) => Ok(false),
        }
    }

    pub fn ensure_country_supported<S: AccessStore>(store: &S, code: &str) -> Result<(), AccessError> {
        if !Self::is_country_supported(store, code)? {
            return Err(AccessError::UnsupportedCountry(code.to_string()));
        }
        Ok(())
    }

    pub fn add_currency<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        code: &str,
    ) -> Result<(), AccessError> {
        let code = normalize_currency(code)?;
        add_entry(store, caller, ListKind::Currencies, code.as_bytes(), code.clone())
    }

    pub fn remove_currency<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        code: &str,
    ) -> Result<(), AccessError> {
        let code = normalize_currency(code)?;
        remove_entry(store, caller, ListKind::Currencies, code.as_bytes(), code.clone())
    }

    pub fn is_currency_supported<S: AccessStore>(store: &S, code: &str) -> Result<bool, AccessError> {
        match normalize_currency(code) {
            Ok(code) => Ok(store.list_contains(ListKind::Currencies, code.as_bytes())?),
            Err(_) => Ok(false),
        }
    }

    pub fn ensure_currency_supported<S: AccessStore>(store: &S, code: &str) -> Result<(), AccessError> {
        if !Self::is_currency_supported(store, code)? {
            return Err(AccessError::UnsupportedCurrency(code.to_string()));
        }
        Ok(())
    }

    pub fn add_token<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        token: &Address,
    ) -> Result<(), AccessError> {
        if token.is_zero() {
            return Err(AccessError::InvalidAddress(*token));
        }
        add_entry(store, caller, ListKind::Tokens, token.as_bytes(), token.to_string())
    }

    pub fn remove_token<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        token: &Address,
    ) -> Result<(), AccessError> {
        remove_entry(store, caller, ListKind::Tokens, token.as_bytes(), token.to_string())
    }

    pub fn is_token_supported<S: AccessStore>(store: &S, token: &Address) -> Result<bool, AccessError> {
        Ok(store.list_contains(ListKind::Tokens, token.as_bytes())?)
    }

    pub fn ensure_token_supported<S: AccessStore>(store: &S, token: &Address) -> Result<(), AccessError> {
        if !Self::is_token_supported(store, token)? {
            return Err(AccessError::UnsupportedToken(*token));
        }
        Ok(())
    }

    /// Entries of a list, as stored (upper-case codes or raw token bytes).
    pub fn list<S: AccessStore>(store: &S, kind: ListKind) -> Result<Vec<Vec<u8>>, AccessError> {
        Ok(store.list_entries(kind)?)
    }
}
