//! Role tables.

use std::fmt;

use serde::{Deserialize, Serialize};
use tradefin_types::{Address, Timestamp};

use crate::error::AccessError;
use crate::gate::AccessGate;
use crate::lists::normalize_country;
use crate::store::AccessStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// KYC-verified user; carries a supported country.
    VerifiedUser,
    LogisticsPartner,
    DeliveryPerson,
    DocumentVerifier,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::VerifiedUser,
        Role::LogisticsPartner,
        Role::DeliveryPerson,
        Role::DocumentVerifier,
    ];

    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::VerifiedUser => 1,
            Self::LogisticsPartner => 2,
            Self::DeliveryPerson => 3,
            Self::DocumentVerifier => 4,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VerifiedUser => "verified-user",
            Self::LogisticsPartner => "logistics-partner",
            Self::DeliveryPerson => "delivery-person",
            Self::DocumentVerifier => "document-verifier",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub user: Address,
    pub role: Role,
    /// Set for `VerifiedUser` only.
    pub country: Option<String>,
    pub granted_by: Address,
    pub granted_at: Timestamp,
}

impl AccessGate {
    /// Grant `role` to `user`. Verified users need a supported country.
    pub fn grant_role<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        user: &Address,
        role: Role,
        country: Option<&str>,
        now: Timestamp,
    ) -> Result<(), AccessError> {
        Self::ensure_owner(store, caller)?;
        if user.is_zero() {
            return Err(AccessError::InvalidAddress(*user));
        }
        let country = match (role, country) {
            (Role::VerifiedUser, None) => return Err(AccessError::CountryRequired),
            (Role::VerifiedUser, Some(code)) => {
                Self::ensure_country_supported(store, code)?;
                Some(normalize_country(code)?)
            }
            _ => None,
        };
        if store.role(role, user)?.is_some() {
            return Err(AccessError::RoleAlreadyGranted { user: *user, role });
        }
        store.put_role(&RoleGrant {
            user: *user,
            role,
            country,
            granted_by: *caller,
            granted_at: now,
        })?;
        tracing::info!(%user, %role, "role granted");
        Ok(())
    }

    pub fn revoke_role<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        user: &Address,
        role: Role,
    ) -> Result<(), AccessError> {
        Self::ensure_owner(store, caller)?;
        if store.role(role, user)?.is_none() {
            return Err(AccessError::MissingRole { user: *user, role });
        }
        store.remove_role(role, user);
        tracing::info!(%user, %role, "role revoked");
        Ok(())
    }

    pub fn has_role<S: AccessStore>(store: &S, user: &Address, role: Role) -> Result<bool, AccessError> {
        Ok(store.role(role, user)?.is_some())
    }

    /// Every role currently granted to `user`.
    pub fn roles_of<S: AccessStore>(store: &S, user: &Address) -> Result<Vec<Role>, AccessError> {
        let mut held = Vec::new();
        for role in Role::ALL {
            if Self::has_role(store, user, role)? {
                held.push(role);
            }
        }
        Ok(held)
    }

    pub fn ensure_role<S: AccessStore>(store: &S, user: &Address, role: Role) -> Result<(), AccessError> {
        if !Self::has_role(store, user, role)? {
            return Err(AccessError::MissingRole { user: *user, role });
        }
        Ok(())
    }

    pub fn ensure_verified<S: AccessStore>(store: &S, user: &Address) -> Result<(), AccessError> {
        if !Self::has_role(store, user, Role::VerifiedUser)? {
            return Err(AccessError::NotVerified(*user));
        }
        Ok(())
    }

    pub fn country_of<S: AccessStore>(store: &S, user: &Address) -> Result<Option<String>, AccessError> {
        Ok(store
            .role(Role::VerifiedUser, user)?
            .and_then(|grant| grant.country))
    }
}
