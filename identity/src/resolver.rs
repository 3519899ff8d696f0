//! Link table and resolution.

use tradefin_store::{key, StoreError, StoreTxn, Table};
use tradefin_types::Address;

use crate::error::IdentityError;

/// Persistence needed by identity resolution.
pub trait IdentityStore {
    /// The primary a secondary credential is linked to.
    fn primary_of(&self, secondary: &Address) -> Result<Option<Address>, StoreError>;
    /// The secondary credential linked to a primary.
    fn secondary_of(&self, primary: &Address) -> Result<Option<Address>, StoreError>;
    fn put_link(&mut self, secondary: &Address, primary: &Address) -> Result<(), StoreError>;

    /// The primary a secondary credential has asked to be linked to.
    fn link_request(&self, secondary: &Address) -> Result<Option<Address>, StoreError>;
    fn put_link_request(&mut self, secondary: &Address, primary: &Address) -> Result<(), StoreError>;
    fn clear_link_request(&mut self, secondary: &Address);
}

impl IdentityStore for StoreTxn<'_> {
    fn primary_of(&self, secondary: &Address) -> Result<Option<Address>, StoreError> {
        self.get(Table::IdentityPrimary, &key::address(secondary))
    }

    fn secondary_of(&self, primary: &Address) -> Result<Option<Address>, StoreError> {
        self.get(Table::IdentitySecondary, &key::address(primary))
    }

    fn put_link(&mut self, secondary: &Address, primary: &Address) -> Result<(), StoreError> {
        self.put(Table::IdentityPrimary, key::address(secondary), primary)?;
        self.put(Table::IdentitySecondary, key::address(primary), secondary)
    }

    fn link_request(&self, secondary: &Address) -> Result<Option<Address>, StoreError> {
        self.get(Table::IdentityRequests, &key::address(secondary))
    }

    fn put_link_request(&mut self, secondary: &Address, primary: &Address) -> Result<(), StoreError> {
        self.put(Table::IdentityRequests, key::address(secondary), primary)
    }

    fn clear_link_request(&mut self, secondary: &Address) {
        self.delete(Table::IdentityRequests, key::address(secondary));
    }
}

/// Bidirectional 1:1 mapping between secondary credentials and primaries.
pub struct IdentityResolver;

impl IdentityResolver {
    /// The canonical identity of `addr`: its primary when `addr` is a linked
    /// secondary, otherwise `addr` itself.
    pub fn resolve<S: IdentityStore>(store: &S, addr: &Address) -> Result<Address, IdentityError> {
        Ok(store.primary_of(addr)?.unwrap_or(*addr))
    }

    /// Whether `addr` is on either side of a link.
    pub fn is_linked<S: IdentityStore>(store: &S, addr: &Address) -> Result<bool, IdentityError> {
        Ok(store.primary_of(addr)?.is_some() || store.secondary_of(addr)?.is_some())
    }

    pub fn link<S: IdentityStore>(
        store: &mut S,
        secondary: &Address,
        primary: &Address,
    ) -> Result<(), IdentityError> {
        Self::check_pair(store, secondary, primary)?;
        store.put_link(secondary, primary)?;
        tracing::info!(%secondary, %primary, "linked secondary credential");
        Ok(())
    }

    /// Record that `secondary` consents to act for `primary`. A newer
    /// request from the same secondary replaces the older one.
    pub fn request_link<S: IdentityStore>(
        store: &mut S,
        secondary: &Address,
        primary: &Address,
    ) -> Result<(), IdentityError> {
        Self::check_pair(store, secondary, primary)?;
        store.put_link_request(secondary, primary)?;
        tracing::info!(%secondary, %primary, "link requested");
        Ok(())
    }

    /// Complete a link the secondary asked for.
    pub fn confirm_link<S: IdentityStore>(
        store: &mut S,
        secondary: &Address,
        primary: &Address,
    ) -> Result<(), IdentityError> {
        if store.link_request(secondary)? != Some(*primary) {
            return Err(IdentityError::NoLinkRequest {
                secondary: *secondary,
                primary: *primary,
            });
        }
        Self::link(store, secondary, primary)?;
        store.clear_link_request(secondary);
        Ok(())
    }

    fn check_pair<S: IdentityStore>(
        store: &S,
        secondary: &Address,
        primary: &Address,
    ) -> Result<(), IdentityError> {
        if secondary.is_zero() || primary.is_zero() || secondary == primary {
            return Err(IdentityError::InvalidAddress {
                secondary: *secondary,
                primary: *primary,
            });
        }
        for addr in [secondary, primary] {
            if Self::is_linked(store, addr)? {
                return Err(IdentityError::AlreadyLinked(*addr));
            }
        }
        Ok(())
    }

    /// Link only when `secondary` is unlinked and `primary` has no secondary
    /// yet. Returns whether a link was created.
    pub fn auto_link_if_needed<S: IdentityStore>(
        store: &mut S,
        secondary: &Address,
        primary: &Address,
    ) -> Result<bool, IdentityError> {
        if secondary.is_zero() || primary.is_zero() || secondary == primary {
            return Ok(false);
        }
        if Self::is_linked(store, secondary)? || Self::is_linked(store, primary)? {
            return Ok(false);
        }
        store.put_link(secondary, primary)?;
        tracing::debug!(%secondary, %primary, "auto-linked secondary credential");
        Ok(true)
    }
}
