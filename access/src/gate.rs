//! The singleton gate: owner and pause switch.

use serde::{Deserialize, Serialize};
use tradefin_types::Address;

use crate::error::AccessError;
use crate::store::AccessStore;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub owner: Address,
    pub paused: bool,
}

/// Entry point for every access check. Stateless; all state lives in the
/// shared store.
pub struct AccessGate;

impl AccessGate {
    /// Install the owner. Only possible once per store.
    pub fn initialize<S: AccessStore>(store: &mut S, owner: &Address) -> Result<(), AccessError> {
        if store.gate()?.is_some() {
            return Err(AccessError::AlreadyInitialized);
        }
        if owner.is_zero() {
            return Err(AccessError::InvalidAddress(*owner));
        }
        store.put_gate(&Gate {
            owner: *owner,
            paused: false,
        })?;
        tracing::info!(%owner, "access gate initialized");
        Ok(())
    }

    pub fn is_initialized<S: AccessStore>(store: &S) -> Result<bool, AccessError> {
        Ok(store.gate()?.is_some())
    }

    fn load<S: AccessStore>(store: &S) -> Result<Gate, AccessError> {
        store.gate()?.ok_or(AccessError::NotInitialized)
    }

    pub fn owner<S: AccessStore>(store: &S) -> Result<Address, AccessError> {
        Ok(Self::load(store)?.owner)
    }

    pub fn is_owner<S: AccessStore>(store: &S, caller: &Address) -> Result<bool, AccessError> {
        Ok(Self::load(store)?.owner == *caller)
    }

    pub fn is_paused<S: AccessStore>(store: &S) -> Result<bool, AccessError> {
        Ok(Self::load(store)?.paused)
    }

    /// Called first by every mutating operation outside owner administration.
    pub fn ensure_not_paused<S: AccessStore>(store: &S) -> Result<(), AccessError> {
        if Self::is_paused(store)? {
            return Err(AccessError::Halted);
        }
        Ok(())
    }

    pub fn ensure_owner<S: AccessStore>(store: &S, caller: &Address) -> Result<(), AccessError> {
        if !Self::is_owner(store, caller)? {
            return Err(AccessError::NotOwner(*caller));
        }
        Ok(())
    }

    pub fn set_paused<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        paused: bool,
    ) -> Result<(), AccessError> {
        let mut gate = Self::load(store)?;
        if gate.owner != *caller {
            return Err(AccessError::NotOwner(*caller));
        }
        if gate.paused == paused {
            return Err(AccessError::AlreadyInState(paused));
        }
        gate.paused = paused;
        store.put_gate(&gate)?;
        tracing::info!(paused, "pause flag changed");
        Ok(())
    }

    pub fn transfer_ownership<S: AccessStore>(
        store: &mut S,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), AccessError> {
        let mut gate = Self::load(store)?;
        if gate.owner != *caller {
            return Err(AccessError::NotOwner(*caller));
        }
        if new_owner.is_zero() {
            return Err(AccessError::InvalidAddress(*new_owner));
        }
        gate.owner = *new_owner;
        store.put_gate(&gate)?;
        tracing::info!(from = %caller, to = %new_owner, "ownership transferred");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradefin_nullables::NullStore;
    use tradefin_store::StoreTxn;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn initialize_once() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        assert!(matches!(
            AccessGate::owner(&txn),
            Err(AccessError::NotInitialized)
        ));
        AccessGate::initialize(&mut txn, &addr(1)).unwrap();
        assert!(matches!(
            AccessGate::initialize(&mut txn, &addr(2)),
            Err(AccessError::AlreadyInitialized)
        ));
        assert_eq!(AccessGate::owner(&txn).unwrap(), addr(1));
    }

    #[test]
    fn pause_round_trip() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        AccessGate::initialize(&mut txn, &addr(1)).unwrap();

        assert!(matches!(
            AccessGate::set_paused(&mut txn, &addr(2), true),
            Err(AccessError::NotOwner(_))
        ));
        assert!(matches!(
            AccessGate::set_paused(&mut txn, &addr(1), false),
            Err(AccessError::AlreadyInState(false))
        ));
        AccessGate::set_paused(&mut txn, &addr(1), true).unwrap();
        assert!(matches!(
            AccessGate::ensure_not_paused(&txn),
            Err(AccessError::Halted)
        ));
        AccessGate::set_paused(&mut txn, &addr(1), false).unwrap();
        AccessGate::ensure_not_paused(&txn).unwrap();
    }

    #[test]
    fn ownership_moves() {
        let backend = NullStore::new();
        let mut txn = StoreTxn::begin(&backend);
        AccessGate::initialize(&mut txn, &addr(1)).unwrap();
        assert!(AccessGate::transfer_ownership(&mut txn, &addr(1), &Address::ZERO).is_err());
        AccessGate::transfer_ownership(&mut txn, &addr(1), &addr(2)).unwrap();
        AccessGate::ensure_owner(&txn, &addr(2)).unwrap();
        assert!(AccessGate::ensure_owner(&txn, &addr(1)).is_err());
    }
}
