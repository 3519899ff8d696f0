//! Persistence for the access tables.

use tradefin_store::{key, StoreError, StoreTxn, Table};
use tradefin_types::Address;

use crate::gate::Gate;
use crate::lists::ListKind;
use crate::roles::{Role, RoleGrant};

const GATE_KEY: &[u8] = b"gate";

pub trait AccessStore {
    fn gate(&self) -> Result<Option<Gate>, StoreError>;
    fn put_gate(&mut self, gate: &Gate) -> Result<(), StoreError>;

    fn list_contains(&self, list: ListKind, entry: &[u8]) -> Result<bool, StoreError>;
    fn put_list_entry(&mut self, list: ListKind, entry: &[u8]) -> Result<(), StoreError>;
    fn remove_list_entry(&mut self, list: ListKind, entry: &[u8]);
    fn list_entries(&self, list: ListKind) -> Result<Vec<Vec<u8>>, StoreError>;

    fn role(&self, role: Role, user: &Address) -> Result<Option<RoleGrant>, StoreError>;
    fn put_role(&mut self, grant: &RoleGrant) -> Result<(), StoreError>;
    fn remove_role(&mut self, role: Role, user: &Address);
}

fn list_key(list: ListKind, entry: &[u8]) -> Vec<u8> {
    key::compose(&[&[list.tag()], entry])
}

fn role_key(role: Role, user: &Address) -> Vec<u8> {
    key::compose(&[&[role.tag()], user.as_bytes()])
}

impl AccessStore for StoreTxn<'_> {
    fn gate(&self) -> Result<Option<Gate>, StoreError> {
        self.get(Table::AccessGate, GATE_KEY)
    }

    fn put_gate(&mut self, gate: &Gate) -> Result<(), StoreError> {
        self.put(Table::AccessGate, GATE_KEY.to_vec(), gate)
    }

    fn list_contains(&self, list: ListKind, entry: &[u8]) -> Result<bool, StoreError> {
        self.contains(Table::AccessLists, &list_key(list, entry))
    }

    fn put_list_entry(&mut self, list: ListKind, entry: &[u8]) -> Result<(), StoreError> {
        self.put(Table::AccessLists, list_key(list, entry), &entry.to_vec())
    }

    fn remove_list_entry(&mut self, list: ListKind, entry: &[u8]) {
        self.delete(Table::AccessLists, list_key(list, entry));
    }

    fn list_entries(&self, list: ListKind) -> Result<Vec<Vec<u8>>, StoreError> {
        let prefix = key::compose(&[&[list.tag()]]);
        Ok(self
            .scan::<Vec<u8>>(Table::AccessLists, &prefix)?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect())
    }

    fn role(&self, role: Role, user: &Address) -> Result<Option<RoleGrant>, StoreError> {
        self.get(Table::AccessRoles, &role_key(role, user))
    }

    fn put_role(&mut self, grant: &RoleGrant) -> Result<(), StoreError> {
        self.put(Table::AccessRoles, role_key(grant.role, &grant.user), grant)
    }

    fn remove_role(&mut self, role: Role, user: &Address) {
        self.delete(Table::AccessRoles, role_key(role, user));
    }
}
