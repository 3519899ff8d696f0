use tradefin_store::{key, StoreError, StoreTxn, Table};

use crate::model::Escrow;

pub trait EscrowStore {
    fn next_escrow_id(&mut self) -> Result<u64, StoreError>;
    fn escrow(&self, id: u64) -> Result<Option<Escrow>, StoreError>;
    fn put_escrow(&mut self, escrow: &Escrow) -> Result<(), StoreError>;
    /// Every escrow, in id order.
    fn escrows(&self) -> Result<Vec<Escrow>, StoreError>;
}

impl EscrowStore for StoreTxn<'_> {
    fn next_escrow_id(&mut self) -> Result<u64, StoreError> {
        self.next_id("escrow")
    }

    fn escrow(&self, id: u64) -> Result<Option<Escrow>, StoreError> {
        self.get(Table::Escrows, &key::id(id))
    }

    fn put_escrow(&mut self, escrow: &Escrow) -> Result<(), StoreError> {
        self.put(Table::Escrows, key::id(escrow.id), escrow)
    }

    fn escrows(&self) -> Result<Vec<Escrow>, StoreError> {
        Ok(self
            .scan::<Escrow>(Table::Escrows, &[])?
            .into_iter()
            .map(|(_, escrow)| escrow)
            .collect())
    }
}
