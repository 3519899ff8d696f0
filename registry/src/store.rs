use tradefin_store::{key, StoreError, StoreTxn, Table};
use tradefin_types::DocHash;

use crate::model::{DocumentRecord, Invoice};

pub trait RegistryStore {
    fn next_invoice_id(&mut self) -> Result<u64, StoreError>;
    fn invoice(&self, id: u64) -> Result<Option<Invoice>, StoreError>;
    fn put_invoice(&mut self, invoice: &Invoice) -> Result<(), StoreError>;
    fn invoice_id_by_number(&self, number: &str) -> Result<Option<u64>, StoreError>;
    fn put_invoice_number(&mut self, number: &str, id: u64) -> Result<(), StoreError>;
    /// Every invoice, in id order.
    fn invoices(&self) -> Result<Vec<Invoice>, StoreError>;

    fn document(&self, hash: &DocHash) -> Result<Option<DocumentRecord>, StoreError>;
    fn put_document(&mut self, record: &DocumentRecord) -> Result<(), StoreError>;
}

impl RegistryStore for StoreTxn<'_> {
    fn next_invoice_id(&mut self) -> Result<u64, StoreError> {
        self.next_id("invoice")
    }

    fn invoice(&self, id: u64) -> Result<Option<Invoice>, StoreError> {
        self.get(Table::Invoices, &key::id(id))
    }

    fn put_invoice(&mut self, invoice: &Invoice) -> Result<(), StoreError> {
        self.put(Table::Invoices, key::id(invoice.id), invoice)
    }

    fn invoice_id_by_number(&self, number: &str) -> Result<Option<u64>, StoreError> {
        self.get(Table::InvoiceNumbers, &key::text(number))
    }

    fn put_invoice_number(&mut self, number: &str, id: u64) -> Result<(), StoreError> {
        self.put(Table::InvoiceNumbers, key::text(number), &id)
    }

    fn invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        Ok(self
            .scan::<Invoice>(Table::Invoices, &[])?
            .into_iter()
            .map(|(_, invoice)| invoice)
            .collect())
    }

    fn document(&self, hash: &DocHash) -> Result<Option<DocumentRecord>, StoreError> {
        self.get(Table::Documents, &key::doc(hash))
    }

    fn put_document(&mut self, record: &DocumentRecord) -> Result<(), StoreError> {
        self.put(Table::Documents, key::doc(&record.hash), record)
    }
}
