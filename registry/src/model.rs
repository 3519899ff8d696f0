use serde::{Deserialize, Serialize};
use std::fmt;
use tradefin_types::{Address, Amount, DocHash, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn is_payable(self) -> bool {
        matches!(self, Self::Sent | Self::Viewed | Self::Overdue)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: u64,
    /// Payee-chosen reference, unique across the ledger.
    pub number: String,
    pub payer: Address,
    pub payee: Address,
    pub amount: Amount,
    pub token: Address,
    pub due_date: Timestamp,
    pub description: String,
    pub status: InvoiceStatus,
    pub created_at: Timestamp,
    pub paid_at: Option<Timestamp>,
    pub documents: Vec<DocHash>,
}

impl Invoice {
    pub fn is_party(&self, addr: &Address) -> bool {
        *addr == self.payer || *addr == self.payee
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub number: String,
    pub payer: Address,
    pub amount: Amount,
    pub token: Address,
    pub due_date: Timestamp,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Invoice,
    BillOfLading,
    PackingList,
    CertificateOfOrigin,
    InsuranceCertificate,
    PurchaseOrder,
    Contract,
    Other,
}

/// Attestation of an off-chain document. Only the verification fields
/// change after registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub hash: DocHash,
    pub metadata_uri: String,
    pub uploader: Address,
    pub timestamp: Timestamp,
    pub doc_type: DocumentType,
    /// Zero when not registered against an escrow.
    pub linked_escrow_id: u64,
    /// Zero when not registered against an invoice.
    pub linked_invoice_id: u64,
    pub verified: bool,
    pub verified_by: Option<Address>,
    pub verified_at: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub hash: DocHash,
    pub metadata_uri: String,
    pub doc_type: DocumentType,
    pub linked_escrow_id: u64,
    pub linked_invoice_id: u64,
}
