//! Invoices and trade documents.
//!
//! The invoice ledger tracks payee-issued invoices from draft to payment.
//! The document registry records content hashes of off-chain documents,
//! lets verifiers attest them, and links them to escrows and invoices.

pub mod documents;
pub mod error;
pub mod invoices;
pub mod model;
pub mod params;
pub mod store;

pub use documents::DocumentRegistry;
pub use error::RegistryError;
pub use invoices::InvoiceLedger;
pub use model::{DocumentRecord, DocumentType, Invoice, InvoiceStatus, NewDocument, NewInvoice};
pub use params::RegistryParams;
pub use store::RegistryStore;
