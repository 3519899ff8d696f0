use thiserror::Error;
use tradefin_access::AccessError;
use tradefin_escrow::EscrowError;
use tradefin_identity::IdentityError;
use tradefin_store::StoreError;
use tradefin_types::{Address, Amount, DocHash, ErrorCode, ErrorKind, Timestamp};

use crate::model::InvoiceStatus;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invoice {0} not found")]
    InvoiceNotFound(u64),

    #[error("invoice number {0} is already used")]
    DuplicateInvoiceNumber(String),

    #[error("invoice number must be non-empty and at most {max} bytes")]
    InvalidInvoiceNumber { max: usize },

    #[error("payer and payee must be distinct non-zero addresses")]
    InvalidParties,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("due date {0} is not in the future")]
    DueDateInPast(Timestamp),

    #[error("invoice is not due until {0}")]
    NotOverdue(Timestamp),

    #[error("text exceeds {max} characters")]
    TextTooLong { max: usize },

    #[error("invoice {id} is {status}")]
    InvalidStatus { id: u64, status: InvoiceStatus },

    #[error("expected exactly {expected}, got {got}")]
    AmountMismatch { expected: Amount, got: Amount },

    #[error("document {0} is already registered")]
    DuplicateDocument(DocHash),

    #[error("document {0} not found")]
    DocumentNotFound(DocHash),

    #[error("document hash must be non-zero")]
    InvalidHash,

    #[error("link target id must be non-zero")]
    InvalidTarget,

    #[error("escrow {0} not found")]
    EscrowNotFound(u64),

    #[error("document {0} is already linked to the target")]
    AlreadyLinked(DocHash),

    #[error("{0} may not perform this action")]
    Unauthorized(Address),

    #[error(transparent)]
    Escrow(#[from] EscrowError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for RegistryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateInvoiceNumber(_)
            | Self::InvalidStatus { .. }
            | Self::NotOverdue(_)
            | Self::InvoiceNotFound(_)
            | Self::DuplicateDocument(_)
            | Self::DocumentNotFound(_)
            | Self::EscrowNotFound(_)
            | Self::AlreadyLinked(_) => ErrorKind::State,
            Self::InvalidInvoiceNumber { .. }
            | Self::InvalidParties
            | Self::ZeroAmount
            | Self::DueDateInPast(_)
            | Self::TextTooLong { .. }
            | Self::AmountMismatch { .. }
            | Self::InvalidHash
            | Self::InvalidTarget => ErrorKind::Validation,
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::Escrow(e) => e.kind(),
            Self::Access(e) => e.kind(),
            Self::Identity(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::DuplicateInvoiceNumber(_) => "DUPLICATE_INVOICE_NUMBER",
            Self::InvalidInvoiceNumber { .. } => "INVALID_INVOICE_NUMBER",
            Self::InvalidParties => "INVALID_PARTIES",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::DueDateInPast(_) => "DUE_DATE_IN_PAST",
            Self::NotOverdue(_) => "NOT_OVERDUE",
            Self::TextTooLong { .. } => "TEXT_TOO_LONG",
            Self::InvalidStatus { .. } => "INVALID_STATUS",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::DuplicateDocument(_) => "DUPLICATE_DOCUMENT",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::InvalidHash => "INVALID_HASH",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::EscrowNotFound(_) => "ESCROW_NOT_FOUND",
            Self::AlreadyLinked(_) => "ALREADY_LINKED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Escrow(e) => e.code(),
            Self::Access(e) => e.code(),
            Self::Identity(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }
}
