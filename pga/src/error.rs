use thiserror::Error;
use tradefin_access::AccessError;
use tradefin_identity::IdentityError;
use tradefin_staking::StakingError;
use tradefin_store::StoreError;
use tradefin_types::{Address, Amount, DocHash, ErrorCode, ErrorKind, Timestamp};

use crate::model::PgaStatus;

#[derive(Debug, Error)]
pub enum PgaError {
    #[error("application {0} not found")]
    ApplicationNotFound(String),

    #[error("application {0} already exists")]
    DuplicateApplication(String),

    #[error("identifier must be non-empty and at most {max} bytes")]
    InvalidId { max: usize },

    #[error("buyer and seller must be distinct non-zero addresses")]
    InvalidParties,

    #[error("collateral {collateral} must be positive and below the trade value {trade_value}")]
    InvalidCollateral { collateral: Amount, trade_value: Amount },

    #[error("guarantee {guarantee} must be positive and at most the trade value {trade_value}")]
    InvalidGuarantee { guarantee: Amount, trade_value: Amount },

    #[error("duration must be at least {min} seconds")]
    DurationTooShort { min: u64 },

    #[error("text exceeds {max} characters")]
    TextTooLong { max: usize },

    #[error("no financier voting power is staked")]
    NoEligibleFinanciers,

    #[error("{0} is not a financier")]
    NotFinancier(Address),

    #[error("{0} has no financier voting power")]
    NoVotingPower(Address),

    #[error("{0} already voted")]
    AlreadyVoted(Address),

    #[error("seller already decided")]
    SellerAlreadyDecided,

    #[error("expected exactly {expected}, got {got}")]
    AmountMismatch { expected: Amount, got: Amount },

    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: PgaStatus, to: PgaStatus },

    #[error("application expired at {0}")]
    ApplicationExpired(Timestamp),

    #[error("application does not expire before {0}")]
    NotExpired(Timestamp),

    #[error("application cannot expire in its current state")]
    CannotExpire,

    #[error("{0} may not perform this action")]
    Unauthorized(Address),

    #[error("delivery agreement {0} not found")]
    AgreementNotFound(String),

    #[error("delivery agreement {0} already exists")]
    DuplicateAgreement(String),

    #[error("deadline {0} is not in the future")]
    DeadlineInPast(Timestamp),

    #[error("buyer already consented")]
    AlreadyConsented,

    #[error("delivery proof must not be empty")]
    EmptyProof,

    #[error("dispute reason must not be empty")]
    EmptyReason,

    #[error("dispute window closed at {0}")]
    DisputeWindowClosed(Timestamp),

    #[error("dispute already settled")]
    DisputeAlreadySettled,

    #[error("document {0} is already attached")]
    DocumentAlreadyAttached(DocHash),

    #[error("arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Staking(#[from] StakingError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for PgaError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidId { .. }
            | Self::InvalidParties
            | Self::InvalidCollateral { .. }
            | Self::InvalidGuarantee { .. }
            | Self::DurationTooShort { .. }
            | Self::TextTooLong { .. }
            | Self::AmountMismatch { .. }
            | Self::DeadlineInPast(_)
            | Self::EmptyProof
            | Self::EmptyReason
            | Self::Overflow => ErrorKind::Validation,
            Self::ApplicationNotFound(_)
            | Self::DuplicateApplication(_)
            | Self::AlreadyVoted(_)
            | Self::SellerAlreadyDecided
            | Self::InvalidTransition { .. }
            | Self::ApplicationExpired(_)
            | Self::NotExpired(_)
            | Self::CannotExpire
            | Self::AgreementNotFound(_)
            | Self::DuplicateAgreement(_)
            | Self::AlreadyConsented
            | Self::DisputeWindowClosed(_)
            | Self::DisputeAlreadySettled
            | Self::DocumentAlreadyAttached(_) => ErrorKind::State,
            Self::Unauthorized(_) | Self::NotFinancier(_) => ErrorKind::Authorization,
            Self::NoEligibleFinanciers | Self::NoVotingPower(_) => ErrorKind::Resource,
            Self::Staking(e) => e.kind(),
            Self::Access(e) => e.kind(),
            Self::Identity(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::ApplicationNotFound(_) => "APPLICATION_NOT_FOUND",
            Self::DuplicateApplication(_) => "DUPLICATE_APPLICATION",
            Self::InvalidId { .. } => "INVALID_ID",
            Self::InvalidParties => "INVALID_PARTIES",
            Self::InvalidCollateral { .. } => "INVALID_COLLATERAL",
            Self::InvalidGuarantee { .. } => "INVALID_GUARANTEE",
            Self::DurationTooShort { .. } => "DURATION_TOO_SHORT",
            Self::TextTooLong { .. } => "TEXT_TOO_LONG",
            Self::NoEligibleFinanciers => "NO_ELIGIBLE_FINANCIERS",
            Self::NotFinancier(_) => "NOT_FINANCIER",
            Self::NoVotingPower(_) => "NO_VOTING_POWER",
            Self::AlreadyVoted(_) => "ALREADY_VOTED",
            Self::SellerAlreadyDecided => "SELLER_ALREADY_DECIDED",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ApplicationExpired(_) => "APPLICATION_EXPIRED",
            Self::NotExpired(_) => "NOT_EXPIRED",
            Self::CannotExpire => "CANNOT_EXPIRE",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::AgreementNotFound(_) => "AGREEMENT_NOT_FOUND",
            Self::DuplicateAgreement(_) => "DUPLICATE_AGREEMENT",
            Self::DeadlineInPast(_) => "DEADLINE_IN_PAST",
            Self::AlreadyConsented => "ALREADY_CONSENTED",
            Self::EmptyProof => "EMPTY_PROOF",
            Self::EmptyReason => "EMPTY_REASON",
            Self::DisputeWindowClosed(_) => "DISPUTE_WINDOW_CLOSED",
            Self::DisputeAlreadySettled => "DISPUTE_ALREADY_SETTLED",
            Self::DocumentAlreadyAttached(_) => "DOCUMENT_ALREADY_ATTACHED",
            Self::Overflow => "OVERFLOW",
            Self::Staking(e) => e.code(),
            Self::Access(e) => e.code(),
            Self::Identity(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }
}
