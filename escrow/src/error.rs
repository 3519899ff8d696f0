use thiserror::Error;
use tradefin_access::AccessError;
use tradefin_identity::IdentityError;
use tradefin_store::StoreError;
use tradefin_types::{Address, Amount, DocHash, ErrorCode, ErrorKind, Timestamp};

use crate::model::{DisputeStatus, EscrowStatus};

#[derive(Debug, Error)]
pub enum EscrowError {
    #[error("escrow {0} not found")]
    EscrowNotFound(u64),

    #[error("importer, exporter and arbitrator must be distinct non-zero addresses")]
    InvalidParties,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("arbitrator fee {fee} must be below the total {total}")]
    ArbitratorFeeTooHigh { fee: Amount, total: Amount },

    #[error("an escrow needs at least one milestone")]
    NoMilestones,

    #[error("at most {max} milestones allowed")]
    TooManyMilestones { max: usize },

    #[error("milestone {0} has a zero amount")]
    InvalidMilestoneAmount(usize),

    #[error("milestones sum to {sum}, above the total {total}")]
    MilestonesExceedTotal { sum: Amount, total: Amount },

    #[error("text exceeds {max} characters")]
    TextTooLong { max: usize },

    #[error("dispute reason must not be empty")]
    EmptyReason,

    #[error("deadline {0} is not in the future")]
    DeadlineInPast(Timestamp),

    #[error("deadline {0} has passed")]
    DeadlinePassed(Timestamp),

    #[error("deadline {0} has not passed yet")]
    DeadlineNotReached(Timestamp),

    #[error("expected exactly {expected}, got {got}")]
    AmountMismatch { expected: Amount, got: Amount },

    #[error("escrow {id} is {status}")]
    InvalidStatus { id: u64, status: EscrowStatus },

    #[error("{0} may not perform this action")]
    Unauthorized(Address),

    #[error("milestone {0} does not exist")]
    InvalidMilestone(usize),

    #[error("milestone {0} is already completed")]
    MilestoneAlreadyCompleted(usize),

    #[error("milestone {0} is not completed")]
    MilestoneNotCompleted(usize),

    #[error("milestone {0} is already released")]
    MilestoneAlreadyReleased(usize),

    #[error("release would exceed the escrow total")]
    ExceedsTotal,

    #[error("a dispute is open")]
    DisputeActive,

    #[error("no dispute has been raised")]
    NoDispute,

    #[error("dispute is {0}")]
    InvalidDisputeStatus(DisputeStatus),

    #[error("sub-wallet {0} is not allowed")]
    InvalidSubWallet(Address),

    #[error("sub-wallet {0} already exists")]
    DuplicateSubWallet(Address),

    #[error("at most {max} sub-wallets allowed")]
    TooManySubWallets { max: usize },

    #[error("a sub-wallet needs at least one permission")]
    NoPermissions,

    #[error("document {0} is already linked")]
    DocumentAlreadyLinked(DocHash),

    #[error("arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for EscrowError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParties
            | Self::ZeroAmount
            | Self::ArbitratorFeeTooHigh { .. }
            | Self::NoMilestones
            | Self::TooManyMilestones { .. }
            | Self::InvalidMilestoneAmount(_)
            | Self::MilestonesExceedTotal { .. }
            | Self::TextTooLong { .. }
            | Self::EmptyReason
            | Self::DeadlineInPast(_)
            | Self::AmountMismatch { .. }
            | Self::InvalidMilestone(_)
            | Self::InvalidSubWallet(_)
            | Self::TooManySubWallets { .. }
            | Self::NoPermissions
            | Self::Overflow => ErrorKind::Validation,
            Self::EscrowNotFound(_)
            | Self::DeadlinePassed(_)
            | Self::DeadlineNotReached(_)
            | Self::InvalidStatus { .. }
            | Self::MilestoneAlreadyCompleted(_)
            | Self::MilestoneNotCompleted(_)
            | Self::MilestoneAlreadyReleased(_)
            | Self::DisputeActive
            | Self::NoDispute
            | Self::InvalidDisputeStatus(_)
            | Self::DuplicateSubWallet(_)
            | Self::DocumentAlreadyLinked(_) => ErrorKind::State,
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::ExceedsTotal => ErrorKind::Resource,
            Self::Access(e) => e.kind(),
            Self::Identity(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::EscrowNotFound(_) => "ESCROW_NOT_FOUND",
            Self::InvalidParties => "INVALID_PARTIES",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::ArbitratorFeeTooHigh { .. } => "ARBITRATOR_FEE_TOO_HIGH",
            Self::NoMilestones => "NO_MILESTONES",
            Self::TooManyMilestones { .. } => "TOO_MANY_MILESTONES",
            Self::InvalidMilestoneAmount(_) => "INVALID_MILESTONE_AMOUNT",
            Self::MilestonesExceedTotal { .. } => "MILESTONES_EXCEED_TOTAL",
            Self::TextTooLong { .. } => "TEXT_TOO_LONG",
            Self::EmptyReason => "EMPTY_REASON",
            Self::DeadlineInPast(_) => "DEADLINE_IN_PAST",
            Self::DeadlinePassed(_) => "DEADLINE_PASSED",
            Self::DeadlineNotReached(_) => "DEADLINE_NOT_REACHED",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::InvalidStatus { .. } => "INVALID_STATUS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidMilestone(_) => "INVALID_MILESTONE",
            Self::MilestoneAlreadyCompleted(_) => "MILESTONE_ALREADY_COMPLETED",
            Self::MilestoneNotCompleted(_) => "MILESTONE_NOT_COMPLETED",
            Self::MilestoneAlreadyReleased(_) => "MILESTONE_ALREADY_RELEASED",
            Self::ExceedsTotal => "EXCEEDS_TOTAL",
            Self::DisputeActive => "DISPUTE_ACTIVE",
            Self::NoDispute => "NO_DISPUTE",
            Self::InvalidDisputeStatus(_) => "INVALID_DISPUTE_STATUS",
            Self::InvalidSubWallet(_) => "INVALID_SUB_WALLET",
            Self::DuplicateSubWallet(_) => "DUPLICATE_SUB_WALLET",
            Self::TooManySubWallets { .. } => "TOO_MANY_SUB_WALLETS",
            Self::NoPermissions => "NO_PERMISSIONS",
            Self::DocumentAlreadyLinked(_) => "DOCUMENT_ALREADY_LINKED",
            Self::Overflow => "OVERFLOW",
            Self::Access(e) => e.code(),
            Self::Identity(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }
}
