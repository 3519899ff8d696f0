use thiserror::Error;
use tradefin_access::AccessError;
use tradefin_identity::IdentityError;
use tradefin_staking::StakingError;
use tradefin_store::StoreError;
use tradefin_types::{Address, Amount, ErrorCode, ErrorKind, Timestamp};

use crate::proposal::ProposalStatus;
use crate::request::RequestStatus;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("proposal {0} not found")]
    ProposalNotFound(u64),

    #[error("trade-finance request {0} not found")]
    RequestNotFound(u64),

    #[error("voting power {have} is below the proposal threshold {need}")]
    InsufficientVotingPower { have: Amount, need: Amount },

    #[error("title must be 1..={max} characters")]
    InvalidTitle { max: usize },

    #[error("text exceeds {max} characters")]
    TextTooLong { max: usize },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("voting window has closed")]
    VotingClosed,

    #[error("voting is open until {0}")]
    VotingStillOpen(Timestamp),

    #[error("wallet {0} has already voted")]
    AlreadyVoted(Address),

    #[error("wallet {0} has no voting power")]
    NoVotingPower(Address),

    #[error("proposal {id} is {status}")]
    InvalidProposalStatus { id: u64, status: ProposalStatus },

    #[error("request {id} is {status}")]
    InvalidRequestStatus { id: u64, status: RequestStatus },

    #[error("{0} may not perform this action")]
    Unauthorized(Address),

    #[error("{0} is not a financier")]
    NotFinancier(Address),

    #[error("proposal does not require multisig execution")]
    MultisigNotRequired,

    #[error("financier {0} has already approved execution")]
    AlreadyApproved(Address),

    #[error("execution approvals {have} < {need}")]
    InsufficientApprovals { have: u32, need: u32 },

    #[error("no financier voting power is staked")]
    NoEligibleFinanciers,

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

impl ErrorCode for GovernanceError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTitle { .. } | Self::TextTooLong { .. } | Self::ZeroAmount | Self::Overflow => {
                ErrorKind::Validation
            }
            Self::ProposalNotFound(_)
            | Self::RequestNotFound(_)
            | Self::VotingClosed
            | Self::VotingStillOpen(_)
            | Self::AlreadyVoted(_)
            | Self::InvalidProposalStatus { .. }
            | Self::InvalidRequestStatus { .. }
            | Self::MultisigNotRequired
            | Self::AlreadyApproved(_)
            | Self::InsufficientApprovals { .. } => ErrorKind::State,
            Self::Unauthorized(_) | Self::NotFinancier(_) => ErrorKind::Authorization,
            Self::InsufficientVotingPower { .. }
            | Self::NoVotingPower(_)
            | Self::NoEligibleFinanciers => ErrorKind::Resource,
            Self::Staking(e) => e.kind(),
            Self::Access(e) => e.kind(),
            Self::Identity(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::ProposalNotFound(_) => "PROPOSAL_NOT_FOUND",
            Self::RequestNotFound(_) => "REQUEST_NOT_FOUND",
            Self::InsufficientVotingPower { .. } => "INSUFFICIENT_VOTING_POWER",
            Self::InvalidTitle { .. } => "INVALID_TITLE",
            Self::TextTooLong { .. } => "TEXT_TOO_LONG",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::VotingClosed => "VOTING_CLOSED",
            Self::VotingStillOpen(_) => "VOTING_STILL_OPEN",
            Self::AlreadyVoted(_) => "ALREADY_VOTED",
            Self::NoVotingPower(_) => "NO_VOTING_POWER",
            Self::InvalidProposalStatus { .. } => "INVALID_PROPOSAL_STATUS",
            Self::InvalidRequestStatus { .. } => "INVALID_REQUEST_STATUS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFinancier(_) => "NOT_FINANCIER",
            Self::MultisigNotRequired => "MULTISIG_NOT_REQUIRED",
            Self::AlreadyApproved(_) => "ALREADY_APPROVED",
            Self::InsufficientApprovals { .. } => "INSUFFICIENT_APPROVALS",
            Self::NoEligibleFinanciers => "NO_ELIGIBLE_FINANCIERS",
            Self::Overflow => "OVERFLOW",
            Self::Staking(e) => e.code(),
            Self::Access(e) => e.code(),
            Self::Identity(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }
}
