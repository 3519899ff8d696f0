use thiserror::Error;
use tradefin_access::AccessError;
use tradefin_identity::IdentityError;
use tradefin_store::StoreError;
use tradefin_types::{Address, Amount, ErrorCode, ErrorKind, Timestamp};

#[derive(Debug, Error)]
pub enum StakingError {
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("stake of {amount} is below the minimum {minimum}")]
    BelowMinimumStake { amount: Amount, minimum: Amount },

    #[error("financier stake of {amount} is below the minimum {minimum}")]
    BelowFinancierMinimum { amount: Amount, minimum: Amount },

    #[error("lock until {deadline} is shorter than the earliest allowed {earliest}")]
    LockTooShort { deadline: Timestamp, earliest: Timestamp },

    #[error("no stake for {user} in token {token}")]
    StakeNotFound { user: Address, token: Address },

    #[error("cannot unstake {requested}: only {staked} staked")]
    InsufficientStake { requested: Amount, staked: Amount },

    #[error("stake is locked until {0}")]
    LockNotElapsed(Timestamp),

    #[error("no rewards to claim")]
    NothingToClaim,

    #[error("{0} is not a financier")]
    NotFinancier(Address),

    #[error("financier revocation already requested")]
    RevocationAlreadyRequested,

    #[error("no financier revocation was requested")]
    NoRevocationRequested,

    #[error("financier revocation can complete at {0}")]
    RevocationPending(Timestamp),

    #[error("price oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for StakingError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroAmount
            | Self::BelowMinimumStake { .. }
            | Self::BelowFinancierMinimum { .. }
            | Self::LockTooShort { .. }
            | Self::Overflow => ErrorKind::Validation,
            Self::StakeNotFound { .. }
            | Self::LockNotElapsed(_)
            | Self::NothingToClaim
            | Self::RevocationAlreadyRequested
            | Self::NoRevocationRequested
            | Self::RevocationPending(_) => ErrorKind::State,
            Self::NotFinancier(_) => ErrorKind::Authorization,
            Self::InsufficientStake { .. } => ErrorKind::Resource,
            Self::OracleUnavailable(_) => ErrorKind::External,
            Self::Access(e) => e.kind(),
            Self::Identity(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::BelowMinimumStake { .. } => "BELOW_MINIMUM_STAKE",
            Self::BelowFinancierMinimum { .. } => "BELOW_FINANCIER_MINIMUM",
            Self::LockTooShort { .. } => "LOCK_TOO_SHORT",
            Self::StakeNotFound { .. } => "STAKE_NOT_FOUND",
            Self::InsufficientStake { .. } => "INSUFFICIENT_STAKE",
            Self::LockNotElapsed(_) => "LOCK_NOT_ELAPSED",
            Self::NothingToClaim => "NOTHING_TO_CLAIM",
            Self::NotFinancier(_) => "NOT_FINANCIER",
            Self::RevocationAlreadyRequested => "REVOCATION_ALREADY_REQUESTED",
            Self::NoRevocationRequested => "NO_REVOCATION_REQUESTED",
            Self::RevocationPending(_) => "REVOCATION_PENDING",
            Self::OracleUnavailable(_) => "ORACLE_UNAVAILABLE",
            Self::Overflow => "OVERFLOW",
            Self::Access(e) => e.code(),
            Self::Identity(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }
}
