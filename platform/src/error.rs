use thiserror::Error;
use tradefin_access::AccessError;
use tradefin_escrow::EscrowError;
use tradefin_governance::GovernanceError;
use tradefin_identity::IdentityError;
use tradefin_pga::PgaError;
use tradefin_registry::RegistryError;
use tradefin_staking::StakingError;
use tradefin_store::StoreError;
use tradefin_types::{ErrorCode, ErrorKind, TransferError};

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("access error: {0}")]
    Access(#[from] AccessError),

    #[error("staking error: {0}")]
    Staking(#[from] StakingError),

    #[error("governance error: {0}")]
    Governance(#[from] GovernanceError),

    #[error("escrow error: {0}")]
    Escrow(#[from] EscrowError),

    #[error("guarantee error: {0}")]
    Pga(#[from] PgaError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("token transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error("config error: {0}")]
    Config(String),

    #[error("logging error: {0}")]
    Logging(String),
}

impl ErrorCode for PlatformError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Identity(e) => e.kind(),
            Self::Access(e) => e.kind(),
            Self::Staking(e) => e.kind(),
            Self::Governance(e) => e.kind(),
            Self::Escrow(e) => e.kind(),
            Self::Pga(e) => e.kind(),
            Self::Registry(e) => e.kind(),
            Self::Store(e) => e.kind(),
            Self::TransferFailed(_) => ErrorKind::External,
            Self::Config(_) => ErrorKind::Validation,
            Self::Logging(_) => ErrorKind::External,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Identity(e) => e.code(),
            Self::Access(e) => e.code(),
            Self::Staking(e) => e.code(),
            Self::Governance(e) => e.code(),
            Self::Escrow(e) => e.code(),
            Self::Pga(e) => e.code(),
            Self::Registry(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::TransferFailed(_) => "TRANSFER_FAILED",
            Self::Config(_) => "CONFIG",
            Self::Logging(_) => "LOGGING",
        }
    }
}
