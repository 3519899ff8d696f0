use thiserror::Error;
use tradefin_store::StoreError;
use tradefin_types::{Address, ErrorCode, ErrorKind};

use crate::lists::ListKind;
use crate::roles::Role;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("access gate already initialized")]
    AlreadyInitialized,

    #[error("access gate has not been initialized")]
    NotInitialized,

    #[error("platform is halted")]
    Halted,

    #[error("{0} is not the owner")]
    NotOwner(Address),

    #[error("pause flag is already {0}")]
    AlreadyInState(bool),

    #[error("invalid address: {0}")]
    InvalidAddress(Address),

    #[error("invalid {kind} entry: {value:?}")]
    InvalidListEntry { kind: ListKind, value: String },

    #[error("{kind} entry {value:?} already present")]
    AlreadyListed { kind: ListKind, value: String },

    #[error("{kind} entry {value:?} not present")]
    NotListed { kind: ListKind, value: String },

    #[error("token {0} is not supported")]
    UnsupportedToken(Address),

    #[error("currency {0} is not supported")]
    UnsupportedCurrency(String),

    #[error("country {0} is not supported")]
    UnsupportedCountry(String),

    #[error("verified users must carry a country")]
    CountryRequired,

    #[error("{user} already holds role {role}")]
    RoleAlreadyGranted { user: Address, role: Role },

    #[error("{user} does not hold role {role}")]
    MissingRole { user: Address, role: Role },

    #[error("{0} is not a verified user")]
    NotVerified(Address),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for AccessError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_)
            | Self::InvalidListEntry { .. }
            | Self::UnsupportedToken(_)
            | Self::UnsupportedCurrency(_)
            | Self::UnsupportedCountry(_)
            | Self::CountryRequired => ErrorKind::Validation,
            Self::AlreadyInitialized
            | Self::NotInitialized
            | Self::AlreadyInState(_)
            | Self::AlreadyListed { .. }
            | Self::NotListed { .. }
            | Self::RoleAlreadyGranted { .. } => ErrorKind::State,
            Self::Halted | Self::NotOwner(_) | Self::MissingRole { .. } | Self::NotVerified(_) => {
                ErrorKind::Authorization
            }
            Self::Store(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::Halted => "HALTED",
            Self::NotOwner(_) => "NOT_OWNER",
            Self::AlreadyInState(_) => "ALREADY_IN_STATE",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
            Self::InvalidListEntry { .. } => "INVALID_LIST_ENTRY",
            Self::AlreadyListed { .. } => "ALREADY_LISTED",
            Self::NotListed { .. } => "NOT_LISTED",
            Self::UnsupportedToken(_) => "UNSUPPORTED_TOKEN",
            Self::UnsupportedCurrency(_) => "UNSUPPORTED_CURRENCY",
            Self::UnsupportedCountry(_) => "UNSUPPORTED_COUNTRY",
            Self::CountryRequired => "COUNTRY_REQUIRED",
            Self::RoleAlreadyGranted { .. } => "ROLE_ALREADY_GRANTED",
            Self::MissingRole { .. } => "MISSING_ROLE",
            Self::NotVerified(_) => "NOT_VERIFIED",
            Self::Store(e) => e.code(),
        }
    }
}
