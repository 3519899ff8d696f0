use thiserror::Error;
use tradefin_store::StoreError;
use tradefin_types::{Address, ErrorCode, ErrorKind};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid link between {secondary} and {primary}")]
    InvalidAddress { secondary: Address, primary: Address },

    #[error("address {0} already participates in a link")]
    AlreadyLinked(Address),

    #[error("{secondary} has not asked to be linked to {primary}")]
    NoLinkRequest { secondary: Address, primary: Address },

    #[error("address {0} already holds stakes or roles of its own")]
    CredentialInUse(Address),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for IdentityError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress { .. } => ErrorKind::Validation,
            Self::AlreadyLinked(_) => ErrorKind::State,
            Self::NoLinkRequest { .. } => ErrorKind::Authorization,
            Self::CredentialInUse(_) => ErrorKind::State,
            Self::Store(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "INVALID_ADDRESS",
            Self::AlreadyLinked(_) => "ALREADY_LINKED",
            Self::NoLinkRequest { .. } => "NO_LINK_REQUEST",
            Self::CredentialInUse(_) => "CREDENTIAL_IN_USE",
            Self::Store(e) => e.code(),
        }
    }
}
