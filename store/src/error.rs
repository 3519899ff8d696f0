use thiserror::Error;
use tradefin_types::{ErrorCode, ErrorKind};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl ErrorCode for StoreError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::External
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "STORE_NOT_FOUND",
            Self::Backend(_) => "STORE_BACKEND",
            Self::Serialization(_) => "STORE_SERIALIZATION",
            Self::Corruption(_) => "STORE_CORRUPTION",
        }
    }
}
