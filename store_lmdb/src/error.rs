use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("no database handle for table {0}")]
    MissingDatabase(&'static str),

    #[error("failed to create data directory: {0}")]
    Io(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<std::io::Error> for LmdbError {
    fn from(e: std::io::Error) -> Self {
        LmdbError::Io(e.to_string())
    }
}

impl From<LmdbError> for tradefin_store::StoreError {
    fn from(e: LmdbError) -> Self {
        tradefin_store::StoreError::Backend(e.to_string())
    }
}
