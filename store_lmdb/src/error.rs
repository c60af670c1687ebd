use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed key in '{db}': {reason}")]
    BadKey { db: &'static str, reason: String },
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<LmdbError> for agora_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Heed(msg) => agora_store::StoreError::Backend(msg),
            LmdbError::Io(e) => agora_store::StoreError::Backend(e.to_string()),
            bad @ LmdbError::BadKey { .. } => agora_store::StoreError::Corruption(bad.to_string()),
        }
    }
}
