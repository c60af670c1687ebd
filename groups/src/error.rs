use agora_types::GroupId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("invalid group input: {0}")]
    InvalidInput(String),

    #[error("store error: {0}")]
    Store(#[from] agora_store::StoreError),
}
