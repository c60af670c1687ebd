use agora_types::BlockHeight;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("governance error: {0}")]
    Governance(#[from] agora_governance::GovernanceError),

    #[error("group error: {0}")]
    Group(#[from] agora_groups::GroupError),

    #[error("router error: {0}")]
    Router(#[from] agora_router::RouterError),

    #[error("store error: {0}")]
    Store(#[from] agora_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] agora_store_lmdb::LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("genesis error: {0}")]
    Genesis(String),

    #[error("block height {next} does not follow {current}")]
    HeightNotIncreasing { current: BlockHeight, next: BlockHeight },

    #[error("no block is open")]
    NoOpenBlock,

    #[error("block {0} is still open")]
    BlockOpen(BlockHeight),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
