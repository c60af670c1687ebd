//! LMDB storage backend for the Agora governance engine.
//!
//! Implements all storage traits from `agora-store` using the `heed` LMDB bindings.
//! Each logical store maps to one LMDB database within a single environment.

pub mod environment;
pub mod error;
pub mod group;
pub mod meta;
pub mod proposal;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use group::LmdbGroupStore;
pub use meta::LmdbMetaStore;
pub use proposal::LmdbProposalStore;
pub use write_batch::LmdbWriteBatch;
