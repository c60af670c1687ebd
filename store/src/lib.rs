//! Abstract storage traits for the Agora governance engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Values are opaque bytes; the owning engine encodes its records. Every
//! iterator returns entries in ascending key order so all replicas observe
//! the same sequence.

pub mod batch;
pub mod error;
pub mod group;
pub mod meta;
pub mod proposal;

pub use batch::{BatchStore, WriteBatch, WriteOp};
pub use error::StoreError;
pub use group::GroupStore;
pub use meta::MetaStore;
pub use proposal::ProposalStore;

/// Everything the governance engine and its registries need from a backend.
pub trait GovernanceBackend: GroupStore + ProposalStore + MetaStore + BatchStore {}

impl<T: GroupStore + ProposalStore + MetaStore + BatchStore> GovernanceBackend for T {}
