//! Fundamental types for the Agora governance engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! member addresses, group and proposal identifiers, block heights and exact ratios.

pub mod address;
pub mod error;
pub mod height;
pub mod id;
pub mod ratio;

pub use address::Address;
pub use error::TypesError;
pub use height::BlockHeight;
pub use id::{GroupId, ProposalId};
pub use ratio::Ratio;

/// Voting power of a single member within a group.
pub type Weight = u64;
