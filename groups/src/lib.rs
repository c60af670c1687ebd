//! Membership registry: named groups of weighted participants.
//!
//! Groups are the voting constituencies of the governance engine. Each group
//! maps member addresses to integer weights; a group's total weight is always
//! derived from its members and never stored.
//!
//! Design:
//! - Groups are created by an explicit message or imported at genesis
//! - Membership changes are add / remove / re-weight (weight 0 removes)
//! - Groups are never deleted; an empty group simply cannot pass proposals
//! - The registry is a thin handle over a shared store, cheap to clone into
//!   every component that needs weight lookups

pub mod error;
pub mod registry;
pub mod types;

pub use error::GroupError;
pub use registry::GroupRegistry;
pub use types::{Group, Member, MemberUpdate};
