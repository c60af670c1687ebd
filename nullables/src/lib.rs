//! Nullable infrastructure for deterministic testing.
//!
//! All external collaborators of the governance engine (the key-value store
//! and the modules behind action routes) are abstracted behind traits. This
//! crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod handler;
pub mod store;

pub use handler::NullHandler;
pub use store::{NullStore, WriteFault};
