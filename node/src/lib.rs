//! Agora node: the governance engines composed into one replicated
//! application.
//!
//! The node is the layer between the replication engine and the core:
//! - Imports and exports genesis state
//! - Tracks block heights and closes expired voting periods at block end
//! - Routes transaction messages to the registry and the proposal engine
//! - Binds the built-in `group` route so groups govern their own membership
//! - Loads configuration and installs structured logging

pub mod app;
pub mod config;
pub mod error;
pub mod genesis;
pub mod group_admin;
pub mod logging;
pub mod msg;
pub mod tracing_spans;

pub use app::{open_lmdb, AnyApp, App, AppBuilder};
pub use config::{NodeConfig, StorageBackend};
pub use error::NodeError;
pub use genesis::GenesisState;
pub use group_admin::{group_route, GroupAdminAction, GroupAdminHandler, GROUP_ROUTE};
pub use logging::{init_logging, LogFormat};
pub use msg::{Msg, TxOutcome};
