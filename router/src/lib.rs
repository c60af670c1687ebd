//! Action router for the Agora governance engine.
//!
//! Independently developed modules register an [`ActionHandler`] under a
//! [`RouteKey`] while the application is being composed. A passed proposal
//! carries a route key and an opaque payload; the proposal engine hands both
//! to [`ActionRouter::dispatch`] and records the verdict.
//!
//! Design:
//! - Registration happens only through [`RouterBuilder`]; the built router is frozen
//! - The router never interprets payloads
//! - Handlers must be deterministic and stage their writes into the caller's
//!   batch; writes staged by a failed execution are dropped

pub mod context;
pub mod error;
pub mod handler;
pub mod route;
pub mod router;

pub use context::ExecutionContext;
pub use error::RouterError;
pub use handler::{ActionHandler, ExecutionFailure, ExecutionOutcome};
pub use route::RouteKey;
pub use router::{ActionRouter, RouterBuilder};
