//! The handler capability contract.

use crate::context::ExecutionContext;
use agora_store::WriteBatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A handler reported that it could not apply (or accept) an action.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct ExecutionFailure {
    reason: String,
}

impl ExecutionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// The verdict of dispatching an action, as recorded on the proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    /// The handler applied every effect of the action.
    Applied,
    /// The handler applied nothing and reported why.
    Failed { reason: String },
}

impl ExecutionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl From<Result<(), ExecutionFailure>> for ExecutionOutcome {
    fn from(result: Result<(), ExecutionFailure>) -> Self {
        match result {
            Ok(()) => Self::Applied,
            Err(failure) => Self::Failed {
                reason: failure.reason,
            },
        }
    }
}

/// Module-supplied logic that applies the effect of a passed proposal.
///
/// Implementations must be pure functions of (ledger state, payload): no
/// wall clock, randomness or network access. `execute` stages its ledger
/// writes into `batch` instead of writing them; the engine commits them in
/// the same batch as the proposal's new status. Writes staged by a failed
/// execution are discarded.
pub trait ActionHandler: Send + Sync {
    /// Validate an action before it is put to a vote. Must not mutate state.
    ///
    /// The default accepts every payload.
    fn check(&self, _ctx: &ExecutionContext, _payload: &[u8]) -> Result<(), ExecutionFailure> {
        Ok(())
    }

    /// Apply the action.
    fn execute(
        &self,
        ctx: &ExecutionContext,
        payload: &[u8],
        batch: &mut WriteBatch,
    ) -> Result<(), ExecutionFailure>;
}
