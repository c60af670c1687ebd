//! Nullable action handler: record dispatched actions without applying them.

use agora_router::{ActionHandler, ExecutionContext, ExecutionFailure};
use agora_store::WriteBatch;
use agora_types::ProposalId;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    fail_with: Mutex<Option<String>>,
    reject_with: Mutex<Option<String>>,
    executed: Mutex<Vec<(ProposalId, Vec<u8>)>>,
    checked: Mutex<Vec<(ProposalId, Vec<u8>)>>,
}

/// A test handler whose verdicts are set programmatically.
///
/// Clones share state, so a test can keep one clone for assertions after
/// moving another into a router.
#[derive(Clone, Default)]
pub struct NullHandler {
    inner: Arc<Inner>,
}

impl NullHandler {
    /// A handler that accepts and applies every action.
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// A handler whose `execute` always fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let handler = Self::default();
        handler.fail_with(reason);
        handler
    }

    /// Make subsequent executions fail with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.inner.fail_with.lock().unwrap() = Some(reason.into());
    }

    /// Make subsequent pre-vote checks fail with `reason`.
    pub fn reject_with(&self, reason: impl Into<String>) {
        *self.inner.reject_with.lock().unwrap() = Some(reason.into());
    }

    /// Actions that were successfully "applied", in dispatch order.
    pub fn executed(&self) -> Vec<(ProposalId, Vec<u8>)> {
        self.inner.executed.lock().unwrap().clone()
    }

    /// Actions that passed through `check`, in order.
    pub fn checked(&self) -> Vec<(ProposalId, Vec<u8>)> {
        self.inner.checked.lock().unwrap().clone()
    }

    /// Clear all state.
    pub fn reset(&self) {
        *self.inner.fail_with.lock().unwrap() = None;
        *self.inner.reject_with.lock().unwrap() = None;
        self.inner.executed.lock().unwrap().clear();
        self.inner.checked.lock().unwrap().clear();
    }
}

impl ActionHandler for NullHandler {
    fn check(&self, ctx: &ExecutionContext, payload: &[u8]) -> Result<(), ExecutionFailure> {
        if let Some(reason) = self.inner.reject_with.lock().unwrap().clone() {
            return Err(ExecutionFailure::new(reason));
        }
        self.inner
            .checked
            .lock()
            .unwrap()
            .push((ctx.proposal_id, payload.to_vec()));
        Ok(())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        payload: &[u8],
        _batch: &mut WriteBatch,
    ) -> Result<(), ExecutionFailure> {
        if let Some(reason) = self.inner.fail_with.lock().unwrap().clone() {
            return Err(ExecutionFailure::new(reason));
        }
        self.inner
            .executed
            .lock()
            .unwrap()
            .push((ctx.proposal_id, payload.to_vec()));
        Ok(())
    }
}
