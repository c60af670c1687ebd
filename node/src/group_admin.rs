//! Built-in `group` route: membership changes decided by the group itself.
//!
//! The payload is a JSON [`GroupAdminAction`]. A group may only change its
//! own membership, so the target must be the group that voted.

use serde::{Deserialize, Serialize};
use tracing::info;

use agora_groups::{GroupRegistry, MemberUpdate};
use agora_router::{ActionHandler, ExecutionContext, ExecutionFailure, RouteKey};
use agora_store::{BatchStore, GroupStore, MetaStore, WriteBatch};
use agora_types::GroupId;

/// Route key the handler is registered under.
pub const GROUP_ROUTE: &str = "group";

pub fn group_route() -> RouteKey {
    RouteKey::parse(GROUP_ROUTE).expect("built-in route key is valid")
}

/// Membership updates for one group, applied all-or-nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAdminAction {
    pub group: GroupId,
    pub updates: Vec<MemberUpdate>,
}

impl GroupAdminAction {
    pub fn to_payload(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("GroupAdminAction is always serializable")
    }

    fn from_payload(ctx: &ExecutionContext, payload: &[u8]) -> Result<Self, ExecutionFailure> {
        let action: Self = serde_json::from_slice(payload)
            .map_err(|e| ExecutionFailure::new(format!("malformed group action: {e}")))?;
        if action.group != ctx.group {
            return Err(ExecutionFailure::new(format!(
                "group {} cannot change the membership of group {}",
                ctx.group, action.group
            )));
        }
        if action.updates.is_empty() {
            return Err(ExecutionFailure::new("group action has no updates"));
        }
        Ok(action)
    }
}

pub struct GroupAdminHandler<S> {
    registry: GroupRegistry<S>,
}

impl<S> GroupAdminHandler<S> {
    pub fn new(registry: GroupRegistry<S>) -> Self {
        Self { registry }
    }
}

impl<S> ActionHandler for GroupAdminHandler<S>
where
    S: GroupStore + MetaStore + BatchStore + Send + Sync,
{
    fn check(&self, ctx: &ExecutionContext, payload: &[u8]) -> Result<(), ExecutionFailure> {
        GroupAdminAction::from_payload(ctx, payload).map(|_| ())
    }

    fn execute(
        &self,
        ctx: &ExecutionContext,
        payload: &[u8],
        batch: &mut WriteBatch,
    ) -> Result<(), ExecutionFailure> {
        let action = GroupAdminAction::from_payload(ctx, payload)?;
        self.registry
            .stage_updates(&action.group, &action.updates, batch)
            .map_err(|e| ExecutionFailure::new(e.to_string()))?;
        info!(group = %action.group, proposal = %ctx.proposal_id, updates = action.updates.len(), "membership change staged");
        Ok(())
    }
}
