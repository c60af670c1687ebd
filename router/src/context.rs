//! Context handed to handlers alongside the action payload.

use agora_types::{Address, BlockHeight, GroupId, ProposalId};

/// Who is acting, for which group, at which height.
///
/// Everything a handler may depend on besides ledger state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    /// The proposal whose action is being checked or executed.
    pub proposal_id: ProposalId,
    /// The original proposer.
    pub proposer: Address,
    /// The group that voted on the proposal.
    pub group: GroupId,
    /// Height of the block carrying the transaction.
    pub height: BlockHeight,
}
