//! Transaction messages delivered by the replication layer, and their results.

use serde::{Deserialize, Serialize};

use agora_governance::{Action, ProposalStatus, VoteOption};
use agora_groups::Member;
use agora_router::ExecutionOutcome;
use agora_types::{Address, GroupId, ProposalId};

/// A state-transition request. Signature checks and fees are settled before
/// a message reaches the application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    CreateGroup {
        members: Vec<Member>,
    },
    CreateProposal {
        proposer: Address,
        group: GroupId,
        action: Action,
    },
    Vote {
        proposal_id: ProposalId,
        voter: Address,
        option: VoteOption,
    },
    TryExecuteProposal {
        proposal_id: ProposalId,
    },
    WithdrawProposal {
        proposal_id: ProposalId,
        proposer: Address,
    },
}

impl Msg {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Msg::CreateGroup { .. } => "create_group",
            Msg::CreateProposal { .. } => "create_proposal",
            Msg::Vote { .. } => "vote",
            Msg::TryExecuteProposal { .. } => "try_execute_proposal",
            Msg::WithdrawProposal { .. } => "withdraw_proposal",
        }
    }
}

/// Result of a successfully delivered message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxOutcome {
    GroupCreated(GroupId),
    ProposalCreated(ProposalId),
    /// The proposal's status after the vote.
    Voted(ProposalStatus),
    /// The handler's verdict. A failed execution is still a delivered
    /// transaction: the proposal moved to `ExecutionFailed`.
    Executed(ExecutionOutcome),
    Withdrawn,
}
