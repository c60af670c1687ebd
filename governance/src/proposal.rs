//! Governance proposals and their lifecycle.

use crate::error::GovernanceError;
use crate::tally::Tally;
use agora_router::RouteKey;
use agora_store::StoreError;
use agora_types::{Address, BlockHeight, GroupId, ProposalId, Weight};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Open for votes. Initial state.
    Voting,
    /// The tally passed; waiting for `TryExecute`.
    Passed,
    /// The tally failed, was vetoed, or the voting period ran out.
    Rejected,
    /// Withdrawn by the proposer while voting.
    Withdrawn,
    /// The action was applied.
    Executed,
    /// The handler reported failure. Never retried.
    ExecutionFailed,
}

impl ProposalStatus {
    pub const ALL: [Self; 6] = [
        Self::Voting,
        Self::Passed,
        Self::Rejected,
        Self::Withdrawn,
        Self::Executed,
        Self::ExecutionFailed,
    ];

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Withdrawn | Self::Executed | Self::ExecutionFailed
        )
    }

    /// The legal edges of the lifecycle.
    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        matches!(
            (self, next),
            (Self::Voting, Self::Passed)
                | (Self::Voting, Self::Rejected)
                | (Self::Voting, Self::Withdrawn)
                | (Self::Passed, Self::Executed)
                | (Self::Passed, Self::ExecutionFailed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voting => "voting",
            Self::Passed => "passed",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
            Self::Executed => "executed",
            Self::ExecutionFailed => "execution_failed",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vote option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOption {
    Yes,
    No,
    /// Counts toward quorum only.
    Abstain,
    /// Counts toward quorum and can block the proposal outright.
    Veto,
}

/// What a passed proposal executes: an opaque payload for the handler bound
/// to `route`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub route: RouteKey,
    /// Module-specific bytes, never interpreted by the engine.
    #[serde(with = "hex")]
    pub payload: Vec<u8>,
}

impl Action {
    pub fn new(route: RouteKey, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            route,
            payload: payload.into(),
        }
    }
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    /// The group whose members vote on this proposal.
    pub group: GroupId,
    pub action: Action,
    pub status: ProposalStatus,
    /// The group's total weight at creation. Frozen: later membership
    /// changes never move the quorum base.
    pub weight_snapshot: u128,
    pub created_at: BlockHeight,
    /// Height at which the proposal left `Voting`.
    #[serde(default)]
    pub decided_at: Option<BlockHeight>,
    /// The tally that decided the proposal.
    #[serde(default)]
    pub final_tally: Option<Tally>,
    #[serde(default)]
    pub executed_at: Option<BlockHeight>,
    /// Handler-supplied reason, set when execution failed.
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl Proposal {
    /// Move to `next`, refusing any edge the lifecycle does not allow.
    pub fn transition(
        &mut self,
        next: ProposalStatus,
        operation: &'static str,
    ) -> Result<(), GovernanceError> {
        if !self.status.can_transition_to(next) {
            return Err(GovernanceError::InvalidState {
                id: self.id,
                status: self.status,
                operation,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Height after which votes are no longer accepted, if a period is set.
    pub fn voting_deadline(&self, voting_period_blocks: u64) -> Option<BlockHeight> {
        (voting_period_blocks > 0).then(|| {
            BlockHeight::new(self.created_at.as_u64().saturating_add(voting_period_blocks))
        })
    }

    pub fn summary(&self) -> ProposalSummary {
        ProposalSummary {
            id: self.id,
            status: self.status,
            proposer: self.proposer.clone(),
            group: self.group.clone(),
            route: self.action.route.clone(),
            weight_snapshot: self.weight_snapshot,
        }
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        bincode::deserialize(bytes)
            .map_err(|e| StoreError::Corruption(format!("proposal record: {e}")))
    }
}

/// A cast vote, stored per (proposal, voter).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub option: VoteOption,
    /// The voter's weight when the vote was cast.
    pub weight_at_cast: Weight,
    pub cast_at: BlockHeight,
}

impl VoteRecord {
    pub(crate) fn encode(&self) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Corruption(format!("vote record: {e}")))
    }
}

/// One row of `ListProposals`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSummary {
    pub id: ProposalId,
    pub status: ProposalStatus,
    pub proposer: Address,
    pub group: GroupId,
    pub route: RouteKey,
    pub weight_snapshot: u128,
}

/// Answer to `GetProposal`: the proposal plus its vote tally.
///
/// For an open proposal the tally reflects the current votes; for a decided
/// one it is the tally that decided it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalView {
    pub proposal: Proposal,
    pub tally: Tally,
}
