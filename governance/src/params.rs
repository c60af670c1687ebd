//! Tally and lifecycle parameters.
//!
//! Every replica must run with identical parameters; they are part of the
//! chain configuration, not a local preference.

use agora_types::Ratio;
use serde::{Deserialize, Serialize};

/// How the pass threshold compares against the Yes share.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdRule {
    /// Yes must strictly exceed the threshold; ties keep the status quo.
    #[default]
    Exceed,
    /// Yes meeting the threshold is enough.
    AtLeast,
}

/// Which weight a cast vote carries when the tally runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteWeighting {
    /// The voter's current weight in the proposal's group, looked up at
    /// every evaluation. A membership change mid-vote re-weights votes
    /// already cast.
    #[default]
    Live,
    /// The voter's weight when the vote was cast.
    AtCast,
}

/// Governance parameters for one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Minimum participating share of the weight snapshot (inclusive).
    #[serde(default = "default_quorum")]
    pub quorum: Ratio,

    /// Share of Yes among Yes + No needed to pass.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: Ratio,

    /// Veto share of participating weight above which a proposal is rejected.
    #[serde(default = "default_veto_threshold")]
    pub veto_threshold: Ratio,

    #[serde(default)]
    pub threshold_rule: ThresholdRule,

    /// Blocks a proposal stays open for voting; 0 means no deadline.
    #[serde(default)]
    pub voting_period_blocks: u64,

    #[serde(default)]
    pub vote_weighting: VoteWeighting,
}

fn default_quorum() -> Ratio {
    Ratio::HALF
}

fn default_pass_threshold() -> Ratio {
    Ratio::HALF
}

fn default_veto_threshold() -> Ratio {
    Ratio::ONE_THIRD
}

impl GovernanceParams {
    /// Whether proposals close on a block-height deadline.
    pub fn has_voting_period(&self) -> bool {
        self.voting_period_blocks > 0
    }
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            quorum: default_quorum(),
            pass_threshold: default_pass_threshold(),
            veto_threshold: default_veto_threshold(),
            threshold_rule: ThresholdRule::default(),
            voting_period_blocks: 0,
            vote_weighting: VoteWeighting::default(),
        }
    }
}
