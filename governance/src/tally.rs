//! Weighted vote tally.
//!
//! `evaluate` is a pure function of the parameters, the frozen weight
//! snapshot and the weighted vote sums. The engine calls it after every vote
//! and once more when a voting period runs out.

use crate::params::{GovernanceParams, ThresholdRule};
use crate::proposal::VoteOption;
use agora_types::Weight;
use serde::{Deserialize, Serialize};

/// Weighted sums per vote option.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub yes: u128,
    pub no: u128,
    pub abstain: u128,
    pub veto: u128,
}

impl Tally {
    pub fn add(&mut self, option: VoteOption, weight: Weight) {
        let weight = u128::from(weight);
        match option {
            VoteOption::Yes => self.yes += weight,
            VoteOption::No => self.no += weight,
            VoteOption::Abstain => self.abstain += weight,
            VoteOption::Veto => self.veto += weight,
        }
    }

    pub fn from_votes(votes: impl IntoIterator<Item = (VoteOption, Weight)>) -> Self {
        let mut tally = Self::default();
        for (option, weight) in votes {
            tally.add(option, weight);
        }
        tally
    }

    /// Weight that showed up, whatever it voted.
    pub fn participating(&self) -> u128 {
        self.yes + self.no + self.abstain + self.veto
    }
}

/// Verdict of a tally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TallyOutcome {
    /// Quorum not reached yet.
    Undecided,
    Passed,
    Rejected,
}

impl TallyOutcome {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Undecided)
    }
}

/// Evaluate `tally` against a group whose total weight was `snapshot` when
/// the proposal was created.
///
/// Quorum is checked first (inclusive), then the veto block (strict), then
/// the pass threshold over Yes + No. Abstain and Veto only count toward
/// quorum. A tally without a single Yes never passes.
pub fn evaluate(params: &GovernanceParams, snapshot: u128, tally: &Tally) -> TallyOutcome {
    let participating = tally.participating();
    if !params.quorum.reached_by(participating, snapshot) {
        return TallyOutcome::Undecided;
    }
    if params.veto_threshold.exceeded_by(tally.veto, participating) {
        return TallyOutcome::Rejected;
    }
    let decisive = tally.yes + tally.no;
    let passes = tally.yes > 0
        && match params.threshold_rule {
            ThresholdRule::Exceed => params.pass_threshold.exceeded_by(tally.yes, decisive),
            ThresholdRule::AtLeast => params.pass_threshold.reached_by(tally.yes, decisive),
        };
    if passes {
        TallyOutcome::Passed
    } else {
        TallyOutcome::Rejected
    }
}
