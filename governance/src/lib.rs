//! Governance for the Agora ledger.
//!
//! Lifecycle: Voting → Passed | Rejected | Withdrawn, then Passed → Executed | ExecutionFailed.
//! Votes are weighted by the proposing group's membership; the group's total
//! weight is frozen into the proposal at creation and used as the quorum base.
//! Every vote re-runs the tally, so a proposal closes as soon as it is decided.
//! A passed proposal's action is executed through the action router exactly once.

pub mod engine;
pub mod error;
pub mod params;
pub mod proposal;
pub mod tally;

pub use engine::ProposalEngine;
pub use error::{ErrorKind, GovernanceError};
pub use params::{GovernanceParams, ThresholdRule, VoteWeighting};
pub use proposal::{Action, Proposal, ProposalStatus, ProposalSummary, ProposalView, VoteOption, VoteRecord};
pub use tally::{evaluate, Tally, TallyOutcome};
