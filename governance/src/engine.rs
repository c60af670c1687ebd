//! Proposal engine: drives proposals through the lifecycle.

use crate::error::GovernanceError;
use crate::params::{GovernanceParams, VoteWeighting};
use crate::proposal::{
    Action, Proposal, ProposalStatus, ProposalSummary, ProposalView, VoteOption, VoteRecord,
};
use crate::tally::{evaluate, Tally, TallyOutcome};
use agora_groups::GroupRegistry;
use agora_router::{ActionRouter, ExecutionContext, ExecutionOutcome};
use agora_store::meta::NEXT_PROPOSAL_ID_KEY;
use agora_store::{GovernanceBackend, WriteBatch};
use agora_types::{Address, BlockHeight, GroupId, ProposalId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns proposal and vote records; reads group weights through the
/// registry and executes passed actions through the router.
pub struct ProposalEngine<S> {
    store: Arc<S>,
    groups: GroupRegistry<S>,
    router: ActionRouter,
    params: GovernanceParams,
}

impl<S: GovernanceBackend> ProposalEngine<S> {
    pub fn new(
        store: Arc<S>,
        groups: GroupRegistry<S>,
        router: ActionRouter,
        params: GovernanceParams,
    ) -> Self {
        Self {
            store,
            groups,
            router,
            params,
        }
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn router(&self) -> &ActionRouter {
        &self.router
    }

    pub fn groups(&self) -> &GroupRegistry<S> {
        &self.groups
    }

    /// Open a proposal for a vote by `group`.
    ///
    /// The group's total weight is captured as the proposal's weight
    /// snapshot. Checks run in order: route bound, group exists, group
    /// eligible for the route, proposer has weight, handler accepts payload.
    pub fn propose(
        &self,
        proposer: &Address,
        group: &GroupId,
        action: Action,
        height: BlockHeight,
    ) -> Result<ProposalId, GovernanceError> {
        if !self.router.contains(&action.route) {
            return Err(GovernanceError::RouteNotFound(action.route));
        }
        let source = self.groups.get_group(group)?;
        if !self.router.is_eligible(&action.route, group)? {
            return Err(GovernanceError::Unauthorized(format!(
                "group {group} may not propose on route {}",
                action.route
            )));
        }
        if source.weight_of(proposer) == 0 {
            return Err(GovernanceError::Unauthorized(format!(
                "{proposer} has no weight in group {group}"
            )));
        }

        let id = self.next_id()?;
        let following = id.next().ok_or_else(|| {
            GovernanceError::InvalidInput("proposal ids are exhausted".to_string())
        })?;
        let ctx = ExecutionContext {
            proposal_id: id,
            proposer: proposer.clone(),
            group: group.clone(),
            height,
        };
        self.router.check(&action.route, &ctx, &action.payload)?;

        let proposal = Proposal {
            id,
            proposer: proposer.clone(),
            group: group.clone(),
            action,
            status: ProposalStatus::Voting,
            weight_snapshot: source.total_weight(),
            created_at: height,
            decided_at: None,
            final_tally: None,
            executed_at: None,
            failure_reason: None,
        };
        let mut batch = WriteBatch::new();
        batch.put_proposal(id, proposal.encode()?);
        batch.put_counter(NEXT_PROPOSAL_ID_KEY, following.as_u64());
        self.store.commit_batch(batch)?;
        info!(
            proposal = %id,
            proposer = %proposer,
            group = %group,
            route = %proposal.action.route,
            snapshot = proposal.weight_snapshot,
            "proposal created"
        );
        Ok(id)
    }

    /// Cast or replace `voter`'s vote and re-run the tally.
    ///
    /// Returns the proposal's status after the vote: still `Voting`, or
    /// `Passed`/`Rejected` if this vote decided it.
    pub fn vote(
        &self,
        id: ProposalId,
        voter: &Address,
        option: VoteOption,
        height: BlockHeight,
    ) -> Result<ProposalStatus, GovernanceError> {
        let mut proposal = self.load(id)?;
        if proposal.status != ProposalStatus::Voting {
            return Err(GovernanceError::InvalidState {
                id,
                status: proposal.status,
                operation: "vote",
            });
        }
        if self.params.has_voting_period()
            && proposal
                .created_at
                .has_expired(self.params.voting_period_blocks, height)
        {
            let deadline = proposal
                .voting_deadline(self.params.voting_period_blocks)
                .unwrap_or(height);
            return Err(GovernanceError::VotingClosed { id, deadline });
        }
        let weight = self.groups.member_weight(&proposal.group, voter)?;
        if weight == 0 {
            return Err(GovernanceError::Unauthorized(format!(
                "{voter} has no weight in group {}",
                proposal.group
            )));
        }

        let record = VoteRecord {
            option,
            weight_at_cast: weight,
            cast_at: height,
        };
        let mut batch = WriteBatch::new();
        batch.put_vote(id, voter, record.encode()?);

        let tally = self.tally(&proposal, Some((voter, record)))?;
        let decided = match evaluate(&self.params, proposal.weight_snapshot, &tally) {
            TallyOutcome::Undecided => None,
            TallyOutcome::Passed => Some(ProposalStatus::Passed),
            TallyOutcome::Rejected => Some(ProposalStatus::Rejected),
        };
        if let Some(status) = decided {
            self.decide(&mut batch, &mut proposal, status, tally, height)?;
        }
        self.store.commit_batch(batch)?;

        debug!(proposal = %id, voter = %voter, ?option, weight, "vote cast");
        if decided.is_some() {
            log_decided(&proposal, &tally);
        }
        Ok(proposal.status)
    }

    /// Execute a passed proposal's action, exactly once.
    ///
    /// The handler's staged writes and the proposal's new status are
    /// committed together, so a storage error leaves the proposal `Passed`
    /// with none of the action's effects applied. A handler failure is not
    /// an error: it is recorded as `ExecutionFailed` and returned as the
    /// outcome.
    ///
    /// # Panics
    ///
    /// Panics if the proposal passed on a route the router has no handler
    /// for. Routes are checked at creation and import, so this means the
    /// stored state does not belong to this application's composition.
    pub fn try_execute(
        &self,
        id: ProposalId,
        height: BlockHeight,
    ) -> Result<ExecutionOutcome, GovernanceError> {
        let mut proposal = self.load(id)?;
        if proposal.status != ProposalStatus::Passed {
            return Err(GovernanceError::InvalidState {
                id,
                status: proposal.status,
                operation: "execute",
            });
        }
        let ctx = ExecutionContext {
            proposal_id: id,
            proposer: proposal.proposer.clone(),
            group: proposal.group.clone(),
            height,
        };
        let mut batch = WriteBatch::new();
        let outcome = match self.router.dispatch(
            &proposal.action.route,
            &ctx,
            &proposal.action.payload,
            &mut batch,
        ) {
            Ok(outcome) => outcome,
            Err(e) => panic!("passed proposal {id} cannot be dispatched: {e}"),
        };

        match &outcome {
            ExecutionOutcome::Applied => {
                proposal.transition(ProposalStatus::Executed, "execute")?;
            }
            ExecutionOutcome::Failed { reason } => {
                proposal.transition(ProposalStatus::ExecutionFailed, "execute")?;
                proposal.failure_reason = Some(reason.clone());
            }
        }
        proposal.executed_at = Some(height);
        batch.put_proposal(id, proposal.encode()?);
        self.store.commit_batch(batch)?;

        match &outcome {
            ExecutionOutcome::Applied => {
                info!(proposal = %id, route = %proposal.action.route, "proposal executed");
            }
            ExecutionOutcome::Failed { reason } => {
                warn!(proposal = %id, route = %proposal.action.route, %reason, "proposal execution failed");
            }
        }
        Ok(outcome)
    }

    /// Withdraw a proposal that is still being voted on. Only the proposer
    /// may do this.
    pub fn withdraw(
        &self,
        id: ProposalId,
        requester: &Address,
        height: BlockHeight,
    ) -> Result<(), GovernanceError> {
        let mut proposal = self.load(id)?;
        if proposal.status != ProposalStatus::Voting {
            return Err(GovernanceError::InvalidState {
                id,
                status: proposal.status,
                operation: "withdraw",
            });
        }
        if &proposal.proposer != requester {
            return Err(GovernanceError::Unauthorized(format!(
                "only the proposer may withdraw proposal {id}"
            )));
        }
        proposal.transition(ProposalStatus::Withdrawn, "withdraw")?;
        proposal.decided_at = Some(height);
        self.save(&proposal)?;
        info!(proposal = %id, "proposal withdrawn");
        Ok(())
    }

    /// Decide every open proposal whose voting period has run out by
    /// `height`. A proposal still short of quorum is rejected.
    ///
    /// Returns the closed proposals and their final status, in id order.
    /// Every decision is committed in one batch.
    pub fn close_expired(
        &self,
        height: BlockHeight,
    ) -> Result<Vec<(ProposalId, ProposalStatus)>, GovernanceError> {
        if !self.params.has_voting_period() {
            return Ok(Vec::new());
        }
        let mut batch = WriteBatch::new();
        let mut decided = Vec::new();
        for (_, bytes) in self.store.iter_proposals()? {
            let mut proposal = Proposal::decode(&bytes)?;
            if proposal.status != ProposalStatus::Voting
                || !proposal
                    .created_at
                    .has_expired(self.params.voting_period_blocks, height)
            {
                continue;
            }
            let tally = self.tally(&proposal, None)?;
            let status = match evaluate(&self.params, proposal.weight_snapshot, &tally) {
                TallyOutcome::Passed => ProposalStatus::Passed,
                TallyOutcome::Rejected | TallyOutcome::Undecided => ProposalStatus::Rejected,
            };
            self.decide(&mut batch, &mut proposal, status, tally, height)?;
            decided.push((proposal, tally));
        }
        if decided.is_empty() {
            return Ok(Vec::new());
        }
        self.store.commit_batch(batch)?;

        for (proposal, tally) in &decided {
            log_decided(proposal, tally);
        }
        info!(height = %height, closed = decided.len(), "voting periods ended");
        Ok(decided
            .into_iter()
            .map(|(proposal, _)| (proposal.id, proposal.status))
            .collect())
    }

    /// Insert already-decided proposals at genesis.
    ///
    /// The whole batch is validated before anything is written, then
    /// committed at once. The id counter moves past the highest imported id.
    pub fn import_proposals(&self, proposals: Vec<Proposal>) -> Result<(), GovernanceError> {
        let mut next = self.next_id()?;
        let mut seen = BTreeSet::new();
        for proposal in &proposals {
            if proposal.id < ProposalId::FIRST {
                return Err(GovernanceError::InvalidInput(format!(
                    "proposal id {} is reserved",
                    proposal.id
                )));
            }
            if proposal.status == ProposalStatus::Voting {
                return Err(GovernanceError::InvalidInput(format!(
                    "proposal {} is still voting and cannot be imported",
                    proposal.id
                )));
            }
            if !seen.insert(proposal.id) || self.store.get_proposal(proposal.id)?.is_some() {
                return Err(GovernanceError::InvalidInput(format!(
                    "proposal {} already exists",
                    proposal.id
                )));
            }
            if proposal.status == ProposalStatus::Passed
                && !self.router.contains(&proposal.action.route)
            {
                return Err(GovernanceError::RouteNotFound(proposal.action.route.clone()));
            }
            let following = proposal.id.next().ok_or_else(|| {
                GovernanceError::InvalidInput(format!(
                    "proposal id {} leaves no id for later proposals",
                    proposal.id
                ))
            })?;
            next = next.max(following);
        }

        let mut batch = WriteBatch::new();
        for proposal in &proposals {
            batch.put_proposal(proposal.id, proposal.encode()?);
        }
        batch.put_counter(NEXT_PROPOSAL_ID_KEY, next.as_u64());
        self.store.commit_batch(batch)?;
        info!(imported = proposals.len(), next_id = %next, "proposals imported");
        Ok(())
    }

    /// Every decided proposal, in id order, for a genesis export.
    pub fn export_proposals(&self) -> Result<Vec<Proposal>, GovernanceError> {
        Ok(self
            .all_proposals()?
            .into_iter()
            .filter(|p| p.status != ProposalStatus::Voting)
            .collect())
    }

    /// A proposal and its tally.
    pub fn get_proposal(&self, id: ProposalId) -> Result<ProposalView, GovernanceError> {
        let proposal = self.load(id)?;
        let tally = match proposal.final_tally {
            Some(tally) => tally,
            None => self.tally(&proposal, None)?,
        };
        Ok(ProposalView { proposal, tally })
    }

    /// Proposal summaries in ascending id order, optionally only those in
    /// `status`.
    pub fn list_proposals(
        &self,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<ProposalSummary>, GovernanceError> {
        Ok(self
            .all_proposals()?
            .iter()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .map(Proposal::summary)
            .collect())
    }

    /// Votes cast on a proposal, ordered by voter.
    pub fn get_votes(&self, id: ProposalId) -> Result<Vec<(Address, VoteRecord)>, GovernanceError> {
        self.load(id)?;
        self.store
            .get_votes(id)?
            .into_iter()
            .map(|(voter, bytes)| Ok((voter, VoteRecord::decode(&bytes)?)))
            .collect()
    }

    fn next_id(&self) -> Result<ProposalId, GovernanceError> {
        let next = self
            .store
            .get_counter(NEXT_PROPOSAL_ID_KEY)?
            .unwrap_or(ProposalId::FIRST.as_u64());
        Ok(ProposalId::new(next))
    }

    fn load(&self, id: ProposalId) -> Result<Proposal, GovernanceError> {
        match self.store.get_proposal(id)? {
            Some(bytes) => Ok(Proposal::decode(&bytes)?),
            None => Err(GovernanceError::ProposalNotFound(id)),
        }
    }

    fn save(&self, proposal: &Proposal) -> Result<(), GovernanceError> {
        self.store.put_proposal(proposal.id, &proposal.encode()?)?;
        Ok(())
    }

    fn all_proposals(&self) -> Result<Vec<Proposal>, GovernanceError> {
        self.store
            .iter_proposals()?
            .into_iter()
            .map(|(_, bytes)| Ok(Proposal::decode(&bytes)?))
            .collect()
    }

    /// Sum the votes on `proposal` with the configured weighting.
    ///
    /// `pending` is a vote staged but not yet committed; it replaces any
    /// stored vote by the same voter.
    fn tally(
        &self,
        proposal: &Proposal,
        pending: Option<(&Address, VoteRecord)>,
    ) -> Result<Tally, GovernanceError> {
        let mut votes = self
            .store
            .get_votes(proposal.id)?
            .into_iter()
            .map(|(voter, bytes)| Ok((voter, VoteRecord::decode(&bytes)?)))
            .collect::<Result<Vec<_>, GovernanceError>>()?;
        if let Some((voter, record)) = pending {
            votes.retain(|(cast_by, _)| cast_by != voter);
            votes.push((voter.clone(), record));
        }
        let group = match self.params.vote_weighting {
            VoteWeighting::Live => Some(self.groups.get_group(&proposal.group)?),
            VoteWeighting::AtCast => None,
        };
        let mut tally = Tally::default();
        for (voter, record) in votes {
            let weight = match &group {
                Some(group) => group.weight_of(&voter),
                None => record.weight_at_cast,
            };
            tally.add(record.option, weight);
        }
        Ok(tally)
    }

    /// Move `proposal` to its decided status and stage the record.
    fn decide(
        &self,
        batch: &mut WriteBatch,
        proposal: &mut Proposal,
        status: ProposalStatus,
        tally: Tally,
        height: BlockHeight,
    ) -> Result<(), GovernanceError> {
        proposal.transition(status, "decide")?;
        proposal.decided_at = Some(height);
        proposal.final_tally = Some(tally);
        batch.put_proposal(proposal.id, proposal.encode()?);
        Ok(())
    }
}

fn log_decided(proposal: &Proposal, tally: &Tally) {
    info!(
        proposal = %proposal.id,
        status = %proposal.status,
        yes = tally.yes,
        no = tally.no,
        abstain = tally.abstain,
        veto = tally.veto,
        "proposal decided"
    );
}
