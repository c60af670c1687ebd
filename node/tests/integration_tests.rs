//! Integration tests exercising the full transaction pipeline:
//! genesis → begin_block → deliver_tx → end_block → queries / export.
//!
//! These tests wire together the registry, router and proposal engine the
//! way the application composes them, on both the in-memory and the LMDB
//! backend.

use std::sync::Arc;

use agora_governance::{Action, ErrorKind, GovernanceParams, ProposalStatus, VoteOption};
use agora_groups::{Group, Member, MemberUpdate};
use agora_node::{
    group_route, App, AppBuilder, GenesisState, GroupAdminAction, Msg, NodeError, TxOutcome,
};
use agora_nullables::{NullHandler, NullStore};
use agora_router::{ExecutionOutcome, RouteKey};
use agora_store_lmdb::LmdbEnvironment;
use agora_types::{Address, BlockHeight, GroupId, ProposalId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn addr(name: &str) -> Address {
    Address::new(format!("agr_{name}"))
}

fn mod_x() -> RouteKey {
    RouteKey::parse("mod-x").unwrap()
}

fn memory_app(params: GovernanceParams, handler: NullHandler) -> App<NullStore> {
    AppBuilder::new(Arc::new(NullStore::new()), params)
        .unwrap()
        .route(mod_x(), handler)
        .unwrap()
        .build()
}

fn kind(err: NodeError) -> ErrorKind {
    match err {
        NodeError::Governance(e) => e.kind(),
        other => panic!("expected a governance error, got {other}"),
    }
}

/// Deliver `msg` in its own block at `height`.
fn tx<S>(app: &mut App<S>, height: u64, msg: Msg) -> Result<TxOutcome, NodeError>
where
    S: agora_store::GovernanceBackend + Send + Sync + 'static,
{
    app.begin_block(BlockHeight::new(height)).unwrap();
    let result = app.deliver_tx(msg);
    app.end_block().unwrap();
    result
}

/// G = {A:1, B:1, C:2} created by transaction; A proposes on "mod-x".
fn setup<S>(app: &mut App<S>) -> (GroupId, ProposalId)
where
    S: agora_store::GovernanceBackend + Send + Sync + 'static,
{
    let group = match tx(
        app,
        1,
        Msg::CreateGroup {
            members: vec![
                Member::new(addr("a"), 1),
                Member::new(addr("b"), 1),
                Member::new(addr("c"), 2),
            ],
        },
    )
    .unwrap()
    {
        TxOutcome::GroupCreated(id) => id,
        other => panic!("unexpected outcome {other:?}"),
    };
    let proposal = match tx(
        app,
        2,
        Msg::CreateProposal {
            proposer: addr("a"),
            group: group.clone(),
            action: Action::new(mod_x(), b"set fee=3".to_vec()),
        },
    )
    .unwrap()
    {
        TxOutcome::ProposalCreated(id) => id,
        other => panic!("unexpected outcome {other:?}"),
    };
    (group, proposal)
}

fn vote(proposal_id: ProposalId, voter: &str, option: VoteOption) -> Msg {
    Msg::Vote {
        proposal_id,
        voter: addr(voter),
        option,
    }
}

// ---------------------------------------------------------------------------
// 1. Lifecycle scenarios
// ---------------------------------------------------------------------------

#[test]
fn tied_vote_is_rejected() {
    let mut app = memory_app(GovernanceParams::default(), NullHandler::succeeding());
    let (_, p1) = setup(&mut app);

    assert_eq!(
        tx(&mut app, 3, vote(p1, "a", VoteOption::Yes)).unwrap(),
        TxOutcome::Voted(ProposalStatus::Voting)
    );
    assert_eq!(
        tx(&mut app, 4, vote(p1, "b", VoteOption::No)).unwrap(),
        TxOutcome::Voted(ProposalStatus::Rejected)
    );
    let view = app.get_proposal(p1).unwrap();
    assert_eq!(view.tally.yes, 1);
    assert_eq!(view.tally.no, 1);
}

#[test]
fn passed_proposal_executes_once() {
    let handler = NullHandler::succeeding();
    let mut app = memory_app(GovernanceParams::default(), handler.clone());
    let (_, p1) = setup(&mut app);

    tx(&mut app, 3, vote(p1, "a", VoteOption::Yes)).unwrap();
    assert_eq!(
        tx(&mut app, 4, vote(p1, "c", VoteOption::Yes)).unwrap(),
        TxOutcome::Voted(ProposalStatus::Passed)
    );
    assert_eq!(
        tx(&mut app, 5, Msg::TryExecuteProposal { proposal_id: p1 }).unwrap(),
        TxOutcome::Executed(ExecutionOutcome::Applied)
    );
    assert_eq!(handler.executed(), vec![(p1, b"set fee=3".to_vec())]);
    assert_eq!(app.get_proposal(p1).unwrap().proposal.status, ProposalStatus::Executed);

    let err = tx(&mut app, 6, Msg::TryExecuteProposal { proposal_id: p1 }).unwrap_err();
    assert_eq!(kind(err), ErrorKind::InvalidState);
    assert_eq!(handler.executed().len(), 1);
}

#[test]
fn execute_while_voting_changes_nothing() {
    let handler = NullHandler::succeeding();
    let mut app = memory_app(GovernanceParams::default(), handler.clone());
    let (_, p1) = setup(&mut app);

    let err = tx(&mut app, 3, Msg::TryExecuteProposal { proposal_id: p1 }).unwrap_err();
    assert_eq!(kind(err), ErrorKind::InvalidState);
    assert_eq!(app.get_proposal(p1).unwrap().proposal.status, ProposalStatus::Voting);
    assert!(handler.executed().is_empty());
}

#[test]
fn non_member_vote_leaves_tally_unchanged() {
    let mut app = memory_app(GovernanceParams::default(), NullHandler::succeeding());
    let (_, p1) = setup(&mut app);
    tx(&mut app, 3, vote(p1, "a", VoteOption::Yes)).unwrap();

    let before = app.get_proposal(p1).unwrap().tally;
    let err = tx(&mut app, 4, vote(p1, "d", VoteOption::Yes)).unwrap_err();
    assert_eq!(kind(err), ErrorKind::Unauthorized);
    assert_eq!(app.get_proposal(p1).unwrap().tally, before);
}

#[test]
fn failed_execution_is_recorded_not_raised() {
    let mut app = memory_app(GovernanceParams::default(), NullHandler::failing("module paused"));
    let (_, p1) = setup(&mut app);
    tx(&mut app, 3, vote(p1, "c", VoteOption::Yes)).unwrap();

    let outcome = tx(&mut app, 4, Msg::TryExecuteProposal { proposal_id: p1 }).unwrap();
    assert_eq!(
        outcome,
        TxOutcome::Executed(ExecutionOutcome::Failed {
            reason: "module paused".to_string()
        })
    );
    let proposal = app.get_proposal(p1).unwrap().proposal;
    assert_eq!(proposal.status, ProposalStatus::ExecutionFailed);
    assert_eq!(proposal.failure_reason.as_deref(), Some("module paused"));
}

#[test]
fn withdraw_only_by_proposer_while_voting() {
    let mut app = memory_app(GovernanceParams::default(), NullHandler::succeeding());
    let (_, p1) = setup(&mut app);

    let err = tx(
        &mut app,
        3,
        Msg::WithdrawProposal {
            proposal_id: p1,
            proposer: addr("b"),
        },
    )
    .unwrap_err();
    assert_eq!(kind(err), ErrorKind::Unauthorized);

    let withdraw = Msg::WithdrawProposal {
        proposal_id: p1,
        proposer: addr("a"),
    };
    assert_eq!(tx(&mut app, 4, withdraw.clone()).unwrap(), TxOutcome::Withdrawn);
    let err = tx(&mut app, 5, withdraw).unwrap_err();
    assert_eq!(kind(err), ErrorKind::InvalidState);

    let withdrawn = app.list_proposals(Some(ProposalStatus::Withdrawn)).unwrap();
    assert_eq!(withdrawn.len(), 1);
}

// ---------------------------------------------------------------------------
// 2. Block boundaries and voting periods
// ---------------------------------------------------------------------------

#[test]
fn end_block_expires_proposals_short_of_quorum() {
    let params = GovernanceParams {
        voting_period_blocks: 3,
        ..GovernanceParams::default()
    };
    let mut app = memory_app(params, NullHandler::succeeding());
    let (_, p1) = setup(&mut app); // created at height 2, deadline 5
    tx(&mut app, 3, vote(p1, "a", VoteOption::Yes)).unwrap();

    app.begin_block(BlockHeight::new(4)).unwrap();
    assert!(app.end_block().unwrap().is_empty());

    app.begin_block(BlockHeight::new(5)).unwrap();
    let err = app.deliver_tx(vote(p1, "c", VoteOption::Yes)).unwrap_err();
    assert_eq!(kind(err), ErrorKind::InvalidState);
    assert_eq!(app.end_block().unwrap(), vec![(p1, ProposalStatus::Rejected)]);
}

// ---------------------------------------------------------------------------
// 3. Groups governing their own membership
// ---------------------------------------------------------------------------

#[test]
fn group_route_changes_membership_after_a_vote() {
    let mut app = memory_app(GovernanceParams::default(), NullHandler::succeeding());
    let (group, _) = setup(&mut app);

    let action = GroupAdminAction {
        group: group.clone(),
        updates: vec![
            MemberUpdate { address: addr("d"), weight: 3 },
            MemberUpdate { address: addr("b"), weight: 0 },
        ],
    };
    let p2 = match tx(
        &mut app,
        3,
        Msg::CreateProposal {
            proposer: addr("c"),
            group: group.clone(),
            action: Action::new(group_route(), action.to_payload()),
        },
    )
    .unwrap()
    {
        TxOutcome::ProposalCreated(id) => id,
        other => panic!("unexpected outcome {other:?}"),
    };
    tx(&mut app, 4, vote(p2, "c", VoteOption::Yes)).unwrap();
    tx(&mut app, 5, Msg::TryExecuteProposal { proposal_id: p2 }).unwrap();

    let updated = app.get_group(&group).unwrap();
    assert_eq!(updated.total_weight(), 6);
    assert!(!updated.is_member(&addr("b")));
    assert_eq!(updated.weight_of(&addr("d")), 3);

    // The earlier proposal keeps its snapshot of 4.
    let p1 = app.get_proposal(ProposalId::FIRST).unwrap();
    assert_eq!(p1.proposal.weight_snapshot, 4);
}

#[test]
fn group_route_rejects_foreign_target_at_creation() {
    let mut app = memory_app(GovernanceParams::default(), NullHandler::succeeding());
    let (group, _) = setup(&mut app);
    let other = match tx(
        &mut app,
        3,
        Msg::CreateGroup {
            members: vec![Member::new(addr("z"), 1)],
        },
    )
    .unwrap()
    {
        TxOutcome::GroupCreated(id) => id,
        other => panic!("unexpected outcome {other:?}"),
    };

    let hijack = GroupAdminAction {
        group: other,
        updates: vec![MemberUpdate { address: addr("a"), weight: 100 }],
    };
    let err = tx(
        &mut app,
        4,
        Msg::CreateProposal {
            proposer: addr("a"),
            group,
            action: Action::new(group_route(), hijack.to_payload()),
        },
    )
    .unwrap_err();
    assert_eq!(kind(err), ErrorKind::InvalidInput);
}

// ---------------------------------------------------------------------------
// 4. Genesis
// ---------------------------------------------------------------------------

#[test]
fn genesis_export_imports_into_a_fresh_chain() {
    let mut app = memory_app(GovernanceParams::default(), NullHandler::succeeding());
    let (_, p1) = setup(&mut app);
    tx(&mut app, 3, vote(p1, "c", VoteOption::Yes)).unwrap();
    // A second proposal stays open and is not exported.
    let (_, open) = setup_second(&mut app);

    let exported = app.export_genesis().unwrap();
    assert_eq!(exported.groups.len(), 2);
    assert_eq!(exported.proposals.len(), 1);
    assert_eq!(exported.proposals[0].id, p1);

    let json = exported.to_json_string().unwrap();
    let mut fresh = memory_app(GovernanceParams::default(), NullHandler::succeeding());
    fresh.init_chain(GenesisState::from_json_str(&json).unwrap()).unwrap();

    assert_eq!(fresh.get_proposal(p1).unwrap().proposal.status, ProposalStatus::Passed);
    assert!(fresh.get_proposal(open).is_err());
    // The imported passed proposal can still be executed on the new chain.
    assert_eq!(
        tx(&mut fresh, 1, Msg::TryExecuteProposal { proposal_id: p1 }).unwrap(),
        TxOutcome::Executed(ExecutionOutcome::Applied)
    );
}

fn setup_second(app: &mut App<NullStore>) -> (GroupId, ProposalId) {
    let group = match tx(
        app,
        10,
        Msg::CreateGroup {
            members: vec![Member::new(addr("q"), 1)],
        },
    )
    .unwrap()
    {
        TxOutcome::GroupCreated(id) => id,
        other => panic!("unexpected outcome {other:?}"),
    };
    let proposal = match tx(
        app,
        11,
        Msg::CreateProposal {
            proposer: addr("q"),
            group: group.clone(),
            action: Action::new(mod_x(), Vec::new()),
        },
    )
    .unwrap()
    {
        TxOutcome::ProposalCreated(id) => id,
        other => panic!("unexpected outcome {other:?}"),
    };
    (group, proposal)
}

#[test]
fn genesis_group_ids_are_skipped_by_creation() {
    let mut app = memory_app(GovernanceParams::default(), NullHandler::succeeding());
    let imported = Group::new(GroupId::from_sequence(1), vec![Member::new(addr("a"), 1)]).unwrap();
    app.init_chain(GenesisState {
        groups: vec![imported],
        proposals: Vec::new(),
    })
    .unwrap();

    let created = tx(
        &mut app,
        1,
        Msg::CreateGroup {
            members: vec![Member::new(addr("b"), 1)],
        },
    )
    .unwrap();
    assert_eq!(created, TxOutcome::GroupCreated(GroupId::from_sequence(2)));
}

// ---------------------------------------------------------------------------
// 5. LMDB persistence
// ---------------------------------------------------------------------------

fn lmdb_app(env: Arc<LmdbEnvironment>, handler: NullHandler) -> App<LmdbEnvironment> {
    AppBuilder::new(env, GovernanceParams::default())
        .unwrap()
        .route(mod_x(), handler)
        .unwrap()
        .build()
}

#[test]
fn lmdb_state_survives_restart() {
    let dir = tempfile::tempdir().expect("temp dir");
    let handler = NullHandler::succeeding();

    let p1 = {
        let env = Arc::new(LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024).expect("open env"));
        let mut app = lmdb_app(env, handler.clone());
        let (_, p1) = setup(&mut app);
        tx(&mut app, 3, vote(p1, "a", VoteOption::Yes)).unwrap();
        p1
    };

    let env = Arc::new(LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024).expect("reopen env"));
    let mut app = lmdb_app(env, handler.clone());
    let votes = app.get_votes(p1).unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].0, addr("a"));

    // Heights restart with the replication layer; the counter does not.
    assert_eq!(
        tx(&mut app, 4, vote(p1, "c", VoteOption::Yes)).unwrap(),
        TxOutcome::Voted(ProposalStatus::Passed)
    );
    tx(&mut app, 5, Msg::TryExecuteProposal { proposal_id: p1 }).unwrap();
    assert_eq!(handler.executed().len(), 1);

    let group = app.list_proposals(None).unwrap()[0].group.clone();
    let next = tx(
        &mut app,
        6,
        Msg::CreateProposal {
            proposer: addr("a"),
            group,
            action: Action::new(mod_x(), Vec::new()),
        },
    )
    .unwrap();
    assert_eq!(next, TxOutcome::ProposalCreated(ProposalId::new(2)));
}
