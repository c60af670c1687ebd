//! The Agora application: composes the registry, router and proposal engine
//! and exposes them to the replication layer as block callbacks and
//! transactions.

use std::sync::Arc;

use tracing::{info, warn};

use agora_governance::{
    GovernanceError, GovernanceParams, ProposalEngine, ProposalStatus, ProposalSummary,
    ProposalView, VoteRecord,
};
use agora_groups::{Group, GroupRegistry};
use agora_nullables::NullStore;
use agora_router::{ActionHandler, RouteKey, RouterBuilder};
use agora_store::GovernanceBackend;
use agora_store_lmdb::LmdbEnvironment;
use agora_types::{Address, BlockHeight, GroupId, ProposalId};

use crate::config::{NodeConfig, StorageBackend};
use crate::genesis::GenesisState;
use crate::group_admin::{group_route, GroupAdminHandler};
use crate::msg::{Msg, TxOutcome};
use crate::tracing_spans::{block_span, genesis_span, tx_span};
use crate::NodeError;

/// Number of named LMDB databases.
const MAX_DBS: u32 = 4;

/// Composes an [`App`]: the built-in `group` route is registered up front,
/// modules add theirs, and `build` freezes the router.
pub struct AppBuilder<S> {
    store: Arc<S>,
    groups: GroupRegistry<S>,
    router: RouterBuilder,
    params: GovernanceParams,
}

impl<S> AppBuilder<S>
where
    S: GovernanceBackend + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, params: GovernanceParams) -> Result<Self, NodeError> {
        let groups = GroupRegistry::new(Arc::clone(&store));
        let mut router = RouterBuilder::new();
        router.register(group_route(), GroupAdminHandler::new(groups.clone()))?;
        Ok(Self {
            store,
            groups,
            router,
            params,
        })
    }

    /// Bind a module's handler, open to proposals from any group.
    pub fn route(
        mut self,
        key: RouteKey,
        handler: impl ActionHandler + 'static,
    ) -> Result<Self, NodeError> {
        self.router.register(key, handler)?;
        Ok(self)
    }

    /// Bind a module's handler, accepting proposals only from `groups`.
    pub fn route_for_groups(
        mut self,
        key: RouteKey,
        handler: impl ActionHandler + 'static,
        groups: impl IntoIterator<Item = GroupId>,
    ) -> Result<Self, NodeError> {
        self.router.register_for_groups(key, handler, groups)?;
        Ok(self)
    }

    pub fn build(self) -> App<S> {
        let router = self.router.build();
        info!(routes = router.routes().len(), "application composed");
        App {
            engine: ProposalEngine::new(self.store, self.groups, router, self.params),
            last_height: None,
            open_block: None,
        }
    }
}

/// Open the LMDB environment under `config.data_dir`.
pub fn open_lmdb(config: &NodeConfig) -> Result<Arc<LmdbEnvironment>, NodeError> {
    let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, config.lmdb_map_size)?;
    Ok(Arc::new(env))
}

/// An application over whichever backend the configuration selects.
pub enum AnyApp {
    Memory(App<NullStore>),
    Lmdb(App<LmdbEnvironment>),
}

impl AnyApp {
    /// Build an application with only the built-in routes from `config`.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let params = config.governance.clone();
        Ok(match config.storage {
            StorageBackend::Memory => {
                AnyApp::Memory(AppBuilder::new(Arc::new(NullStore::new()), params)?.build())
            }
            StorageBackend::Lmdb => AnyApp::Lmdb(AppBuilder::new(open_lmdb(config)?, params)?.build()),
        })
    }
}

/// The replicated state machine. Callbacks arrive in a single total order:
/// `begin_block`, any number of `deliver_tx`, `end_block`.
pub struct App<S> {
    engine: ProposalEngine<S>,
    last_height: Option<BlockHeight>,
    open_block: Option<BlockHeight>,
}

impl<S> App<S>
where
    S: GovernanceBackend + Send + Sync + 'static,
{
    /// Import genesis groups, then genesis proposals.
    pub fn init_chain(&self, genesis: GenesisState) -> Result<(), NodeError> {
        let _span = genesis_span("import").entered();
        let groups = genesis.groups.len();
        for group in genesis.groups {
            self.engine.groups().import_group(group)?;
        }
        self.engine.import_proposals(genesis.proposals)?;
        info!(groups, "genesis imported");
        Ok(())
    }

    /// Groups and every decided proposal, importable by `init_chain`.
    pub fn export_genesis(&self) -> Result<GenesisState, NodeError> {
        let _span = genesis_span("export").entered();
        Ok(GenesisState {
            groups: self.engine.groups().list_groups()?,
            proposals: self.engine.export_proposals()?,
        })
    }

    /// Open block `height`. Heights must strictly increase.
    pub fn begin_block(&mut self, height: BlockHeight) -> Result<(), NodeError> {
        if let Some(open) = self.open_block {
            return Err(NodeError::BlockOpen(open));
        }
        if let Some(current) = self.last_height {
            if height <= current {
                return Err(NodeError::HeightNotIncreasing {
                    current,
                    next: height,
                });
            }
        }
        let _span = block_span(height, "begin").entered();
        self.open_block = Some(height);
        self.last_height = Some(height);
        Ok(())
    }

    /// Apply one transaction at the open block's height.
    ///
    /// A rejected transaction leaves state unchanged and returns the error.
    pub fn deliver_tx(&self, msg: Msg) -> Result<TxOutcome, NodeError> {
        let height = self.open_block.ok_or(NodeError::NoOpenBlock)?;
        let _span = tx_span(height, msg.name()).entered();
        let result = self.apply(msg, height);
        if let Err(e) = &result {
            warn!(error = %e, "transaction rejected");
        }
        result
    }

    fn apply(&self, msg: Msg, height: BlockHeight) -> Result<TxOutcome, NodeError> {
        let engine = &self.engine;
        Ok(match msg {
            Msg::CreateGroup { members } => {
                TxOutcome::GroupCreated(engine.groups().create_group(members)?)
            }
            Msg::CreateProposal {
                proposer,
                group,
                action,
            } => TxOutcome::ProposalCreated(engine.propose(&proposer, &group, action, height)?),
            Msg::Vote {
                proposal_id,
                voter,
                option,
            } => TxOutcome::Voted(engine.vote(proposal_id, &voter, option, height)?),
            Msg::TryExecuteProposal { proposal_id } => {
                TxOutcome::Executed(engine.try_execute(proposal_id, height)?)
            }
            Msg::WithdrawProposal {
                proposal_id,
                proposer,
            } => {
                engine.withdraw(proposal_id, &proposer, height)?;
                TxOutcome::Withdrawn
            }
        })
    }

    /// Close the open block, deciding proposals whose voting period ended.
    pub fn end_block(&mut self) -> Result<Vec<(ProposalId, ProposalStatus)>, NodeError> {
        let height = self.open_block.ok_or(NodeError::NoOpenBlock)?;
        let _span = block_span(height, "end").entered();
        let closed = self.engine.close_expired(height)?;
        self.open_block = None;
        Ok(closed)
    }

    /// Height of the most recent block, `None` before the first.
    pub fn height(&self) -> Option<BlockHeight> {
        self.last_height
    }

    pub fn params(&self) -> &GovernanceParams {
        self.engine.params()
    }

    pub fn routes(&self) -> Vec<&RouteKey> {
        self.engine.router().routes()
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn get_proposal(&self, id: ProposalId) -> Result<ProposalView, GovernanceError> {
        self.engine.get_proposal(id)
    }

    pub fn list_proposals(
        &self,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<ProposalSummary>, GovernanceError> {
        self.engine.list_proposals(status)
    }

    pub fn get_votes(&self, id: ProposalId) -> Result<Vec<(Address, VoteRecord)>, GovernanceError> {
        self.engine.get_votes(id)
    }

    pub fn get_group(&self, id: &GroupId) -> Result<Group, NodeError> {
        Ok(self.engine.groups().get_group(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_groups::Member;

    fn app() -> App<NullStore> {
        AppBuilder::new(Arc::new(NullStore::new()), GovernanceParams::default())
            .unwrap()
            .build()
    }

    #[test]
    fn group_route_is_built_in() {
        let app = app();
        assert_eq!(app.routes(), vec![&group_route()]);
    }

    #[test]
    fn duplicate_module_route_is_rejected() {
        let result = AppBuilder::new(Arc::new(NullStore::new()), GovernanceParams::default())
            .unwrap()
            .route(group_route(), agora_nullables::NullHandler::succeeding());
        assert!(matches!(result, Err(NodeError::Router(_))));
    }

    #[test]
    fn heights_must_increase() {
        let mut app = app();
        app.begin_block(BlockHeight::new(5)).unwrap();
        assert!(matches!(
            app.begin_block(BlockHeight::new(6)),
            Err(NodeError::BlockOpen(_))
        ));
        app.end_block().unwrap();
        assert!(matches!(
            app.begin_block(BlockHeight::new(5)),
            Err(NodeError::HeightNotIncreasing { .. })
        ));
        app.begin_block(BlockHeight::new(6)).unwrap();
        assert_eq!(app.height(), Some(BlockHeight::new(6)));
    }

    #[test]
    fn tx_outside_block_is_rejected() {
        let app = app();
        let msg = Msg::CreateGroup {
            members: vec![Member::new(Address::new("agr_a"), 1)],
        };
        assert!(matches!(app.deliver_tx(msg), Err(NodeError::NoOpenBlock)));
    }

    #[test]
    fn memory_backend_from_config() {
        let config = NodeConfig {
            storage: StorageBackend::Memory,
            ..NodeConfig::default()
        };
        assert!(matches!(AnyApp::from_config(&config).unwrap(), AnyApp::Memory(_)));
    }
}
