//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::info;

use agora_store::{GroupStore, MetaStore, ProposalStore, StoreError};
use agora_types::{Address, GroupId, ProposalId};

use crate::{LmdbError, LmdbGroupStore, LmdbMetaStore, LmdbProposalStore, LmdbWriteBatch};

/// Named databases inside the environment.
const GROUPS_DB: &str = "groups";
const PROPOSALS_DB: &str = "proposals";
const VOTES_DB: &str = "votes";
const META_DB: &str = "meta";

/// Number of named databases the governance engine needs.
pub const REQUIRED_DBS: u32 = 4;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) groups_db: Database<Bytes, Bytes>,
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// `max_dbs` is raised to [`REQUIRED_DBS`] if lower.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per path by this process and
        // never concurrently by another `Env` over the same files.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(REQUIRED_DBS))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let groups_db = env.create_database(&mut wtxn, Some(GROUPS_DB))?;
        let proposals_db = env.create_database(&mut wtxn, Some(PROPOSALS_DB))?;
        let votes_db = env.create_database(&mut wtxn, Some(VOTES_DB))?;
        let meta_db = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self {
            env: Arc::new(env),
            groups_db,
            proposals_db,
            votes_db,
            meta_db,
        })
    }

    pub fn group_store(&self) -> LmdbGroupStore {
        LmdbGroupStore {
            env: Arc::clone(&self.env),
            groups_db: self.groups_db,
        }
    }

    pub fn proposal_store(&self) -> LmdbProposalStore {
        LmdbProposalStore {
            env: Arc::clone(&self.env),
            proposals_db: self.proposals_db,
            votes_db: self.votes_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }

    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    /// Begin a write batch: one LMDB write transaction for several writes.
    pub fn write_batch(&self) -> Result<LmdbWriteBatch<'_>, StoreError> {
        LmdbWriteBatch::new(self)
    }

    /// Flush the memory map to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}

// The environment is the backend handed to the engine: it serves every
// store trait through the per-database stores.

impl GroupStore for LmdbEnvironment {
    fn put_group(&self, id: &GroupId, data: &[u8]) -> Result<(), StoreError> {
        self.group_store().put_group(id, data)
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<Vec<u8>>, StoreError> {
        self.group_store().get_group(id)
    }

    fn iter_groups(&self) -> Result<Vec<(GroupId, Vec<u8>)>, StoreError> {
        self.group_store().iter_groups()
    }
}

impl ProposalStore for LmdbEnvironment {
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError> {
        self.proposal_store().put_proposal(id, data)
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        self.proposal_store().get_proposal(id)
    }

    fn iter_proposals(&self) -> Result<Vec<(ProposalId, Vec<u8>)>, StoreError> {
        self.proposal_store().iter_proposals()
    }

    fn put_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
        data: &[u8],
    ) -> Result<(), StoreError> {
        self.proposal_store().put_vote(proposal, voter, data)
    }

    fn get_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        self.proposal_store().get_vote(proposal, voter)
    }

    fn get_votes(&self, proposal: ProposalId) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        self.proposal_store().get_votes(proposal)
    }
}

impl MetaStore for LmdbEnvironment {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta_store().put_meta(key, value)
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.meta_store().get_meta(key)
    }
}
