//! Nullable store: thread-safe in-memory storage for testing.

use agora_store::{BatchStore, GroupStore, MetaStore, ProposalStore, StoreError, WriteBatch, WriteOp};
use agora_types::{Address, GroupId, ProposalId};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A table whose writes a [`NullStore`] can be told to refuse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteFault {
    Groups,
    Proposals,
    Votes,
    /// Writes to one metadata key.
    Meta(String),
}

impl WriteFault {
    fn hits(&self, op: &WriteOp) -> bool {
        match (self, op) {
            (WriteFault::Groups, WriteOp::PutGroup { .. }) => true,
            (WriteFault::Proposals, WriteOp::PutProposal { .. }) => true,
            (WriteFault::Votes, WriteOp::PutVote { .. }) => true,
            (WriteFault::Meta(key), WriteOp::PutMeta { key: written, .. }) => key == written,
            _ => false,
        }
    }
}

/// An in-memory group + proposal + meta store for testing.
///
/// Ordered maps keep iteration identical to the LMDB backend. Every write,
/// single or batched, goes through [`BatchStore::commit_batch`], which
/// applies all of a batch or nothing.
pub struct NullStore {
    groups: Mutex<BTreeMap<GroupId, Vec<u8>>>,
    proposals: Mutex<BTreeMap<ProposalId, Vec<u8>>>,
    votes: Mutex<BTreeMap<(ProposalId, Address), Vec<u8>>>,
    meta: Mutex<BTreeMap<String, Vec<u8>>>,
    faults: Mutex<Vec<WriteFault>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            groups: Mutex::new(BTreeMap::new()),
            proposals: Mutex::new(BTreeMap::new()),
            votes: Mutex::new(BTreeMap::new()),
            meta: Mutex::new(BTreeMap::new()),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Make every later write that touches `fault` fail with a backend
    /// error. A batch containing such a write applies nothing.
    pub fn fail_writes(&self, fault: WriteFault) {
        self.faults.lock().unwrap().push(fault);
    }

    /// Accept writes again.
    pub fn clear_faults(&self) {
        self.faults.lock().unwrap().clear();
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchStore for NullStore {
    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        {
            let faults = self.faults.lock().unwrap();
            if let Some(fault) = faults
                .iter()
                .find(|f| batch.ops().iter().any(|op| f.hits(op)))
            {
                return Err(StoreError::Backend(format!("injected write fault: {fault:?}")));
            }
        }
        let mut groups = self.groups.lock().unwrap();
        let mut proposals = self.proposals.lock().unwrap();
        let mut votes = self.votes.lock().unwrap();
        let mut meta = self.meta.lock().unwrap();
        for op in batch.into_ops() {
            match op {
                WriteOp::PutGroup { id, data } => {
                    groups.insert(id, data);
                }
                WriteOp::PutProposal { id, data } => {
                    proposals.insert(id, data);
                }
                WriteOp::PutVote {
                    proposal,
                    voter,
                    data,
                } => {
                    votes.insert((proposal, voter), data);
                }
                WriteOp::PutMeta { key, value } => {
                    meta.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

impl GroupStore for NullStore {
    fn put_group(&self, id: &GroupId, data: &[u8]) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.put_group(id, data.to_vec());
        self.commit_batch(batch)
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.groups.lock().unwrap().get(id).cloned())
    }

    fn iter_groups(&self) -> Result<Vec<(GroupId, Vec<u8>)>, StoreError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl ProposalStore for NullStore {
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.put_proposal(id, data.to_vec());
        self.commit_batch(batch)
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.proposals.lock().unwrap().get(&id).cloned())
    }

    fn iter_proposals(&self) -> Result<Vec<(ProposalId, Vec<u8>)>, StoreError> {
        Ok(self
            .proposals
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }

    fn put_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.put_vote(proposal, voter, data.to_vec());
        self.commit_batch(batch)
    }

    fn get_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .get(&(proposal, voter.clone()))
            .cloned())
    }

    fn get_votes(&self, proposal: ProposalId) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .iter()
            .filter(|((p, _), _)| *p == proposal)
            .map(|((_, voter), data)| (voter.clone(), data.clone()))
            .collect())
    }
}

impl MetaStore for NullStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.put_meta(key, value.to_vec());
        self.commit_batch(batch)
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }
}
