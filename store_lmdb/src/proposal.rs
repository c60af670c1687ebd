//! LMDB implementation of ProposalStore.
//!
//! Proposal key: the big-endian proposal id (8 bytes), so iteration runs in
//! id order. Vote key: `proposal_key ++ voter.as_str().as_bytes()`; every
//! vote of a proposal shares the 8-byte prefix and sorts by voter address.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use agora_store::{ProposalStore, StoreError};
use agora_types::{Address, ProposalId};

use crate::LmdbError;

pub struct LmdbProposalStore {
    pub(crate) env: Arc<Env>,
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
}

/// Build the binary composite key `proposal_key ++ voter_bytes`.
pub(crate) fn vote_key(proposal: ProposalId, voter: &Address) -> Vec<u8> {
    let voter = voter.as_str().as_bytes();
    let mut key = Vec::with_capacity(8 + voter.len());
    key.extend_from_slice(&proposal.to_key());
    key.extend_from_slice(voter);
    key
}

/// Turn `prefix` into the smallest key greater than every key it prefixes.
///
/// Returns `false` if no such key exists (the prefix is all `0xff`).
pub(crate) fn increment_prefix(prefix: &mut Vec<u8>) -> bool {
    while let Some(last) = prefix.last_mut() {
        if *last == u8::MAX {
            prefix.pop();
        } else {
            *last += 1;
            return true;
        }
    }
    false
}

impl ProposalStore for LmdbProposalStore {
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.proposals_db
            .put(&mut wtxn, &id.to_key(), data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_proposal(&self, id: ProposalId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .proposals_db
            .get(&rtxn, &id.to_key())
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn iter_proposals(&self) -> Result<Vec<(ProposalId, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.proposals_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            let id = ProposalId::from_key(key).ok_or_else(|| LmdbError::BadKey {
                db: "proposals",
                reason: format!("{} bytes, expected 8", key.len()),
            })?;
            results.push((id, val.to_vec()));
        }
        Ok(results)
    }

    fn put_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let key = vote_key(proposal, voter);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.votes_db
            .put(&mut wtxn, &key, data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_vote(
        &self,
        proposal: ProposalId,
        voter: &Address,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let key = vote_key(proposal, voter);
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self.votes_db.get(&rtxn, &key).map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn get_votes(&self, proposal: ProposalId) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        let prefix = proposal.to_key();
        let mut upper = prefix.to_vec();
        let upper_bound = if increment_prefix(&mut upper) {
            Bound::Excluded(upper.as_slice())
        } else {
            Bound::Unbounded
        };

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bounds = (Bound::Included(&prefix[..]), upper_bound);
        let iter = self
            .votes_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            let voter = std::str::from_utf8(&key[prefix.len()..])
                .ok()
                .and_then(|raw| Address::parse(raw).ok())
                .ok_or_else(|| LmdbError::BadKey {
                    db: "votes",
                    reason: "voter is not a valid address".to_string(),
                })?;
            results.push((voter, val.to_vec()));
        }
        Ok(results)
    }
}
