//! Proposal and vote storage trait.

use crate::StoreError;
use agora_types::{Address, ProposalId};

/// Trait for storing proposals (proposal-by-id table) and their votes
/// (vote-by-(proposal, voter) table).
pub trait ProposalStore {
    /// Insert or replace a proposal record.
    fn put_proposal(&self, id: ProposalId, data: &[u8]) -> Result<(), StoreError>;

    /// Get a proposal record, `None` if the id is unknown.
    fn get_proposal(&self, id: ProposalId) -> Result<Option<Vec<u8>>, StoreError>;

    /// All proposal records, ordered by id.
    fn iter_proposals(&self) -> Result<Vec<(ProposalId, Vec<u8>)>, StoreError>;

    /// Insert or replace a voter's vote on a proposal.
    fn put_vote(&self, proposal: ProposalId, voter: &Address, data: &[u8])
        -> Result<(), StoreError>;

    /// Get a specific voter's vote on a proposal.
    fn get_vote(&self, proposal: ProposalId, voter: &Address)
        -> Result<Option<Vec<u8>>, StoreError>;

    /// All votes cast on a proposal, ordered by voter address.
    fn get_votes(&self, proposal: ProposalId) -> Result<Vec<(Address, Vec<u8>)>, StoreError>;
}
