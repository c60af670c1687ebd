//! Write batching: stage several writes and commit them as one unit.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = WriteBatch::new();
//! batch.put_proposal(id, &proposal_bytes);
//! batch.put_counter(NEXT_PROPOSAL_ID_KEY, id.as_u64() + 1);
//! store.commit_batch(batch)?;
//! ```
//!
//! A backend applies either every staged write or none of them. Dropping a
//! batch without committing it discards the staged writes.

use crate::StoreError;
use agora_types::{Address, GroupId, ProposalId};

/// One staged write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    PutGroup { id: GroupId, data: Vec<u8> },
    PutProposal { id: ProposalId, data: Vec<u8> },
    PutVote { proposal: ProposalId, voter: Address, data: Vec<u8> },
    PutMeta { key: String, value: Vec<u8> },
}

/// Writes staged in order, committed through [`BatchStore::commit_batch`].
///
/// Later writes to the same key win, as they would if applied one by one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_group(&mut self, id: &GroupId, data: Vec<u8>) {
        self.ops.push(WriteOp::PutGroup {
            id: id.clone(),
            data,
        });
    }

    pub fn put_proposal(&mut self, id: ProposalId, data: Vec<u8>) {
        self.ops.push(WriteOp::PutProposal { id, data });
    }

    pub fn put_vote(&mut self, proposal: ProposalId, voter: &Address, data: Vec<u8>) {
        self.ops.push(WriteOp::PutVote {
            proposal,
            voter: voter.clone(),
            data,
        });
    }

    pub fn put_meta(&mut self, key: &str, value: Vec<u8>) {
        self.ops.push(WriteOp::PutMeta {
            key: key.to_string(),
            value,
        });
    }

    /// Stage a big-endian `u64` counter, as read by `MetaStore::get_counter`.
    pub fn put_counter(&mut self, key: &str, value: u64) {
        self.put_meta(key, value.to_be_bytes().to_vec());
    }

    /// Move every write staged in `other` to the end of this batch.
    pub fn append(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }

    /// The most recently staged value of group `id`, if any.
    pub fn staged_group(&self, id: &GroupId) -> Option<&[u8]> {
        self.ops.iter().rev().find_map(|op| match op {
            WriteOp::PutGroup { id: staged, data } if staged == id => Some(data.as_slice()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Trait for backends that can commit a [`WriteBatch`] atomically.
pub trait BatchStore {
    /// Apply every write in `batch`, or none of them if any fails.
    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_order_and_staged_group_sees_last_write() {
        let id = GroupId::from_sequence(1);
        let mut batch = WriteBatch::new();
        batch.put_group(&id, b"v1".to_vec());
        batch.put_counter("seq", 1);

        let mut handler_writes = WriteBatch::new();
        handler_writes.put_group(&id, b"v2".to_vec());
        batch.append(handler_writes);

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.staged_group(&id), Some(&b"v2"[..]));
        assert_eq!(batch.staged_group(&GroupId::from_sequence(2)), None);
        assert_eq!(
            batch.ops()[1],
            WriteOp::PutMeta {
                key: "seq".to_string(),
                value: 1u64.to_be_bytes().to_vec(),
            }
        );
    }
}
