//! Write batching: applies a staged [`WriteBatch`] inside a single LMDB write
//! transaction, so the writes of one governance operation land together.
//!
//! If an [`LmdbWriteBatch`] is dropped without calling
//! [`LmdbWriteBatch::commit`], all operations are rolled back (the underlying
//! LMDB transaction is aborted).

use heed::RwTxn;

use agora_store::{BatchStore, StoreError, WriteBatch, WriteOp};

use crate::environment::LmdbEnvironment;
use crate::proposal::vote_key;
use crate::LmdbError;

/// An open LMDB write transaction that staged operations are applied to.
pub struct LmdbWriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> LmdbWriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    /// Apply one staged operation to the open transaction.
    pub fn apply(&mut self, op: &WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::PutGroup { id, data } => self
                .env
                .groups_db
                .put(&mut self.txn, id.as_bytes(), data)
                .map_err(LmdbError::from)?,
            WriteOp::PutProposal { id, data } => self
                .env
                .proposals_db
                .put(&mut self.txn, &id.to_key(), data)
                .map_err(LmdbError::from)?,
            WriteOp::PutVote {
                proposal,
                voter,
                data,
            } => self
                .env
                .votes_db
                .put(&mut self.txn, &vote_key(*proposal, voter), data)
                .map_err(LmdbError::from)?,
            WriteOp::PutMeta { key, value } => self
                .env
                .meta_db
                .put(&mut self.txn, key.as_bytes(), value)
                .map_err(LmdbError::from)?,
        }
        Ok(())
    }

    /// Commit all operations in this batch atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl BatchStore for LmdbEnvironment {
    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut txn = self.write_batch()?;
        for op in batch.ops() {
            txn.apply(op)?;
        }
        txn.commit()
    }
}
