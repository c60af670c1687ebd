//! LMDB implementation of GroupStore.
//!
//! Key format: the raw group id bytes.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use agora_store::{GroupStore, StoreError};
use agora_types::GroupId;

use crate::LmdbError;

pub struct LmdbGroupStore {
    pub(crate) env: Arc<Env>,
    pub(crate) groups_db: Database<Bytes, Bytes>,
}

impl GroupStore for LmdbGroupStore {
    fn put_group(&self, id: &GroupId, data: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.groups_db
            .put(&mut wtxn, id.as_bytes(), data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_group(&self, id: &GroupId) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .groups_db
            .get(&rtxn, id.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn iter_groups(&self) -> Result<Vec<(GroupId, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.groups_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            results.push((GroupId::new(key.to_vec()), val.to_vec()));
        }
        Ok(results)
    }
}
