//! Metadata storage trait.

use crate::StoreError;

/// Key of the next proposal id counter.
pub const NEXT_PROPOSAL_ID_KEY: &str = "next_proposal_id";

/// Key of the group id sequence counter.
pub const GROUP_SEQUENCE_KEY: &str = "group_sequence";

/// Trait for storing engine metadata (counters, schema version).
///
/// This is a generic key-value store for internal bookkeeping that doesn't
/// belong in any domain-specific store.
pub trait MetaStore {
    /// Store a metadata value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value.
    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Read a big-endian `u64` counter, `None` if it was never written.
    fn get_counter(&self, key: &str) -> Result<Option<u64>, StoreError> {
        match self.get_meta(key)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::Corruption(format!("counter '{key}' has {} bytes", bytes.len()))
                })?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    /// Write a big-endian `u64` counter.
    fn put_counter(&self, key: &str, value: u64) -> Result<(), StoreError> {
        self.put_meta(key, &value.to_be_bytes())
    }
}
