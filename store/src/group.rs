//! Group storage trait.

use crate::StoreError;
use agora_types::GroupId;

/// Trait for storing membership groups (group-by-id table).
pub trait GroupStore {
    /// Insert or replace a group record.
    fn put_group(&self, id: &GroupId, data: &[u8]) -> Result<(), StoreError>;

    /// Get a group record, `None` if the id is unknown.
    fn get_group(&self, id: &GroupId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Whether a group record exists.
    fn group_exists(&self, id: &GroupId) -> Result<bool, StoreError> {
        Ok(self.get_group(id)?.is_some())
    }

    /// All group records, ordered by id bytes.
    fn iter_groups(&self) -> Result<Vec<(GroupId, Vec<u8>)>, StoreError>;
}
