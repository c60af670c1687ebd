//! Group registry: create, look up and mutate membership groups.

use crate::error::GroupError;
use crate::types::{Group, Member, MemberUpdate};
use agora_store::meta::GROUP_SEQUENCE_KEY;
use agora_store::{BatchStore, GroupStore, MetaStore, WriteBatch};
use agora_types::{Address, GroupId, Weight};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of membership groups, backed by a shared store.
pub struct GroupRegistry<S> {
    store: Arc<S>,
}

impl<S> Clone for GroupRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: GroupStore + MetaStore + BatchStore> GroupRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a group from `members` and allocate its id.
    ///
    /// Ids are the big-endian bytes of a persistent sequence, skipping ids
    /// already taken by genesis-imported groups.
    pub fn create_group(&self, members: Vec<Member>) -> Result<GroupId, GroupError> {
        if members.is_empty() {
            return Err(GroupError::InvalidInput(
                "a new group needs at least one member".to_string(),
            ));
        }
        let mut seq = self.store.get_counter(GROUP_SEQUENCE_KEY)?.unwrap_or(0);
        let id = loop {
            seq += 1;
            let candidate = GroupId::from_sequence(seq);
            if !self.store.group_exists(&candidate)? {
                break candidate;
            }
        };
        let group = Group::new(id.clone(), members)?;
        let mut batch = WriteBatch::new();
        batch.put_group(&id, group.encode()?);
        batch.put_counter(GROUP_SEQUENCE_KEY, seq);
        self.store.commit_batch(batch)?;
        info!(group = %id, members = group.len(), total_weight = group.total_weight(), "group created");
        Ok(id)
    }

    /// Insert a group under its own id (genesis import).
    ///
    /// Members are validated as in [`Group::new`]; an empty member list is
    /// accepted.
    pub fn import_group(&self, group: Group) -> Result<(), GroupError> {
        let group = Group::new(group.id.clone(), group.members())?;
        if self.store.group_exists(&group.id)? {
            return Err(GroupError::InvalidInput(format!(
                "group {} already exists",
                group.id
            )));
        }
        self.store.put_group(&group.id, &group.encode()?)?;
        debug!(group = %group.id, members = group.len(), "group imported");
        Ok(())
    }

    /// Look up a group.
    pub fn get_group(&self, id: &GroupId) -> Result<Group, GroupError> {
        match self.store.get_group(id)? {
            Some(bytes) => Group::decode(&bytes),
            None => Err(GroupError::GroupNotFound(id.clone())),
        }
    }

    /// Add, re-weight or (with weight 0) remove a single member.
    ///
    /// Removing a member that is not in the group is a no-op.
    pub fn update_member(
        &self,
        id: &GroupId,
        address: &Address,
        weight: Weight,
    ) -> Result<(), GroupError> {
        self.apply_updates(
            id,
            &[MemberUpdate {
                address: address.clone(),
                weight,
            }],
        )
    }

    /// Apply a batch of membership changes all-or-nothing.
    ///
    /// The batch is validated before anything is written, and the updated
    /// group is written once.
    pub fn apply_updates(&self, id: &GroupId, updates: &[MemberUpdate]) -> Result<(), GroupError> {
        let mut batch = WriteBatch::new();
        self.stage_updates(id, updates, &mut batch)?;
        self.store.commit_batch(batch)?;
        Ok(())
    }

    /// Validate membership changes and stage the updated group in `batch`.
    ///
    /// A group already staged in `batch` is updated from its staged state.
    /// Nothing is staged if validation fails.
    pub fn stage_updates(
        &self,
        id: &GroupId,
        updates: &[MemberUpdate],
        batch: &mut WriteBatch,
    ) -> Result<(), GroupError> {
        let mut seen = BTreeSet::new();
        for update in updates {
            if !seen.insert(&update.address) {
                return Err(GroupError::InvalidInput(format!(
                    "member {} updated twice in one batch",
                    update.address
                )));
            }
        }
        let mut group = match batch.staged_group(id) {
            Some(bytes) => Group::decode(bytes)?,
            None => self.get_group(id)?,
        };
        for update in updates {
            group.apply(update);
        }
        batch.put_group(id, group.encode()?);
        debug!(group = %id, updates = updates.len(), total_weight = group.total_weight(), "membership updated");
        Ok(())
    }

    /// Current total weight of a group, derived from its members.
    pub fn total_weight(&self, id: &GroupId) -> Result<u128, GroupError> {
        Ok(self.get_group(id)?.total_weight())
    }

    /// Current weight of `address` in a group, 0 for non-members.
    pub fn member_weight(&self, id: &GroupId, address: &Address) -> Result<Weight, GroupError> {
        Ok(self.get_group(id)?.weight_of(address))
    }

    /// All groups, ordered by id.
    pub fn list_groups(&self) -> Result<Vec<Group>, GroupError> {
        self.store
            .iter_groups()?
            .into_iter()
            .map(|(_, bytes)| Group::decode(&bytes))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_nullables::{NullStore, WriteFault};

    fn addr(name: &str) -> Address {
        Address::new(format!("agr_{name}"))
    }

    fn member(name: &str, weight: Weight) -> Member {
        Member::new(addr(name), weight)
    }

    fn registry() -> GroupRegistry<NullStore> {
        GroupRegistry::new(Arc::new(NullStore::new()))
    }

    #[test]
    fn failed_create_writes_neither_group_nor_sequence() {
        let store = Arc::new(NullStore::new());
        let reg = GroupRegistry::new(Arc::clone(&store));
        store.fail_writes(WriteFault::Meta(GROUP_SEQUENCE_KEY.to_string()));
        assert!(matches!(
            reg.create_group(vec![member("a", 1)]),
            Err(GroupError::Store(_))
        ));
        assert!(reg.list_groups().unwrap().is_empty());

        store.clear_faults();
        let id = reg.create_group(vec![member("a", 1)]).unwrap();
        assert_eq!(id, GroupId::from_sequence(1));
    }

    #[test]
    fn staged_updates_build_on_each_other_and_wait_for_commit() {
        let reg = registry();
        let id = reg.create_group(vec![member("a", 1)]).unwrap();
        let mut batch = WriteBatch::new();
        reg.stage_updates(&id, &[MemberUpdate { address: addr("b"), weight: 2 }], &mut batch)
            .unwrap();
        reg.stage_updates(&id, &[MemberUpdate { address: addr("c"), weight: 3 }], &mut batch)
            .unwrap();
        assert_eq!(reg.total_weight(&id).unwrap(), 1);

        reg.store.commit_batch(batch).unwrap();
        assert_eq!(reg.total_weight(&id).unwrap(), 6);
    }

    #[test]
    fn create_allocates_sequential_ids() {
        let reg = registry();
        let g1 = reg.create_group(vec![member("a", 1)]).unwrap();
        let g2 = reg.create_group(vec![member("b", 1)]).unwrap();
        assert_eq!(g1, GroupId::from_sequence(1));
        assert_eq!(g2, GroupId::from_sequence(2));
    }

    #[test]
    fn create_skips_imported_ids() {
        let reg = registry();
        let imported = Group::new(GroupId::from_sequence(1), vec![member("x", 1)]).unwrap();
        reg.import_group(imported).unwrap();
        let id = reg.create_group(vec![member("a", 1)]).unwrap();
        assert_eq!(id, GroupId::from_sequence(2));
    }

    #[test]
    fn create_rejects_invalid_members() {
        let reg = registry();
        assert!(matches!(
            reg.create_group(vec![member("a", 0)]),
            Err(GroupError::InvalidInput(_))
        ));
        assert!(matches!(
            reg.create_group(vec![member("a", 1), member("a", 2)]),
            Err(GroupError::InvalidInput(_))
        ));
        assert!(matches!(reg.create_group(vec![]), Err(GroupError::InvalidInput(_))));
        // A rejected creation does not consume an id.
        let id = reg.create_group(vec![member("a", 1)]).unwrap();
        assert_eq!(id, GroupId::from_sequence(1));
    }

    #[test]
    fn import_rejects_collision() {
        let reg = registry();
        let g = Group::new(GroupId::new(b"council".to_vec()), vec![member("a", 1)]).unwrap();
        reg.import_group(g.clone()).unwrap();
        assert!(matches!(reg.import_group(g), Err(GroupError::InvalidInput(_))));
    }

    #[test]
    fn get_unknown_group_is_not_found() {
        let reg = registry();
        assert!(matches!(
            reg.get_group(&GroupId::from_sequence(9)),
            Err(GroupError::GroupNotFound(_))
        ));
    }

    #[test]
    fn update_member_semantics() {
        let reg = registry();
        let id = reg
            .create_group(vec![member("a", 1), member("b", 1), member("c", 2)])
            .unwrap();
        assert_eq!(reg.total_weight(&id).unwrap(), 4);

        reg.update_member(&id, &addr("c"), 5).unwrap();
        assert_eq!(reg.total_weight(&id).unwrap(), 7);

        reg.update_member(&id, &addr("b"), 0).unwrap();
        assert_eq!(reg.total_weight(&id).unwrap(), 6);
        assert_eq!(reg.member_weight(&id, &addr("b")).unwrap(), 0);

        // Removing an absent member is a no-op, not an error.
        reg.update_member(&id, &addr("zed"), 0).unwrap();
        assert_eq!(reg.total_weight(&id).unwrap(), 6);

        reg.update_member(&id, &addr("d"), 1).unwrap();
        assert_eq!(reg.get_group(&id).unwrap().len(), 3);
    }

    #[test]
    fn update_unknown_group_is_not_found() {
        let reg = registry();
        assert!(matches!(
            reg.update_member(&GroupId::from_sequence(3), &addr("a"), 1),
            Err(GroupError::GroupNotFound(_))
        ));
    }

    #[test]
    fn batch_with_duplicate_address_changes_nothing() {
        let reg = registry();
        let id = reg.create_group(vec![member("a", 1)]).unwrap();
        let updates = vec![
            MemberUpdate { address: addr("b"), weight: 2 },
            MemberUpdate { address: addr("b"), weight: 0 },
        ];
        assert!(reg.apply_updates(&id, &updates).is_err());
        assert_eq!(reg.total_weight(&id).unwrap(), 1);
    }

    #[test]
    fn removing_every_member_leaves_an_empty_group() {
        let reg = registry();
        let id = reg.create_group(vec![member("a", 1)]).unwrap();
        reg.update_member(&id, &addr("a"), 0).unwrap();
        let group = reg.get_group(&id).unwrap();
        assert!(group.is_empty());
        assert_eq!(group.total_weight(), 0);
    }

    #[test]
    fn list_groups_ordered_by_id() {
        let reg = registry();
        reg.create_group(vec![member("a", 1)]).unwrap();
        reg.create_group(vec![member("b", 1)]).unwrap();
        let ids: Vec<GroupId> = reg.list_groups().unwrap().into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![GroupId::from_sequence(1), GroupId::from_sequence(2)]);
    }
}
