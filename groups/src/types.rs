//! Membership group types.

use crate::error::GroupError;
use agora_types::{Address, GroupId, Weight};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A member and their voting weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub address: Address,
    pub weight: Weight,
}

impl Member {
    pub fn new(address: Address, weight: Weight) -> Self {
        Self { address, weight }
    }
}

/// A membership change. Weight 0 removes the member; any other weight adds
/// the member or replaces their weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUpdate {
    pub address: Address,
    pub weight: Weight,
}

/// A named set of weighted participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// Member address → weight (always ≥ 1).
    #[serde(deserialize_with = "unique_members")]
    members: BTreeMap<Address, Weight>,
}

/// Deserialize the member map, rejecting an address that appears twice
/// instead of keeping its last weight.
fn unique_members<'de, D>(deserializer: D) -> Result<BTreeMap<Address, Weight>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MembersVisitor;

    impl<'de> Visitor<'de> for MembersVisitor {
        type Value = BTreeMap<Address, Weight>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of member address to weight")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut members = BTreeMap::new();
            while let Some((address, weight)) = access.next_entry::<Address, Weight>()? {
                if members.contains_key(&address) {
                    return Err(de::Error::custom(format!("duplicate member {address}")));
                }
                members.insert(address, weight);
            }
            Ok(members)
        }
    }

    deserializer.deserialize_map(MembersVisitor)
}

impl Group {
    /// Build a group, rejecting zero weights and duplicate addresses.
    pub fn new(id: GroupId, members: Vec<Member>) -> Result<Self, GroupError> {
        if id.is_empty() {
            return Err(GroupError::InvalidInput("group id is empty".to_string()));
        }
        let mut map = BTreeMap::new();
        for member in members {
            if member.weight == 0 {
                return Err(GroupError::InvalidInput(format!(
                    "member {} has non-positive weight",
                    member.address
                )));
            }
            if map.insert(member.address.clone(), member.weight).is_some() {
                return Err(GroupError::InvalidInput(format!(
                    "duplicate member {}",
                    member.address
                )));
            }
        }
        Ok(Self { id, members: map })
    }

    /// Weight of `address` in this group, 0 for non-members.
    pub fn weight_of(&self, address: &Address) -> Weight {
        self.members.get(address).copied().unwrap_or(0)
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.members.contains_key(address)
    }

    /// Sum of all member weights, recomputed on every call.
    pub fn total_weight(&self) -> u128 {
        self.members.values().map(|w| u128::from(*w)).sum()
    }

    /// Members ordered by address.
    pub fn members(&self) -> Vec<Member> {
        self.members
            .iter()
            .map(|(address, weight)| Member::new(address.clone(), *weight))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Apply one membership change. Removing an absent member is a no-op.
    pub fn apply(&mut self, update: &MemberUpdate) {
        if update.weight == 0 {
            self.members.remove(&update.address);
        } else {
            self.members.insert(update.address.clone(), update.weight);
        }
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, GroupError> {
        bincode::serialize(self)
            .map_err(|e| agora_store::StoreError::Serialization(e.to_string()).into())
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, GroupError> {
        let group: Group = bincode::deserialize(bytes)
            .map_err(|e| agora_store::StoreError::Corruption(format!("group record: {e}")))?;
        if group.members.values().any(|w| *w == 0) {
            return Err(agora_store::StoreError::Corruption(format!(
                "group {} stores a zero weight",
                group.id
            ))
            .into());
        }
        Ok(group)
    }
}
