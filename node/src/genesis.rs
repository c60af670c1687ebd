//! Genesis state: the groups and decided proposals a chain starts from.

use std::path::Path;

use serde::{Deserialize, Serialize};

use agora_governance::Proposal;
use agora_groups::Group;

use crate::NodeError;

/// Initial governance state, exchanged as JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(default)]
    pub groups: Vec<Group>,

    /// Already-decided proposals carried over from a previous chain.
    #[serde(default)]
    pub proposals: Vec<Proposal>,
}

impl GenesisState {
    pub fn from_json_file(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, NodeError> {
        serde_json::from_str(s).map_err(|e| NodeError::Genesis(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, NodeError> {
        serde_json::to_string_pretty(self).map_err(|e| NodeError::Genesis(e.to_string()))
    }
}
