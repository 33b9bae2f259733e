//! registry.rs
//!
//! Static membership of a protocol instance: who may vote and with which weight.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{NodeIndex, Weight};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Node registry must contain at least one node")]
    Empty,

    #[error("Node {0} has zero weight")]
    ZeroWeight(NodeIndex),

    #[error("Node index {0} appears more than once")]
    DuplicateIndex(NodeIndex),
}

/// A consensus participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    index: NodeIndex,
    weight: Weight,
    #[serde(default, with = "hex::serde")]
    public_key: Vec<u8>,
}

impl NodeInfo {
    pub fn new(index: NodeIndex, weight: Weight, public_key: Vec<u8>) -> Result<Self, RegistryError> {
        if weight == 0 {
            return Err(RegistryError::ZeroWeight(index));
        }
        Ok(Self { index, weight, public_key })
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

/// Immutable index -> [`NodeInfo`] map, fixed for the lifetime of a protocol run.
///
/// Serialized as a plain list of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NodeInfo>", into = "Vec<NodeInfo>")]
pub struct NodeRegistry {
    nodes: BTreeMap<NodeIndex, NodeInfo>,
    total_weight: Weight,
}

impl NodeRegistry {
    pub fn new(nodes: impl IntoIterator<Item = NodeInfo>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        let mut total_weight: Weight = 0;
        for node in nodes {
            if node.weight == 0 {
                return Err(RegistryError::ZeroWeight(node.index));
            }
            total_weight += node.weight;
            if let Some(dup) = map.insert(node.index, node) {
                return Err(RegistryError::DuplicateIndex(dup.index));
            }
        }
        if map.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Self { nodes: map, total_weight })
    }

    /// `n` nodes indexed `0..n`, weight 1 each, no key material.
    pub fn uniform(n: usize) -> Result<Self, RegistryError> {
        Self::new((0..n as NodeIndex).map(|index| NodeInfo {
            index,
            weight: 1,
            public_key: Vec::new(),
        }))
    }

    pub fn get(&self, index: NodeIndex) -> Option<&NodeInfo> {
        self.nodes.get(&index)
    }

    pub fn contains(&self, index: NodeIndex) -> bool {
        self.nodes.contains_key(&index)
    }

    pub fn weight_of(&self, index: NodeIndex) -> Option<Weight> {
        self.nodes.get(&index).map(|n| n.weight)
    }

    pub fn total_weight(&self) -> Weight {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The `position`-th index in ascending order, wrapping around.
    pub fn index_at(&self, position: u64) -> NodeIndex {
        let n = self.nodes.len() as u64;
        // Construction guarantees at least one node.
        let pos = (position % n) as usize;
        self.nodes.keys().nth(pos).copied().unwrap_or_default()
    }
}

impl TryFrom<Vec<NodeInfo>> for NodeRegistry {
    type Error = RegistryError;

    fn try_from(nodes: Vec<NodeInfo>) -> Result<Self, Self::Error> {
        Self::new(nodes)
    }
}

impl From<NodeRegistry> for Vec<NodeInfo> {
    fn from(registry: NodeRegistry) -> Self {
        registry.nodes.into_values().collect()
    }
}
