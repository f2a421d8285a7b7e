//! Persisted tree document (`standard-v1`).
//!
//! ```json
//! {
//!   "format": "standard-v1",
//!   "tree": ["0x…", …],
//!   "values": [{ "value": ["0x…"], "treeIndex": 4 }, …],
//!   "leafEncoding": ["address"]
//! }
//! ```
//!
//! Loading a document re-derives everything it claims, so a tampered or
//! truncated file is rejected instead of serving proofs for a root nobody
//! committed.

use std::collections::HashSet;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::hash::hash_pair;
use crate::leaf::{LeafError, LeafSchema};
use crate::proof::{format_node, parse_node};
use crate::tree::{is_leaf_index, left_child_index, right_child_index, StandardMerkleTree, TreeValue};

pub const FORMAT_STANDARD_V1: &str = "standard-v1";

/// A persisted document that fails structural validation.
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid leaf encoding: {0}")]
    LeafEncoding(#[source] LeafError),
    #[error("Tree is empty")]
    EmptyTree,
    #[error("Tree has {nodes} nodes, expected {expected} for {values} values")]
    NodeCount {
        nodes: usize,
        values: usize,
        expected: usize,
    },
    #[error("Tree node {index} is not a 0x-prefixed 32-byte hash: {value}")]
    InvalidNode { index: usize, value: String },
    #[error("Value {value_index} has treeIndex {tree_index}, which is not a leaf position")]
    IndexNotLeaf { value_index: usize, tree_index: usize },
    #[error("Values {first} and {second} share treeIndex {tree_index}")]
    IndexReused {
        first: usize,
        second: usize,
        tree_index: usize,
    },
    #[error("Value {value_index} is invalid: {source}")]
    InvalidValue {
        value_index: usize,
        #[source]
        source: LeafError,
    },
    #[error("Value {value_index} does not hash to tree node {tree_index}")]
    LeafHashMismatch { value_index: usize, tree_index: usize },
    #[error("Internal node {0} is not the hash of its children")]
    NodeHashMismatch(usize),
    #[error("Value {0} duplicates an earlier value")]
    DuplicateValue(usize),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entry of the `values` array.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueEntry {
    pub value: Vec<Value>,
    pub tree_index: usize,
}

/// Serialized form of a [`StandardMerkleTree`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeDocument {
    pub format: String,
    pub tree: Vec<String>,
    pub values: Vec<ValueEntry>,
    pub leaf_encoding: Vec<String>,
}

impl TreeDocument {
    pub fn from_json(json: &str) -> Result<Self, DumpError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, DumpError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Root as written in the document, without validating anything else.
    pub fn claimed_root(&self) -> Option<B256> {
        self.tree.first().and_then(|node| parse_node(node))
    }
}

impl StandardMerkleTree {
    /// Serialize to the `standard-v1` document.
    pub fn dump(&self) -> TreeDocument {
        TreeDocument {
            format: FORMAT_STANDARD_V1.to_string(),
            tree: self
                .nodes()
                .iter()
                .map(format_node)
                .collect(),
            values: self
                .values()
                .iter()
                .map(|value| ValueEntry {
                    value: value.leaf.to_json(),
                    tree_index: value.tree_index,
                })
                .collect(),
            leaf_encoding: self.schema().names(),
        }
    }

    /// Load and fully validate a persisted document.
    pub fn load(doc: &TreeDocument) -> Result<Self, DumpError> {
        let result = Self::validate_document(doc);
        if let Err(e) = &result {
            warn!(error = %e, "Rejected persisted Merkle tree");
        }
        result
    }

    pub fn from_json(json: &str) -> Result<Self, DumpError> {
        Self::load(&TreeDocument::from_json(json)?)
    }

    fn validate_document(doc: &TreeDocument) -> Result<Self, DumpError> {
        if doc.format != FORMAT_STANDARD_V1 {
            return Err(DumpError::UnsupportedFormat(doc.format.clone()));
        }
        let schema = LeafSchema::parse(&doc.leaf_encoding).map_err(DumpError::LeafEncoding)?;

        if doc.tree.is_empty() {
            return Err(DumpError::EmptyTree);
        }
        let expected = (2 * doc.values.len()).saturating_sub(1);
        if doc.tree.len() != expected {
            return Err(DumpError::NodeCount {
                nodes: doc.tree.len(),
                values: doc.values.len(),
                expected,
            });
        }

        let nodes = doc
            .tree
            .iter()
            .enumerate()
            .map(|(index, node)| {
                parse_node(node).ok_or_else(|| DumpError::InvalidNode {
                    index,
                    value: node.clone(),
                })
            })
            .collect::<Result<Vec<B256>, _>>()?;

        for i in 0..nodes.len() {
            if !is_leaf_index(nodes.len(), i) {
                let expected = hash_pair(&nodes[left_child_index(i)], &nodes[right_child_index(i)]);
                if nodes[i] != expected {
                    return Err(DumpError::NodeHashMismatch(i));
                }
            }
        }

        let mut owners: Vec<Option<usize>> = vec![None; nodes.len()];
        let mut seen = HashSet::with_capacity(doc.values.len());
        let mut values = Vec::with_capacity(doc.values.len());

        for (value_index, entry) in doc.values.iter().enumerate() {
            let tree_index = entry.tree_index;
            if !is_leaf_index(nodes.len(), tree_index) {
                return Err(DumpError::IndexNotLeaf {
                    value_index,
                    tree_index,
                });
            }
            if let Some(first) = owners[tree_index] {
                return Err(DumpError::IndexReused {
                    first,
                    second: value_index,
                    tree_index,
                });
            }
            owners[tree_index] = Some(value_index);

            let leaf = schema
                .leaf_from_json(&entry.value)
                .map_err(|source| DumpError::InvalidValue {
                    value_index,
                    source,
                })?;
            if leaf.hash() != nodes[tree_index] {
                return Err(DumpError::LeafHashMismatch {
                    value_index,
                    tree_index,
                });
            }
            if !seen.insert(leaf.clone()) {
                return Err(DumpError::DuplicateValue(value_index));
            }

            values.push(TreeValue { leaf, tree_index });
        }

        Ok(Self::from_parts(schema, nodes, values))
    }
}
