//! Standard Merkle tree construction and proof generation.
//!
//! The tree is a flat array of `2n - 1` node hashes for `n` leaves, root at
//! position 0. Leaf hashes are sorted ascending and laid out from the end of
//! the array backwards (the OpenZeppelin `StandardMerkleTree` layout), so the
//! root depends only on the set of leaves and never on input order.
//!
//! ```text
//!            0
//!        1       2
//!      3   4   5   6      <- n = 4 leaves at positions 3..=6
//! ```
//!
//! Every internal node has exactly two children; a leaf count that is not a
//! power of two just leaves the bottom level partly filled.

use std::collections::HashMap;

use alloy_primitives::B256;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::hash::hash_pair;
use crate::leaf::{Leaf, LeafError, LeafSchema};
use crate::proof::{format_node, MerkleProof};

/// Errors during tree construction or proof generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Cannot build a Merkle tree without leaves")]
    EmptyInput,
    #[error("Duplicate leaf {leaf} at input positions {first} and {second}")]
    DuplicateLeaf {
        leaf: String,
        first: usize,
        second: usize,
    },
    #[error("Leaf {0} is not in the tree")]
    NotFound(String),
    #[error("Position {position} is not a leaf of a tree with {nodes} nodes")]
    NotALeaf { position: usize, nodes: usize },
    #[error("Value index {index} out of range for {len} values")]
    ValueOutOfRange { index: usize, len: usize },
    #[error("Invalid leaf at input position {position}: {source}")]
    Leaf {
        position: usize,
        #[source]
        source: LeafError,
    },
}

/// Position of the parent of node `i` (`i > 0`).
pub fn parent_index(i: usize) -> usize {
    debug_assert!(i > 0, "root has no parent");
    (i - 1) / 2
}

/// Position of the sibling of node `i` (`i > 0`).
pub fn sibling_index(i: usize) -> usize {
    debug_assert!(i > 0, "root has no sibling");
    if i % 2 == 0 {
        i - 1
    } else {
        i + 1
    }
}

pub fn left_child_index(i: usize) -> usize {
    2 * i + 1
}

pub fn right_child_index(i: usize) -> usize {
    2 * i + 2
}

/// Whether `i` is a leaf position in a flat tree of `nodes` nodes.
pub fn is_leaf_index(nodes: usize, i: usize) -> bool {
    i < nodes && left_child_index(i) >= nodes
}

/// Lay out sorted leaf hashes and compute every internal node.
///
/// `sorted_leaves` must be non-empty. Leaf `k` lands at `len - 1 - k`.
pub(crate) fn make_tree(sorted_leaves: &[B256]) -> Vec<B256> {
    let n = sorted_leaves.len();
    let len = 2 * n - 1;
    let mut nodes = vec![B256::ZERO; len];

    for (k, leaf) in sorted_leaves.iter().enumerate() {
        nodes[len - 1 - k] = *leaf;
    }
    for i in (0..len - n).rev() {
        nodes[i] = hash_pair(&nodes[left_child_index(i)], &nodes[right_child_index(i)]);
    }

    nodes
}

/// An input value and where it ended up in the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeValue {
    pub leaf: Leaf,
    pub tree_index: usize,
}

/// Immutable allow-list Merkle tree.
///
/// Holds the flat node array, the input values in caller order with their
/// tree positions, and a lookup from leaf value to tree position.
#[derive(Clone, Debug)]
pub struct StandardMerkleTree {
    schema: LeafSchema,
    nodes: Vec<B256>,
    values: Vec<TreeValue>,
    leaf_index: HashMap<Leaf, usize>,
}

impl StandardMerkleTree {
    /// Build a tree over `leaves`.
    ///
    /// Fails on empty input, on a leaf that does not fit `schema`, and on two
    /// leaves with the same encoding. Duplicates are never merged: the
    /// caller decides what the allow list should contain.
    pub fn build(schema: LeafSchema, leaves: Vec<Leaf>) -> Result<Self, TreeError> {
        if leaves.is_empty() {
            return Err(TreeError::EmptyInput);
        }

        for (position, leaf) in leaves.iter().enumerate() {
            schema
                .check(leaf)
                .map_err(|source| TreeError::Leaf { position, source })?;
        }

        #[cfg(feature = "parallel")]
        let hashes: Vec<B256> = leaves.par_iter().map(Leaf::hash).collect();
        #[cfg(not(feature = "parallel"))]
        let hashes: Vec<B256> = leaves.iter().map(Leaf::hash).collect();

        // (hash, value index), sorted by hash; equal hashes end up adjacent.
        let mut order: Vec<(B256, usize)> = hashes.into_iter().zip(0..).collect();
        order.sort();

        if let Some(pair) = order.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            let (first, second) = (pair[0].1, pair[1].1);
            return Err(TreeError::DuplicateLeaf {
                leaf: leaves[second].to_string(),
                first,
                second,
            });
        }

        let sorted: Vec<B256> = order.iter().map(|(hash, _)| *hash).collect();
        let nodes = make_tree(&sorted);

        let mut tree_indices = vec![0usize; leaves.len()];
        for (k, (_, value_index)) in order.iter().enumerate() {
            tree_indices[*value_index] = nodes.len() - 1 - k;
        }

        let values: Vec<TreeValue> = leaves
            .into_iter()
            .zip(tree_indices)
            .map(|(leaf, tree_index)| TreeValue { leaf, tree_index })
            .collect();

        let tree = Self::from_parts(schema, nodes, values);
        info!(
            leaves = tree.len(),
            depth = tree.depth(),
            root = %tree.root(),
            "Built Merkle tree"
        );
        Ok(tree)
    }

    /// Build a single-address allow-list tree.
    pub fn from_addresses<I>(addresses: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = alloy_primitives::Address>,
    {
        let leaves = addresses.into_iter().map(Leaf::address).collect();
        Self::build(LeafSchema::address(), leaves)
    }

    /// Assemble a tree from already-validated parts.
    pub(crate) fn from_parts(schema: LeafSchema, nodes: Vec<B256>, values: Vec<TreeValue>) -> Self {
        let leaf_index = values
            .iter()
            .map(|value| (value.leaf.clone(), value.tree_index))
            .collect();
        Self {
            schema,
            nodes,
            values,
            leaf_index,
        }
    }

    pub fn root(&self) -> B256 {
        self.nodes[0]
    }

    pub fn schema(&self) -> &LeafSchema {
        &self.schema
    }

    /// The flat node array, root first.
    pub fn nodes(&self) -> &[B256] {
        &self.nodes
    }

    /// Input values in caller order with their tree positions.
    pub fn values(&self) -> &[TreeValue] {
        &self.values
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a built tree; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Height of the tree: the proof length of the deepest leaf.
    pub fn depth(&self) -> usize {
        (usize::BITS - self.nodes.len().leading_zeros()) as usize - 1
    }

    /// Tree position of `leaf`, if present.
    pub fn tree_index_of(&self, leaf: &Leaf) -> Option<usize> {
        self.leaf_index.get(leaf).copied()
    }

    pub fn contains(&self, leaf: &Leaf) -> bool {
        self.leaf_index.contains_key(leaf)
    }

    /// Leaf hash of the `value_index`-th input value.
    pub fn leaf_hash(&self, value_index: usize) -> Result<B256, TreeError> {
        let value = self.value(value_index)?;
        Ok(self.nodes[value.tree_index])
    }

    fn value(&self, value_index: usize) -> Result<&TreeValue, TreeError> {
        self.values
            .get(value_index)
            .ok_or(TreeError::ValueOutOfRange {
                index: value_index,
                len: self.values.len(),
            })
    }

    /// Proof for the leaf at flat position `tree_index`.
    ///
    /// Collects the sibling of each node on the path to the root. The root
    /// itself is never part of the proof, so a single-leaf tree yields an
    /// empty proof.
    pub fn prove_by_index(&self, tree_index: usize) -> Result<MerkleProof, TreeError> {
        if !is_leaf_index(self.nodes.len(), tree_index) {
            return Err(TreeError::NotALeaf {
                position: tree_index,
                nodes: self.nodes.len(),
            });
        }

        let mut path = Vec::with_capacity(self.depth());
        let mut index = tree_index;
        while index > 0 {
            path.push(self.nodes[sibling_index(index)]);
            index = parent_index(index);
        }

        Ok(MerkleProof::new(path))
    }

    /// Proof for `leaf`, looked up by value.
    pub fn prove_by_value(&self, leaf: &Leaf) -> Result<MerkleProof, TreeError> {
        let tree_index = self
            .tree_index_of(leaf)
            .ok_or_else(|| TreeError::NotFound(leaf.to_string()))?;
        debug!(%leaf, tree_index, "Generating proof");
        self.prove_by_index(tree_index)
    }

    /// Proof for the `value_index`-th input value.
    pub fn prove_by_value_index(&self, value_index: usize) -> Result<MerkleProof, TreeError> {
        let tree_index = self.value(value_index)?.tree_index;
        self.prove_by_index(tree_index)
    }

    /// Check `proof` for `leaf` against this tree's root.
    pub fn verify(&self, leaf: &Leaf, proof: &MerkleProof) -> Result<bool, LeafError> {
        crate::proof::verify(&self.schema, leaf, proof, self.root())
    }

    /// Text rendering of the node array as a tree, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(usize, String)> = vec![(0, String::new())];

        while let Some((i, prefix)) = stack.pop() {
            let connector = if i == 0 {
                ""
            } else if i % 2 == 1 {
                "├─ "
            } else {
                "└─ "
            };
            out.push_str(&format!("{}{}{}) {}\n", prefix, connector, i, format_node(&self.nodes[i])));

            let right = right_child_index(i);
            if right < self.nodes.len() {
                let child_prefix = match i {
                    0 => String::new(),
                    _ if i % 2 == 1 => format!("{}│  ", prefix),
                    _ => format!("{}   ", prefix),
                };
                stack.push((right, child_prefix.clone()));
                stack.push((left_child_index(i), child_prefix));
            }
        }

        out
    }
}
