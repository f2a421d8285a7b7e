//! Inclusion proofs and the off-chain verifier.
//!
//! The fold here is the same one OpenZeppelin's `MerkleProof.verify`
//! performs on-chain; both must agree bit for bit.

use alloy_primitives::B256;
use thiserror::Error;

use crate::hash::hash_pair;
use crate::leaf::{Leaf, LeafError, LeafSchema};

/// Errors while decoding a proof from its hex form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("Proof element {index} is not a 0x-prefixed 32-byte hex string: {value}")]
    InvalidElement { index: usize, value: String },
}

/// A Merkle inclusion proof.
///
/// Sibling hashes ordered from the leaf level up to just below the root.
/// Pairs are hashed sorted, so no direction bits are needed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleProof {
    path: Vec<B256>,
}

impl MerkleProof {
    pub fn new(path: Vec<B256>) -> Self {
        Self { path }
    }

    /// Sibling hashes, leaf level first.
    pub fn path(&self) -> &[B256] {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    /// True for the proof of a single-leaf tree.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Fold the proof over a leaf hash.
    pub fn compute_root(&self, leaf_hash: B256) -> B256 {
        self.path
            .iter()
            .fold(leaf_hash, |current, sibling| hash_pair(&current, sibling))
    }

    pub fn to_hex(&self) -> Vec<String> {
        self.path.iter().map(format_node).collect()
    }

    pub fn from_hex<S: AsRef<str>>(elements: &[S]) -> Result<Self, ProofError> {
        let path = elements
            .iter()
            .enumerate()
            .map(|(index, element)| {
                parse_node(element.as_ref()).ok_or_else(|| ProofError::InvalidElement {
                    index,
                    value: element.as_ref().to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { path })
    }
}

impl From<Vec<B256>> for MerkleProof {
    fn from(path: Vec<B256>) -> Self {
        Self::new(path)
    }
}

/// `0x`-prefixed lowercase hex of a node hash.
pub fn format_node(node: &B256) -> String {
    format!("0x{}", hex::encode(node))
}

/// Parse a `0x`-prefixed 32-byte node hash.
pub fn parse_node(s: &str) -> Option<B256> {
    let digits = s.strip_prefix("0x")?;
    if digits.len() != 64 {
        return None;
    }
    let bytes = hex::decode(digits).ok()?;
    Some(B256::from_slice(&bytes))
}

/// Verify that `leaf` is included under `root`.
///
/// Returns an error only if the leaf does not fit the schema; a proof that
/// does not reproduce the root is `Ok(false)`.
pub fn verify(
    schema: &LeafSchema,
    leaf: &Leaf,
    proof: &MerkleProof,
    root: B256,
) -> Result<bool, LeafError> {
    let leaf_hash = schema.leaf_hash(leaf)?;
    Ok(proof.compute_root(leaf_hash) == root)
}
