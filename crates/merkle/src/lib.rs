//! Merkle allow-lists for staged NFT sales.
//!
//! This crate provides:
//! - `StandardMerkleTree`: build a tree over typed leaves and generate proofs
//! - `verify`: the off-chain mirror of the on-chain proof check
//! - `TreeDocument`: the persisted `standard-v1` JSON form, with validation
//!
//! Layout and hashing follow OpenZeppelin's `StandardMerkleTree`, so roots
//! and proofs are accepted by `MerkleProof.verify` on-chain.

pub mod dump;
pub mod hash;
pub mod leaf;
pub mod proof;
pub mod tree;

#[cfg(test)]
mod tests;

pub use dump::{DumpError, TreeDocument, ValueEntry, FORMAT_STANDARD_V1};
pub use hash::{hash_leaf, hash_pair};
pub use leaf::{parse_address, AbiType, AbiValue, Leaf, LeafError, LeafSchema};
pub use proof::{format_node, parse_node, verify, MerkleProof, ProofError};
pub use tree::{StandardMerkleTree, TreeError, TreeValue};

pub use alloy_primitives::{Address, B256, U256};
