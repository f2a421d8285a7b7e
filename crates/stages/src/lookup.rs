//! Boundary operations used by the proof endpoint and deployment tooling.

use allowlist_merkle::{AbiType, AbiValue, Address, Leaf, MerkleProof, StandardMerkleTree, B256};
use tracing::debug;

use crate::stage::{StageError, StageId};
use crate::store::StageStore;

/// A proof for one address, with what a caller needs to check it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressProof {
    pub leaf: Leaf,
    pub leaf_hash: B256,
    pub tree_index: usize,
    pub proof: MerkleProof,
    pub root: B256,
}

/// Find `address` in a stage tree and build its proof.
///
/// Address-only trees use the leaf index. Trees whose leaves carry extra
/// data after the address (e.g. a mint allowance) are scanned for the first
/// value whose leading address matches.
pub fn proof_for_address(
    tree: &StandardMerkleTree,
    stage: &StageId,
    address: Address,
) -> Result<AddressProof, StageError> {
    if tree.schema().types().first() != Some(&AbiType::Address) {
        return Err(StageError::NotAddressKeyed {
            stage: stage.clone(),
            encoding: tree.schema().names().join(","),
        });
    }

    let found = if tree.schema().types().len() == 1 {
        let leaf = Leaf::address(address);
        tree.tree_index_of(&leaf).map(|index| (leaf, index))
    } else {
        tree.values()
            .iter()
            .find(|value| value.leaf.values().first() == Some(&AbiValue::Address(address)))
            .map(|value| (value.leaf.clone(), value.tree_index))
    };

    let (leaf, tree_index) = found.ok_or_else(|| StageError::NotEligible {
        stage: stage.clone(),
        address,
    })?;

    let proof = tree
        .prove_by_index(tree_index)
        .map_err(|source| StageError::Proof {
            stage: stage.clone(),
            source,
        })?;
    debug!(%stage, %address, tree_index, proof_len = proof.len(), "Served proof");

    Ok(AddressProof {
        leaf_hash: tree.nodes()[tree_index],
        leaf,
        tree_index,
        proof,
        root: tree.root(),
    })
}

/// Load `stage` from the store and prove `address`.
pub fn lookup_proof(
    store: &StageStore,
    stage: &StageId,
    address: Address,
) -> Result<AddressProof, StageError> {
    let tree = store.load(stage)?;
    proof_for_address(&tree, stage, address)
}

/// Root of a persisted stage, as committed on-chain.
pub fn get_root(store: &StageStore, stage: &StageId) -> Result<B256, StageError> {
    Ok(store.load(stage)?.root())
}
