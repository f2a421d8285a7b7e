//! Building and publishing stage trees.
//!
//! Stages are independent, so a batch builds them in parallel. Nothing is
//! written until every stage in the batch has built: a bad list never leaves
//! a partially published set of roots behind.

use std::collections::HashSet;
use std::path::PathBuf;

use allowlist_merkle::{Address, StandardMerkleTree};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::info;

use crate::stage::{StageError, StageId};
use crate::store::StageStore;

/// Addresses for one stage.
#[derive(Clone, Debug)]
pub struct StageInput {
    pub stage: StageId,
    pub addresses: Vec<Address>,
}

/// A built, not yet persisted, stage tree.
#[derive(Clone, Debug)]
pub struct BuiltStage {
    pub stage: StageId,
    pub tree: StandardMerkleTree,
}

pub fn build_stage(input: StageInput) -> Result<BuiltStage, StageError> {
    let StageInput { stage, addresses } = input;
    let tree = StandardMerkleTree::from_addresses(addresses).map_err(|source| {
        StageError::Build {
            stage: stage.clone(),
            source,
        }
    })?;
    info!(%stage, root = %tree.root(), leaves = tree.len(), "Built stage");
    Ok(BuiltStage { stage, tree })
}

/// Build every stage; fails with the first error in input order.
///
/// A stage id may appear only once per batch, so each published root has
/// exactly one tree behind it.
pub fn build_stages(inputs: Vec<StageInput>) -> Result<Vec<BuiltStage>, StageError> {
    let mut seen = HashSet::with_capacity(inputs.len());
    if let Some(dup) = inputs.iter().find(|input| !seen.insert(&input.stage)) {
        return Err(StageError::DuplicateStage(dup.stage.clone()));
    }

    #[cfg(feature = "parallel")]
    let results: Vec<_> = inputs.into_par_iter().map(build_stage).collect();
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = inputs.into_iter().map(build_stage).collect();

    results.into_iter().collect()
}

/// Persist built stages, returning the written paths.
pub fn publish(store: &StageStore, built: &[BuiltStage]) -> Result<Vec<PathBuf>, StageError> {
    built
        .iter()
        .map(|b| store.save(&b.stage, &b.tree))
        .collect()
}
