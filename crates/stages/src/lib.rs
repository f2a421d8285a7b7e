//! Per-stage allow-list trees.
//!
//! This crate provides utilities for:
//! - Reading finalized address lists
//! - Building stage trees (in parallel across stages)
//! - Persisting one `standard-v1` document per stage
//! - Looking up proofs and roots by stage id

pub mod addresses;
pub mod build;
pub mod logging;
pub mod lookup;
pub mod stage;
pub mod store;

pub use addresses::{parse_address_list, read_address_list};
pub use build::{build_stage, build_stages, publish, BuiltStage, StageInput};
pub use lookup::{get_root, lookup_proof, proof_for_address, AddressProof};
pub use stage::{StageError, StageId};
pub use store::StageStore;

/// Default directory for persisted stage documents.
pub const DEFAULT_STAGES_DIR: &str = "stages";
