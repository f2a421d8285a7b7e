//! HTTP request handlers for stage roots and proofs.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use allowlist_merkle::{
    format_node, parse_address, parse_node, verify, Address, Leaf, LeafSchema, MerkleProof,
    StandardMerkleTree,
};
use allowlist_stages::{proof_for_address, AddressProof, StageError, StageId};

use crate::{load_stage, stage_tree, SharedState};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible: Option<bool>,
}

/// Failures surfaced to API clients.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Stage(#[from] StageError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Stage(e) => match e {
                StageError::InvalidStageId(_)
                | StageError::DuplicateStage(_)
                | StageError::NotAddressKeyed { .. }
                | StageError::AddressList { .. } => StatusCode::BAD_REQUEST,
                StageError::UnknownStage(_) | StageError::NotEligible { .. } => {
                    StatusCode::NOT_FOUND
                }
                StageError::Malformed { .. }
                | StageError::Build { .. }
                | StageError::Proof { .. }
                | StageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        let eligible = matches!(self, ApiError::Stage(StageError::NotEligible { .. }))
            .then_some(false);
        let body = ErrorResponse {
            error: self.to_string(),
            eligible,
        };
        (status, Json(body)).into_response()
    }
}

fn parse_stage(s: &str) -> Result<StageId, ApiError> {
    Ok(StageId::new(s)?)
}

fn parse_address_param(s: &str) -> Result<Address, ApiError> {
    parse_address(s.trim()).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ============ Stages ============

#[derive(Serialize)]
pub struct StagesResponse {
    pub stages: Vec<String>,
}

pub async fn list_stages(
    State(state): State<SharedState>,
) -> Result<Json<StagesResponse>, ApiError> {
    let store = state.read().await.store.clone();
    let stages = store.list()?.iter().map(|s| s.to_string()).collect();
    Ok(Json(StagesResponse { stages }))
}

#[derive(Serialize)]
pub struct RootResponse {
    pub stage: String,
    pub root: String,
    pub leaves: usize,
    pub depth: usize,
    pub leaf_encoding: Vec<String>,
}

impl RootResponse {
    fn new(stage: &StageId, tree: &StandardMerkleTree) -> Self {
        Self {
            stage: stage.to_string(),
            root: format_node(&tree.root()),
            leaves: tree.len(),
            depth: tree.depth(),
            leaf_encoding: tree.schema().names(),
        }
    }
}

pub async fn stage_root(
    State(state): State<SharedState>,
    Path(stage): Path<String>,
) -> Result<Json<RootResponse>, ApiError> {
    let stage = parse_stage(&stage)?;
    let tree = stage_tree(&state, &stage).await?;
    Ok(Json(RootResponse::new(&stage, &tree)))
}

/// Re-read a stage document, replacing the cached tree.
///
/// A document that fails validation leaves the cached tree in place.
pub async fn reload_stage(
    State(state): State<SharedState>,
    Path(stage): Path<String>,
) -> Result<Json<RootResponse>, ApiError> {
    let stage = parse_stage(&stage)?;
    let store = state.read().await.store.clone();
    let tree = Arc::new(load_stage(store, stage.clone()).await?);
    info!(%stage, root = %tree.root(), leaves = tree.len(), "Reloaded stage");
    state.write().await.trees.insert(stage.clone(), tree.clone());
    Ok(Json(RootResponse::new(&stage, &tree)))
}

// ============ Proofs ============

#[derive(Serialize)]
pub struct ProofResponse {
    pub stage: String,
    pub address: String,
    pub value: Vec<Value>,
    pub leaf: String,
    pub tree_index: usize,
    pub proof: Vec<String>,
    pub root: String,
}

impl ProofResponse {
    fn new(stage: &StageId, address: Address, found: AddressProof) -> Self {
        Self {
            stage: stage.to_string(),
            address: address.to_checksum(None),
            value: found.leaf.to_json(),
            leaf: format_node(&found.leaf_hash),
            tree_index: found.tree_index,
            proof: found.proof.to_hex(),
            root: format_node(&found.root),
        }
    }
}

pub async fn stage_proof(
    State(state): State<SharedState>,
    Path((stage, address)): Path<(String, String)>,
) -> Result<Json<ProofResponse>, ApiError> {
    let stage = parse_stage(&stage)?;
    let address = parse_address_param(&address)?;
    let tree = stage_tree(&state, &stage).await?;
    let found = proof_for_address(&tree, &stage, address)?;
    Ok(Json(ProofResponse::new(&stage, address, found)))
}

#[derive(Deserialize)]
pub struct LegacyProofQuery {
    pub stage: String,
    pub address: String,
}

/// Bare array of proof hashes, as the mint pages pass it to the contract.
pub async fn legacy_proof(
    State(state): State<SharedState>,
    Query(query): Query<LegacyProofQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let stage = parse_stage(&query.stage)?;
    let address = parse_address_param(&query.address)?;
    let tree = stage_tree(&state, &stage).await?;
    let found = proof_for_address(&tree, &stage, address)?;
    Ok(Json(found.proof.to_hex()))
}

// ============ Verify ============

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    pub address: String,
    pub proof: Vec<String>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub root: String,
}

/// Check an address proof against an explicit root or a stage's root.
pub async fn verify_proof(
    State(state): State<SharedState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let root = match (&req.root, &req.stage) {
        (Some(root), _) => parse_node(root)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid root: {}", root)))?,
        (None, Some(stage)) => stage_tree(&state, &parse_stage(stage)?).await?.root(),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either stage or root is required".to_string(),
            ))
        }
    };

    let address = parse_address_param(&req.address)?;
    let proof =
        MerkleProof::from_hex(&req.proof).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let valid = verify(&LeafSchema::address(), &Leaf::address(address), &proof, root)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(VerifyResponse {
        valid,
        root: format_node(&root),
    }))
}
