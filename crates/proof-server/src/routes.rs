//! API route definitions for allow-list proofs.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::SharedState;

/// Create API routes
pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Stage roots and proofs
        .route("/api/stages", get(handlers::list_stages))
        .route("/api/stages/:stage/root", get(handlers::stage_root))
        .route("/api/stages/:stage/proof/:address", get(handlers::stage_proof))
        .route("/api/stages/:stage/reload", post(handlers::reload_stage))
        // Query-string form used by existing mint pages: ?stage=&address=
        .route("/api/proof", get(handlers::legacy_proof))
        // Off-chain verification
        .route("/api/verify", post(handlers::verify_proof))
}
