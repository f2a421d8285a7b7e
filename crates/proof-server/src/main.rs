//! HTTP API server for allow-list Merkle proofs.

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use allowlist_merkle::StandardMerkleTree;
use allowlist_stages::{logging, StageError, StageId, StageStore};

mod config;
mod handlers;
mod routes;


use config::Config;

/// Application state shared across handlers.
///
/// Stage trees are loaded from the store on first use and never mutated
/// afterwards; a rebuilt stage is picked up through the reload endpoint.
pub struct AppState {
    pub store: StageStore,
    pub trees: HashMap<StageId, Arc<StandardMerkleTree>>,
}

pub type SharedState = Arc<RwLock<AppState>>;

impl AppState {
    pub fn new(store: StageStore) -> Self {
        Self {
            store,
            trees: HashMap::new(),
        }
    }

    /// Load and validate every stage in the store.
    pub fn preload(&mut self) -> Result<usize, StageError> {
        for stage in self.store.list()? {
            let tree = self.store.load(&stage)?;
            info!(%stage, root = %tree.root(), leaves = tree.len(), "Loaded stage");
            self.trees.insert(stage, Arc::new(tree));
        }
        Ok(self.trees.len())
    }
}

/// Load and validate a stage document off the async workers.
pub async fn load_stage(
    store: StageStore,
    stage: StageId,
) -> Result<StandardMerkleTree, StageError> {
    tokio::task::spawn_blocking(move || store.load(&stage))
        .await
        .map_err(|e| StageError::Io(std::io::Error::other(e)))?
}

/// Fetch a stage tree, loading it from the store on first request.
///
/// The document is read without holding the state lock; the write lock is
/// only taken to insert the loaded tree.
pub async fn stage_tree(
    state: &SharedState,
    stage: &StageId,
) -> Result<Arc<StandardMerkleTree>, StageError> {
    let store = {
        let guard = state.read().await;
        if let Some(tree) = guard.trees.get(stage) {
            return Ok(tree.clone());
        }
        guard.store.clone()
    };

    let tree = Arc::new(load_stage(store, stage.clone()).await?);
    info!(%stage, root = %tree.root(), leaves = tree.len(), "Loaded stage");

    let mut guard = state.write().await;
    Ok(guard.trees.entry(stage.clone()).or_insert(tree).clone())
}

/// Build the application router.
pub fn app(state: SharedState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn serve(config: Config) -> Result<(), StageError> {
    let store = StageStore::open(&config.stages_dir)?;
    info!(dir = %store.dir().display(), "Using stage store");

    let mut state = AppState::new(store);
    if config.preload {
        let count = state.preload()?;
        info!(count, "Preloaded stages");
    }

    let app = app(Arc::new(RwLock::new(state)));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let config = Config::parse();
    logging::init(config.verbose);

    info!("Starting allow-list proof server...");

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Proof server failed");
            ExitCode::FAILURE
        }
    }
}
