// HTTP routes: read-only access to the persisted snapshot

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::snapshot_store::SnapshotStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<SnapshotStore>,
}

pub fn app(store: Arc<SnapshotStore>) -> Router {
    let state = AppState { store };
    Router::new()
        .route("/logs", get(http::logs_handler)) // GET /logs
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
