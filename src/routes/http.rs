// GET /logs

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::SnapshotError;

/// GET /logs — latest snapshot; 404 until the first aggregation run has written one.
pub(super) async fn logs_handler(State(state): State<AppState>) -> Response {
    match state.store.read().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(SnapshotError::NotFound(_)) => error_response(
            StatusCode::NOT_FOUND,
            "Processed logs not found".to_string(),
        ),
        Err(e) => {
            tracing::warn!(error = %e, operation = "read_snapshot", "snapshot unreadable");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Processed logs unreadable: {}", e),
            )
        }
    }
}

fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(serde_json::json!({ "detail": detail }))).into_response()
}
