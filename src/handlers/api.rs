use crate::state::AppState;
use crate::status::DownloadStatus;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::collections::HashMap;
use tracing::info;

/// Snapshot of every tracked download, polled by the page script.
pub async fn status(State(state): State<AppState>) -> Json<HashMap<String, DownloadStatus>> {
    Json(state.statuses.read_all())
}

pub async fn cancel(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    if state.workers.cancel(&id) {
        info!("Cancellation requested for download {}", id);
        Json(serde_json::json!({ "status": "cancelling", "id": id })).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no such download", "id": id })),
        )
            .into_response()
    }
}
