use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::observer::ContentChange;
use crate::state::SharedState;

/// Entry point for the content-management collaborator: one call per
/// lifecycle event. Filtering and the deferred enqueue happen in the
/// observer; the caller is never blocked on queue I/O.
pub async fn ingest(
    State(state): State<SharedState>,
    Json(change): Json<ContentChange>,
) -> (StatusCode, Json<serde_json::Value>) {
    state.observer.on_change(&change).await;
    (StatusCode::ACCEPTED, Json(json!({ "accepted": true })))
}
