use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::db;
use crate::error::AppError;
use crate::state::SharedState;

/// Serve the IndexNow key verification file at its well-known path. The
/// provider fetches `https://<host>/<key>.txt` to validate site ownership.
pub async fn verification_file(
    State(state): State<SharedState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let api_key = db::settings::get(&state.pool, "api_key")
        .await?
        .unwrap_or_default();

    if api_key.is_empty() || file != format!("{api_key}.txt") {
        return Err(AppError::NotFound("Not found".to_string()));
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain"),
            (header::HeaderName::from_static("x-robots-tag"), "noindex"),
        ],
        api_key,
    ))
}
