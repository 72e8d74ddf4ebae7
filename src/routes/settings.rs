use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::crypto;
use crate::db;
use crate::error::AppError;
use crate::settings::{Settings, MAX_BATCH_SIZE};
use crate::state::SharedState;

pub async fn get(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, AppError> {
    let settings = Settings::load(&state.pool).await?;

    // The credential blob never leaves the store, masked or otherwise.
    Ok(Json(json!({
        "api_key": settings.api_key,
        "google_credentials_configured": !settings.google_credentials.is_empty(),
        "content_types": settings.content_types,
        "exclude_urls": settings.exclude_urls,
        "batch_size": settings.batch_size,
        "auto_submit": settings.auto_submit,
    })))
}

#[derive(Deserialize)]
pub struct UpdateSettings {
    pub content_types: Option<Vec<String>>,
    pub exclude_urls: Option<Vec<String>>,
    pub batch_size: Option<usize>,
    pub auto_submit: Option<bool>,
    /// Raw service-account JSON; encrypted before storage. An empty string
    /// clears the stored credentials.
    pub google_credentials: Option<String>,
}

pub async fn update(
    State(state): State<SharedState>,
    Json(req): Json<UpdateSettings>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(raw) = &req.google_credentials {
        let raw = raw.trim();
        if raw.is_empty() {
            db::settings::delete(&state.pool, "google_credentials").await?;
        } else {
            if serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw).is_err() {
                return Err(AppError::BadRequest(
                    "Google service account credentials are not valid JSON".to_string(),
                ));
            }
            let blob = crypto::encrypt(raw, &state.config.secret_key);
            db::settings::set(&state.pool, "google_credentials", &blob).await?;
        }
    }

    if let Some(content_types) = &req.content_types {
        let raw = serde_json::to_string(content_types)
            .map_err(|e| AppError::Internal(format!("Failed to encode content types: {e}")))?;
        db::settings::set(&state.pool, "content_types", &raw).await?;
    }

    if let Some(exclude_urls) = &req.exclude_urls {
        db::settings::set(&state.pool, "exclude_urls", &exclude_urls.join("\n")).await?;
    }

    if let Some(batch_size) = req.batch_size {
        let clamped = batch_size.clamp(1, MAX_BATCH_SIZE);
        db::settings::set(&state.pool, "batch_size", &clamped.to_string()).await?;
    }

    if let Some(auto_submit) = req.auto_submit {
        db::settings::set(
            &state.pool,
            "auto_submit",
            if auto_submit { "1" } else { "0" },
        )
        .await?;
    }

    get(State(state)).await
}
