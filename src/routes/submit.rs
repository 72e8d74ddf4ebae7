use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::db;
use crate::db::queue::Outcome;
use crate::engines::google::NotificationType;
use crate::error::AppError;
use crate::models::{Action, Engine, QueueStatus};
use crate::settings::Settings;
use crate::state::SharedState;

use super::normalize_urls;

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub urls: Vec<String>,
    #[serde(default = "SubmitRequest::default_action")]
    pub action: Action,
    #[serde(default = "SubmitRequest::default_engines")]
    pub engines: Vec<Engine>,
}

impl SubmitRequest {
    fn default_action() -> Action {
        Action::Updated
    }

    fn default_engines() -> Vec<Engine> {
        vec![Engine::Bing, Engine::Google]
    }
}

/// Immediate synchronous submission, bypassing the queue. Each result is
/// still recorded as a historical row so the log and export cover it.
pub async fn submit(
    State(state): State<SharedState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let urls = normalize_urls(&req.urls);
    if urls.is_empty() {
        return Err(AppError::BadRequest("No valid URLs provided".to_string()));
    }

    let settings = Settings::load(&state.pool).await?;
    let mut results = Vec::new();

    if req.engines.contains(&Engine::Bing)
        && req.action != Action::Deleted
        && !settings.api_key.is_empty()
    {
        let host = state.config.site_host();
        let key_location = state.config.key_location(&settings.api_key);
        let batch_results = state
            .indexnow
            .submit(
                &urls,
                &host,
                &settings.api_key,
                &key_location,
                settings.batch_size,
            )
            .await;

        for batch in &batch_results {
            let status = status_for(batch.success);
            for url in &batch.urls {
                record(&state, url, req.action, Engine::Bing, batch.http_code, &batch.response, status)
                    .await?;
                results.push(result_entry(url, Engine::Bing, batch.http_code, status));
            }
        }
    }

    if req.engines.contains(&Engine::Google) {
        if let Some(creds) = settings.google_credentials(&state.config.secret_key) {
            let url_results = state
                .google
                .submit(&urls, &creds, NotificationType::from(req.action))
                .await;

            for result in &url_results {
                let status = status_for(result.success);
                record(
                    &state,
                    &result.url,
                    req.action,
                    Engine::Google,
                    result.http_code,
                    &result.response,
                    status,
                )
                .await?;
                results.push(result_entry(&result.url, Engine::Google, result.http_code, status));
            }
        }
    }

    Ok(Json(json!({ "results": results })))
}

fn status_for(success: bool) -> QueueStatus {
    if success {
        QueueStatus::Done
    } else {
        QueueStatus::Failed
    }
}

async fn record(
    state: &SharedState,
    url: &str,
    action: Action,
    engine: Engine,
    http_code: i64,
    response: &str,
    status: QueueStatus,
) -> Result<(), AppError> {
    db::queue::record_outcome(
        &state.pool,
        0,
        url,
        action,
        &Outcome {
            engine,
            http_code,
            response,
            status,
        },
    )
    .await?;
    Ok(())
}

fn result_entry(url: &str, engine: Engine, http_code: i64, status: QueueStatus) -> serde_json::Value {
    json!({
        "url": url,
        "engine": engine.as_str(),
        "http_code": http_code,
        "status": status.as_str(),
        "timestamp": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}
