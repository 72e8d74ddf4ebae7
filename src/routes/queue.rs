use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::db;
use crate::db::queue::ListParams;
use crate::error::AppError;
use crate::models::{Action, Engine, QueueStatus};
use crate::settings::Settings;
use crate::state::SharedState;

use super::normalize_urls;

fn default_engines() -> Vec<Engine> {
    vec![Engine::Bing, Engine::Google]
}

#[derive(Deserialize)]
pub struct EnqueueRequest {
    pub url: String,
    #[serde(default = "EnqueueRequest::default_action")]
    pub action: Action,
    #[serde(default = "default_engines")]
    pub engines: Vec<Engine>,
}

impl EnqueueRequest {
    fn default_action() -> Action {
        Action::Updated
    }
}

pub async fn enqueue(
    State(state): State<SharedState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let urls = normalize_urls(std::slice::from_ref(&req.url));
    let [url] = urls.as_slice() else {
        return Err(AppError::BadRequest("Invalid URL".to_string()));
    };
    if req.engines.is_empty() {
        return Err(AppError::BadRequest("No engines selected".to_string()));
    }

    let id = db::queue::enqueue(&state.pool, url, req.action, &req.engines).await?;
    Ok(Json(json!({ "id": id })))
}

#[derive(Deserialize)]
pub struct BulkRequest {
    pub urls: Vec<String>,
    #[serde(default = "EnqueueRequest::default_action")]
    pub action: Action,
    #[serde(default = "default_engines")]
    pub engines: Vec<Engine>,
}

/// Bulk enqueue: validates and dedupes input, drops excluded URLs, queues
/// the rest for the next dispatch cycles.
pub async fn bulk(
    State(state): State<SharedState>,
    Json(req): Json<BulkRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.engines.is_empty() {
        return Err(AppError::BadRequest("No engines selected".to_string()));
    }

    let urls = normalize_urls(&req.urls);
    if urls.is_empty() {
        return Err(AppError::BadRequest("No valid URLs provided".to_string()));
    }

    let settings = Settings::load(&state.pool).await?;
    let mut queued = 0;
    for url in &urls {
        if settings.is_url_excluded(url) {
            continue;
        }
        db::queue::enqueue(&state.pool, url, req.action, &req.engines).await?;
        queued += 1;
    }

    Ok(Json(json!({ "queued": queued })))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<QueueStatus>,
    pub engine: Option<Engine>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub orderby: Option<String>,
    pub order: Option<String>,
}

pub async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let params = ListParams {
        status: query.status,
        engine: query.engine,
        limit: per_page,
        offset: (page - 1) * per_page,
        orderby: query.orderby.unwrap_or_else(|| "created_at".to_string()),
        order: query.order.unwrap_or_else(|| "desc".to_string()),
    };

    let items = db::queue::list(&state.pool, &params).await?;
    let total = db::queue::count(&state.pool, query.status, query.engine).await?;

    Ok(Json(json!({ "items": items, "total": total })))
}

pub async fn clear(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, AppError> {
    let cleared = db::queue::clear_all(&state.pool).await?;
    Ok(Json(json!({ "cleared": cleared })))
}

/// Full CSV dump, newest first, fixed column order.
pub async fn export(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let rows = db::queue::export_rows(&state.pool).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "ID", "URL", "Action", "Engine", "Status", "HTTP Code", "Response", "Attempts",
            "Created", "Processed",
        ])
        .map_err(|e| AppError::Internal(format!("CSV write failed: {e}")))?;

    for row in &rows {
        writer
            .write_record([
                row.id.to_string(),
                row.url.clone(),
                row.action.as_str().to_string(),
                row.engine.map(|e| e.as_str().to_string()).unwrap_or_default(),
                row.status.as_str().to_string(),
                row.http_code.map(|c| c.to_string()).unwrap_or_default(),
                row.response.clone().unwrap_or_default(),
                row.attempts.to_string(),
                format_timestamp(Some(row.created_at)),
                format_timestamp(row.processed_at),
            ])
            .map_err(|e| AppError::Internal(format!("CSV write failed: {e}")))?;
    }

    let csv = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV write failed: {e}")))?;

    let filename = format!("searchping-log-{}.csv", Utc::now().format("%Y-%m-%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        csv,
    ))
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
