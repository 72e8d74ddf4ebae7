pub mod dispatch;
pub mod events;
pub mod key;
pub mod queue;
pub mod settings;
pub mod submit;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Queue
        .route(
            "/api/v1/queue",
            get(queue::list).post(queue::enqueue).delete(queue::clear),
        )
        .route("/api/v1/queue/bulk", post(queue::bulk))
        .route("/api/v1/queue/export", get(queue::export))
        // Immediate submission (bypasses the queue)
        .route("/api/v1/submit", post(submit::submit))
        // Content-change events from the CMS collaborator
        .route("/api/v1/events", post(events::ingest))
        // Settings
        .route(
            "/api/v1/settings",
            get(settings::get).put(settings::update),
        )
        // Manual dispatch trigger
        .route("/api/v1/dispatch", post(dispatch::run))
}

pub fn public_routes() -> Router<SharedState> {
    Router::new().route("/{file}", get(key::verification_file))
}

/// Trim, validate and dedupe raw URL input, preserving order. Only absolute
/// http(s) URLs survive.
pub(crate) fn normalize_urls(raw: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();

    for entry in raw {
        // Textarea-style input may pack several URLs into one entry.
        for candidate in entry.split(['\n', ',']) {
            let candidate = candidate.trim();
            if candidate.is_empty() {
                continue;
            }
            let Ok(parsed) = url::Url::parse(candidate) else {
                continue;
            };
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                continue;
            }
            if seen.insert(candidate.to_string()) {
                urls.push(candidate.to_string());
            }
        }
    }

    urls
}
