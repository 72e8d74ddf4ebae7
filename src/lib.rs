pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod dispatcher;
pub mod engines;
pub mod error;
pub mod models;
pub mod observer;
pub mod routes;
pub mod settings;
pub mod setup;
pub mod state;
pub mod token_cache;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Config;
use crate::engines::google::GoogleClient;
use crate::engines::indexnow::IndexNowClient;
use crate::observer::{ContentChangeObserver, QueueingObserver};
use crate::state::{AppState, SharedState};
use crate::token_cache::TokenCache;

pub fn build_app(pool: SqlitePool, config: Config) -> (Router, SharedState) {
    let token_cache = Arc::new(TokenCache::new());
    let indexnow = IndexNowClient::new(config.indexnow_endpoint.clone());
    let google = GoogleClient::new(
        config.google_token_url.clone(),
        config.google_indexing_url.clone(),
        token_cache,
    );
    let observer: Arc<dyn ContentChangeObserver> = Arc::new(QueueingObserver::new(
        pool.clone(),
        Duration::from_secs(config.submit_delay_secs),
    ));

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        indexnow,
        google,
        observer,
        cycle_lock: tokio::sync::Mutex::new(()),
    });

    let api = routes::api_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth::require_admin,
    ));

    let app = Router::new()
        .merge(api)
        .merge(routes::public_routes())
        .route("/health", axum::routing::get(health))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}
