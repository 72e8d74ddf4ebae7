use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::db;
use crate::models::{Action, Engine};
use crate::settings::Settings;

/// Content lifecycle event, as reported by the content-management
/// collaborator. Events only concern published content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentChange {
    pub url: String,
    pub kind: ChangeKind,
    pub content_type: String,
}

/// Observer interface for content lifecycle events.
#[async_trait]
pub trait ContentChangeObserver: Send + Sync {
    async fn on_change(&self, change: &ContentChange);
}

/// Production observer: filters events against the settings and enqueues
/// matching URLs after a short delay, so the triggering request never waits
/// on queue I/O.
pub struct QueueingObserver {
    pool: SqlitePool,
    delay: Duration,
}

impl QueueingObserver {
    pub fn new(pool: SqlitePool, delay: Duration) -> Self {
        Self { pool, delay }
    }
}

#[async_trait]
impl ContentChangeObserver for QueueingObserver {
    async fn on_change(&self, change: &ContentChange) {
        let settings = match Settings::load(&self.pool).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("Failed to load settings for change event: {e}");
                return;
            }
        };

        if !settings.auto_submit {
            return;
        }
        if !settings.content_types.contains(&change.content_type) {
            return;
        }
        if settings.is_url_excluded(&change.url) {
            return;
        }

        // IndexNow has no deletion semantics; deletes go to Google only.
        let (action, engines) = match change.kind {
            ChangeKind::Deleted => (Action::Deleted, vec![Engine::Google]),
            ChangeKind::Created | ChangeKind::Updated => {
                (Action::Updated, vec![Engine::Bing, Engine::Google])
            }
        };

        let pool = self.pool.clone();
        let url = change.url.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match db::queue::enqueue(&pool, &url, action, &engines).await {
                Ok(id) => tracing::debug!("Queued {url} as item {id}"),
                Err(e) => tracing::error!("Deferred enqueue failed for {url}: {e}"),
            }
        });
    }
}
