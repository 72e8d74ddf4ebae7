use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// Submission intent: what should happen to the URL on the receiving end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Action {
    Updated,
    Deleted,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Updated => "updated",
            Action::Deleted => "deleted",
        }
    }
}

/// Delivery backend identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Engine {
    Bing,
    Google,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Bing => "bing",
            Engine::Google => "google",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Done,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Done => "done",
            QueueStatus::Failed => "failed",
        }
    }
}

/// One row per (URL, action) submission intent. Status only moves forward:
/// pending -> done or pending -> failed, written by the dispatcher.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct QueueItem {
    pub id: i64,
    pub url: String,
    pub action: Action,
    pub engines: Json<Vec<Engine>>,
    pub status: QueueStatus,
    pub engine: Option<Engine>,
    pub http_code: Option<i64>,
    pub response: Option<String>,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
