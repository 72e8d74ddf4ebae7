use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::engines::google::GoogleClient;
use crate::engines::indexnow::IndexNowClient;
use crate::observer::ContentChangeObserver;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub indexnow: IndexNowClient,
    pub google: GoogleClient,
    pub observer: Arc<dyn ContentChangeObserver>,
    /// Single-flight guard: at most one dispatch cycle runs at a time.
    pub cycle_lock: Mutex<()>,
}
