use std::collections::HashSet;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::db;
use crate::db::queue::Outcome;
use crate::engines::google::NotificationType;
use crate::models::{Action, Engine, QueueItem, QueueStatus};
use crate::settings::Settings;
use crate::state::{AppState, SharedState};

/// Max items pulled per cycle.
pub const CYCLE_LIMIT: i64 = 200;

/// Attempts before an item is abandoned as failed.
pub const RETRY_LIMIT: i64 = 3;

#[derive(Debug, Default, Clone, Serialize)]
pub struct CycleStats {
    pub fetched: usize,
    pub submitted_bing: usize,
    pub submitted_google: usize,
    pub swept: u64,
}

/// Spawn the periodic dispatch task. The first cycle runs immediately;
/// the task stops when the shutdown channel flips.
pub fn spawn_scheduler(
    state: SharedState,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let period = std::time::Duration::from_secs(state.config.dispatch_interval_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Dispatcher started (every {}s)", period.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match run_cycle(&state).await {
                        Ok(stats) if stats.fetched > 0 || stats.swept > 0 => {
                            tracing::info!(
                                "Dispatch cycle: {} fetched, {} bing, {} google, {} swept",
                                stats.fetched, stats.submitted_bing, stats.submitted_google, stats.swept
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!("Dispatch cycle failed: {e}"),
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!("Dispatcher stopped");
    })
}

/// One dispatch cycle: fetch due items, mark their attempts, route them to
/// the configured backends, persist outcomes, and sweep exhausted items.
/// A cycle that finds another one still running is a no-op.
pub async fn run_cycle(state: &AppState) -> Result<CycleStats, sqlx::Error> {
    let _guard = match state.cycle_lock.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            tracing::debug!("Dispatch cycle already running, skipping");
            return Ok(CycleStats::default());
        }
    };

    let items = db::queue::dequeue_due(&state.pool, CYCLE_LIMIT, RETRY_LIMIT).await?;
    let mut stats = CycleStats {
        fetched: items.len(),
        ..CycleStats::default()
    };

    if !items.is_empty() {
        let settings = Settings::load(&state.pool).await?;

        // The attempt is consumed whether or not delivery happens below.
        for item in &items {
            db::queue::increment_attempt(&state.pool, item.id).await?;
        }

        let mut bing_items: Vec<&QueueItem> = Vec::new();
        let mut google_items: Vec<&QueueItem> = Vec::new();
        for item in &items {
            if item.engines.contains(&Engine::Bing) && item.action != Action::Deleted {
                bing_items.push(item);
            }
            if item.engines.contains(&Engine::Google) {
                google_items.push(item);
            }
        }

        if !bing_items.is_empty() && !settings.api_key.is_empty() {
            stats.submitted_bing = deliver_bing(state, &settings, &bing_items).await?;
        }

        if !google_items.is_empty() {
            if let Some(creds) = settings.google_credentials(&state.config.secret_key) {
                for notification in [NotificationType::UrlUpdated, NotificationType::UrlDeleted] {
                    let group: Vec<&QueueItem> = google_items
                        .iter()
                        .filter(|item| NotificationType::from(item.action) == notification)
                        .copied()
                        .collect();
                    if group.is_empty() {
                        continue;
                    }
                    stats.submitted_google +=
                        deliver_google(state, &creds, &group, notification).await?;
                }
            }
        }
    }

    // Safety net: catches items that errored before delivery or whose
    // configured backend was absent, even when the fetch excluded them.
    stats.swept = db::queue::sweep_expired(&state.pool, RETRY_LIMIT).await?;

    Ok(stats)
}

async fn deliver_bing(
    state: &AppState,
    settings: &Settings,
    items: &[&QueueItem],
) -> Result<usize, sqlx::Error> {
    let urls: Vec<String> = items.iter().map(|item| item.url.clone()).collect();
    let host = state.config.site_host();
    let key_location = state.config.key_location(&settings.api_key);

    let results = state
        .indexnow
        .submit(
            &urls,
            &host,
            &settings.api_key,
            &key_location,
            settings.batch_size,
        )
        .await;

    let mut consumed = vec![false; items.len()];
    let mut recorded = 0;

    for result in &results {
        let status = if result.success {
            QueueStatus::Done
        } else {
            QueueStatus::Failed
        };
        let chunk_urls: HashSet<&str> = result.urls.iter().map(String::as_str).collect();

        // Every item whose URL is in this chunk gets the chunk's outcome;
        // duplicates each get their own row update.
        for (idx, item) in items.iter().enumerate() {
            if consumed[idx] || !chunk_urls.contains(item.url.as_str()) {
                continue;
            }
            consumed[idx] = true;
            db::queue::record_outcome(
                &state.pool,
                item.id,
                &item.url,
                item.action,
                &Outcome {
                    engine: Engine::Bing,
                    http_code: result.http_code,
                    response: &result.response,
                    status,
                },
            )
            .await?;
            recorded += 1;
        }
    }

    Ok(recorded)
}

async fn deliver_google(
    state: &AppState,
    creds: &crate::engines::google::ServiceAccountKey,
    items: &[&QueueItem],
    notification: NotificationType,
) -> Result<usize, sqlx::Error> {
    let urls: Vec<String> = items.iter().map(|item| item.url.clone()).collect();
    let results = state.google.submit(&urls, creds, notification).await;

    let mut consumed = vec![false; items.len()];
    let mut recorded = 0;

    for result in &results {
        let status = if result.success {
            QueueStatus::Done
        } else {
            QueueStatus::Failed
        };

        // One result per submitted URL occurrence: assign each to the first
        // item with that URL that has no outcome yet.
        let matched = items
            .iter()
            .enumerate()
            .find(|(idx, item)| !consumed[*idx] && item.url == result.url)
            .map(|(idx, _)| idx);

        if let Some(idx) = matched {
            consumed[idx] = true;
            db::queue::record_outcome(
                &state.pool,
                items[idx].id,
                &items[idx].url,
                items[idx].action,
                &Outcome {
                    engine: Engine::Google,
                    http_code: result.http_code,
                    response: &result.response,
                    status,
                },
            )
            .await?;
            recorded += 1;
        }
    }

    Ok(recorded)
}
