use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::{Action, Engine, QueueItem, QueueStatus};

/// Response bodies are truncated to this many chars before persistence.
pub const MAX_RESPONSE_LEN: usize = 500;

/// Outcome of one delivery attempt, written back to the queue row.
#[derive(Debug, Clone)]
pub struct Outcome<'a> {
    pub engine: Engine,
    pub http_code: i64,
    pub response: &'a str,
    pub status: QueueStatus,
}

pub async fn enqueue(
    pool: &SqlitePool,
    url: &str,
    action: Action,
    engines: &[Engine],
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO queue (url, action, engines, status, attempts, created_at)
         VALUES (?, ?, ?, ?, 0, ?) RETURNING id",
    )
    .bind(url)
    .bind(action)
    .bind(Json(engines))
    .bind(QueueStatus::Pending)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Pending rows that still have attempts left, oldest first.
pub async fn dequeue_due(
    pool: &SqlitePool,
    limit: i64,
    retry_limit: i64,
) -> Result<Vec<QueueItem>, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>(
        "SELECT * FROM queue WHERE status = ? AND attempts < ?
         ORDER BY created_at ASC, id ASC LIMIT ?",
    )
    .bind(QueueStatus::Pending)
    .bind(retry_limit)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Marks the attempt as consumed for this cycle, independent of outcome.
pub async fn increment_attempt(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE queue SET attempts = attempts + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Writes a delivery outcome. With id = 0 a fresh historical row is inserted
/// instead (the immediate-submit path does not pre-enqueue).
pub async fn record_outcome(
    pool: &SqlitePool,
    id: i64,
    url: &str,
    action: Action,
    outcome: &Outcome<'_>,
) -> Result<(), sqlx::Error> {
    let response: String = outcome.response.chars().take(MAX_RESPONSE_LEN).collect();
    let now = Utc::now();

    if id > 0 {
        sqlx::query(
            "UPDATE queue SET engine = ?, http_code = ?, response = ?, status = ?, processed_at = ?
             WHERE id = ?",
        )
        .bind(outcome.engine)
        .bind(outcome.http_code)
        .bind(&response)
        .bind(outcome.status)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    } else {
        sqlx::query(
            "INSERT INTO queue (url, action, engines, status, engine, http_code, response, attempts, created_at, processed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(url)
        .bind(action)
        .bind(Json(vec![outcome.engine]))
        .bind(outcome.status)
        .bind(outcome.engine)
        .bind(outcome.http_code)
        .bind(&response)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Safety net: anything still pending after exhausting its attempts is failed.
pub async fn sweep_expired(pool: &SqlitePool, retry_limit: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE queue SET status = ? WHERE status = ? AND attempts >= ?")
        .bind(QueueStatus::Failed)
        .bind(QueueStatus::Pending)
        .bind(retry_limit)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub struct ListParams {
    pub status: Option<QueueStatus>,
    pub engine: Option<Engine>,
    pub limit: i64,
    pub offset: i64,
    pub orderby: String,
    pub order: String,
}

const ALLOWED_ORDERBY: &[&str] = &[
    "id",
    "url",
    "status",
    "engine",
    "http_code",
    "created_at",
    "processed_at",
];

pub async fn list(pool: &SqlitePool, params: &ListParams) -> Result<Vec<QueueItem>, sqlx::Error> {
    let orderby = if ALLOWED_ORDERBY.contains(&params.orderby.as_str()) {
        params.orderby.as_str()
    } else {
        "created_at"
    };
    let order = if params.order.eq_ignore_ascii_case("asc") {
        "ASC"
    } else {
        "DESC"
    };

    sqlx::query_as::<_, QueueItem>(&format!(
        "SELECT * FROM queue
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR engine = ?2)
         ORDER BY {orderby} {order} LIMIT ?3 OFFSET ?4"
    ))
    .bind(params.status)
    .bind(params.engine)
    .bind(params.limit)
    .bind(params.offset)
    .fetch_all(pool)
    .await
}

pub async fn count(
    pool: &SqlitePool,
    status: Option<QueueStatus>,
    engine: Option<Engine>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM queue
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR engine = ?2)",
    )
    .bind(status)
    .bind(engine)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Irreversibly empties the queue.
pub async fn clear_all(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM queue").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Full dump for CSV export, newest first.
pub async fn export_rows(pool: &SqlitePool) -> Result<Vec<QueueItem>, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>("SELECT * FROM queue ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await
}
