use std::time::Duration;

use serde_json::json;

use super::{is_success, BatchResult, HTTP_TIMEOUT_SECS};

pub const DEFAULT_ENDPOINT: &str = "https://api.indexnow.org/indexnow";

/// Hard ceiling on URLs per request, imposed by the provider.
pub const MAX_BATCH: usize = 100;

const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Stateless client for the IndexNow bulk endpoint. One POST per chunk,
/// no per-URL auth; ownership is proven by the key file at the site root.
pub struct IndexNowClient {
    endpoint: String,
    backoff: Duration,
    client: reqwest::Client,
}

impl IndexNowClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            backoff: RETRY_BACKOFF,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build reqwest client"),
        }
    }

    /// Shorten the 429 backoff; used by tests.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Submit URLs in chunks of at most `batch_size`. A rate-limited chunk
    /// (429) is retried exactly once after the backoff; the second outcome
    /// is final for that chunk.
    pub async fn submit(
        &self,
        urls: &[String],
        host: &str,
        api_key: &str,
        key_location: &str,
        batch_size: usize,
    ) -> Vec<BatchResult> {
        let batch_size = batch_size.clamp(1, MAX_BATCH);
        let mut results = Vec::new();

        for chunk in urls.chunks(batch_size) {
            let payload = json!({
                "host": host,
                "key": api_key,
                "keyLocation": key_location,
                "urlList": chunk,
            });

            let mut result = self.post_batch(&payload, chunk).await;
            if result.http_code == 429 {
                tracing::warn!("IndexNow rate limited, retrying chunk once");
                tokio::time::sleep(self.backoff).await;
                result = self.post_batch(&payload, chunk).await;
            }
            results.push(result);
        }

        results
    }

    async fn post_batch(&self, payload: &serde_json::Value, urls: &[String]) -> BatchResult {
        match self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(payload)
            .send()
            .await
        {
            Ok(resp) => {
                let http_code = resp.status().as_u16() as i64;
                let response = resp.text().await.unwrap_or_default();
                BatchResult {
                    urls: urls.to_vec(),
                    http_code,
                    response,
                    success: is_success(http_code),
                }
            }
            Err(e) => BatchResult {
                urls: urls.to_vec(),
                http_code: 0,
                response: e.to_string(),
                success: false,
            },
        }
    }
}
