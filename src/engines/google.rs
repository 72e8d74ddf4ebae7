use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::{is_success, UrlResult, HTTP_TIMEOUT_SECS};
use crate::models::Action;
use crate::token_cache::TokenCache;

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_INDEXING_URL: &str =
    "https://indexing.googleapis.com/v3/urlNotifications:publish";

const SCOPE: &str = "https://www.googleapis.com/auth/indexing";
const TOKEN_CACHE_KEY: &str = "google_access_token";

/// Tokens expire after 60 minutes; cache slightly under that.
const TOKEN_TTL: Duration = Duration::from_secs(55 * 60);

/// The fields of a service-account JSON this client needs. Anything else in
/// the uploaded file is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub private_key: String,
}

/// Notification type for the Indexing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    UrlUpdated,
    UrlDeleted,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::UrlUpdated => "URL_UPDATED",
            NotificationType::UrlDeleted => "URL_DELETED",
        }
    }
}

impl From<Action> for NotificationType {
    fn from(action: Action) -> Self {
        match action {
            Action::Deleted => NotificationType::UrlDeleted,
            Action::Updated => NotificationType::UrlUpdated,
        }
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Client for the Google Indexing API. Exchanges a signed service-account
/// assertion for a short-lived bearer token, then notifies one URL per
/// request -- the API has no batch form.
pub struct GoogleClient {
    token_url: String,
    indexing_url: String,
    cache: Arc<TokenCache>,
    client: reqwest::Client,
}

impl GoogleClient {
    pub fn new(
        token_url: impl Into<String>,
        indexing_url: impl Into<String>,
        cache: Arc<TokenCache>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            indexing_url: indexing_url.into(),
            cache,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build reqwest client"),
        }
    }

    /// Submit all URLs with the given notification type. A token failure
    /// short-circuits the whole batch: every URL gets a failure result and
    /// no notification requests are sent.
    pub async fn submit(
        &self,
        urls: &[String],
        creds: &ServiceAccountKey,
        notification: NotificationType,
    ) -> Vec<UrlResult> {
        let token = match self.access_token(creds).await {
            Ok(token) => token,
            Err(message) => {
                return urls
                    .iter()
                    .map(|url| UrlResult {
                        url: url.clone(),
                        http_code: 0,
                        response: message.clone(),
                        success: false,
                    })
                    .collect();
            }
        };

        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            results.push(self.publish(url, &token, notification).await);
        }
        results
    }

    async fn publish(&self, url: &str, token: &str, notification: NotificationType) -> UrlResult {
        let payload = serde_json::json!({ "url": url, "type": notification.as_str() });

        match self
            .client
            .post(&self.indexing_url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) => {
                let http_code = resp.status().as_u16() as i64;
                let response = resp.text().await.unwrap_or_default();
                UrlResult {
                    url: url.to_string(),
                    http_code,
                    response,
                    success: is_success(http_code),
                }
            }
            Err(e) => UrlResult {
                url: url.to_string(),
                http_code: 0,
                response: e.to_string(),
                success: false,
            },
        }
    }

    /// Cached token, or a fresh one via the JWT-bearer grant.
    async fn access_token(&self, creds: &ServiceAccountKey) -> Result<String, String> {
        if let Some(token) = self.cache.get(TOKEN_CACHE_KEY) {
            return Ok(token);
        }

        let assertion = self.sign_assertion(creds)?;

        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &assertion),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status().as_u16();
        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);

        let token = if status == 200 {
            body.get("access_token")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        } else {
            None
        };

        let token = token.ok_or_else(|| {
            body.get("error_description")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown token error")
                .to_string()
        })?;

        self.cache
            .put(TOKEN_CACHE_KEY, token.clone(), TOKEN_TTL);
        Ok(token)
    }

    fn sign_assertion(&self, creds: &ServiceAccountKey) -> Result<String, String> {
        if creds.client_email.is_empty() || creds.private_key.is_empty() {
            return Err("Missing client_email or private_key in credentials".to_string());
        }

        let key = EncodingKey::from_rsa_pem(creds.private_key.as_bytes())
            .map_err(|e| format!("Invalid private key in credentials: {e}"))?;

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &creds.client_email,
            scope: SCOPE,
            aud: &self.token_url,
            iat: now,
            exp: now + 3600,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| format!("Failed to sign assertion: {e}"))
    }
}
