use sqlx::SqlitePool;

use crate::crypto;
use crate::db;
use crate::engines::google::ServiceAccountKey;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const MAX_BATCH_SIZE: usize = 100;

/// Typed view over the settings table. Loaded fresh at the start of every
/// dispatch cycle so operator changes take effect without a restart.
#[derive(Debug, Clone)]
pub struct Settings {
    /// IndexNow site key; empty until first boot generates one.
    pub api_key: String,
    /// Encrypted service-account blob; empty when Google is not configured.
    pub google_credentials: String,
    pub content_types: Vec<String>,
    pub exclude_urls: Vec<String>,
    pub batch_size: usize,
    pub auto_submit: bool,
}

impl Settings {
    pub async fn load(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let api_key = db::settings::get(pool, "api_key").await?.unwrap_or_default();
        let google_credentials = db::settings::get(pool, "google_credentials")
            .await?
            .unwrap_or_default();

        let content_types = match db::settings::get(pool, "content_types").await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|_| default_content_types()),
            None => default_content_types(),
        };

        let exclude_urls = db::settings::get(pool, "exclude_urls")
            .await?
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        let batch_size = db::settings::get(pool, "batch_size")
            .await?
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(DEFAULT_BATCH_SIZE)
            .clamp(1, MAX_BATCH_SIZE);

        let auto_submit = db::settings::get(pool, "auto_submit")
            .await?
            .map(|raw| raw == "1")
            .unwrap_or(true);

        Ok(Settings {
            api_key,
            google_credentials,
            content_types,
            exclude_urls,
            batch_size,
            auto_submit,
        })
    }

    /// Exact string match against the exclusion list.
    pub fn is_url_excluded(&self, url: &str) -> bool {
        self.exclude_urls.iter().any(|excluded| excluded == url)
    }

    /// Decrypt and parse the stored service-account credentials.
    /// None when unset, undecryptable, or not valid JSON.
    pub fn google_credentials(&self, secret: &str) -> Option<ServiceAccountKey> {
        if self.google_credentials.is_empty() {
            return None;
        }
        let plaintext = match crypto::decrypt(&self.google_credentials, secret) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!("Stored Google credentials could not be decrypted: {e}");
                return None;
            }
        };
        match serde_json::from_str(&plaintext) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("Stored Google credentials are not valid JSON: {e}");
                None
            }
        }
    }
}

pub fn default_content_types() -> Vec<String> {
    vec!["post".to_string(), "page".to_string()]
}
