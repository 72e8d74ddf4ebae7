use std::net::IpAddr;
use std::path::PathBuf;

use crate::engines::{google, indexnow};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Process-wide secret the credential vault derives its key from.
    pub secret_key: String,
    pub admin_token: String,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL of the site whose content is being submitted.
    pub base_url: String,
    /// Directory the key verification file is written into, if any.
    pub site_root: Option<PathBuf>,
    pub dispatch_interval_secs: u64,
    /// Delay between a content-change event and its enqueue.
    pub submit_delay_secs: u64,
    pub indexnow_endpoint: String,
    pub google_token_url: String,
    pub google_indexing_url: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_or("SEARCHPING_DATABASE_URL", "sqlite://searchping.db");
        let secret_key = env_required("SEARCHPING_SECRET_KEY")?;
        let admin_token = env_required("SEARCHPING_ADMIN_TOKEN")?;

        let host: IpAddr = env_or("SEARCHPING_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SEARCHPING_HOST: {e}"))?;

        let port: u16 = env_or("SEARCHPING_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid SEARCHPING_PORT: {e}"))?;

        let base_url = env_required("SEARCHPING_BASE_URL")?
            .trim_end_matches('/')
            .to_string();

        let site_root = std::env::var("SEARCHPING_SITE_ROOT").ok().map(PathBuf::from);

        let dispatch_interval_secs: u64 = env_or("SEARCHPING_DISPATCH_INTERVAL", "300")
            .parse()
            .map_err(|e| format!("Invalid SEARCHPING_DISPATCH_INTERVAL: {e}"))?;

        let submit_delay_secs: u64 = env_or("SEARCHPING_SUBMIT_DELAY", "5")
            .parse()
            .map_err(|e| format!("Invalid SEARCHPING_SUBMIT_DELAY: {e}"))?;

        let indexnow_endpoint = env_or("SEARCHPING_INDEXNOW_ENDPOINT", indexnow::DEFAULT_ENDPOINT);
        let google_token_url = env_or("SEARCHPING_GOOGLE_TOKEN_URL", google::DEFAULT_TOKEN_URL);
        let google_indexing_url =
            env_or("SEARCHPING_GOOGLE_INDEXING_URL", google::DEFAULT_INDEXING_URL);

        let log_level = env_or("SEARCHPING_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            secret_key,
            admin_token,
            host,
            port,
            base_url,
            site_root,
            dispatch_interval_secs,
            submit_delay_secs,
            indexnow_endpoint,
            google_token_url,
            google_indexing_url,
            log_level,
        })
    }

    /// Host component of the site base URL, as sent in IndexNow payloads.
    pub fn site_host(&self) -> String {
        url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Well-known location of the key verification file.
    pub fn key_location(&self, api_key: &str) -> String {
        format!("{}/{api_key}.txt", self.base_url)
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
