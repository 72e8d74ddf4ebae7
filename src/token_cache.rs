use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Process-wide TTL cache for short-lived bearer tokens. Races on miss are
/// tolerated: a redundant fetch just overwrites with an equivalent token.
pub struct TokenCache {
    entries: DashMap<String, (String, Instant)>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            let (token, expires_at) = entry.value();
            if Instant::now() < *expires_at {
                return Some(token.clone());
            }
        }
        self.entries.remove(key);
        None
    }

    pub fn put(&self, key: &str, token: String, ttl: Duration) {
        self.entries
            .insert(key.to_string(), (token, Instant::now() + ttl));
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
