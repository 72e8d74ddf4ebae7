use rand::RngCore;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// First-boot provisioning: generate the IndexNow key if none exists and
/// write the verification file the provider checks for ownership.
pub async fn ensure_api_key(pool: &SqlitePool, config: &Config) -> Result<String, sqlx::Error> {
    if let Some(existing) = db::settings::get(pool, "api_key").await? {
        if !existing.is_empty() {
            return Ok(existing);
        }
    }

    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    let key = hex::encode(bytes);

    db::settings::set(pool, "api_key", &key).await?;
    tracing::info!("Generated IndexNow API key");

    write_key_file(config, &key);

    Ok(key)
}

/// Write `<key>.txt` into the site root so the front-of-house web server can
/// serve it directly. The service also serves it at the same path itself.
pub fn write_key_file(config: &Config, key: &str) {
    let Some(dir) = &config.site_root else {
        return;
    };
    let path = dir.join(format!("{key}.txt"));
    match std::fs::write(&path, key) {
        Ok(()) => tracing::info!("Wrote key verification file {}", path.display()),
        Err(e) => tracing::warn!(
            "Failed to write key verification file {}: {e}",
            path.display()
        ),
    }
}
