//! Persistent on-disk snapshot of the rate table with a TTL.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::domain::TariffRow;

const CACHE_FILENAME: &str = "tariff_cache.json";

/// Disk snapshots older than this are ignored.
pub const TARIFF_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Snapshot of the hosted rate table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TariffCache {
    /// Rate table base URL the rows were loaded from.
    pub source: String,
    /// Unix timestamp (seconds) when this cache was created.
    pub cached_at: u64,
    pub rows: Vec<TariffRow>,
}

impl TariffCache {
    /// Create a new cache with current timestamp.
    pub fn new(source: String, rows: Vec<TariffRow>) -> Self {
        Self {
            source,
            cached_at: unix_now(),
            rows,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age() > TARIFF_CACHE_TTL
    }

    pub fn age(&self) -> Duration {
        Duration::from_secs(unix_now().saturating_sub(self.cached_at))
    }

    /// When the rows were fetched, for seeding the in-memory cache.
    pub fn fetched_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.cached_at)
    }

    /// Human-readable age string.
    pub fn age_string(&self) -> String {
        let secs = self.age().as_secs();
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Default cache file path (in the local data directory).
pub fn cache_path() -> PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rate-desk")
            .join(CACHE_FILENAME)
    })
    .clone()
}

/// Load the snapshot for `source`. Expired snapshots and snapshots of
/// another rate table are ignored.
pub fn load_tariff_cache(path: &Path, source: &str) -> Option<TariffCache> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no tariff cache");
        return None;
    }

    let cache = match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<TariffCache>(&content) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to parse tariff cache: {e}");
                return None;
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to read tariff cache: {e}");
            return None;
        }
    };

    if cache.source != source {
        tracing::info!(cached = %cache.source, source = %source, "tariff cache belongs to another rate table");
        return None;
    }
    if cache.is_expired() {
        tracing::info!(age = %cache.age_string(), "tariff cache expired");
        return None;
    }

    tracing::info!(
        rows = cache.rows.len(),
        age = %cache.age_string(),
        "loaded tariff cache"
    );
    Some(cache)
}

pub fn save_tariff_cache(path: &Path, cache: &TariffCache) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(cache)?;
    fs::write(path, content)?;
    tracing::info!(
        rows = cache.rows.len(),
        path = %path.display(),
        "saved tariff cache"
    );
    Ok(())
}
