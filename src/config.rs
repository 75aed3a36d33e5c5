//! Desk configuration: a JSON file in the project config directory with
//! environment overrides on top.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DiscountPolicy, TariffRow};
use crate::util::persistence::project_dirs;

pub const ENV_TARIFF_URL: &str = "RATE_DESK_TARIFF_URL";
pub const ENV_TARIFF_KEY: &str = "RATE_DESK_TARIFF_KEY";
pub const ENV_CACHE_TTL_SECS: &str = "RATE_DESK_CACHE_TTL_SECS";

const CONFIG_FILENAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{name} must be a whole number of seconds, got {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Base URL of the hosted rate table; unset means fallback schedule only.
    pub tariff_url: Option<String>,
    pub tariff_api_key: Option<String>,
    /// In-memory TTL for cards fetched from the rate table.
    pub cache_ttl_secs: u64,
    pub discount: DiscountPolicy,
    /// Lane cards that win over both the fallback schedule and the rate table.
    pub tariff_overrides: Vec<TariffRow>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            tariff_url: None,
            tariff_api_key: None,
            cache_ttl_secs: 60 * 60,
            discount: DiscountPolicy::default(),
            tariff_overrides: Vec::new(),
        }
    }
}

impl DeskConfig {
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` (or the default location) and applies process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.with_env(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_TARIFF_URL).filter(|v| !v.trim().is_empty()) {
            self.tariff_url = Some(url.trim().to_string());
        }
        if let Some(key) = lookup(ENV_TARIFF_KEY).filter(|v| !v.trim().is_empty()) {
            self.tariff_api_key = Some(key.trim().to_string());
        }
        if let Some(value) = lookup(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_CACHE_TTL_SECS,
                    value,
                })?;
        }
        Ok(self)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeskConfig::load_from(&dir.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, DeskConfig::default());
        assert_eq!(config.discount.min_pct, 20.0);
        assert_eq!(config.discount.max_pct, 40.0);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"{
                "tariff_url": "https://rates.example.com/rest/v1",
                "tariff_overrides": [{
                    "hub": "SEA", "vehicle_type": "car", "base_rate": 70.0,
                    "per_mile_rate": 1.6, "per_weight_unit_rate": 0.1, "minimum_charge": 70.0,
                    "fuel_surcharge_pct": 20.0, "included_distance": 15.0, "weight_threshold": 50.0
                }]
            }"#,
        )
        .unwrap();

        let config = DeskConfig::load_from(&path).unwrap();
        assert_eq!(
            config.tariff_url.as_deref(),
            Some("https://rates.example.com/rest/v1")
        );
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.tariff_overrides.len(), 1);
        assert_eq!(config.tariff_overrides[0].card.base_rate, 70.0);
    }

    #[test]
    fn negative_override_rates_are_clamped_before_pricing() {
        use crate::domain::{
            compute_quote, AccessorialCatalog, OverrideTable, QuoteRequest, ServiceType,
            TariffKey, VehicleType,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r#"{
                "tariff_overrides": [{
                    "hub": "SEA", "vehicle_type": "car", "base_rate": -70.0,
                    "per_mile_rate": -1.6, "per_weight_unit_rate": 0.1, "minimum_charge": 70.0,
                    "fuel_surcharge_pct": 250.0, "included_distance": 15.0, "weight_threshold": 50.0
                }]
            }"#,
        )
        .unwrap();

        let config = DeskConfig::load_from(&path).unwrap();
        let table = OverrideTable::from_rows(config.tariff_overrides);
        let card = table
            .get(&TariffKey::new("sea", ServiceType::Standard, VehicleType::Car))
            .unwrap();
        assert_eq!(card.base_rate, 0.0);
        assert_eq!(card.per_mile_rate, 0.0);
        assert_eq!(card.fuel_surcharge_pct, 100.0);

        let request = QuoteRequest::new("SEA", VehicleType::Car, 40.0, 60.0);
        let result = compute_quote(card, &request, &AccessorialCatalog::default());
        assert!(result.total >= 0.0);
        assert!(result.fuel_surcharge >= 0.0);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            DeskConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn environment_overrides_file_values() {
        let config = DeskConfig::default()
            .with_env(env(&[
                (ENV_TARIFF_URL, " https://env.example.com "),
                (ENV_TARIFF_KEY, "secret"),
                (ENV_CACHE_TTL_SECS, "120"),
            ]))
            .unwrap();

        assert_eq!(config.tariff_url.as_deref(), Some("https://env.example.com"));
        assert_eq!(config.tariff_api_key.as_deref(), Some("secret"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(120));
    }

    #[test]
    fn bad_ttl_is_rejected() {
        let result = DeskConfig::default().with_env(env(&[(ENV_CACHE_TTL_SECS, "soon")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }
}
