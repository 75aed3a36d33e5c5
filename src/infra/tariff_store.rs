//! Thin asynchronous client for the hosted rate table.
//!
//! - Looks up one tariff card per lane (PostgREST-style filters).
//! - Keeps a 60-minute in-memory cache and serves stale cards when the
//!   backend is unreachable.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::{ServiceType, TariffCard, TariffKey, TariffRow, TariffStore, VehicleType};
use crate::util::version::user_agent;

const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TARIFF_TABLE: &str = "tariffs";

#[derive(Debug, Error)]
pub enum TariffStoreError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Cached,
    Stale,
}

#[derive(Clone, Debug)]
pub struct CachedPayload<T> {
    pub data: T,
    pub fetched_at: SystemTime,
    pub status: CacheStatus,
}

impl<T> CachedPayload<T> {
    fn new(data: T, fetched_at: SystemTime, status: CacheStatus) -> Self {
        Self {
            data,
            fetched_at,
            status,
        }
    }
}

#[derive(Clone)]
pub struct HttpTariffStore {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    cache: Arc<Mutex<HashMap<TariffKey, Cached<Option<TariffCard>>>>>,
    ttl: Duration,
}

impl HttpTariffStore {
    pub fn new(base: &str) -> Result<Self, TariffStoreError> {
        // `Url::join` drops the last path segment unless the base ends in '/'.
        let base_url = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: None,
            cache: Arc::new(Mutex::new(HashMap::new())),
            ttl: DEFAULT_TTL,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Card for one lane. `data` is `None` when the table has no row for it.
    pub async fn fetch(
        &self,
        key: &TariffKey,
    ) -> Result<CachedPayload<Option<TariffCard>>, TariffStoreError> {
        if let Some(payload) = self.cached(key).await {
            tracing::debug!(lane = %key, "serving cached tariff");
            return Ok(payload);
        }

        let url = self.lane_url(key)?;
        tracing::debug!(%url, "requesting tariff");

        match self.fetch_rows(url).await {
            Ok(rows) => {
                let card = rows.into_iter().next().map(|row| row.card);
                Ok(self.store(key.clone(), card, SystemTime::now()).await)
            }
            Err(error) => {
                if let Some(stale) = self.cached_stale(key).await {
                    tracing::warn!(lane = %key, %error, "tariff request failed; serving stale card");
                    return Ok(stale);
                }
                Err(error)
            }
        }
    }

    /// Every row of the rate table. Also refreshes the in-memory cache.
    pub async fn fetch_all(&self) -> Result<Vec<TariffRow>, TariffStoreError> {
        let mut url = self.url(TARIFF_TABLE)?;
        url.query_pairs_mut().append_pair("select", "*");
        let rows = self.fetch_rows(url).await?;
        tracing::info!(rows = rows.len(), "loaded rate table");
        self.warm(rows.clone(), SystemTime::now()).await;
        Ok(rows)
    }

    /// Seeds the cache, e.g. from the on-disk snapshot.
    pub async fn warm(&self, rows: Vec<TariffRow>, fetched_at: SystemTime) {
        let mut cache = self.cache.lock().await;
        for row in rows {
            cache.insert(row.key.normalized(), Cached::new(Some(row.card), fetched_at));
        }
    }

    fn lane_url(&self, key: &TariffKey) -> Result<Url, TariffStoreError> {
        let mut url = self.url(TARIFF_TABLE)?;
        url.query_pairs_mut()
            .append_pair("hub", &format!("eq.{}", key.hub))
            .append_pair("service_type", &format!("eq.{}", key.service_type))
            .append_pair("vehicle_type", &format!("eq.{}", key.vehicle_type))
            .append_pair("limit", "1");
        Ok(url)
    }

    async fn fetch_rows(&self, url: Url) -> Result<Vec<TariffRow>, TariffStoreError> {
        let rows: Vec<TariffRowDto> = self.fetch_data(url).await?;
        Ok(rows.into_iter().map(TariffRow::from).collect())
    }

    async fn cached(&self, key: &TariffKey) -> Option<CachedPayload<Option<TariffCard>>> {
        let cache = self.cache.lock().await;
        cache.get(key).and_then(|entry| entry.if_fresh(self.ttl))
    }

    async fn cached_stale(&self, key: &TariffKey) -> Option<CachedPayload<Option<TariffCard>>> {
        let cache = self.cache.lock().await;
        cache.get(key).map(Cached::stale)
    }

    async fn store(
        &self,
        key: TariffKey,
        card: Option<TariffCard>,
        fetched_at: SystemTime,
    ) -> CachedPayload<Option<TariffCard>> {
        let payload = CachedPayload::new(card.clone(), fetched_at, CacheStatus::Fresh);
        self.cache
            .lock()
            .await
            .insert(key, Cached::new(card, fetched_at));
        payload
    }

    async fn fetch_data<T>(&self, url: Url) -> Result<T, TariffStoreError>
    where
        T: DeserializeOwned,
    {
        let mut builder = self.http.get(url);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("apikey", api_key).bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorDto>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.to_string());
            return Err(TariffStoreError::Api(message));
        }

        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

#[async_trait]
impl TariffStore for HttpTariffStore {
    type Error = TariffStoreError;

    async fn lookup(&self, key: &TariffKey) -> Result<Option<TariffCard>, TariffStoreError> {
        self.fetch(key).await.map(|payload| payload.data)
    }
}

struct Cached<T> {
    value: T,
    fetched_at: SystemTime,
}

impl<T: Clone> Cached<T> {
    fn new(value: T, fetched_at: SystemTime) -> Self {
        Self { value, fetched_at }
    }

    fn if_fresh(&self, ttl: Duration) -> Option<CachedPayload<T>> {
        if self
            .fetched_at
            .elapsed()
            .map(|elapsed| elapsed <= ttl)
            .unwrap_or(false)
        {
            Some(CachedPayload::new(
                self.value.clone(),
                self.fetched_at,
                CacheStatus::Cached,
            ))
        } else {
            None
        }
    }

    fn stale(&self) -> CachedPayload<T> {
        CachedPayload::new(self.value.clone(), self.fetched_at, CacheStatus::Stale)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorDto {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TariffRowDto {
    #[serde(alias = "hub_code")]
    hub: String,
    #[serde(default, alias = "service_level")]
    service_type: Option<ServiceType>,
    vehicle_type: VehicleType,
    #[serde(deserialize_with = "f64_from_json")]
    base_rate: f64,
    #[serde(alias = "rate_per_mile", deserialize_with = "f64_from_json")]
    per_mile_rate: f64,
    #[serde(default, alias = "rate_per_lb", deserialize_with = "f64_from_json")]
    per_weight_unit_rate: f64,
    #[serde(default, deserialize_with = "f64_from_json")]
    minimum_charge: f64,
    #[serde(default, alias = "fuel_surcharge", deserialize_with = "f64_from_json")]
    fuel_surcharge_pct: f64,
    #[serde(default, alias = "included_miles", deserialize_with = "f64_from_json")]
    included_distance: f64,
    #[serde(default, alias = "weight_threshold_lb", deserialize_with = "f64_from_json")]
    weight_threshold: f64,
}

impl From<TariffRowDto> for TariffRow {
    fn from(dto: TariffRowDto) -> Self {
        Self {
            key: TariffKey::new(&dto.hub, dto.service_type.unwrap_or_default(), dto.vehicle_type),
            card: TariffCard {
                base_rate: dto.base_rate,
                per_mile_rate: dto.per_mile_rate,
                per_weight_unit_rate: dto.per_weight_unit_rate,
                minimum_charge: dto.minimum_charge,
                fuel_surcharge_pct: dto.fuel_surcharge_pct,
                included_distance: dto.included_distance,
                weight_threshold: dto.weight_threshold,
            }
            .normalized(),
        }
    }
}

/// Numeric columns arrive as JSON numbers or, for `numeric` types, strings.
fn f64_from_json<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct NumberOrString;

    impl<'de> serde::de::Visitor<'de> for NumberOrString {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a finite number or numeric string")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .ok_or_else(|| E::invalid_value(serde::de::Unexpected::Str(value), &self))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(NumberOrString)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn van_key() -> TariffKey {
        TariffKey::new("atl", ServiceType::Standard, VehicleType::CargoVan)
    }

    fn van_row() -> TariffRow {
        TariffRow {
            key: van_key(),
            card: TariffCard {
                base_rate: 105.0,
                per_mile_rate: 2.0,
                per_weight_unit_rate: 0.1,
                minimum_charge: 105.0,
                fuel_surcharge_pct: 25.0,
                included_distance: 20.0,
                weight_threshold: 100.0,
            },
        }
    }

    #[test]
    fn lane_url_uses_eq_filters() {
        let store = HttpTariffStore::new("https://rates.example.com/rest/v1").unwrap();
        let url = store.lane_url(&van_key()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://rates.example.com/rest/v1/tariffs?hub=eq.ATL&service_type=eq.standard&vehicle_type=eq.cargo_van&limit=1"
        );
    }

    #[test]
    fn rows_accept_numeric_strings_and_aliases() {
        let rows: Vec<TariffRowDto> = serde_json::from_str(
            r#"[{
                "hub_code": "dfw",
                "vehicle_type": "box_truck",
                "base_rate": "175.00",
                "rate_per_mile": 2.6,
                "per_weight_unit_rate": "0.08",
                "fuel_surcharge_pct": 22,
                "included_miles": 25,
                "weight_threshold": null
            }]"#,
        )
        .unwrap();

        let row = TariffRow::from(rows.into_iter().next().unwrap());
        assert_eq!(row.key.hub, "DFW");
        assert_eq!(row.key.service_type, ServiceType::Standard);
        assert_eq!(row.card.base_rate, 175.0);
        assert_eq!(row.card.per_weight_unit_rate, 0.08);
        assert_eq!(row.card.included_distance, 25.0);
        assert_eq!(row.card.weight_threshold, 0.0);
        assert_eq!(row.card.minimum_charge, 0.0);
    }

    #[test]
    fn non_finite_numeric_strings_are_rejected() {
        for value in ["NaN", "inf", "-infinity"] {
            let raw = format!(
                r#"[{{"hub": "ATL", "vehicle_type": "car", "base_rate": "{value}", "per_mile_rate": 1.5}}]"#
            );
            assert!(serde_json::from_str::<Vec<TariffRowDto>>(&raw).is_err(), "{value}");
        }
    }

    #[test]
    fn rows_are_normalized_on_conversion() {
        let rows: Vec<TariffRowDto> = serde_json::from_str(
            r#"[{"hub": "ATL", "vehicle_type": "car", "base_rate": -5, "per_mile_rate": "1.5",
                 "fuel_surcharge_pct": 140}]"#,
        )
        .unwrap();
        let row = TariffRow::from(rows.into_iter().next().unwrap());
        assert_eq!(row.card.base_rate, 0.0);
        assert_eq!(row.card.per_mile_rate, 1.5);
        assert_eq!(row.card.fuel_surcharge_pct, 100.0);
    }

    #[tokio::test]
    async fn warmed_cache_answers_without_network() {
        let store = HttpTariffStore::new("http://127.0.0.1:9/").unwrap();
        store.warm(vec![van_row()], SystemTime::now()).await;

        let payload = store.fetch(&van_key()).await.unwrap();
        assert_eq!(payload.status, CacheStatus::Cached);
        assert_eq!(payload.data.map(|card| card.base_rate), Some(105.0));
    }

    #[tokio::test]
    async fn expired_card_is_served_stale_when_backend_is_down() {
        let store = HttpTariffStore::new("http://127.0.0.1:9/")
            .unwrap()
            .with_ttl(Duration::from_secs(60));
        let two_hours_ago = SystemTime::now() - Duration::from_secs(2 * 60 * 60);
        store.warm(vec![van_row()], two_hours_ago).await;

        let payload = store.fetch(&van_key()).await.unwrap();
        assert_eq!(payload.status, CacheStatus::Stale);
        assert!(payload.data.is_some());
    }
}
