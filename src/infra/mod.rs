//! Collaborators that leave the process: the hosted rate table and its disk cache.

pub mod cache;
pub mod tariff_store;

pub use cache::{load_tariff_cache, save_tariff_cache, TariffCache, TARIFF_CACHE_TTL};
pub use tariff_store::{CacheStatus, CachedPayload, HttpTariffStore, TariffStoreError};
