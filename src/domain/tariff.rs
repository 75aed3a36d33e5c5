//! Tariff resolution for a lane. The rate engine only ever sees the resolved card.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use super::entities::{TariffCard, TariffKey, TariffRow};

#[derive(Debug, Error)]
pub enum TariffError {
    #[error("no rate available for this lane ({0})")]
    NoRateAvailable(TariffKey),
    #[error("tariff store unavailable for {key}: {message}")]
    Store { key: TariffKey, message: String },
}

/// External rate table.
#[async_trait]
pub trait TariffStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// `Ok(None)` means the store answered and has no card for the lane.
    async fn lookup(&self, key: &TariffKey) -> Result<Option<TariffCard>, Self::Error>;
}

/// Explicit per-lane cards checked before any store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverrideTable {
    cards: BTreeMap<TariffKey, TariffCard>,
}

impl OverrideTable {
    pub fn from_rows(rows: impl IntoIterator<Item = TariffRow>) -> Self {
        let mut table = Self::default();
        table.extend(rows);
        table
    }

    /// Later rows replace earlier ones for the same lane. Cards are normalized on the way in.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = TariffRow>) {
        for row in rows {
            self.cards.insert(row.key.normalized(), row.card.normalized());
        }
    }

    pub fn get(&self, key: &TariffKey) -> Option<&TariffCard> {
        self.cards.get(key)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&TariffKey, &TariffCard)> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Where a resolved card came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TariffSource {
    Override,
    Store,
}

/// Store that never has a card; used when no rate table is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStore;

#[async_trait]
impl TariffStore for NoStore {
    type Error = std::convert::Infallible;

    async fn lookup(&self, _key: &TariffKey) -> Result<Option<TariffCard>, Self::Error> {
        Ok(None)
    }
}

/// An optional store: `None` answers every lookup with "no card".
#[async_trait]
impl<S: TariffStore> TariffStore for Option<S> {
    type Error = S::Error;

    async fn lookup(&self, key: &TariffKey) -> Result<Option<TariffCard>, Self::Error> {
        match self {
            Some(store) => store.lookup(key).await,
            None => Ok(None),
        }
    }
}

/// In-process rate table, for tests and offline use.
#[derive(Clone, Debug, Default)]
pub struct MemoryTariffStore {
    cards: BTreeMap<TariffKey, TariffCard>,
}

impl MemoryTariffStore {
    pub fn new(rows: impl IntoIterator<Item = TariffRow>) -> Self {
        Self {
            cards: rows
                .into_iter()
                .map(|row| (row.key.normalized(), row.card.normalized()))
                .collect(),
        }
    }
}

#[async_trait]
impl TariffStore for MemoryTariffStore {
    type Error = std::convert::Infallible;

    async fn lookup(&self, key: &TariffKey) -> Result<Option<TariffCard>, Self::Error> {
        Ok(self.cards.get(key).cloned())
    }
}

/// Resolves cards with a fixed precedence: override table, then store.
pub struct TariffResolver<S = NoStore> {
    overrides: OverrideTable,
    store: S,
}

impl TariffResolver<NoStore> {
    pub fn overrides_only(overrides: OverrideTable) -> Self {
        Self {
            overrides,
            store: NoStore,
        }
    }
}

impl<S: TariffStore> TariffResolver<S> {
    pub fn new(overrides: OverrideTable, store: S) -> Self {
        Self { overrides, store }
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    pub async fn resolve(&self, key: &TariffKey) -> Result<TariffCard, TariffError> {
        self.resolve_with_source(key).await.map(|(card, _)| card)
    }

    pub async fn resolve_with_source(
        &self,
        key: &TariffKey,
    ) -> Result<(TariffCard, TariffSource), TariffError> {
        let key = key.clone().normalized();

        if let Some(card) = self.overrides.get(&key) {
            tracing::debug!(lane = %key, "tariff resolved from override table");
            return Ok((card.clone(), TariffSource::Override));
        }

        match self.store.lookup(&key).await {
            Ok(Some(card)) => {
                tracing::debug!(lane = %key, "tariff resolved from store");
                Ok((card, TariffSource::Store))
            }
            Ok(None) => {
                tracing::info!(lane = %key, "no tariff for lane");
                Err(TariffError::NoRateAvailable(key))
            }
            Err(error) => {
                tracing::warn!(lane = %key, %error, "tariff store lookup failed");
                Err(TariffError::Store {
                    key,
                    message: error.to_string(),
                })
            }
        }
    }
}
