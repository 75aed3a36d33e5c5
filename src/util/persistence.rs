use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{QuoteRequest, QuoteResult};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "RateDesk";
const APP_NAME: &str = "RateDesk";

/// Records kept on disk; older quotes are dropped first.
pub const HISTORY_LIMIT: usize = 200;

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
}

/// A finished quote together with the inputs that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteHistoryRecord {
    pub id: Uuid,
    /// RFC 3339, UTC.
    pub created_at: String,
    pub request: QuoteRequest,
    pub result: QuoteResult,
}

pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
}

impl HistoryStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            limit: HISTORY_LIMIT,
        }
    }

    /// `history.json` in the project data directory.
    pub fn default_location() -> Result<Self, PersistSaveError> {
        let dirs = project_dirs().ok_or(PersistSaveError::StorageUnavailable)?;
        Ok(Self::at(dirs.data_dir().join("history.json")))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Oldest first. A missing or unreadable file is an empty history.
    pub fn load(&self) -> Vec<QuoteHistoryRecord> {
        let Ok(data) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        match serde_json::from_str(&data) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "ignoring unreadable quote history: {err}");
                Vec::new()
            }
        }
    }

    pub fn append(
        &self,
        request: &QuoteRequest,
        result: &QuoteResult,
    ) -> Result<QuoteHistoryRecord, PersistSaveError> {
        let created_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let record = QuoteHistoryRecord {
            id: Uuid::new_v4(),
            created_at,
            request: request.clone(),
            result: result.clone(),
        };

        let mut records = self.load();
        records.push(record.clone());
        if records.len() > self.limit {
            let overflow = records.len() - self.limit;
            records.drain(..overflow);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&self.path, json)?;
        tracing::info!(id = %record.id, path = %self.path.display(), "saved quote to history");

        Ok(record)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistSaveError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
    #[error(transparent)]
    Timestamp(#[from] time::error::Format),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{compute_quote, AccessorialCatalog, TariffCard, VehicleType};

    fn sample() -> (QuoteRequest, QuoteResult) {
        let tariff = TariffCard {
            base_rate: 65.0,
            per_mile_rate: 1.5,
            per_weight_unit_rate: 0.1,
            minimum_charge: 65.0,
            fuel_surcharge_pct: 20.0,
            included_distance: 15.0,
            weight_threshold: 50.0,
        };
        let request = QuoteRequest::new("ATL", VehicleType::Car, 25.0, 40.0);
        let result = compute_quote(&tariff, &request, &AccessorialCatalog::default());
        (request, result)
    }

    #[test]
    fn appended_records_load_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("quotes").join("history.json"));
        let (request, result) = sample();

        let first = store.append(&request, &result).unwrap();
        let second = store.append(&request, &result).unwrap();

        let records = store.load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, first.id);
        assert_eq!(records[1].id, second.id);
        assert_eq!(records[1].result.total, result.total);
        assert!(OffsetDateTime::parse(&records[0].created_at, &Rfc3339).is_ok());
    }

    #[test]
    fn history_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("history.json")).with_limit(2);
        let (request, result) = sample();

        let ids: Vec<_> = (0..3)
            .map(|_| store.append(&request, &result).unwrap().id)
            .collect();

        let kept: Vec<_> = store.load().into_iter().map(|r| r.id).collect();
        assert_eq!(kept, ids[1..].to_vec());
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        assert!(HistoryStore::at(dir.path().join("none.json")).load().is_empty());
    }
}
