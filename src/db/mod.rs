mod json;
mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use log::info;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Tally, VoterMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Tally,
    VoterMap,
}

impl RecordKind {
    pub fn key(self) -> &'static str {
        match self {
            RecordKind::Tally => "votes",
            RecordKind::VoterMap => "users",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {kind} record: {source}")]
    Io {
        kind: RecordKind,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {kind} record: {source}")]
    Malformed {
        kind: RecordKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// Keyed text storage for the two poll records. Writes replace the whole record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // Returns `None` when the record has never been written.
    async fn read(&self, kind: RecordKind) -> Result<Option<String>, StoreError>;

    async fn write(&self, kind: RecordKind, body: &str) -> Result<(), StoreError>;
}

// Typed access to the tally and voter map over any RecordStore.
#[derive(Clone)]
pub struct Records {
    backend: Arc<dyn RecordStore>,
}

impl Records {
    pub fn new(backend: impl RecordStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    async fn load<T: DeserializeOwned>(&self, kind: RecordKind) -> Result<Option<T>, StoreError> {
        match self.backend.read(kind).await? {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|source| StoreError::Malformed { kind, source }),
            None => Ok(None),
        }
    }

    async fn save<T: Serialize>(&self, kind: RecordKind, value: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(value)
            .map_err(|source| StoreError::Malformed { kind, source })?;
        self.backend.write(kind, &body).await
    }

    pub async fn load_tally(&self, options: &[String]) -> Result<Tally, StoreError> {
        let mut tally = self
            .load::<Tally>(RecordKind::Tally)
            .await?
            .unwrap_or_else(|| Tally::zeroed(options));
        tally.fill_missing(options);
        Ok(tally)
    }

    pub async fn load_voters(&self) -> Result<VoterMap, StoreError> {
        Ok(self.load(RecordKind::VoterMap).await?.unwrap_or_default())
    }

    pub async fn save_tally(&self, tally: &Tally) -> Result<(), StoreError> {
        self.save(RecordKind::Tally, tally).await
    }

    pub async fn save_voters(&self, voters: &VoterMap) -> Result<(), StoreError> {
        self.save(RecordKind::VoterMap, voters).await
    }

    // Pre-creates both records if they do not exist yet.
    pub async fn initialize(&self, options: &[String]) -> Result<(), StoreError> {
        if self.backend.read(RecordKind::Tally).await?.is_none() {
            info!("Creating empty {} record", RecordKind::Tally);
            self.save_tally(&Tally::zeroed(options)).await?;
        }
        if self.backend.read(RecordKind::VoterMap).await?.is_none() {
            info!("Creating empty {} record", RecordKind::VoterMap);
            self.save_voters(&VoterMap::default()).await?;
        }
        Ok(())
    }

    // Zeroes the tally and empties the voter map.
    pub async fn reset(&self, options: &[String]) -> Result<(), StoreError> {
        self.save_tally(&Tally::zeroed(options)).await?;
        self.save_voters(&VoterMap::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identifier, VoterRecord};
    use chrono::Utc;

    fn options() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    fn json_records() -> (tempfile::TempDir, Records) {
        let dir = tempfile::tempdir().expect("temp dir");
        let records = Records::new(JsonFileStore::new(dir.path()));
        (dir, records)
    }

    #[tokio::test]
    async fn missing_records_load_as_defaults() {
        let (_dir, records) = json_records();
        assert_eq!(records.load_tally(&options()).await.unwrap(), Tally::zeroed(&options()));
        assert!(records.load_voters().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn initialize_does_not_clobber_existing_records() {
        let (_dir, records) = json_records();
        let mut tally = Tally::zeroed(&options());
        tally.increment("B");
        records.save_tally(&tally).await.unwrap();

        records.initialize(&options()).await.unwrap();

        assert_eq!(records.load_tally(&options()).await.unwrap().get("B"), 1);
        assert!(records.load_voters().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saved_records_load_back() {
        let (_dir, records) = json_records();
        let mut voters = VoterMap::default();
        voters.insert_new(
            Identifier::new("0011223344556677"),
            VoterRecord {
                name: "Jana".to_string(),
                choice: "A".to_string(),
                address: Some("10.0.0.1".to_string()),
                voted_at: Utc::now(),
            },
        );
        records.save_voters(&voters).await.unwrap();
        assert_eq!(records.load_voters().await.unwrap(), voters);
    }

    #[tokio::test]
    async fn malformed_record_is_an_error_not_a_default() {
        let (dir, records) = json_records();
        std::fs::write(dir.path().join("votes.json"), "{ not json").unwrap();

        let err = records.load_tally(&options()).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { kind: RecordKind::Tally, .. }));
    }

    #[tokio::test]
    async fn reset_zeroes_everything() {
        let (_dir, records) = json_records();
        let mut tally = Tally::zeroed(&options());
        tally.increment("A");
        records.save_tally(&tally).await.unwrap();

        records.reset(&options()).await.unwrap();

        assert_eq!(records.load_tally(&options()).await.unwrap(), Tally::zeroed(&options()));
        assert!(records.load_voters().await.unwrap().is_empty());
    }
}
