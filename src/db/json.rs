use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{RecordKind, RecordStore, StoreError};

// Stores each record as `<dir>/votes.json` and `<dir>/users.json`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, kind: RecordKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.key()))
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn read(&self, kind: RecordKind) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path(kind)).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { kind, source }),
        }
    }

    async fn write(&self, kind: RecordKind, body: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io { kind, source })?;
        tokio::fs::write(self.path(kind), body)
            .await
            .map_err(|source| StoreError::Io { kind, source })
    }
}
