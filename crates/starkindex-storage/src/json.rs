//! JSON file backend.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/events.json   JSON array of records, insertion order
//! <root>/cursor.json   {"next_block": N, "updated_at": T}
//! ```
//!
//! Every write goes to a sibling `.tmp` file that is then renamed over the
//! target, so readers never observe a half-written file. Appends are
//! read-merge-rewrite under an async mutex; one process per root directory.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use starkindex_core::cursor::{CrawlCursor, CursorStore};
use starkindex_core::error::IndexerError;
use starkindex_core::record::DecodedRecord;
use starkindex_core::store::{merge_records, EventStore};

pub const EVENTS_FILE: &str = "events.json";
pub const CURSOR_FILE: &str = "cursor.json";

/// Records and cursor persisted as JSON files.
pub struct JsonFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (creating if needed) the store directory `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, IndexerError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "opened JSON store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn events_path(&self) -> PathBuf {
        self.root.join(EVENTS_FILE)
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.root.join(CURSOR_FILE)
    }
}

/// Read a records file. A missing file is an empty store.
pub async fn read_records(path: &Path) -> Result<Vec<DecodedRecord>, IndexerError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| IndexerError::Storage(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), IndexerError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, IndexerError> {
    serde_json::to_vec(value).map_err(|e| IndexerError::Storage(e.to_string()))
}

#[async_trait]
impl EventStore for JsonFileStore {
    async fn append(&self, records: Vec<DecodedRecord>) -> Result<usize, IndexerError> {
        if records.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;
        let path = self.events_path();

        let mut existing = read_records(&path).await?;
        let mut seen: HashSet<_> = existing.iter().map(DecodedRecord::key).collect();
        let added = merge_records(&mut existing, &mut seen, records);
        if added > 0 {
            write_atomic(&path, to_json(&existing)?).await?;
        }
        tracing::debug!(added, total = existing.len(), "appended records");
        Ok(added)
    }

    async fn load_all(&self) -> Result<Vec<DecodedRecord>, IndexerError> {
        read_records(&self.events_path()).await
    }
}

#[async_trait]
impl CursorStore for JsonFileStore {
    async fn load_cursor(&self) -> Result<Option<CrawlCursor>, IndexerError> {
        let path = self.cursor_path();
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| IndexerError::Storage(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_cursor(&self, cursor: &CrawlCursor) -> Result<(), IndexerError> {
        let _guard = self.write_lock.lock().await;
        write_atomic(&self.cursor_path(), to_json(cursor)?).await
    }
}
