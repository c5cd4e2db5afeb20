//! Idempotent event store.
//!
//! Records are keyed by `(block_number, transaction_hash)`. An append only
//! adds records whose key is not already stored; the first writer of a key
//! wins, including within a single batch. Re-querying an overlapping window
//! after a crash is therefore harmless.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::cursor::{CrawlCursor, CursorStore};
use crate::error::IndexerError;
use crate::record::{DecodedRecord, RecordKey};
use crate::types::BlockNumber;

/// Durable, deduplicating record log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Merge `records` into the store. Returns how many were new.
    ///
    /// Atomic per call only; two calls are two independent merges.
    async fn append(&self, records: Vec<DecodedRecord>) -> Result<usize, IndexerError>;

    /// Every stored record, in insertion order.
    async fn load_all(&self) -> Result<Vec<DecodedRecord>, IndexerError>;

    /// Highest block number among stored records.
    async fn last_block(&self) -> Result<Option<BlockNumber>, IndexerError> {
        Ok(self
            .load_all()
            .await?
            .iter()
            .map(DecodedRecord::block_number)
            .max())
    }
}

/// Union `incoming` into `existing`, skipping keys already in `seen`.
///
/// `seen` must hold the keys of `existing`; it is updated in place. Returns the
/// number of records added.
pub fn merge_records(
    existing: &mut Vec<DecodedRecord>,
    seen: &mut HashSet<RecordKey>,
    incoming: Vec<DecodedRecord>,
) -> usize {
    let before = existing.len();
    for record in incoming {
        if seen.insert(record.key()) {
            existing.push(record);
        }
    }
    existing.len() - before
}

// ─── In-memory store ─────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    records: Vec<DecodedRecord>,
    seen: HashSet<RecordKey>,
    cursor: Option<CrawlCursor>,
}

/// In-memory store for tests and ephemeral sessions. Lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another test thread panicked mid-append;
        // the data itself is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append(&self, records: Vec<DecodedRecord>) -> Result<usize, IndexerError> {
        let mut state = self.lock();
        let MemoryState { records: existing, seen, .. } = &mut *state;
        Ok(merge_records(existing, seen, records))
    }

    async fn load_all(&self) -> Result<Vec<DecodedRecord>, IndexerError> {
        Ok(self.lock().records.clone())
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn load_cursor(&self) -> Result<Option<CrawlCursor>, IndexerError> {
        Ok(self.lock().cursor.clone())
    }

    async fn save_cursor(&self, cursor: &CrawlCursor) -> Result<(), IndexerError> {
        self.lock().cursor = Some(cursor.clone());
        Ok(())
    }
}
