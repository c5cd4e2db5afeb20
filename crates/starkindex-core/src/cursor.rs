//! Crawl cursor: the durable "next block to crawl" marker.
//!
//! The cursor is the only progress marker that survives a restart. It is saved
//! after every drained window, never before, so a crash re-queries the last
//! window instead of skipping it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::types::{BlockNumber, BlockWindow};

/// The crawler's position in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlCursor {
    /// First block not yet covered by a drained window.
    pub next_block: BlockNumber,
    /// Unix timestamp of the last save.
    #[serde(default)]
    pub updated_at: i64,
}

impl CrawlCursor {
    pub fn new(next_block: BlockNumber) -> Self {
        Self {
            next_block,
            updated_at: 0,
        }
    }

    /// Move past a fully drained window. Never moves backwards.
    pub fn advance_past(&mut self, window: &BlockWindow) {
        let next = window.to.saturating_add(1);
        if next > self.next_block {
            self.next_block = next;
        }
        self.updated_at = chrono::Utc::now().timestamp();
    }
}

/// Persists the cursor between sessions.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Load the saved cursor, if any.
    async fn load_cursor(&self) -> Result<Option<CrawlCursor>, IndexerError>;

    /// Save (overwrite) the cursor.
    async fn save_cursor(&self, cursor: &CrawlCursor) -> Result<(), IndexerError>;
}
