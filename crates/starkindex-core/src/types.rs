//! Shared types for the crawl pipeline.

use serde::{Deserialize, Serialize};

/// Block height. Primary ordering key for everything in the pipeline.
pub type BlockNumber = u64;

/// Opaque, node-supplied pagination cursor. `None` means the window is drained.
pub type ContinuationToken = Option<String>;

// ─── EventLog ────────────────────────────────────────────────────────────────

/// A raw event as returned by the node, before decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub block_number: BlockNumber,
    pub block_hash: String,
    pub transaction_hash: String,
    /// Contract that emitted the event.
    pub from_address: String,
    /// `keys[0]` is the event selector; the rest are `#[key]` members.
    pub keys: Vec<String>,
    pub data: Vec<String>,
}

impl EventLog {
    /// The event selector (`keys[0]`), if present.
    pub fn selector(&self) -> Option<&str> {
        self.keys.first().map(|s| s.as_str())
    }
}

/// Events of one transaction receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvents {
    /// `None` while the transaction sits in the pending block.
    pub block_number: Option<BlockNumber>,
    /// In emission order. A pending receipt's logs carry block 0 and an empty
    /// block hash.
    pub logs: Vec<EventLog>,
}

// ─── BlockHeader ─────────────────────────────────────────────────────────────

/// The few block fields the crawler needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: BlockNumber,
    pub hash: String,
    /// Unix timestamp, seconds.
    pub timestamp: i64,
}

// ─── EventQuery / EventPage ──────────────────────────────────────────────────

/// One paginated `getEvents` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    pub address: String,
    pub from_block: BlockNumber,
    pub to_block: BlockNumber,
    /// Key filter: one inner list per key position, OR-ed within a position.
    pub keys: Vec<Vec<String>>,
    pub page_size: u64,
    pub continuation_token: ContinuationToken,
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPage {
    pub logs: Vec<EventLog>,
    pub continuation_token: ContinuationToken,
}

// ─── BlockWindow ─────────────────────────────────────────────────────────────

/// An inclusive `[from, to]` block range targeted by one drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWindow {
    pub from: BlockNumber,
    pub to: BlockNumber,
}

impl BlockWindow {
    pub fn new(from: BlockNumber, to: BlockNumber) -> Self {
        Self { from, to }
    }

    /// `to - from`, the quantity compared against `min_batch`.
    pub fn width(&self) -> u64 {
        self.to.saturating_sub(self.from)
    }

    pub fn contains(&self, block: BlockNumber) -> bool {
        (self.from..=self.to).contains(&block)
    }
}

impl std::fmt::Display for BlockWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}
