//! starkindex-core: chain-agnostic engine for crawling one contract's events.
//!
//! # Architecture
//!
//! ```text
//! Crawler (session loop)
//!     ├── DeploymentLocator   (binary search for the first block with code)
//!     ├── WindowPlanner       (confirmed, batch-bounded block windows)
//!     ├── SleepThrottle       (additive idle backoff)
//!     ├── PageConsumer        (continuation-token pagination, append per page)
//!     │       ├── EventDecoder         (raw log → DecodedRecord)
//!     │       └── BlockTimestampCache  (block → timestamp, per session)
//!     ├── EventStore + CursorStore     (idempotent records, resume point)
//!     └── FailureGovernor     (consecutive-failure threshold)
//!
//! BlockArchiver (raw block copy)
//!     └── BlockSink           (archived blocks, resume height)
//! ```
//!
//! Chain access goes through the [`ChainClient`] trait; the Starknet JSON-RPC
//! implementation lives in `starkindex-starknet`.

pub mod analytics;
pub mod archive;
pub mod cache;
pub mod client;
pub mod config;
pub mod crawler;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod governor;
pub mod locator;
pub mod pagination;
pub mod record;
pub mod scheduler;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use archive::{ArchiveStats, BlockArchiver, BlockSink};
pub use cache::BlockTimestampCache;
pub use client::ChainClient;
pub use config::CrawlerConfig;
pub use crawler::{CrawlStats, Crawler, CycleOutcome};
pub use cursor::{CrawlCursor, CursorStore};
pub use decoder::EventDecoder;
pub use error::IndexerError;
pub use governor::FailureGovernor;
pub use locator::DeploymentLocator;
pub use pagination::{DrainSummary, PageConsumer};
pub use record::{DecodedRecord, EventKind, RecordKey};
pub use scheduler::{CrawlState, SleepThrottle, WindowPlanner};
pub use store::{EventStore, MemoryStore};
pub use types::{
    BlockHeader, BlockNumber, BlockWindow, EventLog, EventPage, EventQuery, TransactionEvents,
};
