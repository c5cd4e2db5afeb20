//! Raw block archiver.
//!
//! Copies every block from a start height up to the chain head into a
//! [`BlockSink`], then polls for new blocks. A restart resumes after the
//! highest block the sink already holds.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::client::ChainClient;
use crate::error::IndexerError;
use crate::governor::FailureGovernor;
use crate::types::BlockNumber;

/// Destination for archived blocks.
#[async_trait]
pub trait BlockSink: Send + Sync {
    /// Highest block already archived, if any.
    async fn highest_block(&self) -> Result<Option<BlockNumber>, IndexerError>;

    async fn write_block(&self, number: BlockNumber, block: &Value) -> Result<(), IndexerError>;
}

/// Counters for one archive session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    pub blocks: u64,
    /// Blocks the node reported as missing.
    pub skipped: u64,
}

pub struct BlockArchiver {
    client: Arc<dyn ChainClient>,
    sink: Arc<dyn BlockSink>,
    from_block: BlockNumber,
    to_block: Option<BlockNumber>,
    poll_interval: Duration,
    governor: FailureGovernor,
    next: Option<BlockNumber>,
    stats: ArchiveStats,
}

impl BlockArchiver {
    pub fn new(client: Arc<dyn ChainClient>, sink: Arc<dyn BlockSink>) -> Self {
        Self {
            client,
            sink,
            from_block: 0,
            to_block: None,
            poll_interval: Duration::from_secs(10),
            governor: FailureGovernor::default(),
            next: None,
            stats: ArchiveStats::default(),
        }
    }

    /// Lowest block to archive. Ignored when the sink already holds higher ones.
    pub fn from_block(mut self, block: BlockNumber) -> Self {
        self.from_block = block;
        self
    }

    /// Return once this block is archived.
    pub fn to_block(mut self, block: BlockNumber) -> Self {
        self.to_block = Some(block);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.governor = FailureGovernor::new(n);
        self
    }

    pub fn next_block(&self) -> Option<BlockNumber> {
        self.next
    }

    pub fn stats(&self) -> ArchiveStats {
        self.stats
    }

    fn is_finished(&self) -> bool {
        match (self.next, self.to_block) {
            (Some(next), Some(limit)) => next > limit,
            _ => false,
        }
    }

    async fn start_block(&self) -> Result<BlockNumber, IndexerError> {
        let resume = self.sink.highest_block().await?.map(|b| b + 1);
        Ok(resume.map_or(self.from_block, |r| r.max(self.from_block)))
    }

    /// Archive everything up to the current head (or the stop block).
    /// Returns the number of blocks written.
    pub async fn catch_up(&mut self) -> Result<u64, IndexerError> {
        let mut next = match self.next {
            Some(next) => next,
            None => {
                let start = self.start_block().await?;
                tracing::info!(start, "archiving blocks");
                self.next = Some(start);
                start
            }
        };

        let latest = self.client.latest_block_number().await?;
        let target = self.to_block.map_or(latest, |limit| limit.min(latest));

        let mut written = 0;
        while next <= target {
            match self.client.get_raw_block(next).await {
                Ok(block) => {
                    self.sink.write_block(next, &block).await?;
                    self.stats.blocks += 1;
                    written += 1;
                    tracing::debug!(block = next, "archived block");
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!(block = next, error = %e, "block not found, skipping");
                    self.stats.skipped += 1;
                }
                Err(e) => return Err(e),
            }
            next += 1;
            self.next = Some(next);
        }
        Ok(written)
    }

    /// Archive and poll until the stop block is passed, or forever.
    ///
    /// Failed rounds are retried after the poll interval; the governor's
    /// threshold ends the session with the last error.
    pub async fn run(&mut self) -> Result<ArchiveStats, IndexerError> {
        loop {
            match self.catch_up().await {
                Ok(written) => {
                    self.governor.record_success();
                    if written > 0 {
                        tracing::info!(written, next_block = ?self.next, "archive caught up");
                    }
                }
                Err(e) => {
                    let error = e.to_string();
                    let consecutive = self.governor.record_failure(e)?;
                    tracing::warn!(consecutive, error = %error, "archive round failed, retrying");
                }
            }
            if self.is_finished() {
                return Ok(self.stats);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
