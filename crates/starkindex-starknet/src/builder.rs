//! Fluent builder for Starknet crawl sessions.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use starkindex_core::MemoryStore;
//! use starkindex_starknet::CrawlerBuilder;
//!
//! # fn main() -> Result<(), starkindex_core::IndexerError> {
//! let crawler = CrawlerBuilder::new()
//!     .rpc_url("http://localhost:9545")
//!     .contract_address("0xc0ffee")
//!     .confirmations(60)
//!     .max_batch(10_000)
//!     .build(Arc::new(MemoryStore::new()))?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use starkindex_core::config::CrawlerConfig;
use starkindex_core::crawler::Crawler;
use starkindex_core::cursor::CursorStore;
use starkindex_core::error::IndexerError;
use starkindex_core::record::EventKind;
use starkindex_core::store::EventStore;

use crate::decoder::AdaliansDecoder;
use crate::retry::RetryConfig;
use crate::rpc::StarknetRpcClient;
use crate::transport::HttpTransportConfig;

/// Fluent builder for a [`Crawler`] over the Starknet JSON-RPC client and the
/// Adalians decoder.
#[derive(Default)]
pub struct CrawlerBuilder {
    config: CrawlerConfig,
    rpc_url: Option<String>,
    transport: HttpTransportConfig,
}

impl CrawlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing config (e.g. loaded from a file).
    pub fn from_config(config: CrawlerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the node's JSON-RPC endpoint.
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn contract_address(mut self, address: impl Into<String>) -> Self {
        self.config.contract_address = address.into();
        self
    }

    /// Start here, ignoring any saved cursor.
    pub fn from_block(mut self, block: u64) -> Self {
        self.config.from_block = Some(block);
        self
    }

    /// Stop once this block is drained.
    pub fn to_block(mut self, block: u64) -> Self {
        self.config.to_block = Some(block);
        self
    }

    pub fn confirmations(mut self, depth: u64) -> Self {
        self.config.confirmations = depth;
        self
    }

    pub fn min_batch(mut self, blocks: u64) -> Self {
        self.config.min_batch = blocks;
        self
    }

    pub fn max_batch(mut self, blocks: u64) -> Self {
        self.config.max_batch = blocks;
        self
    }

    /// Set the `chunk_size` of each events query.
    pub fn page_size(mut self, size: u64) -> Self {
        self.config.page_size = size;
        self
    }

    /// Idle sleep floor, step and ceiling.
    pub fn idle_sleep(mut self, min: Duration, step: Duration, max: Duration) -> Self {
        self.config.min_sleep_ms = min.as_millis() as u64;
        self.config.sleep_step_ms = step.as_millis() as u64;
        self.config.max_sleep_ms = max.as_millis() as u64;
        self
    }

    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.config.failure_threshold = n;
        self
    }

    pub fn lookup_attempts(mut self, n: u32) -> Self {
        self.config.lookup_attempts = n;
        self
    }

    pub fn event_kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.config.event_kinds = kinds.into_iter().collect();
        self
    }

    /// In-place retry policy for each RPC call.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.transport.retry = retry;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.transport.request_timeout = timeout;
        self
    }

    /// Validate and return the crawler config.
    pub fn build_config(self) -> Result<CrawlerConfig, IndexerError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build a crawler that keeps records and cursor in `store`.
    pub fn build<S>(self, store: Arc<S>) -> Result<Crawler, IndexerError>
    where
        S: EventStore + CursorStore + 'static,
    {
        let url = self
            .rpc_url
            .ok_or_else(|| IndexerError::Config("rpc_url is required".into()))?;
        self.config.validate()?;
        let client = StarknetRpcClient::http_with(url, self.transport)?;
        Ok(Crawler::new(
            self.config,
            Arc::new(client),
            Arc::new(AdaliansDecoder::new()),
            store,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starkindex_core::MemoryStore;

    #[test]
    fn builder_defaults() {
        let cfg = CrawlerBuilder::new()
            .contract_address("0xc0de")
            .build_config()
            .unwrap();
        assert_eq!(cfg.confirmations, 60);
        assert_eq!(cfg.max_batch, 10_000);
        assert_eq!(cfg.page_size, 1_000);
        assert_eq!(cfg.event_kinds, EventKind::ALL.to_vec());
    }

    #[test]
    fn builder_custom() {
        let cfg = CrawlerBuilder::new()
            .contract_address("0xc0de")
            .from_block(600_000)
            .to_block(650_000)
            .confirmations(10)
            .max_batch(500)
            .page_size(100)
            .idle_sleep(
                Duration::from_millis(50),
                Duration::from_millis(25),
                Duration::from_secs(2),
            )
            .event_kinds([EventKind::CrewmateRecruitedV1])
            .build_config()
            .unwrap();

        assert_eq!(cfg.from_block, Some(600_000));
        assert_eq!(cfg.to_block, Some(650_000));
        assert_eq!(cfg.confirmations, 10);
        assert_eq!(cfg.max_batch, 500);
        assert_eq!(cfg.sleep_step_ms, 25);
        assert_eq!(cfg.max_sleep_ms, 2_000);
        assert_eq!(cfg.event_kinds, vec![EventKind::CrewmateRecruitedV1]);
    }

    #[test]
    fn build_requires_url_and_contract() {
        let err = CrawlerBuilder::new()
            .contract_address("0xc0de")
            .build(Arc::new(MemoryStore::new()))
            .err()
            .unwrap();
        assert!(matches!(err, IndexerError::Config(_)));

        let err = CrawlerBuilder::new()
            .rpc_url("http://localhost:9545")
            .build(Arc::new(MemoryStore::new()))
            .err()
            .unwrap();
        assert!(matches!(err, IndexerError::Config(_)));
    }

    #[tokio::test]
    async fn build_wires_a_crawler() {
        let crawler = CrawlerBuilder::new()
            .rpc_url("http://localhost:9545")
            .contract_address("0xc0de")
            .to_block(100)
            .build(Arc::new(MemoryStore::new()))
            .unwrap();
        assert_eq!(crawler.config().to_block, Some(100));
        assert!(crawler.next_block().is_none());
    }
}
