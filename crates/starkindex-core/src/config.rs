//! Crawler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::IndexerError;
use crate::governor::DEFAULT_FAILURE_THRESHOLD;
use crate::record::EventKind;
use crate::types::BlockNumber;

/// Configuration for one crawl session.
///
/// Every field except `contract_address` has a default, so a config file only
/// needs to name the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Contract whose events are crawled (`0x…`).
    #[serde(default)]
    pub contract_address: String,
    /// Start here instead of the saved cursor or the deployment block.
    #[serde(default)]
    pub from_block: Option<BlockNumber>,
    /// Stop once this block is drained. `None` = run forever.
    #[serde(default)]
    pub to_block: Option<BlockNumber>,
    /// Most-recent blocks excluded from querying to limit re-org exposure.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Windows narrower than this are not queried; the crawler sleeps instead.
    #[serde(default = "default_min_batch")]
    pub min_batch: u64,
    /// Upper bound on `to - from` for one window.
    #[serde(default = "default_max_batch")]
    pub max_batch: u64,
    /// `chunk_size` passed to each paginated events query.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Idle sleep floor (milliseconds).
    #[serde(default = "default_min_sleep_ms")]
    pub min_sleep_ms: u64,
    /// Idle sleep increment / decrement (milliseconds).
    #[serde(default = "default_sleep_step_ms")]
    pub sleep_step_ms: u64,
    /// Idle sleep ceiling (milliseconds).
    #[serde(default = "default_max_sleep_ms")]
    pub max_sleep_ms: u64,
    /// Consecutive failed cycles before the crawl stops.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Attempts per deployment-locator lookup before giving up.
    #[serde(default = "default_lookup_attempts")]
    pub lookup_attempts: u32,
    /// Event kinds to crawl.
    #[serde(default = "default_event_kinds")]
    pub event_kinds: Vec<EventKind>,
}

fn default_confirmations() -> u64 {
    60
}

fn default_min_batch() -> u64 {
    1
}

fn default_max_batch() -> u64 {
    10_000
}

fn default_page_size() -> u64 {
    1_000
}

fn default_min_sleep_ms() -> u64 {
    100
}

fn default_sleep_step_ms() -> u64 {
    100
}

fn default_max_sleep_ms() -> u64 {
    60_000
}

fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}

fn default_lookup_attempts() -> u32 {
    3
}

fn default_event_kinds() -> Vec<EventKind> {
    EventKind::ALL.to_vec()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            from_block: None,
            to_block: None,
            confirmations: default_confirmations(),
            min_batch: default_min_batch(),
            max_batch: default_max_batch(),
            page_size: default_page_size(),
            min_sleep_ms: default_min_sleep_ms(),
            sleep_step_ms: default_sleep_step_ms(),
            max_sleep_ms: default_max_sleep_ms(),
            failure_threshold: default_failure_threshold(),
            lookup_attempts: default_lookup_attempts(),
            event_kinds: default_event_kinds(),
        }
    }
}

impl CrawlerConfig {
    /// Parse a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, IndexerError> {
        serde_json::from_str(json).map_err(|e| IndexerError::Config(e.to_string()))
    }

    pub fn min_sleep(&self) -> Duration {
        Duration::from_millis(self.min_sleep_ms)
    }

    pub fn sleep_step(&self) -> Duration {
        Duration::from_millis(self.sleep_step_ms)
    }

    pub fn max_sleep(&self) -> Duration {
        Duration::from_millis(self.max_sleep_ms)
    }

    /// Reject configurations the scheduler cannot honour.
    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.contract_address.trim().is_empty() {
            return Err(IndexerError::Config("contract_address is required".into()));
        }
        if self.max_batch < self.min_batch {
            return Err(IndexerError::Config(format!(
                "max_batch ({}) is smaller than min_batch ({})",
                self.max_batch, self.min_batch
            )));
        }
        if self.page_size == 0 {
            return Err(IndexerError::Config("page_size must be greater than 0".into()));
        }
        if self.max_sleep_ms < self.min_sleep_ms {
            return Err(IndexerError::Config(
                "max_sleep_ms is smaller than min_sleep_ms".into(),
            ));
        }
        if self.failure_threshold == 0 {
            return Err(IndexerError::Config("failure_threshold must be at least 1".into()));
        }
        if self.event_kinds.is_empty() {
            return Err(IndexerError::Config("at least one event kind is required".into()));
        }
        if let (Some(from), Some(to)) = (self.from_block, self.to_block) {
            if to < from {
                return Err(IndexerError::Config(format!(
                    "to_block ({to}) is below from_block ({from})"
                )));
            }
        }
        Ok(())
    }
}
