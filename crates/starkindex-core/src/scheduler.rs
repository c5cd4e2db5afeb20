//! Crawl scheduler: window planning and the idle-sleep throttle.
//!
//! # Window
//! `to = min(latest - confirmations, from + max_batch, to_block)`. A window is
//! only worth querying when `to - from >= min_batch`; otherwise the scheduler
//! reports idle and the crawler sleeps. The final window of a bounded crawl
//! (`to == to_block`) is queried whatever its width.
//!
//! # Throttle
//! Additive increase / additive decrease: each consecutive idle cycle adds
//! `step` to the sleep (capped at `max`), each non-empty drain removes `step`
//! (floored at `min`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::CrawlerConfig;
use crate::types::{BlockNumber, BlockWindow};

/// Where the crawl loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrawlState {
    /// Issuing paginated queries for the current window.
    Draining,
    /// Window too narrow to query; sleeping.
    IdleBackoff,
    /// Failure threshold exceeded. Terminal.
    Fatal,
}

impl std::fmt::Display for CrawlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draining => write!(f, "draining"),
            Self::IdleBackoff => write!(f, "idle-backoff"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

// ─── WindowPlanner ───────────────────────────────────────────────────────────

/// Computes the next window to drain.
#[derive(Debug, Clone)]
pub struct WindowPlanner {
    confirmations: u64,
    min_batch: u64,
    max_batch: u64,
    to_block: Option<BlockNumber>,
}

impl WindowPlanner {
    pub fn new(confirmations: u64, min_batch: u64, max_batch: u64) -> Self {
        Self {
            confirmations,
            min_batch,
            max_batch,
            to_block: None,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            to_block: config.to_block,
            ..Self::new(config.confirmations, config.min_batch, config.max_batch)
        }
    }

    /// Never plan past `block`.
    pub fn until(mut self, block: BlockNumber) -> Self {
        self.to_block = Some(block);
        self
    }

    /// Highest block that may be queried with the chain head at `latest`.
    pub fn confirmed_head(&self, latest: BlockNumber) -> BlockNumber {
        latest.saturating_sub(self.confirmations)
    }

    /// The window starting at `from`, or `None` if it is too narrow to query.
    pub fn next_window(&self, from: BlockNumber, latest: BlockNumber) -> Option<BlockWindow> {
        let mut to = self
            .confirmed_head(latest)
            .min(from.saturating_add(self.max_batch));
        if let Some(limit) = self.to_block {
            to = to.min(limit);
        }
        let reaches_stop = self.to_block == Some(to);
        if to < from || (to - from < self.min_batch && !reaches_stop) {
            return None;
        }
        Some(BlockWindow::new(from, to))
    }

    /// `true` once `next_block` has passed the configured stop block.
    pub fn is_finished(&self, next_block: BlockNumber) -> bool {
        self.to_block.map_or(false, |limit| next_block > limit)
    }
}

// ─── SleepThrottle ───────────────────────────────────────────────────────────

/// Adaptive idle sleep.
#[derive(Debug, Clone)]
pub struct SleepThrottle {
    current: Duration,
    min: Duration,
    step: Duration,
    max: Duration,
}

impl SleepThrottle {
    pub fn new(min: Duration, step: Duration, max: Duration) -> Self {
        Self {
            current: min,
            min,
            step,
            max: max.max(min),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.min_sleep(), config.sleep_step(), config.max_sleep())
    }

    /// Entering idle-backoff: grow the delay and return it.
    pub fn on_idle(&mut self) -> Duration {
        self.current = (self.current + self.step).min(self.max);
        self.current
    }

    /// A non-empty window was drained: shrink the delay toward the floor.
    pub fn on_drain(&mut self) {
        self.current = self.current.saturating_sub(self.step).max(self.min);
    }

    pub fn current(&self) -> Duration {
        self.current
    }
}
