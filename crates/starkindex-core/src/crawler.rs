//! The crawl session: wires locator, scheduler, pagination, store and
//! governor into one loop.
//!
//! # Cycle
//! 1. Recover the cursor on first use (override → saved cursor → highest
//!    stored block → located deployment block).
//! 2. Ask the planner for a window below the confirmed head.
//! 3. Drain it page by page into the store, then save the advanced cursor.
//! 4. No window: grow the idle sleep. Error: let the governor decide.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::BlockTimestampCache;
use crate::client::ChainClient;
use crate::config::CrawlerConfig;
use crate::cursor::{CrawlCursor, CursorStore};
use crate::decoder::EventDecoder;
use crate::error::IndexerError;
use crate::governor::FailureGovernor;
use crate::locator::DeploymentLocator;
use crate::pagination::{DrainSummary, PageConsumer};
use crate::scheduler::{CrawlState, SleepThrottle, WindowPlanner};
use crate::store::EventStore;
use crate::types::{BlockNumber, BlockWindow};

/// What one call to [`Crawler::cycle`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A window was fully drained and the cursor advanced past it.
    Drained {
        window: BlockWindow,
        summary: DrainSummary,
    },
    /// Nothing worth querying yet. Sleep for `delay`.
    Idle { delay: Duration },
    /// The cycle failed below the failure threshold; the cursor did not move.
    Failed { error: String, consecutive: u32 },
}

/// Running totals for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub windows: u64,
    pub pages: u64,
    pub logs: u64,
    pub appended: u64,
}

/// One crawl session over one contract.
pub struct Crawler {
    config: CrawlerConfig,
    client: Arc<dyn ChainClient>,
    decoder: Arc<dyn EventDecoder>,
    events: Arc<dyn EventStore>,
    cursors: Arc<dyn CursorStore>,
    keys: Vec<Vec<String>>,
    cache: BlockTimestampCache,
    locator: DeploymentLocator,
    planner: WindowPlanner,
    throttle: SleepThrottle,
    governor: FailureGovernor,
    cursor: Option<CrawlCursor>,
    state: CrawlState,
    stats: CrawlStats,
}

impl Crawler {
    /// Build a session whose records and cursor live in the same store.
    pub fn new<S>(
        config: CrawlerConfig,
        client: Arc<dyn ChainClient>,
        decoder: Arc<dyn EventDecoder>,
        store: Arc<S>,
    ) -> Self
    where
        S: EventStore + CursorStore + 'static,
    {
        let events: Arc<dyn EventStore> = store.clone();
        let cursors: Arc<dyn CursorStore> = store;
        Self::with_stores(config, client, decoder, events, cursors)
    }

    pub fn with_stores(
        config: CrawlerConfig,
        client: Arc<dyn ChainClient>,
        decoder: Arc<dyn EventDecoder>,
        events: Arc<dyn EventStore>,
        cursors: Arc<dyn CursorStore>,
    ) -> Self {
        let keys = decoder.key_filter(&config.event_kinds);
        Self {
            keys,
            cache: BlockTimestampCache::new(),
            locator: DeploymentLocator::new(config.lookup_attempts),
            planner: WindowPlanner::from_config(&config),
            throttle: SleepThrottle::from_config(&config),
            governor: FailureGovernor::new(config.failure_threshold),
            cursor: None,
            state: CrawlState::IdleBackoff,
            stats: CrawlStats::default(),
            config,
            client,
            decoder,
            events,
            cursors,
        }
    }

    /// Replace the deployment locator (e.g. to shorten its retry pause).
    pub fn with_locator(mut self, locator: DeploymentLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn stats(&self) -> CrawlStats {
        self.stats
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Next block to crawl, once the cursor has been recovered.
    pub fn next_block(&self) -> Option<BlockNumber> {
        self.cursor.as_ref().map(|c| c.next_block)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.governor.consecutive_failures()
    }

    /// Crawl until the configured stop block is passed, or forever.
    ///
    /// Returns an error only once the failure governor gives up.
    pub async fn run(&mut self) -> Result<CrawlStats, IndexerError> {
        self.config.validate()?;
        tracing::info!(
            contract = %self.config.contract_address,
            kinds = ?self.config.event_kinds,
            to_block = ?self.config.to_block,
            "starting crawl"
        );

        loop {
            if let Some(next) = self.next_block() {
                if self.planner.is_finished(next) {
                    tracing::info!(next_block = next, stats = ?self.stats, "crawl reached stop block");
                    return Ok(self.stats);
                }
            }

            match self.cycle().await? {
                CycleOutcome::Drained { .. } => {}
                CycleOutcome::Idle { delay } => tokio::time::sleep(delay).await,
                CycleOutcome::Failed { .. } => tokio::time::sleep(self.throttle.current()).await,
            }
        }
    }

    /// Run a single cycle and feed its result to the governor.
    pub async fn cycle(&mut self) -> Result<CycleOutcome, IndexerError> {
        match self.try_cycle().await {
            Ok(Some((window, summary))) => {
                self.governor.record_success();
                if window.width() > 0 {
                    self.throttle.on_drain();
                }
                Ok(CycleOutcome::Drained { window, summary })
            }
            Ok(None) => {
                self.governor.record_success();
                self.state = CrawlState::IdleBackoff;
                let delay = self.throttle.on_idle();
                tracing::debug!(delay_ms = delay.as_millis() as u64, "no window ready, backing off");
                Ok(CycleOutcome::Idle { delay })
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(error = %e, "cycle ended early, object not found");
                Ok(CycleOutcome::Failed {
                    error: e.to_string(),
                    consecutive: self.governor.consecutive_failures(),
                })
            }
            Err(e) => {
                let error = e.to_string();
                match self.governor.record_failure(e) {
                    Ok(consecutive) => {
                        tracing::warn!(
                            consecutive,
                            threshold = self.governor.threshold(),
                            error = %error,
                            "crawl cycle failed, retrying"
                        );
                        Ok(CycleOutcome::Failed { error, consecutive })
                    }
                    Err(e) => {
                        self.state = CrawlState::Fatal;
                        tracing::error!(
                            consecutive = self.governor.consecutive_failures(),
                            error = %e,
                            "failure threshold reached, stopping crawl"
                        );
                        Err(e)
                    }
                }
            }
        }
    }

    async fn try_cycle(&mut self) -> Result<Option<(BlockWindow, DrainSummary)>, IndexerError> {
        let mut cursor = match self.cursor.clone() {
            Some(cursor) => cursor,
            None => {
                let cursor = self.recover_cursor().await?;
                self.cursor = Some(cursor.clone());
                cursor
            }
        };

        let latest = self.client.latest_block_number().await?;
        let Some(window) = self.planner.next_window(cursor.next_block, latest) else {
            return Ok(None);
        };

        self.state = CrawlState::Draining;
        let summary = PageConsumer::new(
            self.client.as_ref(),
            self.decoder.as_ref(),
            self.events.as_ref(),
            &mut self.cache,
        )
        .filter(&self.config.contract_address, &self.keys)
        .page_size(self.config.page_size)
        .drain(window)
        .await?;

        cursor.advance_past(&window);
        self.cursors.save_cursor(&cursor).await?;
        self.cursor = Some(cursor);

        self.stats.windows += 1;
        self.stats.pages += summary.pages as u64;
        self.stats.logs += summary.logs as u64;
        self.stats.appended += summary.appended as u64;

        tracing::info!(
            %window,
            latest,
            pages = summary.pages,
            logs = summary.logs,
            appended = summary.appended,
            "window drained"
        );
        Ok(Some((window, summary)))
    }

    async fn recover_cursor(&mut self) -> Result<CrawlCursor, IndexerError> {
        if let Some(from) = self.config.from_block {
            tracing::info!(from, "starting from configured block");
            return Ok(CrawlCursor::new(from));
        }
        if let Some(saved) = self.cursors.load_cursor().await? {
            tracing::info!(next_block = saved.next_block, "resuming from saved cursor");
            return Ok(saved);
        }
        if let Some(last) = self.events.last_block().await? {
            tracing::info!(last, "resuming from highest stored record");
            return Ok(CrawlCursor::new(last));
        }
        let deployed = self
            .locator
            .locate(self.client.as_ref(), &self.config.contract_address)
            .await?;
        tracing::info!(deployed, "starting from deployment block");
        Ok(CrawlCursor::new(deployed))
    }
}
