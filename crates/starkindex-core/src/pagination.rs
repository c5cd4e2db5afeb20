//! Pagination consumer: drains one window by following continuation tokens.
//!
//! Each page is fully decoded, timestamped and appended to the store before
//! the next page is requested. A crash mid-window therefore loses at most the
//! page in flight, and the re-query after restart is absorbed by dedup.

use crate::cache::BlockTimestampCache;
use crate::client::ChainClient;
use crate::decoder::EventDecoder;
use crate::error::IndexerError;
use crate::record::DecodedRecord;
use crate::store::EventStore;
use crate::types::{BlockWindow, ContinuationToken, EventLog, EventQuery};

/// Counters for one drained window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub pages: usize,
    pub logs: usize,
    pub appended: usize,
}

/// Borrows the session's collaborators for the duration of one drain.
pub struct PageConsumer<'a> {
    client: &'a dyn ChainClient,
    decoder: &'a dyn EventDecoder,
    store: &'a dyn EventStore,
    cache: &'a mut BlockTimestampCache,
    address: &'a str,
    keys: &'a [Vec<String>],
    page_size: u64,
}

impl<'a> PageConsumer<'a> {
    pub fn new(
        client: &'a dyn ChainClient,
        decoder: &'a dyn EventDecoder,
        store: &'a dyn EventStore,
        cache: &'a mut BlockTimestampCache,
    ) -> Self {
        Self {
            client,
            decoder,
            store,
            cache,
            address: "",
            keys: &[],
            page_size: 1_000,
        }
    }

    /// Contract address and key filter for every query.
    pub fn filter(mut self, address: &'a str, keys: &'a [Vec<String>]) -> Self {
        self.address = address;
        self.keys = keys;
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Request pages for `window` until the node returns no continuation token.
    ///
    /// Any error aborts the drain; pages already appended stay appended.
    pub async fn drain(&mut self, window: BlockWindow) -> Result<DrainSummary, IndexerError> {
        let mut summary = DrainSummary::default();
        let mut token: ContinuationToken = None;

        loop {
            let query = EventQuery {
                address: self.address.to_string(),
                from_block: window.from,
                to_block: window.to,
                keys: self.keys.to_vec(),
                page_size: self.page_size,
                continuation_token: token.take(),
            };
            let page = self.client.get_event_logs(&query).await?;
            summary.pages += 1;
            summary.logs += page.logs.len();

            let mut records = Vec::with_capacity(page.logs.len());
            for log in &page.logs {
                records.push(self.decode(log).await?);
            }
            if !records.is_empty() {
                summary.appended += self.store.append(records).await?;
            }

            tracing::debug!(
                %window,
                page = summary.pages,
                logs = page.logs.len(),
                more = page.continuation_token.is_some(),
                "consumed event page"
            );

            match page.continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(summary)
    }

    async fn decode(&mut self, log: &EventLog) -> Result<DecodedRecord, IndexerError> {
        let kind = self.decoder.event_name(log)?;
        let mut record = self.decoder.decode(kind.name(), log)?;
        let ts = self.cache.timestamp(self.client, log.block_number).await?;
        record.set_block_timestamp(ts);
        Ok(record)
    }
}
