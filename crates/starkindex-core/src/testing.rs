//! Scripted chain client and stub decoder for unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::client::ChainClient;
use crate::decoder::EventDecoder;
use crate::error::IndexerError;
use crate::record::{CrewmatePurchased, DecodedRecord, EntityRef, EventKind, RecordMeta};
use crate::types::{BlockHeader, BlockNumber, EventLog, EventPage, EventQuery, TransactionEvents};

/// Shared, ordered trace of interesting calls.
pub(crate) type Trace = Arc<Mutex<Vec<String>>>;

pub(crate) struct MockChain {
    latest: Mutex<BlockNumber>,
    deployed_at: Option<BlockNumber>,
    pages: Mutex<VecDeque<EventPage>>,
    latest_failures: Mutex<VecDeque<IndexerError>>,
    presence_failures: Mutex<HashMap<BlockNumber, u32>>,
    queries: Mutex<Vec<EventQuery>>,
    block_calls: AtomicUsize,
    presence_calls: AtomicUsize,
    trace: Option<Trace>,
}

impl MockChain {
    pub(crate) fn new(latest: BlockNumber) -> Self {
        Self {
            latest: Mutex::new(latest),
            deployed_at: None,
            pages: Mutex::new(VecDeque::new()),
            latest_failures: Mutex::new(VecDeque::new()),
            presence_failures: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
            block_calls: AtomicUsize::new(0),
            presence_calls: AtomicUsize::new(0),
            trace: None,
        }
    }

    pub(crate) fn deployed_at(mut self, block: BlockNumber) -> Self {
        self.deployed_at = Some(block);
        self
    }

    pub(crate) fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub(crate) fn push_page(&self, logs: Vec<EventLog>, token: Option<&str>) {
        self.pages.lock().unwrap().push_back(EventPage {
            logs,
            continuation_token: token.map(str::to_string),
        });
    }

    pub(crate) fn fail_latest(&self, err: IndexerError) {
        self.latest_failures.lock().unwrap().push_back(err);
    }

    pub(crate) fn fail_presence(&self, block: BlockNumber, times: u32) {
        self.presence_failures.lock().unwrap().insert(block, times);
    }

    pub(crate) fn set_latest(&self, latest: BlockNumber) {
        *self.latest.lock().unwrap() = latest;
    }

    pub(crate) fn queries(&self) -> Vec<EventQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub(crate) fn block_calls(&self) -> usize {
        self.block_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn presence_calls(&self) -> usize {
        self.presence_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn latest_block_number(&self) -> Result<BlockNumber, IndexerError> {
        if let Some(err) = self.latest_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(*self.latest.lock().unwrap())
    }

    async fn get_block(&self, number: BlockNumber) -> Result<BlockHeader, IndexerError> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        if number > *self.latest.lock().unwrap() {
            return Err(IndexerError::NotFound(format!("block {number}")));
        }
        Ok(BlockHeader {
            number,
            hash: format!("0xb{number}"),
            timestamp: number as i64 * 10,
        })
    }

    async fn get_event_logs(&self, query: &EventQuery) -> Result<EventPage, IndexerError> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(trace) = &self.trace {
            let token = query.continuation_token.as_deref().unwrap_or("-");
            trace.lock().unwrap().push(format!("fetch {token}"));
        }
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn get_code_presence(
        &self,
        _address: &str,
        number: BlockNumber,
    ) -> Result<bool, IndexerError> {
        self.presence_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(left) = self.presence_failures.lock().unwrap().get_mut(&number) {
            if *left > 0 {
                *left -= 1;
                return Err(IndexerError::Transient(format!("code lookup {number} timed out")));
            }
        }
        Ok(self.deployed_at.map_or(false, |d| number >= d))
    }

    async fn get_transaction_events(&self, tx_hash: &str) -> Result<TransactionEvents, IndexerError> {
        Err(IndexerError::NotFound(format!("transaction {tx_hash}")))
    }
}

/// Raw log whose `keys[0]` is the plain event name.
pub(crate) fn log(block: BlockNumber, tx: &str, name: &str) -> EventLog {
    EventLog {
        block_number: block,
        block_hash: format!("0xb{block}"),
        transaction_hash: tx.to_string(),
        from_address: "0xc0de".into(),
        keys: vec![name.to_string()],
        data: vec!["0xcafe".into()],
    }
}

/// Decoder that uses event names as selectors and only knows purchases.
pub(crate) struct StubDecoder;

impl EventDecoder for StubDecoder {
    fn selector(&self, kind: EventKind) -> String {
        kind.name().to_string()
    }

    fn event_name(&self, log: &EventLog) -> Result<EventKind, IndexerError> {
        log.selector().unwrap_or_default().parse()
    }

    fn decode(&self, event_name: &str, log: &EventLog) -> Result<DecodedRecord, IndexerError> {
        match event_name.parse::<EventKind>()? {
            EventKind::CrewmatePurchased => Ok(DecodedRecord::CrewmatePurchased(CrewmatePurchased {
                meta: RecordMeta {
                    block_number: log.block_number,
                    block_hash: log.block_hash.clone(),
                    block_timestamp: None,
                    transaction_hash: log.transaction_hash.clone(),
                },
                crewmate: EntityRef {
                    label: "1".into(),
                    id: "1".into(),
                },
                caller: log.data.first().cloned().unwrap_or_default(),
            })),
            EventKind::CrewmateRecruitedV1 => Err(IndexerError::Decode {
                event: event_name.to_string(),
                reason: "not supported by stub".into(),
            }),
        }
    }
}
