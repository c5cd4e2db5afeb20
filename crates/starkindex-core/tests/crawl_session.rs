//! End-to-end crawl sessions against a simulated chain.
//!
//! The simulated node serves a fixed set of events with real pagination
//! (continuation token = offset into the filtered result), so these tests
//! exercise the window, page and resume logic together.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use starkindex_core::record::{CrewmatePurchased, EntityRef, RecordMeta};
use starkindex_core::{
    BlockHeader, BlockNumber, ChainClient, CrawlerConfig, Crawler, CursorStore, DecodedRecord,
    DeploymentLocator, EventDecoder, EventKind, EventLog, EventPage, EventQuery, EventStore,
    IndexerError, MemoryStore, TransactionEvents,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

struct SimChain {
    latest: Mutex<BlockNumber>,
    deployed_at: BlockNumber,
    events: Vec<EventLog>,
    failing_event_calls: AtomicU32,
    event_calls: AtomicUsize,
}

impl SimChain {
    fn new(latest: BlockNumber, deployed_at: BlockNumber, events: Vec<EventLog>) -> Self {
        Self {
            latest: Mutex::new(latest),
            deployed_at,
            events,
            failing_event_calls: AtomicU32::new(0),
            event_calls: AtomicUsize::new(0),
        }
    }

    fn fail_next_event_calls(&self, n: u32) {
        self.failing_event_calls.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainClient for SimChain {
    async fn latest_block_number(&self) -> Result<BlockNumber, IndexerError> {
        Ok(*self.latest.lock().unwrap())
    }

    async fn get_block(&self, number: BlockNumber) -> Result<BlockHeader, IndexerError> {
        Ok(BlockHeader {
            number,
            hash: format!("0xb{number:x}"),
            timestamp: 1_700_000_000 + number as i64,
        })
    }

    async fn get_event_logs(&self, query: &EventQuery) -> Result<EventPage, IndexerError> {
        self.event_calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failing_event_calls.load(Ordering::SeqCst);
        if left > 0 {
            self.failing_event_calls.store(left - 1, Ordering::SeqCst);
            return Err(IndexerError::Transient("connection reset by peer".into()));
        }

        let wanted: HashSet<&String> = query.keys.first().into_iter().flatten().collect();
        let matching: Vec<&EventLog> = self
            .events
            .iter()
            .filter(|e| e.block_number >= query.from_block && e.block_number <= query.to_block)
            .filter(|e| wanted.is_empty() || e.selector().map_or(false, |s| wanted.contains(&s.to_string())))
            .collect();

        let offset: usize = query
            .continuation_token
            .as_deref()
            .map(|t| t.parse().unwrap())
            .unwrap_or(0);
        let end = (offset + query.page_size as usize).min(matching.len());
        Ok(EventPage {
            logs: matching[offset..end].iter().map(|e| (*e).clone()).collect(),
            continuation_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn get_code_presence(&self, _address: &str, number: BlockNumber) -> Result<bool, IndexerError> {
        Ok(number >= self.deployed_at)
    }

    async fn get_transaction_events(&self, tx_hash: &str) -> Result<TransactionEvents, IndexerError> {
        let logs: Vec<EventLog> = self
            .events
            .iter()
            .filter(|e| e.transaction_hash == tx_hash)
            .cloned()
            .collect();
        Ok(TransactionEvents {
            block_number: logs.first().map(|l| l.block_number),
            logs,
        })
    }
}

/// Purchases only; the caller is `data[0]`.
struct PurchaseDecoder;

impl EventDecoder for PurchaseDecoder {
    fn selector(&self, kind: EventKind) -> String {
        kind.name().to_string()
    }

    fn event_name(&self, log: &EventLog) -> Result<EventKind, IndexerError> {
        log.selector().unwrap_or_default().parse()
    }

    fn decode(&self, event_name: &str, log: &EventLog) -> Result<DecodedRecord, IndexerError> {
        if event_name.parse::<EventKind>()? != EventKind::CrewmatePurchased {
            return Err(IndexerError::Decode {
                event: event_name.into(),
                reason: "unsupported".into(),
            });
        }
        Ok(DecodedRecord::CrewmatePurchased(CrewmatePurchased {
            meta: RecordMeta {
                block_number: log.block_number,
                block_hash: log.block_hash.clone(),
                block_timestamp: None,
                transaction_hash: log.transaction_hash.clone(),
            },
            crewmate: EntityRef {
                label: "1".into(),
                id: log.keys.get(1).cloned().unwrap_or_default(),
            },
            caller: log.data[0].clone(),
        }))
    }
}

/// Forty purchases spread over blocks 100..=607, two per block every fifth block.
fn sample_events() -> Vec<EventLog> {
    let mut events = Vec::new();
    for i in 0..40u64 {
        let block = 100 + i * 13;
        let copies = if i % 5 == 0 { 2 } else { 1 };
        for j in 0..copies {
            events.push(EventLog {
                block_number: block,
                block_hash: format!("0xb{block:x}"),
                transaction_hash: format!("0x{i:x}{j}"),
                from_address: "0xc0de".into(),
                keys: vec!["CrewmatePurchased".into(), i.to_string()],
                data: vec![format!("0xca11e{}", i % 4)],
            });
        }
    }
    events
}

fn config(to_block: BlockNumber) -> CrawlerConfig {
    CrawlerConfig {
        contract_address: "0xc0de".into(),
        to_block: Some(to_block),
        max_batch: 100,
        page_size: 3,
        min_sleep_ms: 0,
        sleep_step_ms: 0,
        max_sleep_ms: 0,
        ..Default::default()
    }
}

fn session(cfg: CrawlerConfig, chain: &Arc<SimChain>, store: &Arc<MemoryStore>) -> Crawler {
    Crawler::new(cfg, chain.clone(), Arc::new(PurchaseDecoder), store.clone())
        .with_locator(DeploymentLocator::new(3).with_retry_delay(std::time::Duration::ZERO))
}

fn expected_keys(events: &[EventLog], upto: BlockNumber) -> HashSet<(BlockNumber, String)> {
    events
        .iter()
        .filter(|e| e.block_number <= upto)
        .map(|e| (e.block_number, e.transaction_hash.clone()))
        .collect()
}

async fn stored_keys(store: &MemoryStore) -> Vec<(BlockNumber, String)> {
    store
        .load_all()
        .await
        .unwrap()
        .iter()
        .map(|r| (r.block_number(), r.meta().transaction_hash.clone()))
        .collect()
}

// ─── Sessions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn crawl_from_deployment_collects_every_event_once() {
    let events = sample_events();
    let chain = Arc::new(SimChain::new(700, 100, events.clone()));
    let store = Arc::new(MemoryStore::new());

    let stats = session(config(640), &chain, &store).run().await.unwrap();

    let stored = stored_keys(&store).await;
    let unique: HashSet<_> = stored.iter().cloned().collect();
    assert_eq!(unique.len(), stored.len(), "duplicate records stored");
    assert_eq!(unique, expected_keys(&events, 640));
    assert_eq!(stats.appended as usize, stored.len());

    // windows are contiguous from the deployment block
    assert_eq!(store.load_cursor().await.unwrap().unwrap().next_block, 641);
    assert!(store
        .load_all()
        .await
        .unwrap()
        .iter()
        .all(|r| r.meta().block_timestamp == Some(1_700_000_000 + r.block_number() as i64)));
}

#[tokio::test]
async fn resumed_session_continues_from_saved_cursor() {
    let events = sample_events();
    let chain = Arc::new(SimChain::new(700, 100, events.clone()));
    let store = Arc::new(MemoryStore::new());

    session(config(300), &chain, &store).run().await.unwrap();
    assert_eq!(store.load_cursor().await.unwrap().unwrap().next_block, 301);
    let calls_first = chain.event_calls.load(Ordering::SeqCst);

    session(config(640), &chain, &store).run().await.unwrap();
    let stored = stored_keys(&store).await;
    assert_eq!(stored.iter().cloned().collect::<HashSet<_>>(), expected_keys(&events, 640));
    assert_eq!(stored.len(), expected_keys(&events, 640).len());
    assert!(chain.event_calls.load(Ordering::SeqCst) > calls_first);
}

#[tokio::test]
async fn lost_cursor_resumes_from_last_record_without_duplicates() {
    let events = sample_events();
    let chain = Arc::new(SimChain::new(700, 100, events.clone()));

    let first = Arc::new(MemoryStore::new());
    session(config(300), &chain, &first).run().await.unwrap();

    // records survived, cursor did not
    let second = Arc::new(MemoryStore::new());
    second.append(first.load_all().await.unwrap()).await.unwrap();
    assert!(second.load_cursor().await.unwrap().is_none());

    session(config(640), &chain, &second).run().await.unwrap();
    let stored = stored_keys(&second).await;
    assert_eq!(stored.len(), expected_keys(&events, 640).len());
}

#[tokio::test]
async fn transient_failures_mid_crawl_lose_nothing() {
    let events = sample_events();
    let chain = Arc::new(SimChain::new(700, 100, events.clone()));
    chain.fail_next_event_calls(4);
    let store = Arc::new(MemoryStore::new());

    session(config(640), &chain, &store).run().await.unwrap();
    let stored = stored_keys(&store).await;
    assert_eq!(stored.iter().cloned().collect::<HashSet<_>>(), expected_keys(&events, 640));
    assert_eq!(stored.len(), expected_keys(&events, 640).len());
}

#[tokio::test]
async fn persistent_failures_stop_the_session() {
    let chain = Arc::new(SimChain::new(700, 100, sample_events()));
    chain.fail_next_event_calls(u32::MAX);
    let store = Arc::new(MemoryStore::new());

    let mut crawler = session(CrawlerConfig { failure_threshold: 4, ..config(640) }, &chain, &store);
    let err = crawler.run().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(chain.event_calls.load(Ordering::SeqCst), 4);
    assert!(store.is_empty());
}
