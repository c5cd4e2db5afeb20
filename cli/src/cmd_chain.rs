//! Commands that talk to a Starknet node: `locate`, `crawl`, `standalone`
//! and `blocks`.

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use starkindex_core::{
    BlockArchiver, BlockTimestampCache, ChainClient, CrawlerConfig, DecodedRecord,
    DeploymentLocator, EventDecoder, EventKind,
};
use starkindex_starknet::{AdaliansDecoder, CrawlerBuilder, StarknetRpcClient};
use starkindex_storage::{BlockArchive, JsonFileStore};

use crate::print_json;

// ─── locate ──────────────────────────────────────────────────────────────────

pub async fn locate(rpc_url: &str, config: &CrawlerConfig) -> Result<()> {
    require_contract(config)?;
    let client = StarknetRpcClient::http(rpc_url)?;
    let mut locator = DeploymentLocator::new(config.lookup_attempts);

    let block = locator
        .locate(&client, &config.contract_address)
        .await
        .with_context(|| format!("locating deployment of {}", config.contract_address))?;

    print_json(&json!({
        "contract_address": config.contract_address,
        "deployment_block": block,
        "lookups": locator.lookups(),
    }))
}

// ─── crawl ───────────────────────────────────────────────────────────────────

pub struct CrawlArgs<'a> {
    pub output: &'a Path,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    pub event_filter: &'a [String],
}

pub async fn crawl(rpc_url: &str, config: CrawlerConfig, args: CrawlArgs<'_>) -> Result<()> {
    require_contract(&config)?;
    let mut builder = CrawlerBuilder::from_config(config).rpc_url(rpc_url);
    if let Some(block) = args.from_block {
        builder = builder.from_block(block);
    }
    if let Some(block) = args.to_block {
        builder = builder.to_block(block);
    }
    if !args.event_filter.is_empty() {
        builder = builder.event_kinds(parse_kinds(args.event_filter)?);
    }

    let store = Arc::new(
        JsonFileStore::open(args.output)
            .await
            .with_context(|| format!("opening store at {}", args.output.display()))?,
    );
    let mut crawler = builder.build(store.clone())?;

    let started_at = chrono::Utc::now();
    tracing::info!(output = %args.output.display(), "crawl started");

    let finished = tokio::select! {
        result = crawler.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let finished_early = finished.is_none();
    let stats = match finished {
        Some(result) => result?,
        None => {
            tracing::warn!(next_block = ?crawler.next_block(), "interrupted; cursor holds the last drained window");
            crawler.stats()
        }
    };

    print_json(&json!({
        "interrupted": finished_early,
        "started_at": started_at.to_rfc3339(),
        "finished_at": chrono::Utc::now().to_rfc3339(),
        "next_block": crawler.next_block(),
        "events_file": store.events_path().display().to_string(),
        "stats": stats,
    }))
}

// ─── standalone ──────────────────────────────────────────────────────────────

/// Decode the `event_filter` events emitted by a single transaction.
pub async fn standalone(rpc_url: &str, tx_hash: &str, event_filter: &str) -> Result<()> {
    let kind: EventKind = event_filter.parse()?;
    let client = StarknetRpcClient::http(rpc_url)?;
    let records = decode_transaction(&client, &AdaliansDecoder::new(), tx_hash, kind).await?;
    tracing::info!(tx_hash, event = %kind, decoded = records.len(), "standalone decode");

    print_json(&records)
}

/// Decoded `kind` events of one receipt. Records of a pending receipt carry
/// no timestamp.
async fn decode_transaction<C>(
    client: &C,
    decoder: &dyn EventDecoder,
    tx_hash: &str,
    kind: EventKind,
) -> Result<Vec<DecodedRecord>>
where
    C: ChainClient + ?Sized,
{
    let receipt = client
        .get_transaction_events(tx_hash)
        .await
        .with_context(|| format!("fetching receipt of {tx_hash}"))?;

    let timestamp = match receipt.block_number {
        Some(block) => Some(BlockTimestampCache::new().timestamp(client, block).await?),
        None => {
            tracing::debug!(tx_hash, "receipt is pending, leaving timestamps unset");
            None
        }
    };

    let mut records = Vec::new();
    for log in &receipt.logs {
        // events with key members belong to other contracts' ABIs
        if log.keys.len() != 1 || decoder.event_name(log).ok() != Some(kind) {
            continue;
        }
        let mut record = decoder.decode(kind.name(), log)?;
        if let Some(ts) = timestamp {
            record.set_block_timestamp(ts);
        }
        records.push(record);
    }
    Ok(records)
}

// ─── blocks ──────────────────────────────────────────────────────────────────

pub struct BlocksArgs<'a> {
    pub output: &'a Path,
    pub from_block: u64,
    pub to_block: Option<u64>,
    pub blocks_per_dir: u64,
    pub poll_secs: u64,
}

/// Archive raw blocks under `output`, resuming after the highest one there.
pub async fn blocks(rpc_url: &str, config: &CrawlerConfig, args: BlocksArgs<'_>) -> Result<()> {
    let client = Arc::new(StarknetRpcClient::http(rpc_url)?);
    let archive = Arc::new(
        BlockArchive::open(args.output)
            .await
            .with_context(|| format!("opening block archive at {}", args.output.display()))?
            .blocks_per_dir(args.blocks_per_dir),
    );

    let mut archiver = BlockArchiver::new(client, archive)
        .from_block(args.from_block)
        .poll_interval(Duration::from_secs(args.poll_secs))
        .failure_threshold(config.failure_threshold);
    if let Some(block) = args.to_block {
        archiver = archiver.to_block(block);
    }

    let finished = tokio::select! {
        result = archiver.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let finished_early = finished.is_none();
    let stats = match finished {
        Some(result) => result?,
        None => {
            tracing::warn!(next_block = ?archiver.next_block(), "interrupted; archived blocks are kept");
            archiver.stats()
        }
    };

    print_json(&json!({
        "interrupted": finished_early,
        "next_block": archiver.next_block(),
        "output": args.output.display().to_string(),
        "stats": stats,
    }))
}

// ─── helpers ─────────────────────────────────────────────────────────────────

fn require_contract(config: &CrawlerConfig) -> Result<()> {
    if config.contract_address.is_empty() {
        bail!("no contract address: pass --contract or set STARKNET_ADALIANS_CONTRACT_ADDRESS");
    }
    Ok(())
}

pub(crate) fn parse_kinds(names: &[String]) -> Result<Vec<EventKind>> {
    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        let kind: EventKind = name.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}
