//! Starknet JSON-RPC implementation of [`ChainClient`].
//!
//! | Operation                | Method                            |
//! |--------------------------|-----------------------------------|
//! | `latest_block_number`    | `starknet_blockNumber`            |
//! | `get_block`              | `starknet_getBlockWithTxHashes`   |
//! | `get_raw_block`          | `starknet_getBlockWithTxHashes`   |
//! | `get_event_logs`         | `starknet_getEvents`              |
//! | `get_code_presence`      | `starknet_getClassHashAt`         |
//! | `get_transaction_events` | `starknet_getTransactionReceipt`  |

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use starkindex_core::client::ChainClient;
use starkindex_core::error::IndexerError;
use starkindex_core::types::{
    BlockHeader, BlockNumber, EventLog, EventPage, EventQuery, TransactionEvents,
};

use crate::request::codes;
use crate::transport::{HttpTransport, HttpTransportConfig, RpcTransport};

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BlockResult {
    block_number: BlockNumber,
    block_hash: String,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct EmittedEvent {
    from_address: String,
    keys: Vec<String>,
    data: Vec<String>,
    /// Absent for events in the pending block.
    #[serde(default)]
    block_hash: Option<String>,
    #[serde(default)]
    block_number: Option<BlockNumber>,
    transaction_hash: String,
}

#[derive(Debug, Deserialize)]
struct EventsChunk {
    events: Vec<EmittedEvent>,
    #[serde(default)]
    continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReceiptEvent {
    from_address: String,
    keys: Vec<String>,
    data: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReceiptResult {
    transaction_hash: String,
    #[serde(default)]
    block_hash: Option<String>,
    #[serde(default)]
    block_number: Option<BlockNumber>,
    #[serde(default)]
    events: Vec<ReceiptEvent>,
}

fn block_id(number: BlockNumber) -> Value {
    json!({ "block_number": number })
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Starknet node client over any [`RpcTransport`].
pub struct StarknetRpcClient<T = HttpTransport> {
    transport: T,
}

impl StarknetRpcClient<HttpTransport> {
    /// HTTP client for `url` with default retry settings.
    pub fn http(url: impl Into<String>) -> Result<Self, IndexerError> {
        Self::http_with(url, HttpTransportConfig::default())
    }

    pub fn http_with(url: impl Into<String>, config: HttpTransportConfig) -> Result<Self, IndexerError> {
        Ok(Self::new(HttpTransport::new(url, config)?))
    }
}

impl<T: RpcTransport> StarknetRpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<R, IndexerError> {
        let value = self.transport.call(method, params).await?;
        serde_json::from_value(value).map_err(|e| IndexerError::Rpc {
            code: 0,
            message: format!("unexpected {method} result: {e}"),
        })
    }
}

#[async_trait]
impl<T: RpcTransport> ChainClient for StarknetRpcClient<T> {
    async fn latest_block_number(&self) -> Result<BlockNumber, IndexerError> {
        self.call("starknet_blockNumber", vec![]).await
    }

    async fn get_block(&self, number: BlockNumber) -> Result<BlockHeader, IndexerError> {
        let block: BlockResult = self
            .call("starknet_getBlockWithTxHashes", vec![block_id(number)])
            .await?;
        Ok(BlockHeader {
            number: block.block_number,
            hash: block.block_hash,
            timestamp: block.timestamp,
        })
    }

    async fn get_raw_block(&self, number: BlockNumber) -> Result<Value, IndexerError> {
        self.call("starknet_getBlockWithTxHashes", vec![block_id(number)]).await
    }

    async fn get_event_logs(&self, query: &EventQuery) -> Result<EventPage, IndexerError> {
        let mut filter = json!({
            "from_block": block_id(query.from_block),
            "to_block": block_id(query.to_block),
            "address": query.address,
            "keys": query.keys,
            "chunk_size": query.page_size,
        });
        if let Some(token) = &query.continuation_token {
            filter["continuation_token"] = Value::String(token.clone());
        }

        let chunk: EventsChunk = self.call("starknet_getEvents", vec![filter]).await?;
        let logs = chunk
            .events
            .into_iter()
            .map(|e| {
                let block_number = e.block_number.ok_or_else(|| {
                    IndexerError::Other(format!("pending event {} in confirmed range", e.transaction_hash))
                })?;
                Ok(EventLog {
                    block_number,
                    block_hash: e.block_hash.unwrap_or_default(),
                    transaction_hash: e.transaction_hash,
                    from_address: e.from_address,
                    keys: e.keys,
                    data: e.data,
                })
            })
            .collect::<Result<Vec<_>, IndexerError>>()?;

        Ok(EventPage {
            logs,
            continuation_token: chunk.continuation_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_code_presence(&self, address: &str, number: BlockNumber) -> Result<bool, IndexerError> {
        let result: Result<String, IndexerError> = self
            .call(
                "starknet_getClassHashAt",
                vec![block_id(number), Value::String(address.to_string())],
            )
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(IndexerError::Rpc { code, .. }) if code == codes::CONTRACT_NOT_FOUND => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_transaction_events(&self, tx_hash: &str) -> Result<TransactionEvents, IndexerError> {
        let receipt: ReceiptResult = self
            .call(
                "starknet_getTransactionReceipt",
                vec![Value::String(tx_hash.to_string())],
            )
            .await?;
        let block_hash = receipt.block_hash.unwrap_or_default();
        let logs = receipt
            .events
            .into_iter()
            .map(|e| EventLog {
                block_number: receipt.block_number.unwrap_or_default(),
                block_hash: block_hash.clone(),
                transaction_hash: receipt.transaction_hash.clone(),
                from_address: e.from_address,
                keys: e.keys,
                data: e.data,
            })
            .collect();
        Ok(TransactionEvents {
            block_number: receipt.block_number,
            logs,
        })
    }
}
