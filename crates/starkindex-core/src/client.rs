//! The `ChainClient` trait: everything the crawler asks of the node.

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::types::{BlockHeader, BlockNumber, EventPage, EventQuery, TransactionEvents};

/// Read access to the chain.
///
/// Implementations report network failures as [`IndexerError::Transient`] and
/// missing blocks or transactions as [`IndexerError::NotFound`]. Retry policy
/// beyond a single request is the caller's business.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Height of the newest block the node knows about.
    async fn latest_block_number(&self) -> Result<BlockNumber, IndexerError>;

    /// Header of block `number`.
    async fn get_block(&self, number: BlockNumber) -> Result<BlockHeader, IndexerError>;

    /// Block `number` as the node serves it, for archiving.
    ///
    /// The default renders just the header.
    async fn get_raw_block(&self, number: BlockNumber) -> Result<serde_json::Value, IndexerError> {
        let header = self.get_block(number).await?;
        serde_json::to_value(header).map_err(|e| IndexerError::Other(e.to_string()))
    }

    /// One page of events matching `query`.
    async fn get_event_logs(&self, query: &EventQuery) -> Result<EventPage, IndexerError>;

    /// Whether contract code is deployed at `address` as of block `number`.
    async fn get_code_presence(
        &self,
        address: &str,
        number: BlockNumber,
    ) -> Result<bool, IndexerError>;

    /// All events emitted by one transaction, with the block it landed in.
    async fn get_transaction_events(&self, tx_hash: &str) -> Result<TransactionEvents, IndexerError>;
}
