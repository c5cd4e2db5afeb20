//! Block timestamp cache: memoizes block number → timestamp for one session.

use std::collections::HashMap;

use crate::client::ChainClient;
use crate::error::IndexerError;
use crate::types::BlockNumber;

/// Session-lifetime timestamp cache.
///
/// There is no eviction; between two cursor advances at most `max_batch`
/// distinct blocks can be touched. Nothing is persisted, a restarted session
/// simply re-fetches.
#[derive(Debug, Default)]
pub struct BlockTimestampCache {
    entries: HashMap<BlockNumber, i64>,
}

impl BlockTimestampCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of `block`, fetched through `client` on first use.
    pub async fn timestamp<C>(&mut self, client: &C, block: BlockNumber) -> Result<i64, IndexerError>
    where
        C: ChainClient + ?Sized,
    {
        if let Some(ts) = self.entries.get(&block) {
            return Ok(*ts);
        }
        let header = client.get_block(block).await?;
        tracing::trace!(block, timestamp = header.timestamp, "cached block timestamp");
        self.entries.insert(block, header.timestamp);
        Ok(header.timestamp)
    }

    pub fn get(&self, block: BlockNumber) -> Option<i64> {
        self.entries.get(&block).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    #[tokio::test]
    async fn fetches_once_per_block() {
        let chain = MockChain::new(100);
        let mut cache = BlockTimestampCache::new();

        assert_eq!(cache.timestamp(&chain, 42).await.unwrap(), 42 * 10);
        assert_eq!(cache.timestamp(&chain, 42).await.unwrap(), 42 * 10);
        assert_eq!(cache.timestamp(&chain, 43).await.unwrap(), 43 * 10);

        assert_eq!(chain.block_calls(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(42), Some(420));
    }

    #[tokio::test]
    async fn missing_block_is_not_cached() {
        let chain = MockChain::new(100);
        let mut cache = BlockTimestampCache::new();

        let err = cache.timestamp(&chain, 500).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.is_empty());
    }
}
