//! Deployment block locator.
//!
//! Binary-searches `[1, latest]` for the lowest block at which the contract's
//! code is present. Code presence is monotonic in block height, so the search
//! keeps `min` on the absent side and `max` on the present side until they are
//! adjacent.

use std::collections::HashMap;
use std::time::Duration;

use crate::client::ChainClient;
use crate::error::IndexerError;
use crate::types::BlockNumber;

/// Finds the block a contract was deployed at.
///
/// Every lookup result is memoized per contract for the lifetime of the
/// locator, so repeated `locate` calls in one session cost no extra chain calls.
/// One locator serves one chain.
pub struct DeploymentLocator {
    /// Attempts per lookup before a transient failure is propagated.
    lookup_attempts: u32,
    /// Pause between attempts of the same lookup.
    retry_delay: Duration,
    /// Keyed by normalized address and block.
    checked: HashMap<(String, BlockNumber), bool>,
}

impl DeploymentLocator {
    pub fn new(lookup_attempts: u32) -> Self {
        Self {
            lookup_attempts: lookup_attempts.max(1),
            retry_delay: Duration::from_millis(500),
            checked: HashMap::new(),
        }
    }

    /// Override the pause between lookup attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Lowest block at which `address` has code, or `0` if it has none even at
    /// the chain head.
    pub async fn locate<C>(&mut self, client: &C, address: &str) -> Result<BlockNumber, IndexerError>
    where
        C: ChainClient + ?Sized,
    {
        let latest = client.latest_block_number().await?;
        if latest == 0 || !self.is_present(client, address, latest).await? {
            tracing::info!(address, latest, "contract not deployed as of chain head");
            return Ok(0);
        }

        let mut min: BlockNumber = 1;
        let mut max = latest;
        while max - min >= 2 {
            let mid = min + (max - min) / 2;
            if self.is_present(client, address, mid).await? {
                max = mid;
            } else {
                min = mid;
            }
        }

        let block = if self.is_present(client, address, min).await? {
            min
        } else {
            max
        };
        tracing::info!(address, block, lookups = self.checked.len(), "located deployment block");
        Ok(block)
    }

    /// Number of distinct (contract, block) lookups so far.
    pub fn lookups(&self) -> usize {
        self.checked.len()
    }

    async fn is_present<C>(
        &mut self,
        client: &C,
        address: &str,
        block: BlockNumber,
    ) -> Result<bool, IndexerError>
    where
        C: ChainClient + ?Sized,
    {
        let key = (address_key(address), block);
        if let Some(present) = self.checked.get(&key) {
            return Ok(*present);
        }

        let mut attempt = 0u32;
        let present = loop {
            attempt += 1;
            match client.get_code_presence(address, block).await {
                Ok(present) => break present,
                Err(IndexerError::NotFound(_)) => break false,
                Err(e) if e.is_transient() && attempt < self.lookup_attempts => {
                    tracing::warn!(block, attempt, error = %e, "code lookup failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                // An unreachable node is not evidence of absence.
                Err(e) => return Err(e),
            }
        };

        tracing::debug!(block, present, "checked contract code");
        self.checked.insert(key, present);
        Ok(present)
    }
}

/// Lowercase, unprefixed, no leading zeros: `0x00ABC` and `0xabc` share a key.
fn address_key(address: &str) -> String {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address)
        .trim_start_matches('0');
    digits.to_ascii_lowercase()
}

impl Default for DeploymentLocator {
    fn default() -> Self {
        Self::new(3)
    }
}
