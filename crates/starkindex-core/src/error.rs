//! Error types for the crawl pipeline.

use thiserror::Error;

/// Errors that can occur while crawling, decoding or persisting events.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Network failure or timeout talking to the node. Always retryable.
    #[error("Transient RPC error: {0}")]
    Transient(String),

    /// The queried block, transaction or contract does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The node answered with a protocol-level error that retrying won't fix.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The decoder does not know this event name or selector.
    #[error("Unparsable event kind: {name}")]
    UnknownEventKind { name: String },

    #[error("Decode error in '{event}': {reason}")]
    Decode { event: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Returns `true` for network-level failures worth retrying in place.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Returns `true` for lookups of things that do not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this error counts toward the consecutive-failure
    /// threshold. Missing objects are an answer, not a failure.
    pub fn counts_as_failure(&self) -> bool {
        !self.is_not_found()
    }
}

impl From<std::io::Error> for IndexerError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
