//! The `EventDecoder` trait: turns raw logs into typed records.

use crate::error::IndexerError;
use crate::record::{DecodedRecord, EventKind};
use crate::types::EventLog;

/// Maps raw logs to [`DecodedRecord`]s.
///
/// Implementations must reject anything they cannot map with
/// [`IndexerError::UnknownEventKind`]; silently skipping a log would hide an
/// ABI mismatch.
pub trait EventDecoder: Send + Sync {
    /// The `keys[0]` value identifying `kind` on the wire.
    fn selector(&self, kind: EventKind) -> String;

    /// Resolve the declared event name of a raw log.
    fn event_name(&self, log: &EventLog) -> Result<EventKind, IndexerError>;

    /// Decode `log` as an event named `event_name`.
    ///
    /// The returned record has no block timestamp yet.
    fn decode(&self, event_name: &str, log: &EventLog) -> Result<DecodedRecord, IndexerError>;

    /// Key filter selecting exactly `kinds` in an event query.
    fn key_filter(&self, kinds: &[EventKind]) -> Vec<Vec<String>> {
        vec![kinds.iter().map(|k| self.selector(*k)).collect()]
    }
}
