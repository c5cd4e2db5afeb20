//! Failure governor: decides retry vs. fatal stop for failed crawl cycles.

use crate::error::IndexerError;

/// Default number of consecutive failed cycles before the crawl gives up.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 10;

/// Counts consecutive failed cycles.
///
/// Every error kind counts except [`IndexerError::NotFound`]. Reaching the
/// threshold hands the last error back to the caller unchanged.
#[derive(Debug, Clone)]
pub struct FailureGovernor {
    threshold: u32,
    consecutive: u32,
}

impl FailureGovernor {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
        }
    }

    /// A cycle completed; forget past failures.
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// A cycle failed with `err`.
    ///
    /// Returns `Ok(count)` with the current consecutive-failure count when the
    /// crawl should retry, or `Err(err)` once the threshold is reached.
    pub fn record_failure(&mut self, err: IndexerError) -> Result<u32, IndexerError> {
        if !err.counts_as_failure() {
            return Ok(self.consecutive);
        }
        self.consecutive += 1;
        if self.consecutive >= self.threshold {
            return Err(err);
        }
        Ok(self.consecutive)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

impl Default for FailureGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> IndexerError {
        IndexerError::Transient("connection reset".into())
    }

    #[test]
    fn ten_failures_are_fatal() {
        let mut gov = FailureGovernor::default();
        for i in 1..10 {
            assert_eq!(gov.record_failure(transient()).unwrap(), i);
        }
        let err = gov.record_failure(transient()).unwrap_err();
        assert_eq!(err.to_string(), "Transient RPC error: connection reset");
    }

    #[test]
    fn nine_failures_then_success_resets() {
        let mut gov = FailureGovernor::default();
        for _ in 0..9 {
            gov.record_failure(transient()).unwrap();
        }
        assert_eq!(gov.consecutive_failures(), 9);
        gov.record_success();
        assert_eq!(gov.consecutive_failures(), 0);

        for _ in 0..9 {
            gov.record_failure(transient()).unwrap();
        }
        assert_eq!(gov.consecutive_failures(), 9);
    }

    #[test]
    fn not_found_does_not_count() {
        let mut gov = FailureGovernor::new(2);
        gov.record_failure(transient()).unwrap();
        for _ in 0..5 {
            assert_eq!(gov.record_failure(IndexerError::NotFound("block".into())).unwrap(), 1);
        }
        assert!(gov.record_failure(transient()).is_err());
    }

    #[test]
    fn decode_errors_count() {
        let mut gov = FailureGovernor::new(1);
        let err = gov
            .record_failure(IndexerError::UnknownEventKind { name: "0x1".into() })
            .unwrap_err();
        assert!(matches!(err, IndexerError::UnknownEventKind { .. }));
    }
}
