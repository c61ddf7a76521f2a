//! Call outcomes produced by the pipeline.

use serde::Serialize;

/// Result of a single call attempt through the pipeline.
///
/// Only `Success`, `Failure` and `Timeout` are recorded by the circuit
/// breaker. The two rejection variants are admission decisions, not outcomes
/// of the downstream work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallOutcome {
    Success,
    Failure,
    Timeout,
    RejectedBreakerOpen,
    RejectedBulkheadFull,
}

impl CallOutcome {
    /// True for outcomes that count against the failure rate.
    pub fn is_failure(self) -> bool {
        matches!(self, CallOutcome::Failure | CallOutcome::Timeout)
    }

    /// True for admission-control rejections.
    pub fn is_rejection(self) -> bool {
        matches!(
            self,
            CallOutcome::RejectedBreakerOpen | CallOutcome::RejectedBulkheadFull
        )
    }

    /// Label used for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Failure => "failure",
            CallOutcome::Timeout => "timeout",
            CallOutcome::RejectedBreakerOpen => "rejected_breaker_open",
            CallOutcome::RejectedBulkheadFull => "rejected_bulkhead_full",
        }
    }
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
