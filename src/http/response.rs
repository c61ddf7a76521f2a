//! Response envelope and error mapping.
//!
//! # Responsibilities
//! - Render every call, success or failure, as the same JSON envelope
//! - Map each failure kind to a distinct HTTP status
//!
//! # Design Decisions
//! - Timeouts return 504 Gateway Timeout
//! - Breaker and bulkhead rejections return 503, never 502
//! - Only genuine downstream failures return 502

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::downstream::{DownstreamFailure, SimulationResult};
use crate::resilience::ResilienceError;

/// Result envelope returned by the call endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub ok: bool,
    pub endpoint: String,
    pub mode: String,
    pub scenario: String,
    pub correlation_id: String,
    pub latency_ms: u64,
    pub message: String,
    pub fail_window_index: Option<u64>,
    pub in_fail_window: bool,
}

/// Error type of a call on either path.
pub type CallError = ResilienceError<DownstreamFailure>;

/// HTTP status for a failed call.
pub fn failure_status(err: &CallError) -> StatusCode {
    match err {
        ResilienceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ResilienceError::CallNotPermitted(_) | ResilienceError::BulkheadFull(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ResilienceError::Downstream(_) | ResilienceError::Aborted => StatusCode::BAD_GATEWAY,
    }
}

/// User-facing message for a failed call.
pub fn failure_message(err: &CallError) -> String {
    match err {
        ResilienceError::Timeout(_) => format!("Request timed out: {}", err),
        ResilienceError::CallNotPermitted(_) => format!("Circuit breaker is open: {}", err),
        ResilienceError::BulkheadFull(_) => format!("Bulkhead is full: {}", err),
        ResilienceError::Downstream(_) | ResilienceError::Aborted => {
            format!("Dependency failure: {}", err)
        }
    }
}

/// Diagnostics available for a failed call.
///
/// Rejected and timed-out calls have none: either the downstream never ran,
/// or its result was abandoned.
pub fn failure_diagnostics(err: &CallError) -> Option<&SimulationResult> {
    err.downstream().map(|failure| &failure.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{BulkheadFull, CallNotPermitted, CircuitState};
    use std::time::Duration;

    fn downstream_failure() -> CallError {
        ResilienceError::Downstream(DownstreamFailure {
            result: SimulationResult {
                message: "Deterministic fail-window: forced failure (6–12).".into(),
                sequence_index: Some(7),
                in_fail_window: true,
            },
        })
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            failure_status(&ResilienceError::Timeout(Duration::from_millis(200))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            failure_status(&ResilienceError::CallNotPermitted(CallNotPermitted {
                name: "downstream".into(),
                state: CircuitState::Open,
                retry_after: None,
            })),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            failure_status(&ResilienceError::BulkheadFull(BulkheadFull {
                name: "downstream".into(),
                max_concurrent_calls: 10,
            })),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(failure_status(&downstream_failure()), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_messages_distinguish_kinds() {
        assert_eq!(
            failure_message(&downstream_failure()),
            "Dependency failure: Deterministic fail-window: forced failure (6–12)."
        );
        let open = failure_message(&ResilienceError::CallNotPermitted(CallNotPermitted {
            name: "downstream".into(),
            state: CircuitState::Open,
            retry_after: None,
        }));
        assert!(open.starts_with("Circuit breaker is open: "));
    }

    #[test]
    fn test_diagnostics_only_for_downstream_failures() {
        let err = downstream_failure();
        assert_eq!(failure_diagnostics(&err).and_then(|r| r.sequence_index), Some(7));
        assert!(failure_diagnostics(&ResilienceError::Timeout(Duration::from_millis(1))).is_none());
    }

    #[test]
    fn test_envelope_is_camel_case() {
        let envelope = ApiResponse {
            ok: true,
            endpoint: "profile".into(),
            mode: "hardened".into(),
            scenario: "normal".into(),
            correlation_id: "abc".into(),
            latency_ms: 31,
            message: "Success".into(),
            fail_window_index: None,
            in_fail_window: false,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["correlationId"], "abc");
        assert_eq!(json["latencyMs"], 31);
        assert!(json["failWindowIndex"].is_null());
        assert_eq!(json["inFailWindow"], false);
    }
}
