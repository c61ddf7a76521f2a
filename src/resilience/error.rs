//! Terminal errors of the resilient pipeline.

use std::time::Duration;

use thiserror::Error;

use crate::resilience::bulkhead::BulkheadFull;
use crate::resilience::circuit_breaker::CallNotPermitted;
use crate::resilience::outcome::CallOutcome;

/// Why a call through the pipeline did not produce a value.
///
/// `E` is the error type of the protected work.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// No bulkhead slot was free.
    #[error(transparent)]
    BulkheadFull(BulkheadFull),

    /// The circuit breaker refused the call.
    #[error(transparent)]
    CallNotPermitted(CallNotPermitted),

    /// The work did not finish within the time limit.
    #[error("TIMEOUT: call did not complete within {0:?}")]
    Timeout(Duration),

    /// The work ran and failed.
    #[error("{0}")]
    Downstream(E),

    /// The work's task was cancelled before producing a result.
    #[error("call was aborted before completing")]
    Aborted,
}

impl<E> ResilienceError<E> {
    /// Outcome this error corresponds to.
    pub fn outcome(&self) -> CallOutcome {
        match self {
            ResilienceError::BulkheadFull(_) => CallOutcome::RejectedBulkheadFull,
            ResilienceError::CallNotPermitted(_) => CallOutcome::RejectedBreakerOpen,
            ResilienceError::Timeout(_) => CallOutcome::Timeout,
            ResilienceError::Downstream(_) | ResilienceError::Aborted => CallOutcome::Failure,
        }
    }

    /// The downstream error, if the work itself failed.
    pub fn downstream(&self) -> Option<&E> {
        match self {
            ResilienceError::Downstream(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitState;

    #[test]
    fn test_error_display() {
        let err: ResilienceError<String> = ResilienceError::Timeout(Duration::from_millis(200));
        assert_eq!(err.to_string(), "TIMEOUT: call did not complete within 200ms");

        let err: ResilienceError<String> = ResilienceError::CallNotPermitted(CallNotPermitted {
            name: "backendService".into(),
            state: CircuitState::Open,
            retry_after: None,
        });
        assert_eq!(
            err.to_string(),
            "CircuitBreaker 'backendService' is OPEN and does not permit further calls"
        );

        let err: ResilienceError<String> = ResilienceError::Downstream("boom".into());
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.downstream().map(String::as_str), Some("boom"));
    }

    #[test]
    fn test_error_outcomes() {
        let err: ResilienceError<()> = ResilienceError::BulkheadFull(BulkheadFull {
            name: "b".into(),
            max_concurrent_calls: 1,
        });
        assert_eq!(err.outcome(), CallOutcome::RejectedBulkheadFull);
        assert_eq!(
            ResilienceError::<()>::Aborted.outcome(),
            CallOutcome::Failure
        );
    }
}
