//! Resilient pipeline: bulkhead → circuit breaker → time limiter.
//!
//! # Data Flow
//! ```text
//! execute(work)
//!     → bulkhead.try_acquire()          full?    → BulkheadFull
//!     → breaker.acquire_permission()    denied?  → CallNotPermitted (slot released)
//!     → time_limiter.run(work())        overrun? → Timeout
//!     → breaker.record(outcome)
//!     → slot released (permit dropped)
//! ```
//!
//! # Design Decisions
//! - Bulkhead first: calls shed for concurrency never touch breaker accounting
//! - Time limiter innermost: only real work execution is time-boxed
//! - At most one attempt per call; no retries
//! - Errors are never swallowed; the caller sees exactly one terminal kind

use std::future::Future;
use std::time::Instant;

use serde::Serialize;

use crate::config::LabConfig;
use crate::observability::metrics;
use crate::resilience::bulkhead::{Bulkhead, BulkheadMetrics};
use crate::resilience::circuit_breaker::{BreakerMetrics, CallPermit, CircuitBreaker};
use crate::resilience::error::ResilienceError;
use crate::resilience::outcome::CallOutcome;
use crate::resilience::timeouts::{Limited, TimeLimiter};

/// Combined snapshot of the pipeline's admission state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub circuit_breaker: BreakerMetrics,
    pub bulkhead: BulkheadMetrics,
}

#[derive(Debug)]
pub struct ResilientPipeline {
    bulkhead: Bulkhead,
    breaker: CircuitBreaker,
    time_limiter: TimeLimiter,
}

impl ResilientPipeline {
    pub fn new(bulkhead: Bulkhead, breaker: CircuitBreaker, time_limiter: TimeLimiter) -> Self {
        Self {
            bulkhead,
            breaker,
            time_limiter,
        }
    }

    /// Build a pipeline from the resilience sections of the config.
    pub fn from_config(name: &str, config: &LabConfig) -> Self {
        Self::new(
            Bulkhead::new(name, &config.bulkhead),
            CircuitBreaker::new(name, config.circuit_breaker.clone()),
            TimeLimiter::new(&config.time_limiter),
        )
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    /// Run `work` under bulkhead, breaker and time limit.
    ///
    /// `work` is only invoked once both admission checks pass. It is spawned
    /// on its own task; if it overruns the time limit it keeps running in the
    /// background and its result is discarded.
    ///
    /// A panic inside `work` is recorded as a failure and then resumed on
    /// the caller.
    pub async fn execute<F, Fut, T, E>(&self, work: F) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let start = Instant::now();

        let slot = match self.bulkhead.try_acquire() {
            Ok(slot) => slot,
            Err(full) => {
                tracing::debug!(bulkhead = %self.bulkhead.name(), "Call rejected: bulkhead full");
                metrics::record_pipeline_call(CallOutcome::RejectedBulkheadFull, start.elapsed());
                return Err(ResilienceError::BulkheadFull(full));
            }
        };

        let permit = match self.breaker.acquire_permission() {
            Ok(permit) => permit,
            Err(denied) => {
                drop(slot);
                tracing::debug!(
                    breaker = %self.breaker.name(),
                    state = %denied.state,
                    "Call rejected: circuit breaker not permitting calls"
                );
                metrics::record_pipeline_call(CallOutcome::RejectedBreakerOpen, start.elapsed());
                return Err(ResilienceError::CallNotPermitted(denied));
            }
        };

        let mut admitted = Admitted {
            breaker: &self.breaker,
            permit: Some(permit),
        };
        let limited = self.time_limiter.run(work()).await;

        let (outcome, result) = match limited {
            Limited::Completed(Ok(value)) => (CallOutcome::Success, Ok(value)),
            Limited::Completed(Err(e)) => (CallOutcome::Failure, Err(ResilienceError::Downstream(e))),
            Limited::TimedOut => (
                CallOutcome::Timeout,
                Err(ResilienceError::Timeout(self.time_limiter.timeout())),
            ),
            Limited::Crashed(join_error) => {
                admitted.finish(CallOutcome::Failure);
                drop(slot);
                metrics::record_pipeline_call(CallOutcome::Failure, start.elapsed());
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
                return Err(ResilienceError::Aborted);
            }
        };

        admitted.finish(outcome);
        drop(slot);

        metrics::record_pipeline_call(outcome, start.elapsed());
        tracing::debug!(
            outcome = %outcome,
            elapsed_ms = start.elapsed().as_millis() as u64,
            state = %self.breaker.state(),
            "Pipeline call finished"
        );

        result
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            circuit_breaker: self.breaker.metrics(),
            bulkhead: self.bulkhead.metrics(),
        }
    }

    /// Force the circuit breaker closed with an empty window.
    pub fn reset(&self) {
        self.breaker.reset();
    }
}

/// A breaker permit held while the work runs.
///
/// If the caller is dropped mid-call (client went away) the permit goes back
/// unrecorded so a half-open trial slot is not lost.
struct Admitted<'a> {
    breaker: &'a CircuitBreaker,
    permit: Option<CallPermit>,
}

impl Admitted<'_> {
    fn finish(&mut self, outcome: CallOutcome) {
        if let Some(permit) = self.permit.take() {
            self.breaker.record(permit, outcome);
        }
    }
}

impl Drop for Admitted<'_> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            self.breaker.release(permit);
        }
    }
}
