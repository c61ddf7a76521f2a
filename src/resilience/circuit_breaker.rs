//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: downstream assumed down, calls fail fast
//! - Half-Open: trial calls test whether the downstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: window full and failure rate >= threshold
//! Open → Half-Open: next permission request after the wait duration
//! Half-Open → Closed: trial call succeeds (window cleared)
//! Half-Open → Open: trial call fails or times out
//! any → Closed: administrative reset
//! ```
//!
//! # Design Decisions
//! - Count-based sliding window, evaluated only once full
//! - Open → Half-Open is lazy (no background timer)
//! - Every transition bumps an epoch; outcomes carrying a stale epoch are dropped
//! - Single mutex around state + window so permission and recording are atomic

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::outcome::CallOutcome;
use crate::resilience::sliding_window::SlidingWindow;

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when the breaker refuses a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("CircuitBreaker '{name}' is {state} and does not permit further calls")]
pub struct CallNotPermitted {
    pub name: String,
    pub state: CircuitState,
    /// Time until a trial call will be admitted, when known.
    pub retry_after: Option<Duration>,
}

/// Permission to run a single call.
///
/// Hand it back through [`CircuitBreaker::record`] with the call's outcome,
/// or [`CircuitBreaker::release`] if the call was abandoned before finishing.
#[derive(Debug)]
#[must_use = "a permit must be returned with the call outcome"]
pub struct CallPermit {
    epoch: u64,
    state: CircuitState,
}

impl CallPermit {
    /// State the breaker was in when the permit was granted.
    pub fn state(&self) -> CircuitState {
        self.state
    }
}

/// Point-in-time view of the breaker, used by the admin status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerMetrics {
    pub state: CircuitState,
    /// Percent of failed calls in the window; `None` while empty.
    pub failure_rate: Option<f32>,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    pub not_permitted_calls: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    opened_at: Option<Instant>,
    window: SlidingWindow,
    half_open_admitted: u32,
    epoch: u64,
    not_permitted: u64,
}

/// Sliding-window circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let window = SlidingWindow::new(config.sliding_window_size);
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                opened_at: None,
                window,
                half_open_admitted: 0,
                epoch: 0,
                not_permitted: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state. An open breaker reports `Open` until a call arrives
    /// after the wait duration.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Ask for permission to run one call.
    pub fn acquire_permission(&self) -> Result<CallPermit, CallNotPermitted> {
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Ok(CallPermit {
                epoch: inner.epoch,
                state: CircuitState::Closed,
            }),
            CircuitState::Open => {
                let wait = self.config.wait_duration_in_open_state();
                let elapsed = inner
                    .opened_at
                    .map(|opened_at| opened_at.elapsed())
                    .unwrap_or(wait);

                if elapsed >= wait {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.half_open_admitted = 1;
                    Ok(CallPermit {
                        epoch: inner.epoch,
                        state: CircuitState::HalfOpen,
                    })
                } else {
                    inner.not_permitted += 1;
                    Err(self.not_permitted(CircuitState::Open, Some(wait - elapsed)))
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_admitted < self.config.permitted_calls_in_half_open_state {
                    inner.half_open_admitted += 1;
                    Ok(CallPermit {
                        epoch: inner.epoch,
                        state: CircuitState::HalfOpen,
                    })
                } else {
                    inner.not_permitted += 1;
                    Err(self.not_permitted(CircuitState::HalfOpen, None))
                }
            }
        }
    }

    /// Record the outcome of a permitted call.
    pub fn record(&self, permit: CallPermit, outcome: CallOutcome) {
        if outcome.is_rejection() {
            return;
        }

        let mut inner = self.lock();
        if permit.epoch != inner.epoch {
            tracing::debug!(
                breaker = %self.name,
                outcome = %outcome,
                "Ignoring outcome of call admitted before last transition"
            );
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.record(outcome);
                if !inner.window.is_full() {
                    return;
                }
                if let Some(rate) = inner.window.failure_rate() {
                    if rate >= self.config.failure_rate_threshold {
                        tracing::warn!(
                            breaker = %self.name,
                            failure_rate = rate,
                            threshold = self.config.failure_rate_threshold,
                            "Failure rate exceeded threshold"
                        );
                        self.transition(&mut inner, CircuitState::Open);
                    }
                }
            }
            CircuitState::HalfOpen => {
                if outcome.is_failure() {
                    self.transition(&mut inner, CircuitState::Open);
                } else {
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            // Permits are never issued while open; the epoch check above
            // already filtered anything from before the transition.
            CircuitState::Open => {}
        }
    }

    /// Hand back a permit whose call never produced an outcome.
    ///
    /// Nothing is recorded; a half-open trial slot becomes available again.
    pub fn release(&self, permit: CallPermit) {
        let mut inner = self.lock();
        if permit.epoch == inner.epoch && inner.state == CircuitState::HalfOpen {
            inner.half_open_admitted = inner.half_open_admitted.saturating_sub(1);
            tracing::debug!(breaker = %self.name, "Half-open trial abandoned");
        }
    }

    /// Force the breaker closed and clear its window.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let previous = inner.state;

        inner.state = CircuitState::Closed;
        inner.opened_at = None;
        inner.window.clear();
        inner.half_open_admitted = 0;
        inner.not_permitted = 0;
        inner.epoch += 1;

        tracing::info!(breaker = %self.name, from = %previous, "Circuit breaker reset");
        metrics::record_breaker_transition(CircuitState::Closed);
    }

    pub fn metrics(&self) -> BreakerMetrics {
        let inner = self.lock();
        BreakerMetrics {
            state: inner.state,
            failure_rate: inner.window.failure_rate(),
            buffered_calls: inner.window.len(),
            failed_calls: inner.window.failures(),
            not_permitted_calls: inner.not_permitted,
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.epoch += 1;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                inner.half_open_admitted = 0;
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                inner.window.clear();
                inner.half_open_admitted = 0;
            }
        }

        match to {
            CircuitState::Open => {
                tracing::warn!(breaker = %self.name, from = %from, to = %to, "Circuit breaker state change")
            }
            _ => {
                tracing::info!(breaker = %self.name, from = %from, to = %to, "Circuit breaker state change")
            }
        }
        metrics::record_breaker_transition(to);
    }

    fn not_permitted(&self, state: CircuitState, retry_after: Option<Duration>) -> CallNotPermitted {
        CallNotPermitted {
            name: self.name.clone(),
            state,
            retry_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(wait_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_rate_threshold: 50.0,
            sliding_window_size: 10,
            wait_duration_in_open_state_ms: wait_ms,
            permitted_calls_in_half_open_state: 1,
        }
    }

    fn call(breaker: &CircuitBreaker, outcome: CallOutcome) {
        let permit = breaker.acquire_permission().expect("call should be permitted");
        breaker.record(permit, outcome);
    }

    fn trip(breaker: &CircuitBreaker) {
        for _ in 0..5 {
            call(breaker, CallOutcome::Success);
        }
        for _ in 0..5 {
            call(breaker, CallOutcome::Failure);
        }
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_stays_closed_until_window_full() {
        let breaker = CircuitBreaker::new("test", config(5_000));
        for _ in 0..9 {
            call(&breaker, CallOutcome::Failure);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.metrics().failure_rate, Some(100.0));

        call(&breaker, CallOutcome::Failure);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = CircuitBreaker::new("test", config(5_000));
        for _ in 0..6 {
            call(&breaker, CallOutcome::Success);
        }
        for _ in 0..4 {
            call(&breaker, CallOutcome::Failure);
        }
        // 40% over a full window
        assert_eq!(breaker.state(), CircuitState::Closed);

        // Evicts a success: 5 of the last 10 failed
        call(&breaker, CallOutcome::Timeout);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_open_rejects_calls() {
        let breaker = CircuitBreaker::new("backend", config(5_000));
        trip(&breaker);

        let err = breaker.acquire_permission().unwrap_err();
        assert_eq!(err.state, CircuitState::Open);
        assert!(err.retry_after.is_some());
        assert_eq!(
            err.to_string(),
            "CircuitBreaker 'backend' is OPEN and does not permit further calls"
        );
        assert_eq!(breaker.metrics().not_permitted_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_success_closes() {
        let breaker = CircuitBreaker::new("test", config(5_000));
        trip(&breaker);

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(breaker.acquire_permission().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        let trial = breaker.acquire_permission().unwrap();
        assert_eq!(trial.state(), CircuitState::HalfOpen);
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // Only one trial while half-open
        let err = breaker.acquire_permission().unwrap_err();
        assert_eq!(err.state, CircuitState::HalfOpen);

        breaker.record(trial, CallOutcome::Success);
        let metrics = breaker.metrics();
        assert_eq!(metrics.state, CircuitState::Closed);
        assert_eq!(metrics.buffered_calls, 0);
        assert_eq!(metrics.failure_rate, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_failure_reopens() {
        let breaker = CircuitBreaker::new("test", config(1_000));
        trip(&breaker);

        tokio::time::advance(Duration::from_millis(1_000)).await;
        let trial = breaker.acquire_permission().unwrap();
        breaker.record(trial, CallOutcome::Timeout);
        assert_eq!(breaker.state(), CircuitState::Open);

        // The wait restarts from the failed trial
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(breaker.acquire_permission().is_err());
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(breaker.acquire_permission().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_trial_frees_half_open_slot() {
        let breaker = CircuitBreaker::new("test", config(1_000));
        trip(&breaker);

        tokio::time::advance(Duration::from_millis(1_000)).await;
        let trial = breaker.acquire_permission().unwrap();
        assert!(breaker.acquire_permission().is_err());

        breaker.release(trial);
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        let retry = breaker.acquire_permission().unwrap();
        breaker.record(retry, CallOutcome::Success);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_stale_outcome_ignored() {
        let breaker = CircuitBreaker::new("test", config(5_000));
        let late = breaker.acquire_permission().unwrap();
        trip(&breaker);

        breaker.reset();
        breaker.record(late, CallOutcome::Failure);
        assert_eq!(breaker.metrics().buffered_calls, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_not_lost() {
        let breaker = std::sync::Arc::new(CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_rate_threshold: 100.0,
                sliding_window_size: 1_000,
                wait_duration_in_open_state_ms: 5_000,
                permitted_calls_in_half_open_state: 1,
            },
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let breaker = breaker.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    let permit = breaker.acquire_permission().unwrap();
                    let outcome = if i % 4 == 0 {
                        CallOutcome::Failure
                    } else {
                        CallOutcome::Success
                    };
                    breaker.record(permit, outcome);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let metrics = breaker.metrics();
        assert_eq!(metrics.state, CircuitState::Closed);
        assert_eq!(metrics.buffered_calls, 400);
        assert_eq!(metrics.failed_calls, 104);
        assert_eq!(metrics.failure_rate, Some(26.0));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let breaker = CircuitBreaker::new("test", config(5_000));
        trip(&breaker);
        let _ = breaker.acquire_permission();

        breaker.reset();
        let once = breaker.metrics();
        breaker.reset();
        let twice = breaker.metrics();

        assert_eq!(once, twice);
        assert_eq!(once.state, CircuitState::Closed);
        assert_eq!(once.buffered_calls, 0);
        assert_eq!(once.not_permitted_calls, 0);
    }
}
