//! Timeout enforcement.
//!
//! # Responsibilities
//! - Run a unit of work on its own task with a hard deadline
//! - Report overrun as a distinct outcome
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - On overrun the task is detached, not aborted: it runs to completion and
//!   its result is dropped
//! - Timeout errors are distinct from other errors
//! - Overrun is reported as `Limited::TimedOut`; the caller picks the error

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinError;

use crate::config::TimeLimiterConfig;

/// How a time-limited unit of work ended.
#[derive(Debug)]
pub enum Limited<R> {
    /// The work finished within the cap.
    Completed(R),
    /// The cap elapsed first; the work was abandoned.
    TimedOut,
    /// The task panicked or was cancelled by the runtime.
    Crashed(JoinError),
}

#[derive(Debug, Clone)]
pub struct TimeLimiter {
    timeout: Duration,
}

impl TimeLimiter {
    pub fn new(config: &TimeLimiterConfig) -> Self {
        Self {
            timeout: config.timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Spawn `work` and wait at most the configured cap for it.
    pub async fn run<Fut>(&self, work: Fut) -> Limited<Fut::Output>
    where
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let handle = tokio::spawn(work);

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(output)) => Limited::Completed(output),
            Ok(Err(join_error)) => Limited::Crashed(join_error),
            Err(_) => {
                tracing::debug!(timeout = ?self.timeout, "Call exceeded time limit, abandoning");
                Limited::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn limiter(ms: u64) -> TimeLimiter {
        TimeLimiter::new(&TimeLimiterConfig { timeout_ms: ms })
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_within_cap() {
        let result = limiter(200)
            .run(async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                42
            })
            .await;
        assert!(matches!(result, Limited::Completed(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_times_out_and_work_keeps_running() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let result = limiter(200)
            .run(async move {
                tokio::time::sleep(Duration::from_millis(400)).await;
                flag.store(true, Ordering::SeqCst);
                "late"
            })
            .await;
        assert!(matches!(result, Limited::TimedOut));
        assert!(!finished.load(Ordering::SeqCst));

        // Abandoned, not cancelled
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_panic_reported_as_crash() {
        let result = limiter(200)
            .run(async {
                panic!("boom");
            })
            .await;
        match result {
            Limited::Crashed(err) => assert!(err.is_panic()),
            other => panic!("expected crash, got {:?}", other),
        }
    }
}
