//! Count-based sliding window of recorded call outcomes.
//!
//! # Responsibilities
//! - Keep the last N recorded outcomes in insertion order
//! - Evict the oldest outcome once the window is full
//! - Report failure rate over the buffered outcomes
//!
//! # Design Decisions
//! - Ring buffer over a `VecDeque` with capacity fixed at construction
//! - Failure count maintained on insert/evict, so rate lookups are O(1)
//! - Not synchronized; the circuit breaker owns it behind its lock

use std::collections::VecDeque;

use crate::resilience::outcome::CallOutcome;

#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    outcomes: VecDeque<CallOutcome>,
    failures: usize,
}

impl SlidingWindow {
    /// Create an empty window holding at most `capacity` outcomes.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            outcomes: VecDeque::with_capacity(capacity),
            failures: 0,
        }
    }

    /// Record an outcome, evicting the oldest entry when full.
    ///
    /// Rejections are admission decisions and are ignored.
    pub fn record(&mut self, outcome: CallOutcome) {
        if outcome.is_rejection() {
            return;
        }

        if self.outcomes.len() == self.capacity {
            if let Some(evicted) = self.outcomes.pop_front() {
                if evicted.is_failure() {
                    self.failures -= 1;
                }
            }
        }

        if outcome.is_failure() {
            self.failures += 1;
        }
        self.outcomes.push_back(outcome);
    }

    /// Failure rate in percent, or `None` while the window is empty.
    pub fn failure_rate(&self) -> Option<f32> {
        if self.outcomes.is_empty() {
            return None;
        }
        Some(self.failures as f32 * 100.0 / self.outcomes.len() as f32)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.outcomes.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of failed (or timed out) calls currently buffered.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
    }
}
