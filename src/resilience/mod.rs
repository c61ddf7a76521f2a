//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Hardened call:
//!     → bulkhead.rs (concurrency slot, zero wait)
//!     → circuit_breaker.rs (permission; fail fast while open)
//!     → timeouts.rs (run work on its own task with a deadline)
//!     → circuit_breaker.rs (record outcome into sliding_window.rs)
//!     → bulkhead.rs (slot released)
//! ```
//!
//! # Design Decisions
//! - pipeline.rs fixes the order; reordering changes which failures the breaker sees
//! - Timeouts are failures for breaker accounting; rejections are not recorded
//! - No retries: one attempt per call

pub mod bulkhead;
pub mod circuit_breaker;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod sliding_window;
pub mod timeouts;

pub use bulkhead::{Bulkhead, BulkheadFull, BulkheadMetrics, BulkheadPermit};
pub use circuit_breaker::{BreakerMetrics, CallNotPermitted, CallPermit, CircuitBreaker, CircuitState};
pub use error::ResilienceError;
pub use outcome::CallOutcome;
pub use pipeline::{PipelineStatus, ResilientPipeline};
pub use sliding_window::SlidingWindow;
pub use timeouts::{Limited, TimeLimiter};
