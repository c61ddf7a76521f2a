//! Resilience lab: a simulated downstream dependency called either directly
//! (baseline) or through a bulkhead, circuit breaker and time limiter
//! (hardened), so the two behaviours can be compared side by side.

pub mod admin;
pub mod config;
pub mod downstream;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::LabConfig;
pub use downstream::{Scenario, SimulatedDownstream};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resilience::{ResilienceError, ResilientPipeline};
