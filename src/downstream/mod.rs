//! Simulated downstream dependency.
//!
//! # Data Flow
//! ```text
//! handler (baseline: direct, hardened: inside pipeline)
//!     → simulator.rs call(endpoint, scenario)
//!         → latency sleep
//!         → scenario.rs decides success / failure
//!         → endpoint state updated (counter, last result)
//!     ← Ok(SimulationResult) | Err(DownstreamFailure { result })
//! ```

pub mod scenario;
pub mod simulator;

pub use scenario::{Scenario, UnknownScenario};
pub use simulator::{DownstreamFailure, EndpointState, SimulatedDownstream, SimulationResult};
