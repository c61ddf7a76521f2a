//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (resolve correlation ID)
//!     → profile.rs (baseline: downstream directly,
//!                   hardened: downstream inside ResilientPipeline)
//!     → response.rs (envelope, failure → status mapping)
//!     → Send to client
//! ```

pub mod profile;
pub mod request;
pub mod response;
pub mod server;

pub use profile::Mode;
pub use request::{CorrelationId, X_CORRELATION_ID};
pub use response::ApiResponse;
pub use server::{AppState, HttpServer};
