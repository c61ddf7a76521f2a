//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the lab.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the resilience lab.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LabConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// Circuit breaker guarding the hardened call path.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Concurrency limit for the hardened call path.
    pub bulkhead: BulkheadConfig,

    /// Per-call time limit for the hardened call path.
    pub time_limiter: TimeLimiterConfig,

    /// Simulated downstream behaviour.
    pub downstream: DownstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Outer request timeout in seconds (applies to both call paths).
    pub request_timeout_secs: u64,

    /// Allow cross-origin requests from any origin.
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            cors_enabled: true,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failure rate in percent at which the circuit opens.
    pub failure_rate_threshold: f32,

    /// Number of recorded outcomes the failure rate is computed over.
    pub sliding_window_size: usize,

    /// How long the circuit stays open before admitting a trial call.
    pub wait_duration_in_open_state_ms: u64,

    /// Trial calls admitted while half-open.
    pub permitted_calls_in_half_open_state: u32,
}

impl CircuitBreakerConfig {
    pub fn wait_duration_in_open_state(&self) -> Duration {
        Duration::from_millis(self.wait_duration_in_open_state_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 10,
            wait_duration_in_open_state_ms: 5_000,
            permitted_calls_in_half_open_state: 1,
        }
    }
}

/// Bulkhead configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BulkheadConfig {
    /// Maximum number of in-flight calls. Excess calls are rejected, never queued.
    pub max_concurrent_calls: usize,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 10,
        }
    }
}

/// Time limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeLimiterConfig {
    /// Hard cap on a single call in milliseconds.
    pub timeout_ms: u64,
}

impl TimeLimiterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TimeLimiterConfig {
    fn default() -> Self {
        Self { timeout_ms: 200 }
    }
}

/// Simulated downstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Latency of `normal`, `fail` and `fail-window` calls.
    pub normal_latency_ms: u64,

    /// Latency of `slow` calls. Should exceed the time limiter cap.
    pub slow_latency_ms: u64,

    /// Probability of failure for the `fail` scenario (0.0 - 1.0).
    pub failure_probability: f64,

    /// First call index (1-based) of the deterministic fail window.
    pub fail_window_start: u64,

    /// Last call index (inclusive) of the deterministic fail window.
    pub fail_window_end: u64,
}

impl DownstreamConfig {
    pub fn normal_latency(&self) -> Duration {
        Duration::from_millis(self.normal_latency_ms)
    }

    pub fn slow_latency(&self) -> Duration {
        Duration::from_millis(self.slow_latency_ms)
    }
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            normal_latency_ms: 30,
            slow_latency_ms: 400,
            failure_probability: 0.30,
            fail_window_start: 6,
            fail_window_end: 12,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for log aggregation.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_lab_profile() {
        let config = LabConfig::default();
        assert_eq!(config.circuit_breaker.failure_rate_threshold, 50.0);
        assert_eq!(config.circuit_breaker.sliding_window_size, 10);
        assert_eq!(
            config.circuit_breaker.wait_duration_in_open_state(),
            Duration::from_secs(5)
        );
        assert_eq!(config.bulkhead.max_concurrent_calls, 10);
        assert_eq!(config.time_limiter.timeout(), Duration::from_millis(200));
        assert_eq!(config.downstream.fail_window_start, 6);
        assert_eq!(config.downstream.fail_window_end, 12);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LabConfig = toml::from_str(
            r#"
            [time_limiter]
            timeout_ms = 50

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.time_limiter.timeout_ms, 50);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.bulkhead.max_concurrent_calls, 10);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
