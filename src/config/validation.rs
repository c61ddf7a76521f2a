//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds in 0-100, capacities > 0)
//! - Check cross-field consistency (fail window bounds ordered)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LabConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::LabConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &LabConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    let cb = &config.circuit_breaker;
    if !(cb.failure_rate_threshold > 0.0 && cb.failure_rate_threshold <= 100.0) {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_rate_threshold",
            format!("{} is outside (0, 100]", cb.failure_rate_threshold),
        ));
    }
    if cb.sliding_window_size == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.sliding_window_size",
            "must be greater than 0",
        ));
    }
    if cb.permitted_calls_in_half_open_state == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.permitted_calls_in_half_open_state",
            "at least one trial call is required",
        ));
    }

    if config.bulkhead.max_concurrent_calls == 0 {
        errors.push(ValidationError::new(
            "bulkhead.max_concurrent_calls",
            "must be greater than 0",
        ));
    }

    if config.time_limiter.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "time_limiter.timeout_ms",
            "must be greater than 0",
        ));
    }

    let ds = &config.downstream;
    if !(0.0..=1.0).contains(&ds.failure_probability) {
        errors.push(ValidationError::new(
            "downstream.failure_probability",
            format!("{} is outside [0, 1]", ds.failure_probability),
        ));
    }
    if ds.fail_window_start == 0 || ds.fail_window_start > ds.fail_window_end {
        errors.push(ValidationError::new(
            "downstream.fail_window_start",
            format!(
                "window {}-{} must satisfy 1 <= start <= end",
                ds.fail_window_start, ds.fail_window_end
            ),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
