//! Downstream call endpoints (`/api/profile`, `/api/search`).
//!
//! # Responsibilities
//! - Run one simulated call per request, directly (baseline) or through the
//!   resilient pipeline (hardened)
//! - Render the outcome as an `ApiResponse` with the mapped status

use std::str::FromStr;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::downstream::{Scenario, SimulationResult};
use crate::http::request::CorrelationId;
use crate::http::response::{failure_diagnostics, failure_message, failure_status, ApiResponse, CallError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::ResilienceError;

/// Which call path to exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Direct call, no protection.
    #[default]
    Baseline,
    /// Call through bulkhead, circuit breaker and time limiter.
    Hardened,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Baseline => "baseline",
            Mode::Hardened => "hardened",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" => Ok(Mode::Baseline),
            "hardened" => Ok(Mode::Hardened),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallParams {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_scenario")]
    pub scenario: String,
}

fn default_mode() -> String {
    Mode::Baseline.as_str().to_string()
}

fn default_scenario() -> String {
    Scenario::Normal.as_str().to_string()
}

pub async fn profile_handler(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Query(params): Query<CallParams>,
) -> Response {
    call_endpoint(&state, "profile", correlation_id, params).await
}

pub async fn search_handler(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Query(params): Query<CallParams>,
) -> Response {
    call_endpoint(&state, "search", correlation_id, params).await
}

async fn call_endpoint(
    state: &AppState,
    endpoint: &'static str,
    correlation_id: CorrelationId,
    params: CallParams,
) -> Response {
    let start = Instant::now();
    // Anything but "hardened" takes the unprotected path
    let mode = params.mode.parse::<Mode>().unwrap_or_default();
    let scenario = Scenario::parse_lenient(&params.scenario);

    tracing::debug!(
        correlation_id = %correlation_id,
        endpoint,
        mode = mode.as_str(),
        scenario = %scenario,
        "Calling downstream"
    );

    let result: Result<SimulationResult, CallError> = match mode {
        Mode::Baseline => state
            .downstream
            .call(endpoint, scenario)
            .await
            .map_err(ResilienceError::Downstream),
        Mode::Hardened => {
            let downstream = state.downstream.clone();
            state
                .pipeline
                .execute(move || async move { downstream.call(endpoint, scenario).await })
                .await
        }
    };

    let latency_ms = start.elapsed().as_millis() as u64;
    let (status, message, diagnostics) = match &result {
        Ok(r) => (StatusCode::OK, r.message.clone(), Some(r)),
        Err(e) => (failure_status(e), failure_message(e), failure_diagnostics(e)),
    };

    if result.is_err() {
        tracing::warn!(
            correlation_id = %correlation_id,
            endpoint,
            mode = mode.as_str(),
            status = status.as_u16(),
            latency_ms,
            message = %message,
            "Downstream call failed"
        );
    } else {
        tracing::info!(
            correlation_id = %correlation_id,
            endpoint,
            mode = mode.as_str(),
            latency_ms,
            "Downstream call succeeded"
        );
    }
    metrics::record_request(endpoint, mode.as_str(), status.as_u16(), start);

    let body = ApiResponse {
        ok: result.is_ok(),
        endpoint: endpoint.to_string(),
        mode: params.mode,
        scenario: params.scenario,
        correlation_id: correlation_id.into_string(),
        latency_ms,
        message,
        fail_window_index: diagnostics.and_then(|d| d.sequence_index),
        in_fail_window: diagnostics.map(|d| d.in_fail_window).unwrap_or(false),
    };

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("HARDENED".parse::<Mode>().unwrap(), Mode::Hardened);
        assert_eq!("baseline".parse::<Mode>().unwrap(), Mode::Baseline);
        assert_eq!("whatever".parse::<Mode>().unwrap_or_default(), Mode::Baseline);
    }
}
