//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define lab metrics (requests, pipeline outcomes, breaker state)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `lab_requests_total` (counter): HTTP calls by endpoint, mode, status
//! - `lab_request_duration_seconds` (histogram): HTTP call latency
//! - `lab_pipeline_calls_total` (counter): pipeline attempts by outcome
//! - `lab_pipeline_call_duration_seconds` (histogram): time spent in the pipeline
//! - `lab_circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `lab_circuit_breaker_transitions_total` (counter): transitions by target state
//! - `lab_downstream_calls_total` (counter): simulated calls by endpoint, scenario, result
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed (tests never install one)
//! - Label values are small closed sets, never correlation ids

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::{CallOutcome, CircuitState};

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished HTTP call.
pub fn record_request(endpoint: &str, mode: &str, status: u16, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    counter!(
        "lab_requests_total",
        "endpoint" => endpoint.to_string(),
        "mode" => mode.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "lab_request_duration_seconds",
        "endpoint" => endpoint.to_string(),
        "mode" => mode.to_string()
    )
    .record(elapsed);
}

/// Record one attempt through the resilient pipeline.
pub fn record_pipeline_call(outcome: CallOutcome, elapsed: Duration) {
    counter!("lab_pipeline_calls_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("lab_pipeline_call_duration_seconds", "outcome" => outcome.as_str())
        .record(elapsed.as_secs_f64());
}

/// Record a circuit breaker state change.
pub fn record_breaker_transition(to: CircuitState) {
    gauge!("lab_circuit_breaker_state").set(to as u8 as f64);
    counter!("lab_circuit_breaker_transitions_total", "to" => to.as_str()).increment(1);
}

/// Record a simulated downstream call.
pub fn record_downstream_call(endpoint: &str, scenario: &'static str, ok: bool) {
    counter!(
        "lab_downstream_calls_total",
        "endpoint" => endpoint.to_string(),
        "scenario" => scenario,
        "result" => if ok { "success" } else { "failure" }
    )
    .increment(1);
}
