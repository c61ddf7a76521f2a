use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{extract::State, Json};
use serde::Serialize;

use crate::downstream::EndpointState;
use crate::http::server::AppState;
use crate::resilience::CircuitState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabStatus {
    pub circuit_breaker_state: CircuitState,
    /// Percent of failed calls in the breaker window; null while empty.
    pub failure_rate: Option<f32>,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    pub not_permitted_calls: u64,
    pub bulkhead_max_concurrent_calls: usize,
    pub bulkhead_available_slots: usize,
    pub endpoints: BTreeMap<String, EndpointState>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp_ms: u64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<LabStatus> {
    let status = state.pipeline.status();
    let breaker = status.circuit_breaker;

    Json(LabStatus {
        circuit_breaker_state: breaker.state,
        failure_rate: breaker.failure_rate,
        buffered_calls: breaker.buffered_calls,
        failed_calls: breaker.failed_calls,
        not_permitted_calls: breaker.not_permitted_calls,
        bulkhead_max_concurrent_calls: status.bulkhead.max_concurrent_calls,
        bulkhead_available_slots: status.bulkhead.available_slots,
        endpoints: state.downstream.snapshot(),
    })
}

pub async fn reset_lab(State(state): State<AppState>) -> Json<ResetResponse> {
    state.downstream.reset();
    state.pipeline.reset();
    tracing::info!("Lab state reset");

    Json(ResetResponse {
        message: "Lab state reset successfully",
    })
}

pub async fn get_info() -> Json<ServiceInfo> {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    Json(ServiceInfo {
        service: "baseline-to-hardened",
        version: env!("CARGO_PKG_VERSION"),
        timestamp_ms,
    })
}
