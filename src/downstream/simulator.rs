//! Simulated unreliable dependency.
//!
//! # Responsibilities
//! - Sleep for a scenario-dependent latency
//! - Fail at random (`fail`) or deterministically (`fail-window`)
//! - Keep a per-endpoint fail-window counter and last result
//!
//! # Design Decisions
//! - Failures carry their `SimulationResult`, so callers never need side channels
//! - Counter increments happen under the endpoint's map entry lock: indices are
//!   unique and gap-free across concurrent callers
//! - Only `fail-window` calls advance the counter

use std::collections::BTreeMap;

use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::config::DownstreamConfig;
use crate::downstream::scenario::Scenario;
use crate::observability::metrics;

/// Diagnostic result of one simulated call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub message: String,
    /// Fail-window position of this call (1-based), `fail-window` only.
    pub sequence_index: Option<u64>,
    pub in_fail_window: bool,
}

impl SimulationResult {
    fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sequence_index: None,
            in_fail_window: false,
        }
    }
}

/// A simulated business failure, tagged with the call's diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .result.message)]
pub struct DownstreamFailure {
    pub result: SimulationResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointState {
    /// Number of `fail-window` calls made so far.
    pub fail_window_calls: u64,
    pub last_result: Option<SimulationResult>,
}

#[derive(Debug)]
pub struct SimulatedDownstream {
    config: DownstreamConfig,
    endpoints: DashMap<String, EndpointState>,
}

impl SimulatedDownstream {
    pub fn new(config: DownstreamConfig) -> Self {
        Self {
            config,
            endpoints: DashMap::new(),
        }
    }

    /// Perform one simulated call against `endpoint`.
    pub async fn call(
        &self,
        endpoint: &str,
        scenario: Scenario,
    ) -> Result<SimulationResult, DownstreamFailure> {
        let latency = match scenario {
            Scenario::Slow => self.config.slow_latency(),
            _ => self.config.normal_latency(),
        };
        tokio::time::sleep(latency).await;

        let outcome = match scenario {
            Scenario::Normal | Scenario::Slow => Ok(SimulationResult::plain("Success")),
            Scenario::Fail => {
                let probability = self.config.failure_probability.clamp(0.0, 1.0);
                let failed = rand::thread_rng().gen_bool(probability);
                if failed {
                    Err(DownstreamFailure {
                        result: SimulationResult::plain(format!(
                            "Downstream dependency failed (simulated {}% failure rate)",
                            (probability * 100.0).round()
                        )),
                    })
                } else {
                    Ok(SimulationResult::plain("Success"))
                }
            }
            Scenario::FailWindow => {
                let index = self.next_fail_window_index(endpoint);
                self.fail_window_result(index)
            }
        };

        let recorded = match &outcome {
            Ok(result) => result.clone(),
            Err(failure) => failure.result.clone(),
        };
        self.endpoints
            .entry(endpoint.to_string())
            .or_default()
            .last_result = Some(recorded);

        metrics::record_downstream_call(endpoint, scenario.as_str(), outcome.is_ok());
        tracing::debug!(
            endpoint = %endpoint,
            scenario = %scenario,
            ok = outcome.is_ok(),
            "Simulated downstream call"
        );

        outcome
    }

    fn next_fail_window_index(&self, endpoint: &str) -> u64 {
        let mut state = self.endpoints.entry(endpoint.to_string()).or_default();
        state.fail_window_calls += 1;
        state.fail_window_calls
    }

    fn fail_window_result(&self, index: u64) -> Result<SimulationResult, DownstreamFailure> {
        let start = self.config.fail_window_start;
        let end = self.config.fail_window_end;

        if (start..=end).contains(&index) {
            Err(DownstreamFailure {
                result: SimulationResult {
                    message: format!(
                        "Deterministic fail-window: forced failure ({}–{}).",
                        start, end
                    ),
                    sequence_index: Some(index),
                    in_fail_window: true,
                },
            })
        } else if index < start {
            Ok(SimulationResult {
                message: format!("Fail-window warmup (1–{}): normal.", start - 1),
                sequence_index: Some(index),
                in_fail_window: false,
            })
        } else {
            Ok(SimulationResult {
                message: format!("Fail-window recovery ({}+): normal.", end + 1),
                sequence_index: Some(index),
                in_fail_window: false,
            })
        }
    }

    /// Most recent result recorded for `endpoint`.
    pub fn last_result(&self, endpoint: &str) -> Option<SimulationResult> {
        self.endpoints
            .get(endpoint)
            .and_then(|state| state.last_result.clone())
    }

    pub fn fail_window_calls(&self, endpoint: &str) -> u64 {
        self.endpoints
            .get(endpoint)
            .map(|state| state.fail_window_calls)
            .unwrap_or(0)
    }

    /// State of every endpoint seen since the last reset, sorted by name.
    pub fn snapshot(&self) -> BTreeMap<String, EndpointState> {
        self.endpoints
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Forget all counters and last results.
    pub fn reset(&self) {
        self.endpoints.clear();
        tracing::info!("Simulated downstream reset");
    }
}
