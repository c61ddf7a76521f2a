//! Failure scenarios understood by the simulated downstream.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Short latency, always succeeds.
    #[default]
    Normal,
    /// Long latency, always succeeds. Trips the time limiter.
    Slow,
    /// Short latency, fails at random.
    Fail,
    /// Short latency, deterministic failure episode driven by a per-endpoint counter.
    FailWindow,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scenario '{0}'")]
pub struct UnknownScenario(pub String);

impl Scenario {
    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Normal => "normal",
            Scenario::Slow => "slow",
            Scenario::Fail => "fail",
            Scenario::FailWindow => "fail-window",
        }
    }

    /// Parse a scenario, treating anything unrecognised as `normal`.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|e: UnknownScenario| {
            tracing::debug!(error = %e, "Falling back to normal scenario");
            Scenario::Normal
        })
    }
}

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Scenario::Normal),
            "slow" => Ok(Scenario::Slow),
            "fail" => Ok(Scenario::Fail),
            "fail-window" => Ok(Scenario::FailWindow),
            _ => Err(UnknownScenario(s.to_string())),
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
