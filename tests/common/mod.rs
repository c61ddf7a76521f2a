//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use resilience_lab::config::LabConfig;
use resilience_lab::http::HttpServer;
use resilience_lab::lifecycle::Shutdown;
use tokio::net::TcpListener;

/// A lab server running in the background on an ephemeral port.
pub struct TestLab {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl TestLab {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GET an endpoint with the given mode and scenario.
    pub async fn call(&self, endpoint: &str, mode: &str, scenario: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/api/{}", endpoint)))
            .query(&[("mode", mode), ("scenario", scenario)])
            .send()
            .await
            .expect("lab unreachable")
    }

    pub async fn status(&self) -> serde_json::Value {
        self.client
            .get(self.url("/api/admin/status"))
            .send()
            .await
            .expect("lab unreachable")
            .json()
            .await
            .expect("status body")
    }
}

impl Drop for TestLab {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with fast latencies so tests stay quick. Metrics stay off.
pub fn fast_config() -> LabConfig {
    let mut config = LabConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;
    config.downstream.normal_latency_ms = 5;
    config.downstream.slow_latency_ms = 300;
    config.time_limiter.timeout_ms = 100;
    config.circuit_breaker.wait_duration_in_open_state_ms = 300;
    config
}

/// Bind to an ephemeral port and serve `config` until the lab is dropped.
pub async fn start_lab(config: LabConfig) -> TestLab {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config);

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap();

    TestLab {
        addr,
        shutdown,
        client,
    }
}
