//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, CORS, correlation ID)
//! - Bind server to listener
//! - Stop gracefully on the shutdown broadcast

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::admin_router;
use crate::config::LabConfig;
use crate::downstream::SimulatedDownstream;
use crate::http::profile::{profile_handler, search_handler};
use crate::http::request::correlation_id_middleware;
use crate::resilience::ResilientPipeline;

/// Name of the pipeline guarding the simulated downstream.
pub const PIPELINE_NAME: &str = "downstream";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResilientPipeline>,
    pub downstream: Arc<SimulatedDownstream>,
}

impl AppState {
    pub fn from_config(config: &LabConfig) -> Self {
        Self {
            pipeline: Arc::new(ResilientPipeline::from_config(PIPELINE_NAME, config)),
            downstream: Arc::new(SimulatedDownstream::new(config.downstream.clone())),
        }
    }
}

/// HTTP server for the lab.
pub struct HttpServer {
    router: Router,
    config: LabConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: LabConfig) -> Self {
        let state = AppState::from_config(&config);
        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &LabConfig, state: AppState) -> Router {
        let cors = if config.server.cors_enabled {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        };

        Router::new()
            .route("/api/profile", get(profile_handler))
            .route("/api/search", get(search_handler))
            .merge(admin_router())
            .with_state(state)
            .layer(middleware::from_fn(correlation_id_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Router with state attached, for serving or in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }


    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_concurrent_calls = self.config.bulkhead.max_concurrent_calls,
            timeout_ms = self.config.time_limiter.timeout_ms,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
