//! Lab administration: breaker status, reset, service info.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/status", get(get_status))
        .route("/api/admin/reset", post(reset_lab))
        .route("/api/info", get(get_info))
}
