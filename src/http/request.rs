//! Request handling: correlation IDs.
//!
//! # Responsibilities
//! - Read the caller's correlation ID, or generate one (UUID v4)
//! - Make it available to handlers and echo it on the response
//!
//! # Design Decisions
//! - Correlation ID attached as early as possible for logging
//! - Empty header values are treated as absent

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header carrying the correlation ID in both directions.
pub const X_CORRELATION_ID: &str = "x-correlation-id";

/// Identifier tying a client call to its log lines and response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Take the ID from `X-Correlation-Id`, generating one if absent or empty.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(X_CORRELATION_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<CorrelationId>() {
            return Ok(id.clone());
        }
        Ok(CorrelationId::from_headers(&parts.headers))
    }
}

/// Resolve the correlation ID once per request and echo it on the response.
pub async fn correlation_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let id = CorrelationId::from_headers(request.headers());
    request.extensions_mut().insert(id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(X_CORRELATION_ID, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_header() {
        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, HeaderValue::from_static("abc-123"));
        assert_eq!(CorrelationId::from_headers(&headers).as_str(), "abc-123");
    }

    #[test]
    fn test_generates_when_missing_or_empty() {
        let generated = CorrelationId::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(generated.as_str()).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(X_CORRELATION_ID, HeaderValue::from_static(""));
        let generated = CorrelationId::from_headers(&headers);
        assert!(Uuid::parse_str(generated.as_str()).is_ok());
    }

    #[test]
    fn test_generated_ids_unique() {
        assert_ne!(CorrelationId::generate(), CorrelationId::generate());
    }
}
