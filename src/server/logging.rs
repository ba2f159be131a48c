//! Request logging middleware and audit events for Stockroom.
//!
//! This module provides structured logging for all API requests including:
//! - Unique request ID tracking
//! - Request timing
//! - Method, path, and status logging
//! - Request ID propagation in response headers
//!
//! # Usage
//!
//! ```rust,ignore
//! use stockroom::server::logging::request_logging_middleware;
//!
//! let app = Router::new()
//!     .route("/health", get(health_handler))
//!     .layer(axum::middleware::from_fn(request_logging_middleware));
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument, Level};
use uuid::Uuid;

use crate::config::LoggingConfig;

/// Initialize the global `tracing` subscriber from the logging configuration.
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) {
    let level = if config.enabled {
        config.level.parse::<Level>().unwrap_or(Level::INFO)
    } else {
        Level::WARN
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Record change event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEvent {
    Created,
    Updated,
    Deleted,
}

impl std::fmt::Display for RecordEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecordEvent::Created => "created",
            RecordEvent::Updated => "updated",
            RecordEvent::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}

/// Log a change to a product, sale or purchase for audit purposes.
///
/// # Arguments
///
/// * `event` - What happened to the record
/// * `resource` - Resource kind (`product`, `sale`, `purchase`)
/// * `id` - The record id
/// * `performed_by` - Token subject of the caller
pub fn log_record_event(event: RecordEvent, resource: &str, id: i64, performed_by: &str) {
    let span = info_span!(
        "record_event",
        event = %event,
        resource = %resource,
        id = id,
    );
    let _enter = span.enter();

    info!(performed_by = %performed_by, "Record event occurred");
}

/// Account event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    Registered,
    LoggedIn,
    LoginFailed,
}

impl std::fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuthEvent::Registered => "registered",
            AuthEvent::LoggedIn => "logged_in",
            AuthEvent::LoginFailed => "login_failed",
        };
        write!(f, "{}", s)
    }
}

/// Log an account event. Failed logins are logged at `warn`.
pub fn log_auth_event(event: AuthEvent, subject: &str) {
    let span = info_span!("auth_event", event = %event, subject = %subject);
    let _enter = span.enter();

    match event {
        AuthEvent::LoginFailed => warn!("Authentication event occurred"),
        _ => info!("Authentication event occurred"),
    }
}

/// Header name for the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generate a new unique request ID.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logging middleware that tracks request timing and generates request IDs.
///
/// This middleware:
/// 1. Generates a unique request ID for each incoming request
/// 2. Creates a tracing span with the request ID
/// 3. Logs the request method and path
/// 4. Measures and logs the response time
/// 5. Adds the request ID to the response headers
pub async fn request_logging_middleware(request: Request, next: Next) -> Response<Body> {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();

    let response = async move {
        info!("Started processing request");
        next.run(request).await
    }
    .instrument(span.clone())
    .await;

    let duration = start.elapsed();
    let status = response.status();

    let _enter = span.enter();
    info!(
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    Response::from_parts(parts, body)
}

/// Health check response structure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status ("healthy" or "degraded")
    pub status: String,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Database connectivity status
    pub database: DatabaseHealth,
}

/// Database health status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseHealth {
    /// Whether the database answered a probe query
    pub connected: bool,
}

impl HealthResponse {
    /// Build a health response from the database probe result.
    pub fn from_probe(db_connected: bool) -> Self {
        Self {
            status: if db_connected { "healthy" } else { "degraded" }.to_string(),
            service: "stockroom".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_connected,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_is_valid_uuid() {
        let id = generate_request_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn health_response_healthy() {
        let health = HealthResponse::from_probe(true);
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "stockroom");
        assert!(health.database.connected);
    }

    #[test]
    fn health_response_degraded() {
        let health = HealthResponse::from_probe(false);
        assert_eq!(health.status, "degraded");
        assert!(!health.database.connected);
    }

    #[test]
    fn event_names() {
        assert_eq!(RecordEvent::Deleted.to_string(), "deleted");
        assert_eq!(AuthEvent::LoginFailed.to_string(), "login_failed");
    }
}
