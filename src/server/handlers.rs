use std::sync::Arc;

use axum::{extract::FromRef, extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::server::auth::AuthState;
use crate::server::database::Database;
use crate::server::logging::HealthResponse;

/// Shared application state for handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Response for deletes on any resource.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Liveness and database connectivity probe.
///
/// `GET /health`
///
/// Answers 200 when the database responds and 503 otherwise.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = HealthResponse::from_probe(state.db.ping().await);

    let status = if health.database.connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(health))
}
