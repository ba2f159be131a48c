//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use stockroom::config::AuthConfig;
use stockroom::server::auth::AuthState;
use stockroom::server::database::Database;
use stockroom::server::handlers::AppState;
use stockroom::server::routes::build_router;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        jwt_issuer: "stockroom".to_string(),
        jwt_audience: "stockroom-api".to_string(),
        token_expiration_secs: 3600,
    }
}

/// Fresh app state backed by a private in-memory database.
pub async fn setup_test_app() -> AppState {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");
    db.migrate().await.expect("failed to create tables");

    AppState {
        db,
        auth: AuthState::from_config(&test_auth_config()).expect("failed to build auth state"),
    }
}

/// Build the router for `state`.
pub fn app(state: &AppState) -> Router {
    build_router(state.clone())
}

/// A token for `subject` signed with the test secret.
pub fn token_for(state: &AppState, subject: &str) -> String {
    state
        .auth
        .validator
        .create_token(subject)
        .expect("failed to create token")
}

/// Send a JSON request and return the status and parsed body.
///
/// A body that is not JSON comes back as `{}`.
pub async fn json_request(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body_bytes = body
        .map(|v| serde_json::to_vec(&v).unwrap())
        .unwrap_or_default();

    send(app, method, uri, token, Body::from(body_bytes)).await
}

/// Send a raw body with a JSON content type.
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Body,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = builder.body(body).unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

/// Create a product through the API and return its id.
pub async fn create_product(state: &AppState, token: &str, name: &str, price: f64) -> i64 {
    let (status, body) = json_request(
        app(state),
        "POST",
        "/api/products",
        Some(token),
        Some(json!({ "name": name, "price": price })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
    body["product"]["id"].as_i64().unwrap()
}
