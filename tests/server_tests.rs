//! End-to-end test against a live server on a loopback port.

mod common;

use serde_json::{json, Value};
use stockroom::server::routes::build_router;
use tokio::net::TcpListener;

use common::setup_test_app;

/// Spawn the router on an ephemeral port and return its base URL.
async fn spawn_test_server() -> String {
    let state = setup_test_app().await;
    let router = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("no local addr");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("server failed");
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn register_login_and_record_a_sale() {
    let base = spawn_test_server().await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    assert!(health.headers().contains_key("x-request-id"));

    let register = client
        .post(format!("{base}/api/register"))
        .json(&json!({
            "username": "ann",
            "email": "ann@example.com",
            "password": "s3cret-pass"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(register.status(), 201);

    let login: Value = client
        .post(format!("{base}/api/login"))
        .json(&json!({ "email": "ann@example.com", "password": "s3cret-pass" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["access_token"].as_str().unwrap().to_string();

    let product = client
        .post(format!("{base}/api/products"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Widget", "price": 9.99 }))
        .send()
        .await
        .unwrap();
    assert_eq!(product.status(), 201);
    let product: Value = product.json().await.unwrap();
    let product_id = product["product"]["id"].as_i64().unwrap();

    let sale = client
        .post(format!("{base}/api/sales"))
        .bearer_auth(&token)
        .json(&json!({ "product_id": product_id, "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(sale.status(), 201);
    let sale: Value = sale.json().await.unwrap();
    assert_eq!(sale["sale"]["product_name"], "Widget");

    // Without the token the same call is refused.
    let anonymous = client
        .get(format!("{base}/api/sales"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);
}
