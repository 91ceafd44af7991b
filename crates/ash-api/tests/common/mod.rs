#![allow(dead_code)]

use std::sync::Arc;

use ash_api::{router, AppState};
use ash_auth_simple::SimpleAuthProvider;
use ash_core::services::{
    AccountService, AnalyticsService, RateLimitPolicy, RateLimitService, ReviewService,
};
use ash_db_memory::MemoryStore;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret-integration-test";

pub fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let auth = Arc::new(SimpleAuthProvider::new(SECRET, 1));
    let limits = RateLimitService::new(store.clone(), RateLimitPolicy::default());

    router(AppState {
        accounts: AccountService::new(store.clone(), auth.clone()),
        reviews: ReviewService::new(store.clone(), limits),
        analytics: AnalyticsService::new(store),
        auth,
    })
}

pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = send_raw(app, method, uri, token, body).await;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Registers an account and returns its bearer token.
pub async fn register(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "email": format!("{name}@example.com"),
            "password": "correct horse battery",
            "display_name": name,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Creates an item and returns its id.
pub async fn create_item(app: &Router, token: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/items",
        Some(token),
        Some(json!({ "name": name, "brand": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}
