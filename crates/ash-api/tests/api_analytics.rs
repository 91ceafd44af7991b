mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{app, register, send};

#[tokio::test]
async fn anonymous_events_are_recorded() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/analytics/events",
        None,
        Some(json!({ "name": "landing_view" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "landing_view");
    assert!(body["data"]["user_id"].is_null());
}

#[tokio::test]
async fn invalid_event_names_are_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/analytics/events",
        None,
        Some(json!({ "name": "Landing View" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn summary_requires_auth_and_counts_events() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/api/analytics/summary", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = register(&app, "analyst").await;
    for name in ["item_view", "item_view", "signup_click"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/analytics/events",
            Some(&token),
            Some(json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/analytics/summary?since_hours=1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let counts = body["data"].as_array().unwrap();
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0]["name"], "item_view");
    assert_eq!(counts[0]["count"], 2);
    assert_eq!(counts[1]["name"], "signup_click");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/analytics/summary?since_hours=0",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
