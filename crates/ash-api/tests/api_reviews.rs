mod common;

use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::{app, create_item, register, send, send_raw};

#[tokio::test]
async fn items_can_be_created_listed_and_fetched() {
    let app = app();
    let token = register(&app, "maker").await;
    let id = create_item(&app, &token, "Red Label").await;

    let (status, body) = send(&app, Method::GET, &format!("/api/items/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Red Label");
    assert_eq!(body["data"]["rating"], 0.0);

    let (status, body) = send(&app, Method::GET, "/api/items?limit=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/api/items?limit=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn creating_items_requires_auth() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/items",
        None,
        Some(json!({ "name": "Anonymous" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_and_malformed_item_ids() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/items/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let missing = uuid::Uuid::now_v7();
    let (status, body) = send(&app, Method::GET, &format!("/api/items/{missing}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn review_cooldowns_are_enforced() {
    let app = app();
    let token = register(&app, "critic").await;
    let first = create_item(&app, &token, "First").await;
    let second = create_item(&app, &token, "Second").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/items/{first}/reviews"),
        Some(&token),
        Some(json!({ "content": "Smooth draw", "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["item_rating"]["rating"], 4.0);
    assert_eq!(body["data"]["item_rating"]["total_reviews"], 1);

    // Same item again: permanent, so no Retry-After.
    let response = send_raw(
        &app,
        Method::POST,
        &format!("/api/items/{first}/reviews"),
        Some(&token),
        Some(json!({ "content": "Still smooth", "rating": 5 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(!response.headers().contains_key(header::RETRY_AFTER));

    // Another item inside the 48h window.
    let response = send_raw(
        &app,
        Method::POST,
        &format!("/api/items/{second}/reviews"),
        Some(&token),
        Some(json!({ "content": "Harsh", "rating": 2 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry > 47 * 3600 && retry <= 48 * 3600);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/rate-limit/status?item_id={first}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["already_reviewed"], true);
    assert_eq!(body["data"]["can_post"], false);
    assert_eq!(body["data"]["can_comment"], true);
}

#[tokio::test]
async fn rejects_out_of_range_ratings() {
    let app = app();
    let token = register(&app, "strict").await;
    let item = create_item(&app, &token, "Bounds").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/items/{item}/reviews"),
        Some(&token),
        Some(json!({ "content": "Too good", "rating": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn comments_feed_the_aggregate_and_are_throttled() {
    let app = app();
    let author = register(&app, "poster").await;
    let replier = register(&app, "replier").await;
    let item = create_item(&app, &author, "Blend").await;

    let (_, body) = send(
        &app,
        Method::POST,
        &format!("/api/items/{item}/reviews"),
        Some(&author),
        Some(json!({ "content": "Great", "rating": 4 })),
    )
    .await;
    let post = body["data"]["post"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/items/{item}/reviews/{post}/comments"),
        Some(&replier),
        Some(json!({ "content": "Too strong for me", "rating": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["first_comment"], true);
    assert_eq!(body["data"]["item_rating"]["rating"], 3.0);
    assert_eq!(body["data"]["item_rating"]["total_reviews"], 2);
    let comment = body["data"]["comment"]["id"].as_str().unwrap().to_string();

    let response = send_raw(
        &app,
        Method::POST,
        &format!("/api/items/{item}/reviews/{post}/comments"),
        Some(&replier),
        Some(json!({ "content": "One more thing", "parent_id": comment })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // The review author has not commented yet, so a reply is allowed.
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/items/{item}/reviews/{post}/comments"),
        Some(&author),
        Some(json!({ "content": "Fair enough", "parent_id": comment })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["comment"]["rating"], 0.0);
    assert_eq!(body["data"]["item_rating"]["rating"], 3.0);
}

#[tokio::test]
async fn only_authors_can_delete() {
    let app = app();
    let owner = register(&app, "owner").await;
    let other = register(&app, "other").await;
    let item = create_item(&app, &owner, "Mine").await;

    let (_, body) = send(
        &app,
        Method::POST,
        &format!("/api/items/{item}/reviews"),
        Some(&owner),
        Some(json!({ "content": "Mine to keep", "rating": 3 })),
    )
    .await;
    let post = body["data"]["post"]["id"].as_str().unwrap().to_string();
    let path = format!("/api/items/{item}/reviews/{post}");

    let (status, body) = send(&app, Method::DELETE, &path, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = send(&app, Method::DELETE, &path, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_reviews"], 0);

    // Deleting does not reopen the item for another review.
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/items/{item}/reviews"),
        Some(&owner),
        Some(json!({ "content": "Second try", "rating": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn votes_toggle_per_user() {
    let app = app();
    let author = register(&app, "writer").await;
    let fan = register(&app, "fan").await;
    let item = create_item(&app, &author, "Voted").await;

    let (_, body) = send(
        &app,
        Method::POST,
        &format!("/api/items/{item}/reviews"),
        Some(&author),
        Some(json!({ "content": "Vote on me", "rating": 5 })),
    )
    .await;
    let post = body["data"]["post"]["id"].as_str().unwrap().to_string();
    let vote = format!("/api/items/{item}/reviews/{post}/vote");

    let (status, body) = send(&app, Method::POST, &vote, Some(&fan), Some(json!({ "direction": "up" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 1);

    let (_, body) = send(&app, Method::POST, &vote, Some(&author), Some(json!({ "direction": "down" }))).await;
    assert_eq!(body["data"]["score"], 0);
    assert_eq!(body["data"]["up"], 1);
    assert_eq!(body["data"]["down"], 1);

    let (_, body) = send(&app, Method::POST, &vote, Some(&fan), Some(json!({ "direction": "clear" }))).await;
    assert_eq!(body["data"]["score"], -1);

    let (status, _) = send(&app, Method::POST, &vote, Some(&fan), Some(json!({ "direction": "sideways" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
