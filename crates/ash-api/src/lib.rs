//! # ash-api
//!
//! The web routing and orchestration layer for Ashtray.

pub mod auth;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::middleware::from_fn;
use axum::routing::{delete, get, post};
use axum::Router;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Configures the routes for the review forum.
///
/// # Developer Note
/// Everything JSON lives under `/api` so the binary can serve a frontend
/// from the root without route clashes.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(handlers::accounts::register))
        .route("/auth/login", post(handlers::accounts::login))
        .route("/auth/me", get(handlers::accounts::me))
        .route(
            "/items",
            get(handlers::items::list_items).post(handlers::items::create_item),
        )
        .route("/items/{item_id}", get(handlers::items::get_item))
        .route("/items/{item_id}/reviews", post(handlers::reviews::add_review))
        .route(
            "/items/{item_id}/reviews/{post_id}",
            delete(handlers::reviews::delete_review),
        )
        .route(
            "/items/{item_id}/reviews/{post_id}/vote",
            post(handlers::reviews::vote_review),
        )
        .route(
            "/items/{item_id}/reviews/{post_id}/comments",
            post(handlers::reviews::add_comment),
        )
        .route(
            "/items/{item_id}/reviews/{post_id}/comments/{comment_id}",
            delete(handlers::reviews::delete_comment),
        )
        .route(
            "/items/{item_id}/reviews/{post_id}/comments/{comment_id}/vote",
            post(handlers::reviews::vote_comment),
        )
        .route("/rate-limit/status", get(handlers::limits::rate_limit_status))
        .route("/analytics/events", post(handlers::analytics::record_event))
        .route("/analytics/summary", get(handlers::analytics::summary));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(from_fn(middleware::security_headers))
        .layer(middleware::cors_policy())
        .layer(middleware::propagate_request_id())
        .layer(middleware::trace_layer())
        .layer(middleware::set_request_id())
        .with_state(state)
}
