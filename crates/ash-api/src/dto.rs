use ash_core::models::{User, VoteDirection};
use ash_core::traits::IssuedToken;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Success envelope: `{ "message": ..., "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    pub status: StatusCode,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl SessionResponse {
    pub fn new(user: User, token: IssuedToken) -> Self {
        Self {
            user,
            token: token.token,
            expires_at: token.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: VoteDirection,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub item_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub name: String,
    #[serde(default)]
    pub item_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_since_hours")]
    pub since_hours: i64,
}

fn default_since_hours() -> i64 {
    24
}
