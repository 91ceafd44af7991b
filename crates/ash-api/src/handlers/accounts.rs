use axum::extract::State;

use ash_core::services::Registration;

use crate::auth::AuthUser;
use crate::dto::{ApiResponse, LoginRequest, SessionResponse};
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Registration>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    let (user, token) = state.accounts.register(body).await?;
    Ok(ApiResponse::created(
        "account created",
        SessionResponse::new(user, token),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    let (user, token) = state.accounts.login(&body.email, &body.password).await?;
    tracing::info!(user_id = %user.id, "login succeeded");
    Ok(ApiResponse::ok("logged in", SessionResponse::new(user, token)))
}

pub async fn me(
    AuthUser(author): AuthUser,
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<ash_core::models::User>> {
    let user = state.accounts.get_user(author.user_id).await?;
    Ok(ApiResponse::ok("current user", user))
}
