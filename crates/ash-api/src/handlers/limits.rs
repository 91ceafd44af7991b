use axum::extract::State;

use ash_core::services::RateLimitStatus;

use crate::auth::AuthUser;
use crate::dto::{ApiResponse, StatusQuery};
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

/// What the caller may do right now, and how long to wait otherwise.
pub async fn rate_limit_status(
    AuthUser(author): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> ApiResult<ApiResponse<RateLimitStatus>> {
    let status = state
        .reviews
        .limits()
        .status(author.user_id, query.item_id)
        .await;
    Ok(ApiResponse::ok("rate limit status", status))
}
