use axum::extract::State;

use ash_core::models::{AnalyticsEvent, EventCount};

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::dto::{ApiResponse, EventRequest, SummaryQuery};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

pub async fn record_event(
    MaybeAuthUser(author): MaybeAuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EventRequest>,
) -> ApiResult<ApiResponse<AnalyticsEvent>> {
    let event = state
        .analytics
        .record(&body.name, body.item_id, author.map(|a| a.user_id))
        .await?;
    Ok(ApiResponse::created("event recorded", event))
}

pub async fn summary(
    AuthUser(_author): AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<ApiResponse<Vec<EventCount>>> {
    let counts = state.analytics.summary(query.since_hours).await?;
    Ok(ApiResponse::ok("event counts", counts))
}
