//! Reviews, comments, votes and deletion. All of these require a bearer token.

use axum::extract::State;
use uuid::Uuid;

use ash_core::services::{
    CommentOutcome, NewComment, NewReview, RatingSummary, ReviewOutcome, VoteOutcome,
};

use crate::auth::AuthUser;
use crate::dto::{ApiResponse, VoteRequest};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub async fn add_review(
    AuthUser(author): AuthUser,
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<NewReview>,
) -> ApiResult<ApiResponse<ReviewOutcome>> {
    let outcome = state.reviews.add_review(&author, item_id, body).await?;
    Ok(ApiResponse::created("review added", outcome))
}

pub async fn delete_review(
    AuthUser(author): AuthUser,
    State(state): State<AppState>,
    ApiPath((item_id, post_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<ApiResponse<RatingSummary>> {
    let summary = state
        .reviews
        .delete_post(author.user_id, item_id, post_id)
        .await?;
    Ok(ApiResponse::ok("review deleted", summary))
}

pub async fn vote_review(
    AuthUser(author): AuthUser,
    State(state): State<AppState>,
    ApiPath((item_id, post_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(body): ApiJson<VoteRequest>,
) -> ApiResult<ApiResponse<VoteOutcome>> {
    let outcome = state
        .reviews
        .vote_post(author.user_id, item_id, post_id, body.direction)
        .await?;
    Ok(ApiResponse::ok("vote recorded", outcome))
}

pub async fn add_comment(
    AuthUser(author): AuthUser,
    State(state): State<AppState>,
    ApiPath((item_id, post_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(body): ApiJson<NewComment>,
) -> ApiResult<ApiResponse<CommentOutcome>> {
    let outcome = state
        .reviews
        .add_comment(&author, item_id, post_id, body)
        .await?;
    Ok(ApiResponse::created("comment added", outcome))
}

pub async fn delete_comment(
    AuthUser(author): AuthUser,
    State(state): State<AppState>,
    ApiPath((item_id, post_id, comment_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<ApiResponse<RatingSummary>> {
    let summary = state
        .reviews
        .delete_comment(author.user_id, item_id, post_id, comment_id)
        .await?;
    Ok(ApiResponse::ok("comment deleted", summary))
}

pub async fn vote_comment(
    AuthUser(author): AuthUser,
    State(state): State<AppState>,
    ApiPath((item_id, post_id, comment_id)): ApiPath<(Uuid, Uuid, Uuid)>,
    ApiJson(body): ApiJson<VoteRequest>,
) -> ApiResult<ApiResponse<VoteOutcome>> {
    let outcome = state
        .reviews
        .vote_comment(author.user_id, item_id, post_id, comment_id, body.direction)
        .await?;
    Ok(ApiResponse::ok("vote recorded", outcome))
}
