use axum::extract::State;
use uuid::Uuid;

use ash_core::models::Item;
use ash_core::services::NewItem;

use crate::auth::AuthUser;
use crate::dto::{ApiResponse, ListQuery};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub async fn list_items(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ApiResponse<Vec<Item>>> {
    let items = state.reviews.list_items(query.limit, query.offset).await?;
    Ok(ApiResponse::ok(format!("{} items", items.len()), items))
}

pub async fn get_item(
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Item>> {
    let item = state.reviews.get_item(item_id).await?;
    Ok(ApiResponse::ok("item", item))
}

pub async fn create_item(
    AuthUser(author): AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewItem>,
) -> ApiResult<ApiResponse<Item>> {
    let item = state.reviews.create_item(body).await?;
    tracing::debug!(item_id = %item.id, user_id = %author.user_id, "item created via api");
    Ok(ApiResponse::created("item created", item))
}
