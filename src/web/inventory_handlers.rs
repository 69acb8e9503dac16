// src/web/inventory_handlers.rs
use crate::{
    error::AppResult,
    models::{
        inventory::{
            AssignItemPayload, CreateItemPayload, HistoryEntry, InventoryItem, InventoryStats, ItemFilters,
            ItemStatusPayload, UpdateItemPayload,
        },
        user::CurrentUser,
    },
    services::inventory_service,
    state::AppState,
};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

pub async fn create_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateItemPayload>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    let item = inventory_service::create_item(&state.db_pool, user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(filters): Query<ItemFilters>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    Ok(Json(inventory_service::list_items(&state.db_pool, &filters).await?))
}

pub async fn get_item(State(state): State<AppState>, Path(item_id): Path<i64>) -> AppResult<Json<InventoryItem>> {
    Ok(Json(inventory_service::get_item(&state.db_pool, item_id).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
    Json(payload): Json<UpdateItemPayload>,
) -> AppResult<Json<InventoryItem>> {
    Ok(Json(inventory_service::update_item(&state.db_pool, user.id, item_id, &payload).await?))
}

pub async fn assign_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
    Json(payload): Json<AssignItemPayload>,
) -> AppResult<Json<InventoryItem>> {
    Ok(Json(
        inventory_service::assign_item(&state.db_pool, user.id, item_id, payload.user_id).await?,
    ))
}

pub async fn unassign_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<InventoryItem>> {
    Ok(Json(inventory_service::unassign_item(&state.db_pool, user.id, item_id).await?))
}

pub async fn change_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(item_id): Path<i64>,
    Json(payload): Json<ItemStatusPayload>,
) -> AppResult<Json<InventoryItem>> {
    Ok(Json(
        inventory_service::change_status(&state.db_pool, user.id, item_id, payload.status, payload.notes.as_deref())
            .await?,
    ))
}

pub async fn item_history(State(state): State<AppState>, Path(item_id): Path<i64>) -> AppResult<Json<Vec<HistoryEntry>>> {
    Ok(Json(inventory_service::item_history(&state.db_pool, item_id).await?))
}

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<InventoryStats>> {
    Ok(Json(inventory_service::inventory_stats(&state.db_pool).await?))
}
