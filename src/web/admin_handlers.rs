// src/web/admin_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        agenda::{BulkDayOutcome, BulkWindowsPayload},
        notification::Room,
        period::{AcademicPeriod, CreatePeriodPayload, EnabledDaysPayload, PeriodConfig, UpdatePeriodPayload},
        user::{ChangePasswordPayload, CreateUserPayload, Program, UpdateUserPayload, UserSummary, ROLE_COORDINATOR},
    },
    services::{period_service, slot_service, user_service},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
pub struct AddCoordinatorPayload {
    pub coordinator_id: i64,
}

// --- Utilizadores ---

// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(user_service::find_all_users(&state.db_pool).await?))
}

// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserPayload>,
) -> AppResult<(StatusCode, Json<UserSummary>)> {
    tracing::info!("Admin: criando utilizador '{}' com roles {:?}", payload.username, payload.roles);
    let user_id = user_service::create_user(&state.db_pool, &payload).await?;
    let summary = user_service::get_user_summary(&state.db_pool, user_id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

// PATCH /api/admin/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdateUserPayload>,
) -> AppResult<Json<UserSummary>> {
    user_service::update_user(&state.db_pool, user_id, &payload).await?;
    Ok(Json(user_service::get_user_summary(&state.db_pool, user_id).await?))
}

// POST /api/admin/users/{id}/password
pub async fn change_password(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<ChangePasswordPayload>,
) -> AppResult<StatusCode> {
    user_service::update_user_password(&state.db_pool, user_id, &payload.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Programas ---

// GET /api/admin/programs
pub async fn list_programs(State(state): State<AppState>) -> AppResult<Json<Vec<Program>>> {
    Ok(Json(user_service::list_programs(&state.db_pool).await?))
}

// POST /api/admin/programs/{id}/coordinators
pub async fn add_coordinator(
    State(state): State<AppState>,
    Path(program_id): Path<i64>,
    Json(payload): Json<AddCoordinatorPayload>,
) -> AppResult<StatusCode> {
    user_service::add_program_coordinator(&state.db_pool, program_id, payload.coordinator_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Períodos ---

pub async fn list_periods(State(state): State<AppState>) -> AppResult<Json<Vec<AcademicPeriod>>> {
    Ok(Json(period_service::list_periods(&state.db_pool).await?))
}

pub async fn create_period(
    State(state): State<AppState>,
    Json(payload): Json<CreatePeriodPayload>,
) -> AppResult<(StatusCode, Json<AcademicPeriod>)> {
    let period = period_service::create_period(&state.db_pool, &payload).await?;
    Ok((StatusCode::CREATED, Json(period)))
}

pub async fn update_period(
    State(state): State<AppState>,
    Path(period_id): Path<i64>,
    Json(payload): Json<UpdatePeriodPayload>,
) -> AppResult<Json<AcademicPeriod>> {
    Ok(Json(period_service::update_period(&state.db_pool, period_id, &payload).await?))
}

// POST /api/admin/periods/{id}/activate
pub async fn activate_period(
    State(state): State<AppState>,
    Path(period_id): Path<i64>,
) -> AppResult<Json<AcademicPeriod>> {
    Ok(Json(period_service::activate_period(&state.db_pool, period_id).await?))
}

pub async fn get_period_config(
    State(state): State<AppState>,
    Path(period_id): Path<i64>,
) -> AppResult<Json<PeriodConfig>> {
    // 404 distingue período inexistente de período sem configuração
    period_service::get_period(&state.db_pool, period_id).await?;
    period_service::get_config(&state.db_pool, period_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Configuração do período"))
}

pub async fn put_period_config(
    State(state): State<AppState>,
    Path(period_id): Path<i64>,
    Json(config): Json<PeriodConfig>,
) -> AppResult<Json<PeriodConfig>> {
    Ok(Json(period_service::upsert_config(&state.db_pool, period_id, &config).await?))
}

pub async fn get_enabled_days(
    State(state): State<AppState>,
    Path(period_id): Path<i64>,
) -> AppResult<Json<Vec<NaiveDate>>> {
    period_service::get_period(&state.db_pool, period_id).await?;
    Ok(Json(period_service::list_enabled_days(&state.db_pool, period_id).await?))
}

pub async fn put_enabled_days(
    State(state): State<AppState>,
    Path(period_id): Path<i64>,
    Json(payload): Json<EnabledDaysPayload>,
) -> AppResult<Json<Vec<NaiveDate>>> {
    Ok(Json(period_service::set_enabled_days(&state.db_pool, period_id, &payload.days).await?))
}

// --- Janelas em lote ---

// POST /api/admin/coordinators/{id}/windows
pub async fn bulk_create_windows(
    State(state): State<AppState>,
    Path(coordinator_id): Path<i64>,
    Json(payload): Json<BulkWindowsPayload>,
) -> AppResult<Json<Vec<BulkDayOutcome>>> {
    if !user_service::check_user_role_any(&state.db_pool, coordinator_id, &[ROLE_COORDINATOR]).await? {
        return Err(AppError::bad_request("O utilizador indicado não é coordenador."));
    }
    let slot_minutes = payload.slot_minutes.unwrap_or(state.default_slot_minutes);

    let outcomes = slot_service::bulk_create_windows(
        &state.db_pool,
        coordinator_id,
        &payload.days,
        payload.start,
        payload.end,
        slot_minutes,
    )
    .await;

    for outcome in outcomes.iter().filter(|o| o.ok) {
        state
            .hub
            .emit_many(
                &[Room::Day(outcome.day), Room::Coordinator(coordinator_id)],
                "windows_changed",
                json!({ "coordinator_id": coordinator_id, "day": outcome.day }),
            )
            .await;
    }
    Ok(Json(outcomes))
}
