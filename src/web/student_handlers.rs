// src/web/student_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        agenda::{CreateRequestPayload, DayQuery, RequestView, TimeSlot},
        notification::Room,
        period::ActivePeriodView,
        user::CurrentUser,
    },
    services::{period_service, request_service},
    state::AppState,
};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

async fn notify_slot(state: &AppState, event: &str, slot: &TimeSlot) {
    state
        .hub
        .emit_many(
            &[Room::Day(slot.day), Room::Coordinator(slot.coordinator_id)],
            event,
            json!({ "slot_id": slot.id, "coordinator_id": slot.coordinator_id, "day": slot.day }),
        )
        .await;
}

// GET /api/agendatec/periods/active (qualquer utilizador autenticado)
pub async fn active_period(State(state): State<AppState>) -> AppResult<Json<ActivePeriodView>> {
    period_service::active_period_view(&state.db_pool)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Período ativo"))
}

// GET /api/agendatec/student/slots?day=
pub async fn free_slots(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<DayQuery>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    let day = query.day.ok_or_else(|| AppError::bad_request("Indique o dia (?day=YYYY-MM-DD)."))?;
    Ok(Json(request_service::free_slots_for_student(&state.db_pool, user.id, day).await?))
}

// GET /api/agendatec/student/requests
pub async fn my_requests(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<RequestView>>> {
    Ok(Json(request_service::list_student_requests(&state.db_pool, user.id).await?))
}

// POST /api/agendatec/student/requests
pub async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateRequestPayload>,
) -> AppResult<(StatusCode, Json<request_service::CreatedRequest>)> {
    let created = request_service::create_request(&state.db_pool, user.id, &payload).await?;
    if let Some(slot) = &created.slot {
        notify_slot(&state, "slot_booked", slot).await;
    }
    Ok((StatusCode::CREATED, Json(created)))
}

// POST /api/agendatec/student/requests/{id}/cancel
pub async fn cancel_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<i64>,
) -> AppResult<Json<request_service::CanceledRequest>> {
    let canceled = request_service::cancel_request(&state.db_pool, user.id, request_id).await?;
    if let Some(slot) = &canceled.released_slot {
        notify_slot(&state, "slot_released", slot).await;
    }
    Ok(Json(canceled))
}
