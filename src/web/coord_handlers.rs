// src/web/coord_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        agenda::{
            AppointmentView, AvailabilityWindow, CreateWindowPayload, DayDashboard, DayQuery, DeleteRangePayload,
            RangeDeletion, Request, RequestFilters, RequestView, TimeSlot, UpdateRequestStatusPayload,
            WindowWithSlots,
        },
        notification::Room,
        user::CurrentUser,
    },
    services::{request_service, slot_service},
    state::AppState,
};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

async fn notify_windows_changed(state: &AppState, coordinator_id: i64, day: NaiveDate) {
    state
        .hub
        .emit_many(
            &[Room::Day(day), Room::Coordinator(coordinator_id)],
            "windows_changed",
            json!({ "coordinator_id": coordinator_id, "day": day }),
        )
        .await;
}

// --- Janelas e slots ---

// GET /api/agendatec/coord/windows?day=
pub async fn list_windows(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<DayQuery>,
) -> AppResult<Json<Vec<AvailabilityWindow>>> {
    Ok(Json(slot_service::list_windows(&state.db_pool, user.id, query.day).await?))
}

// POST /api/agendatec/coord/windows
pub async fn create_window(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateWindowPayload>,
) -> AppResult<(StatusCode, Json<WindowWithSlots>)> {
    let slot_minutes = payload.slot_minutes.unwrap_or(state.default_slot_minutes);
    let created = slot_service::create_window(
        &state.db_pool,
        user.id,
        payload.day,
        payload.start,
        payload.end,
        slot_minutes,
    )
    .await?;

    notify_windows_changed(&state, user.id, payload.day).await;
    Ok((StatusCode::CREATED, Json(created)))
}

// DELETE /api/agendatec/coord/windows/{id}
pub async fn delete_window(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(window_id): Path<i64>,
) -> AppResult<Json<RangeDeletion>> {
    let (day, deletion) = slot_service::delete_window(&state.db_pool, user.id, window_id).await?;
    notify_windows_changed(&state, user.id, day).await;
    Ok(Json(deletion))
}

// POST /api/agendatec/coord/windows/delete-range
pub async fn delete_range(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<DeleteRangePayload>,
) -> AppResult<Json<RangeDeletion>> {
    let deletion =
        slot_service::delete_range(&state.db_pool, user.id, payload.day, payload.start, payload.end).await?;
    if deletion != RangeDeletion::default() {
        notify_windows_changed(&state, user.id, payload.day).await;
    }
    Ok(Json(deletion))
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub day: Option<NaiveDate>,
    #[serde(default)]
    pub only_free: bool,
}

// GET /api/agendatec/coord/slots?day=&only_free=
pub async fn list_slots(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    let day = query.day.ok_or_else(|| AppError::bad_request("Indique o dia (?day=YYYY-MM-DD)."))?;
    Ok(Json(
        slot_service::list_slots(&state.db_pool, &[user.id], day, query.only_free).await?,
    ))
}

// --- Pedidos ---

// GET /api/agendatec/coord/requests
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(filters): Query<RequestFilters>,
) -> AppResult<Json<Vec<RequestView>>> {
    Ok(Json(
        request_service::list_coordinator_requests(&state.db_pool, user.id, &filters).await?,
    ))
}

// PATCH /api/agendatec/coord/requests/{id}
pub async fn update_request_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(request_id): Path<i64>,
    Json(payload): Json<UpdateRequestStatusPayload>,
) -> AppResult<Json<Request>> {
    let (request, appointment) =
        request_service::update_request_status(&state.db_pool, user.id, user.is_admin(), request_id, &payload).await?;

    let coordinator_id = appointment.as_ref().map_or(user.id, |a| a.coordinator_id);
    state
        .hub
        .emit(
            &Room::Coordinator(coordinator_id),
            "request_status_changed",
            json!({ "request_id": request.id, "status": request.status }),
        )
        .await;
    Ok(Json(request))
}

// GET /api/agendatec/coord/dashboard?day=
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<DayQuery>,
) -> AppResult<Json<DayDashboard>> {
    Ok(Json(request_service::day_dashboard(&state.db_pool, user.id, query.day).await?))
}

// --- Serviço social ---

#[derive(Debug, Deserialize)]
pub struct SocialQuery {
    pub day: NaiveDate,
    pub program_id: Option<i64>,
}

// GET /api/agendatec/social/appointments?day=&program_id=
pub async fn social_appointments(
    State(state): State<AppState>,
    Query(query): Query<SocialQuery>,
) -> AppResult<Json<Vec<AppointmentView>>> {
    Ok(Json(
        request_service::list_day_appointments(&state.db_pool, query.day, query.program_id).await?,
    ))
}
