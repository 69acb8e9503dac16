// src/web/ticket_handlers.rs
use crate::{
    error::AppResult,
    models::{
        helpdesk::{
            Area, AssignTicketPayload, Category, CommentPayload, CreateTicketPayload, RateTicketPayload,
            ResolveTicketPayload, Ticket, TicketComment, TicketDetail, TicketFilters, TicketStats,
        },
        notification::Room,
        user::CurrentUser,
    },
    services::{catalog_service, ticket_service},
    state::AppState,
};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;

/// Avisa o requerente e o técnico atribuído (e o anterior, se mudou).
async fn notify_ticket(state: &AppState, ticket: &Ticket, previous_tech: Option<i64>) {
    let mut rooms = vec![Room::Requester(ticket.requester_id)];
    rooms.extend(ticket.assigned_to_id.map(Room::Tech));
    rooms.extend(previous_tech.map(Room::Tech));

    state
        .hub
        .emit_many(
            &rooms,
            "ticket_updated",
            json!({
                "ticket_id": ticket.id,
                "ticket_number": ticket.ticket_number,
                "status": ticket.status,
                "assigned_to_id": ticket.assigned_to_id,
            }),
        )
        .await;
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub area: Option<Area>,
}

// GET /api/help-desk/categories?area=
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(catalog_service::list_categories(&state.db_pool, query.area).await?))
}

// POST /api/help-desk/tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateTicketPayload>,
) -> AppResult<(StatusCode, Json<Ticket>)> {
    let ticket = ticket_service::create_ticket(&state.db_pool, &user, &payload).await?;
    notify_ticket(&state, &ticket, None).await;
    Ok((StatusCode::CREATED, Json(ticket)))
}

// GET /api/help-desk/tickets
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(filters): Query<TicketFilters>,
) -> AppResult<Json<Vec<Ticket>>> {
    Ok(Json(ticket_service::list_tickets(&state.db_pool, &user, &filters).await?))
}

// GET /api/help-desk/tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
) -> AppResult<Json<TicketDetail>> {
    Ok(Json(ticket_service::get_ticket_detail(&state.db_pool, &user, ticket_id).await?))
}

// POST /api/help-desk/tickets/{id}/assign (helpdesk_admin)
pub async fn assign_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
    Json(payload): Json<AssignTicketPayload>,
) -> AppResult<Json<Ticket>> {
    let (ticket, previous) = ticket_service::assign_ticket(&state.db_pool, &user, ticket_id, &payload).await?;
    notify_ticket(&state, &ticket, previous).await;
    Ok(Json(ticket))
}

// POST /api/help-desk/tickets/{id}/start
pub async fn start_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
) -> AppResult<Json<Ticket>> {
    let ticket = ticket_service::start_ticket(&state.db_pool, &user, ticket_id).await?;
    notify_ticket(&state, &ticket, None).await;
    Ok(Json(ticket))
}

// POST /api/help-desk/tickets/{id}/resolve
pub async fn resolve_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
    Json(payload): Json<ResolveTicketPayload>,
) -> AppResult<Json<Ticket>> {
    let ticket = ticket_service::resolve_ticket(&state.db_pool, &user, ticket_id, &payload).await?;
    notify_ticket(&state, &ticket, None).await;
    Ok(Json(ticket))
}

// POST /api/help-desk/tickets/{id}/cancel
pub async fn cancel_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
) -> AppResult<Json<Ticket>> {
    let ticket = ticket_service::cancel_ticket(&state.db_pool, &user, ticket_id).await?;
    notify_ticket(&state, &ticket, None).await;
    Ok(Json(ticket))
}

// POST /api/help-desk/tickets/{id}/rate
pub async fn rate_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
    Json(payload): Json<RateTicketPayload>,
) -> AppResult<Json<Ticket>> {
    let ticket = ticket_service::rate_ticket(&state.db_pool, &user, ticket_id, &payload).await?;
    notify_ticket(&state, &ticket, None).await;
    Ok(Json(ticket))
}

// POST /api/help-desk/tickets/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(ticket_id): Path<i64>,
    Json(payload): Json<CommentPayload>,
) -> AppResult<(StatusCode, Json<TicketComment>)> {
    let (ticket, comment) = ticket_service::add_comment(&state.db_pool, &user, ticket_id, &payload).await?;

    // Comentários internos não chegam à sala do requerente
    let mut rooms: Vec<Room> = ticket.assigned_to_id.map(Room::Tech).into_iter().collect();
    if !comment.is_internal {
        rooms.push(Room::Requester(ticket.requester_id));
    }
    state
        .hub
        .emit_many(
            &rooms,
            "ticket_comment_added",
            json!({ "ticket_id": ticket.id, "comment_id": comment.id, "author_id": comment.author_id }),
        )
        .await;
    Ok((StatusCode::CREATED, Json(comment)))
}

// GET /api/help-desk/stats (helpdesk_admin)
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<TicketStats>> {
    Ok(Json(ticket_service::ticket_stats(&state.db_pool).await?))
}
