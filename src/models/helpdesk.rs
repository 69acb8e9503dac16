// src/models/helpdesk.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Area {
    Desarrollo,
    Soporte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Baja,
    Media,
    Alta,
    Urgente,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Pending,
    Assigned,
    InProgress,
    ResolvedSuccess,
    ResolvedFailed,
    Closed,
    Canceled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "PENDING",
            TicketStatus::Assigned => "ASSIGNED",
            TicketStatus::InProgress => "IN_PROGRESS",
            TicketStatus::ResolvedSuccess => "RESOLVED_SUCCESS",
            TicketStatus::ResolvedFailed => "RESOLVED_FAILED",
            TicketStatus::Closed => "CLOSED",
            TicketStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Closed | TicketStatus::Canceled)
    }

    /// Transições permitidas do ciclo de vida de um ticket.
    pub fn can_transition_to(self, to: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, to),
            (Pending, Assigned)
                | (Assigned, Assigned) // reatribuição
                | (Assigned, InProgress)
                | (InProgress, ResolvedSuccess)
                | (InProgress, ResolvedFailed)
                | (ResolvedSuccess, Closed)
                | (ResolvedFailed, Closed)
                | (Pending, Canceled)
                | (Assigned, Canceled)
        )
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: i64,
    pub area: Area,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Ticket {
    pub id: i64,
    pub ticket_number: String,
    pub requester_id: i64,
    pub area: Area,
    pub category_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub assigned_to_id: Option<i64>,
    pub inventory_item_id: Option<i64>,
    pub resolution_notes: Option<String>,
    pub rating: Option<i64>,
    pub rating_comment: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
    pub closed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TicketComment {
    pub id: i64,
    pub ticket_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub is_internal: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TicketAssignment {
    pub id: i64,
    pub ticket_id: i64,
    pub assigned_by_id: i64,
    pub assigned_to_id: i64,
    pub reason: Option<String>,
    pub assigned_at: NaiveDateTime,
    pub unassigned_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub comments: Vec<TicketComment>,
    pub assignments: Vec<TicketAssignment>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CountByKey {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketStats {
    pub total: i64,
    pub by_status: Vec<CountByKey>,
    pub by_area: Vec<CountByKey>,
}

// --- Payloads da API ---

#[derive(Debug, Deserialize)]
pub struct CreateTicketPayload {
    pub area: Area,
    pub category_id: Option<i64>,
    pub title: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub inventory_item_id: Option<i64>,
}

fn default_priority() -> Priority {
    Priority::Media
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketFilters {
    pub status: Option<TicketStatus>,
    pub area: Option<Area>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<i64>,
    /// Só os tickets que o próprio abriu
    #[serde(default)]
    pub mine: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssignTicketPayload {
    pub assigned_to_id: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveTicketPayload {
    pub success: bool,
    pub resolution_notes: String,
}

#[derive(Debug, Deserialize)]
pub struct RateTicketPayload {
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
}
