// src/models/agenda.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Horas do dia guardadas como minutos desde a meia-noite, expostas como "HH:MM".
pub mod hhmm {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(text: &str) -> Option<i64> {
        let (h, m) = text.trim().split_once(':')?;
        let h: i64 = h.parse().ok()?;
        let m: i64 = m.parse().ok()?;
        if !(0..24).contains(&h) || !(0..60).contains(&m) {
            // "24:00" aceite como fim do dia
            return (h == 24 && m == 0).then_some(24 * 60);
        }
        Some(h * 60 + m)
    }

    pub fn format(minute: i64) -> String {
        format!("{:02}:{:02}", minute / 60, minute % 60)
    }

    pub fn serialize<S: Serializer>(minute: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*minute))
    }

    pub fn serialize_opt<S: Serializer>(minute: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match minute {
            Some(m) => serializer.serialize_str(&format(*m)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| de::Error::custom(format!("hora inválida '{}', use HH:MM", text)))
    }
}

// --- Estruturas que espelham as Tabelas da DB ---

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvailabilityWindow {
    pub id: i64,
    pub coordinator_id: i64,
    pub day: NaiveDate,
    #[serde(rename = "start", with = "hhmm")]
    pub start_minute: i64,
    #[serde(rename = "end", with = "hhmm")]
    pub end_minute: i64,
    pub slot_minutes: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeSlot {
    pub id: i64,
    pub coordinator_id: i64,
    pub day: NaiveDate,
    #[serde(rename = "start", with = "hhmm")]
    pub start_minute: i64,
    #[serde(rename = "end", with = "hhmm")]
    pub end_minute: i64,
    pub is_booked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Drop,
    Appointment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    ResolvedSuccess,
    ResolvedNotCompleted,
    NoShow,
    AttendedOtherSlot,
    Canceled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::ResolvedSuccess => "RESOLVED_SUCCESS",
            RequestStatus::ResolvedNotCompleted => "RESOLVED_NOT_COMPLETED",
            RequestStatus::NoShow => "NO_SHOW",
            RequestStatus::AttendedOtherSlot => "ATTENDED_OTHER_SLOT",
            RequestStatus::Canceled => "CANCELED",
        }
    }

    /// Resoluções que o coordenador pode aplicar a um pedido pendente.
    pub fn coordinator_can_resolve(self, to: RequestStatus, kind: RequestKind) -> bool {
        if self != RequestStatus::Pending {
            return false;
        }
        match to {
            RequestStatus::ResolvedSuccess | RequestStatus::ResolvedNotCompleted => true,
            RequestStatus::NoShow | RequestStatus::AttendedOtherSlot => kind == RequestKind::Appointment,
            RequestStatus::Pending | RequestStatus::Canceled => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Done,
    NoShow,
    Canceled,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Request {
    pub id: i64,
    pub student_id: i64,
    pub program_id: i64,
    pub period_id: i64,
    pub kind: RequestKind,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub coordinator_comment: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub request_id: i64,
    pub student_id: i64,
    pub program_id: i64,
    pub coordinator_id: i64,
    // NULL quando o slot de uma marcação cancelada foi apagado depois
    pub slot_id: Option<i64>,
    pub status: AppointmentStatus,
}

/// Linha de listagem: pedido + aluno + (se houver) marcação e slot.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RequestView {
    pub id: i64,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub description: Option<String>,
    pub coordinator_comment: Option<String>,
    pub student_id: i64,
    pub student_name: String,
    pub student_username: String,
    pub program_id: i64,
    pub period_id: i64,
    pub created_at: NaiveDateTime,
    pub appointment_id: Option<i64>,
    pub appointment_status: Option<AppointmentStatus>,
    pub coordinator_id: Option<i64>,
    pub day: Option<NaiveDate>,
    #[serde(rename = "start", serialize_with = "hhmm::serialize_opt")]
    pub start_minute: Option<i64>,
    #[serde(rename = "end", serialize_with = "hhmm::serialize_opt")]
    pub end_minute: Option<i64>,
}

/// Marcação do dia vista pelo serviço social.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AppointmentView {
    pub id: i64,
    pub request_id: i64,
    pub status: AppointmentStatus,
    pub student_name: String,
    pub student_username: String,
    pub program_id: i64,
    pub coordinator_id: i64,
    pub day: NaiveDate,
    #[serde(rename = "start", with = "hhmm")]
    pub start_minute: i64,
    #[serde(rename = "end", with = "hhmm")]
    pub end_minute: i64,
}

/// Resultado de uma remoção de intervalo.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RangeDeletion {
    pub deleted_slots: u64,
    pub removed_windows: u64,
    pub created_windows: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowWithSlots {
    pub window: AvailabilityWindow,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DayDashboard {
    pub day: Option<NaiveDate>,
    pub total: i64,
    pub pending: i64,
    pub resolved_success: i64,
    pub resolved_not_completed: i64,
    pub no_show: i64,
    pub attended_other_slot: i64,
    pub canceled: i64,
}

// --- Payloads da API ---

#[derive(Debug, Deserialize)]
pub struct CreateWindowPayload {
    pub day: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: i64,
    #[serde(with = "hhmm")]
    pub end: i64,
    pub slot_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRangePayload {
    pub day: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: i64,
    #[serde(with = "hhmm")]
    pub end: i64,
}

/// Configuração de vários dias de uma vez (admin em nome de um coordenador).
#[derive(Debug, Deserialize)]
pub struct BulkWindowsPayload {
    pub days: Vec<NaiveDate>,
    #[serde(with = "hhmm")]
    pub start: i64,
    #[serde(with = "hhmm")]
    pub end: i64,
    pub slot_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkDayOutcome {
    pub day: NaiveDate,
    pub ok: bool,
    pub slots_created: usize,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestPayload {
    pub kind: RequestKind,
    pub description: Option<String>,
    pub slot_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequestStatusPayload {
    pub status: RequestStatus,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestFilters {
    pub status: Option<RequestStatus>,
    pub kind: Option<RequestKind>,
    pub day: Option<NaiveDate>,
    pub period_id: Option<i64>,
}
