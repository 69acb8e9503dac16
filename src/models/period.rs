// src/models/period.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodStatus {
    Active,
    Inactive,
    Archived,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AcademicPeriod {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
}

impl AcademicPeriod {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

/// Configuração do AgendaTec para um período.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PeriodConfig {
    #[serde(default)]
    pub period_id: i64,
    pub student_admission_start: NaiveDateTime,
    pub student_admission_deadline: NaiveDateTime,
    pub max_cancellations_per_student: i64,
    pub allow_drop_requests: bool,
    pub allow_appointment_requests: bool,
}

impl PeriodConfig {
    pub fn admission_open(&self, now: NaiveDateTime) -> bool {
        self.student_admission_start <= now && now <= self.student_admission_deadline
    }
}

/// Período ativo com tudo o que um aluno precisa saber.
#[derive(Debug, Clone, Serialize)]
pub struct ActivePeriodView {
    pub period: AcademicPeriod,
    pub config: Option<PeriodConfig>,
    pub enabled_days: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePeriodPayload {
    pub code: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePeriodPayload {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<PeriodStatus>,
}

#[derive(Debug, Deserialize)]
pub struct EnabledDaysPayload {
    pub days: Vec<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_window_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 8, 5).unwrap().and_hms_opt(18, 0, 0).unwrap();
        let cfg = PeriodConfig {
            period_id: 1,
            student_admission_start: start,
            student_admission_deadline: end,
            max_cancellations_per_student: 2,
            allow_drop_requests: true,
            allow_appointment_requests: true,
        };
        assert!(cfg.admission_open(start));
        assert!(cfg.admission_open(end));
        assert!(!cfg.admission_open(end + chrono::Duration::seconds(1)));
    }
}
