// src/services/period_service.rs
use crate::{
    db,
    error::{AppError, AppResult},
    models::period::{
        AcademicPeriod, ActivePeriodView, CreatePeriodPayload, PeriodConfig, PeriodStatus, UpdatePeriodPayload,
    },
};
use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};

const PERIOD_COLUMNS: &str = "id, code, name, start_date, end_date, status";

pub async fn list_periods(db_pool: &SqlitePool) -> AppResult<Vec<AcademicPeriod>> {
    let periods = sqlx::query_as::<_, AcademicPeriod>(&format!(
        "SELECT {} FROM academic_periods ORDER BY start_date DESC",
        PERIOD_COLUMNS
    ))
    .fetch_all(db_pool)
    .await?;
    Ok(periods)
}

pub async fn get_period(db_pool: &SqlitePool, period_id: i64) -> AppResult<AcademicPeriod> {
    let mut conn = db_pool.acquire().await?;
    period_in(&mut *conn, period_id)
        .await?
        .ok_or_else(|| AppError::not_found("Período"))
}

pub async fn period_in(conn: &mut SqliteConnection, period_id: i64) -> AppResult<Option<AcademicPeriod>> {
    let period = sqlx::query_as::<_, AcademicPeriod>(&format!(
        "SELECT {} FROM academic_periods WHERE id = ?",
        PERIOD_COLUMNS
    ))
    .bind(period_id)
    .fetch_optional(conn)
    .await?;
    Ok(period)
}

pub async fn active_period_in(conn: &mut SqliteConnection) -> AppResult<Option<AcademicPeriod>> {
    let period = sqlx::query_as::<_, AcademicPeriod>(&format!(
        "SELECT {} FROM academic_periods WHERE status = 'ACTIVE' LIMIT 1",
        PERIOD_COLUMNS
    ))
    .fetch_optional(conn)
    .await?;
    Ok(period)
}

pub async fn config_in(conn: &mut SqliteConnection, period_id: i64) -> AppResult<Option<PeriodConfig>> {
    let config = sqlx::query_as::<_, PeriodConfig>(
        r#"
        SELECT period_id, student_admission_start, student_admission_deadline,
               max_cancellations_per_student, allow_drop_requests, allow_appointment_requests
        FROM agendatec_period_configs WHERE period_id = ?
        "#,
    )
    .bind(period_id)
    .fetch_optional(conn)
    .await?;
    Ok(config)
}

pub async fn is_day_enabled_in(conn: &mut SqliteConnection, period_id: i64, day: NaiveDate) -> AppResult<bool> {
    let enabled: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM period_enabled_days WHERE period_id = ? AND day = ?)")
            .bind(period_id)
            .bind(day)
            .fetch_one(conn)
            .await?;
    Ok(enabled)
}

/// O dia está habilitado no período ativo? Sem período ativo: não.
pub async fn is_day_enabled_in_active(conn: &mut SqliteConnection, day: NaiveDate) -> AppResult<bool> {
    match active_period_in(&mut *conn).await? {
        Some(period) => is_day_enabled_in(conn, period.id, day).await,
        None => Ok(false),
    }
}

pub async fn create_period(db_pool: &SqlitePool, payload: &CreatePeriodPayload) -> AppResult<AcademicPeriod> {
    if payload.code.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(AppError::bad_request("Código e nome do período são obrigatórios."));
    }
    if payload.end_date < payload.start_date {
        return Err(AppError::bad_request("A data de fim deve ser depois do início."));
    }

    let result = sqlx::query(
        "INSERT INTO academic_periods (code, name, start_date, end_date, status) VALUES (?, ?, ?, ?, 'INACTIVE')",
    )
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .execute(db_pool)
    .await;

    let id = match result {
        Ok(res) => res.last_insert_rowid(),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(AppError::conflict("duplicate_period_code", "Já existe um período com esse código."));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!("Período {} criado (id {}).", payload.code, id);
    get_period(db_pool, id).await
}

pub async fn update_period(
    db_pool: &SqlitePool,
    period_id: i64,
    payload: &UpdatePeriodPayload,
) -> AppResult<AcademicPeriod> {
    let current = get_period(db_pool, period_id).await?;

    let start_date = payload.start_date.unwrap_or(current.start_date);
    let end_date = payload.end_date.unwrap_or(current.end_date);
    if end_date < start_date {
        return Err(AppError::bad_request("A data de fim deve ser depois do início."));
    }

    // Ativar tem regras próprias (exclusividade)
    let status = match payload.status {
        Some(PeriodStatus::Active) if current.status != PeriodStatus::Active => {
            return Err(AppError::bad_request("Use o endpoint de ativação para ativar um período."));
        }
        Some(status) => status,
        None => current.status,
    };

    sqlx::query("UPDATE academic_periods SET name = ?, start_date = ?, end_date = ?, status = ? WHERE id = ?")
        .bind(payload.name.as_deref().unwrap_or(&current.name))
        .bind(start_date)
        .bind(end_date)
        .bind(status)
        .bind(period_id)
        .execute(db_pool)
        .await?;

    get_period(db_pool, period_id).await
}

/// Torna o período o único ATIVO. Os outros ativos passam a INATIVO.
pub async fn activate_period(db_pool: &SqlitePool, period_id: i64) -> AppResult<AcademicPeriod> {
    let mut tx = db::begin_write(db_pool).await?;

    let period = period_in(&mut *tx, period_id)
        .await?
        .ok_or_else(|| AppError::not_found("Período"))?;
    if period.status == PeriodStatus::Archived {
        return Err(AppError::conflict("period_archived", "Um período arquivado não pode ser ativado."));
    }

    sqlx::query("UPDATE academic_periods SET status = 'INACTIVE' WHERE status = 'ACTIVE' AND id <> ?")
        .bind(period_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE academic_periods SET status = 'ACTIVE' WHERE id = ?")
        .bind(period_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!("📅 Período {} ({}) ativado.", period.code, period_id);
    get_period(db_pool, period_id).await
}

pub async fn get_config(db_pool: &SqlitePool, period_id: i64) -> AppResult<Option<PeriodConfig>> {
    let mut conn = db_pool.acquire().await?;
    config_in(&mut *conn, period_id).await
}

pub async fn upsert_config(db_pool: &SqlitePool, period_id: i64, config: &PeriodConfig) -> AppResult<PeriodConfig> {
    if config.student_admission_deadline <= config.student_admission_start {
        return Err(AppError::bad_request("O prazo de admissão deve ser depois do início."));
    }
    if config.max_cancellations_per_student < 0 {
        return Err(AppError::bad_request("O máximo de cancelamentos não pode ser negativo."));
    }
    get_period(db_pool, period_id).await?;

    sqlx::query(
        r#"
        INSERT INTO agendatec_period_configs
            (period_id, student_admission_start, student_admission_deadline,
             max_cancellations_per_student, allow_drop_requests, allow_appointment_requests)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(period_id) DO UPDATE SET
            student_admission_start = excluded.student_admission_start,
            student_admission_deadline = excluded.student_admission_deadline,
            max_cancellations_per_student = excluded.max_cancellations_per_student,
            allow_drop_requests = excluded.allow_drop_requests,
            allow_appointment_requests = excluded.allow_appointment_requests
        "#,
    )
    .bind(period_id)
    .bind(config.student_admission_start)
    .bind(config.student_admission_deadline)
    .bind(config.max_cancellations_per_student)
    .bind(config.allow_drop_requests)
    .bind(config.allow_appointment_requests)
    .execute(db_pool)
    .await?;

    get_config(db_pool, period_id)
        .await?
        .ok_or(AppError::InternalServerError)
}

pub async fn list_enabled_days(db_pool: &SqlitePool, period_id: i64) -> AppResult<Vec<NaiveDate>> {
    let days = sqlx::query_scalar::<_, NaiveDate>(
        "SELECT day FROM period_enabled_days WHERE period_id = ? ORDER BY day ASC",
    )
    .bind(period_id)
    .fetch_all(db_pool)
    .await?;
    Ok(days)
}

/// Substitui os dias habilitados. Todos têm de cair dentro do período.
pub async fn set_enabled_days(db_pool: &SqlitePool, period_id: i64, days: &[NaiveDate]) -> AppResult<Vec<NaiveDate>> {
    let mut tx = db::begin_write(db_pool).await?;

    let period = period_in(&mut *tx, period_id)
        .await?
        .ok_or_else(|| AppError::not_found("Período"))?;
    if let Some(outside) = days.iter().find(|d| !period.contains(**d)) {
        return Err(AppError::bad_request(format!(
            "O dia {} está fora do período {} ({} a {}).",
            outside, period.code, period.start_date, period.end_date
        )));
    }

    sqlx::query("DELETE FROM period_enabled_days WHERE period_id = ?")
        .bind(period_id)
        .execute(&mut *tx)
        .await?;
    for day in days {
        sqlx::query("INSERT OR IGNORE INTO period_enabled_days (period_id, day) VALUES (?, ?)")
            .bind(period_id)
            .bind(day)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!("Período {}: {} dias habilitados.", period_id, days.len());
    list_enabled_days(db_pool, period_id).await
}

pub async fn active_period_view(db_pool: &SqlitePool) -> AppResult<Option<ActivePeriodView>> {
    let mut conn = db_pool.acquire().await?;
    let Some(period) = active_period_in(&mut *conn).await? else {
        return Ok(None);
    };
    let config = config_in(&mut *conn, period.id).await?;
    drop(conn);

    let enabled_days = list_enabled_days(db_pool, period.id).await?;
    Ok(Some(ActivePeriodView {
        period,
        config,
        enabled_days,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn new_period(pool: &SqlitePool, code: &str) -> AcademicPeriod {
        create_period(
            pool,
            &CreatePeriodPayload {
                code: code.into(),
                name: format!("Período {}", code),
                start_date: date(2025, 8, 1),
                end_date: date(2025, 12, 15),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn activation_is_exclusive() {
        let pool = db::test_pool().await;
        let a = new_period(&pool, "2025-1").await;
        let b = new_period(&pool, "2025-2").await;

        activate_period(&pool, a.id).await.unwrap();
        activate_period(&pool, b.id).await.unwrap();

        assert_eq!(get_period(&pool, a.id).await.unwrap().status, PeriodStatus::Inactive);
        assert_eq!(get_period(&pool, b.id).await.unwrap().status, PeriodStatus::Active);
        let view = active_period_view(&pool).await.unwrap().unwrap();
        assert_eq!(view.period.id, b.id);
    }

    #[tokio::test]
    async fn archived_period_cannot_be_activated() {
        let pool = db::test_pool().await;
        let p = new_period(&pool, "2024-2").await;
        update_period(
            &pool,
            p.id,
            &UpdatePeriodPayload { name: None, start_date: None, end_date: None, status: Some(PeriodStatus::Archived) },
        )
        .await
        .unwrap();

        let err = activate_period(&pool, p.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "period_archived", .. }));
    }

    #[tokio::test]
    async fn enabled_days_must_fall_inside_the_period() {
        let pool = db::test_pool().await;
        let p = new_period(&pool, "2025-2").await;

        let days = set_enabled_days(&pool, p.id, &[date(2025, 9, 2), date(2025, 9, 1)]).await.unwrap();
        assert_eq!(days, vec![date(2025, 9, 1), date(2025, 9, 2)]);

        let err = set_enabled_days(&pool, p.id, &[date(2026, 1, 10)]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        // a lista anterior fica intacta
        assert_eq!(list_enabled_days(&pool, p.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn config_upsert_validates_and_overwrites() {
        let pool = db::test_pool().await;
        let p = new_period(&pool, "2025-2").await;
        let start = date(2025, 8, 1).and_hms_opt(8, 0, 0).unwrap();
        let mut cfg = PeriodConfig {
            period_id: p.id,
            student_admission_start: start,
            student_admission_deadline: start + chrono::Duration::days(5),
            max_cancellations_per_student: 2,
            allow_drop_requests: true,
            allow_appointment_requests: true,
        };
        upsert_config(&pool, p.id, &cfg).await.unwrap();

        cfg.max_cancellations_per_student = 0;
        cfg.allow_drop_requests = false;
        let saved = upsert_config(&pool, p.id, &cfg).await.unwrap();
        assert_eq!(saved.max_cancellations_per_student, 0);
        assert!(!saved.allow_drop_requests);

        cfg.student_admission_deadline = start;
        assert!(upsert_config(&pool, p.id, &cfg).await.is_err());
    }
}
