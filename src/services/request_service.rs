// src/services/request_service.rs
use crate::{
    db,
    error::{AppError, AppResult},
    models::agenda::{
        Appointment, AppointmentStatus, AppointmentView, CreateRequestPayload, DayDashboard, Request, RequestFilters,
        RequestKind, RequestStatus, RequestView, TimeSlot, UpdateRequestStatusPayload,
    },
    services::{period_service, slot_service, user_service},
};
use chrono::{Local, NaiveDate};
use sqlx::{SqliteConnection, SqlitePool};

const REQUEST_COLUMNS: &str =
    "id, student_id, program_id, period_id, kind, description, status, coordinator_comment, created_at, updated_at";

const REQUEST_VIEW_SELECT: &str = r#"
    SELECT r.id, r.kind, r.status, r.description, r.coordinator_comment, r.student_id,
           (u.first_name || ' ' || u.last_name) AS student_name, u.username AS student_username,
           r.program_id, r.period_id, r.created_at,
           a.id AS appointment_id, a.status AS appointment_status, a.coordinator_id,
           s.day, s.start_minute, s.end_minute
    FROM requests r
    JOIN users u ON u.id = r.student_id
    LEFT JOIN appointments a ON a.request_id = r.id
    LEFT JOIN time_slots s ON s.id = a.slot_id
"#;

/// Resultado da criação: o pedido e, para marcações, a marcação e o slot reservado.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreatedRequest {
    pub request: Request,
    pub appointment: Option<Appointment>,
    pub slot: Option<TimeSlot>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CanceledRequest {
    pub request: Request,
    pub released_slot: Option<TimeSlot>,
}

async fn request_in(conn: &mut SqliteConnection, request_id: i64) -> AppResult<Option<Request>> {
    let request = sqlx::query_as::<_, Request>(&format!("SELECT {} FROM requests WHERE id = ?", REQUEST_COLUMNS))
        .bind(request_id)
        .fetch_optional(conn)
        .await?;
    Ok(request)
}

async fn live_appointment_in(conn: &mut SqliteConnection, request_id: i64) -> AppResult<Option<Appointment>> {
    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT id, request_id, student_id, program_id, coordinator_id, slot_id, status
        FROM appointments WHERE request_id = ? AND status = 'SCHEDULED'
        "#,
    )
    .bind(request_id)
    .fetch_optional(conn)
    .await?;
    Ok(appointment)
}

async fn coordinates_program(conn: &mut SqliteConnection, coordinator_id: i64, program_id: i64) -> AppResult<bool> {
    let linked: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM program_coordinators WHERE coordinator_id = ? AND program_id = ?)",
    )
    .bind(coordinator_id)
    .bind(program_id)
    .fetch_one(conn)
    .await?;
    Ok(linked)
}

// --- Aluno ---

/// Cria o pedido do aluno no período ativo. Para marcações reserva o slot
/// na mesma transação; se outro aluno ganhar a corrida o erro é `slot_unavailable`.
pub async fn create_request(
    db_pool: &SqlitePool,
    student_id: i64,
    payload: &CreateRequestPayload,
) -> AppResult<CreatedRequest> {
    let mut tx = db::begin_write(db_pool).await?;

    let program_id: Option<i64> = sqlx::query_scalar("SELECT program_id FROM users WHERE id = ?")
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?
        .flatten();
    let program_id = program_id.ok_or_else(|| AppError::bad_request("O aluno não tem programa académico associado."))?;

    let period = period_service::active_period_in(&mut tx)
        .await?
        .ok_or_else(|| AppError::conflict("no_active_period", "Não há período ativo."))?;
    let config = period_service::config_in(&mut tx, period.id)
        .await?
        .ok_or_else(|| AppError::conflict("admission_closed", "O período ativo ainda não aceita pedidos."))?;

    let now = Local::now().naive_local();
    if !config.admission_open(now) {
        return Err(AppError::conflict("admission_closed", "O prazo para pedidos não está aberto."));
    }
    match payload.kind {
        RequestKind::Drop if !config.allow_drop_requests => {
            return Err(AppError::bad_request("Pedidos de baixa não estão habilitados neste período."));
        }
        RequestKind::Appointment if !config.allow_appointment_requests => {
            return Err(AppError::bad_request("Marcações não estão habilitadas neste período."));
        }
        _ => {}
    }

    let has_active: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM requests WHERE student_id = ? AND period_id = ? AND status <> 'CANCELED')",
    )
    .bind(student_id)
    .bind(period.id)
    .fetch_one(&mut *tx)
    .await?;
    if has_active {
        return Err(AppError::conflict("request_exists", "Já tem um pedido ativo neste período."));
    }

    // Validação e reserva do slot (só marcações)
    let slot = match (payload.kind, payload.slot_id) {
        (RequestKind::Drop, Some(_)) => {
            return Err(AppError::bad_request("Um pedido de baixa não leva horário."));
        }
        (RequestKind::Drop, None) => None,
        (RequestKind::Appointment, None) => {
            return Err(AppError::bad_request("Escolha um horário para a marcação."));
        }
        (RequestKind::Appointment, Some(slot_id)) => {
            let slot = slot_service::find_slot_in(&mut tx, slot_id)
                .await?
                .ok_or_else(|| AppError::not_found("Horário"))?;
            if !coordinates_program(&mut tx, slot.coordinator_id, program_id).await? {
                return Err(AppError::bad_request("O horário não pertence a um coordenador do seu programa."));
            }
            if slot.day < Local::now().date_naive() {
                return Err(AppError::bad_request("O horário já passou."));
            }
            if !period_service::is_day_enabled_in(&mut tx, period.id, slot.day).await? {
                return Err(AppError::bad_request("O dia do horário não está habilitado."));
            }
            slot_service::book_slot(&mut tx, slot.id).await?;
            Some(TimeSlot { is_booked: true, ..slot })
        }
    };

    let inserted = sqlx::query(
        "INSERT INTO requests (student_id, program_id, period_id, kind, description) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(student_id)
    .bind(program_id)
    .bind(period.id)
    .bind(payload.kind)
    .bind(payload.description.as_deref().map(str::trim).filter(|d| !d.is_empty()))
    .execute(&mut *tx)
    .await;
    let request_id = match inserted {
        Ok(res) => res.last_insert_rowid(),
        // corrida com outro pedido do mesmo aluno
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(AppError::conflict("request_exists", "Já tem um pedido ativo neste período."));
        }
        Err(e) => return Err(e.into()),
    };

    let appointment = match &slot {
        Some(slot) => {
            let appointment_id = sqlx::query(
                r#"
                INSERT INTO appointments (request_id, student_id, program_id, coordinator_id, slot_id)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(request_id)
            .bind(student_id)
            .bind(program_id)
            .bind(slot.coordinator_id)
            .bind(slot.id)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            Some(Appointment {
                id: appointment_id,
                request_id,
                student_id,
                program_id,
                coordinator_id: slot.coordinator_id,
                slot_id: Some(slot.id),
                status: AppointmentStatus::Scheduled,
            })
        }
        None => None,
    };

    let request = request_in(&mut tx, request_id)
        .await?
        .ok_or(AppError::InternalServerError)?;

    tx.commit().await?;
    tracing::info!(
        "📝 Pedido {} ({:?}) criado pelo aluno {} no período {}.",
        request_id,
        payload.kind,
        student_id,
        period.code
    );
    Ok(CreatedRequest {
        request,
        appointment,
        slot,
    })
}

/// Cancela um pedido pendente do próprio aluno e liberta o slot, se houver.
pub async fn cancel_request(db_pool: &SqlitePool, student_id: i64, request_id: i64) -> AppResult<CanceledRequest> {
    let mut tx = db::begin_write(db_pool).await?;

    let request = request_in(&mut tx, request_id)
        .await?
        .filter(|r| r.student_id == student_id)
        .ok_or_else(|| AppError::not_found("Pedido"))?;

    if request.status != RequestStatus::Pending {
        return Err(AppError::InvalidTransition {
            from: request.status.as_str().into(),
            to: RequestStatus::Canceled.as_str().into(),
        });
    }

    let max_cancellations = period_service::config_in(&mut tx, request.period_id)
        .await?
        .map(|c| c.max_cancellations_per_student)
        .unwrap_or(0);
    let already_canceled: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM requests WHERE student_id = ? AND period_id = ? AND status = 'CANCELED'",
    )
    .bind(student_id)
    .bind(request.period_id)
    .fetch_one(&mut *tx)
    .await?;
    if already_canceled >= max_cancellations {
        return Err(AppError::conflict(
            "cancellation_limit",
            format!("Atingiu o limite de {} cancelamentos neste período.", max_cancellations),
        ));
    }

    sqlx::query("UPDATE requests SET status = 'CANCELED', updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

    let mut released_slot = None;
    if let Some(appointment) = live_appointment_in(&mut tx, request_id).await? {
        sqlx::query("UPDATE appointments SET status = 'CANCELED' WHERE id = ?")
            .bind(appointment.id)
            .execute(&mut *tx)
            .await?;
        if let Some(slot_id) = appointment.slot_id {
            slot_service::release_slot(&mut tx, slot_id).await?;
            released_slot = slot_service::find_slot_in(&mut tx, slot_id).await?;
        }
    }

    let request = request_in(&mut tx, request_id)
        .await?
        .ok_or(AppError::InternalServerError)?;
    tx.commit().await?;

    tracing::info!("Pedido {} cancelado pelo aluno {}.", request_id, student_id);
    Ok(CanceledRequest { request, released_slot })
}

pub async fn list_student_requests(db_pool: &SqlitePool, student_id: i64) -> AppResult<Vec<RequestView>> {
    let rows = sqlx::query_as::<_, RequestView>(&format!(
        "{} WHERE r.student_id = ? ORDER BY r.created_at DESC, r.id DESC",
        REQUEST_VIEW_SELECT
    ))
    .bind(student_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows)
}

/// Slots livres dos coordenadores do programa do aluno.
pub async fn free_slots_for_student(db_pool: &SqlitePool, student_id: i64, day: NaiveDate) -> AppResult<Vec<TimeSlot>> {
    let student = user_service::find_user_by_id(db_pool, student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Aluno"))?;
    let Some(program_id) = student.program_id else {
        return Ok(Vec::new());
    };

    let coordinators = sqlx::query_scalar::<_, i64>(
        "SELECT coordinator_id FROM program_coordinators WHERE program_id = ?",
    )
    .bind(program_id)
    .fetch_all(db_pool)
    .await?;

    slot_service::list_slots(db_pool, &coordinators, day, true).await
}

// --- Coordenador ---

fn ids_json(ids: &[i64]) -> AppResult<String> {
    serde_json::to_string(ids).map_err(|e| {
        tracing::error!("Erro ao serializar ids para JSON: {:?}", e);
        AppError::InternalServerError
    })
}

/// Pedidos dos programas que o coordenador coordena.
pub async fn list_coordinator_requests(
    db_pool: &SqlitePool,
    coordinator_id: i64,
    filters: &RequestFilters,
) -> AppResult<Vec<RequestView>> {
    let programs = user_service::coordinator_program_ids(db_pool, coordinator_id).await?;
    if programs.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, RequestView>(&format!(
        r#"{}
        WHERE r.program_id IN (SELECT value FROM json_each(?1))
          AND (?2 IS NULL OR r.status = ?2)
          AND (?3 IS NULL OR r.kind = ?3)
          AND (?4 IS NULL OR s.day = ?4)
          AND (?5 IS NULL OR r.period_id = ?5)
        ORDER BY s.day IS NULL, s.day, s.start_minute, r.created_at
        "#,
        REQUEST_VIEW_SELECT
    ))
    .bind(ids_json(&programs)?)
    .bind(filters.status)
    .bind(filters.kind)
    .bind(filters.day)
    .bind(filters.period_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows)
}

/// Resolve um pedido pendente. Devolve o pedido e o coordenador da marcação (para notificar).
pub async fn update_request_status(
    db_pool: &SqlitePool,
    coordinator_id: i64,
    is_admin: bool,
    request_id: i64,
    payload: &UpdateRequestStatusPayload,
) -> AppResult<(Request, Option<Appointment>)> {
    let mut tx = db::begin_write(db_pool).await?;

    let request = request_in(&mut tx, request_id)
        .await?
        .ok_or_else(|| AppError::not_found("Pedido"))?;
    if !is_admin && !coordinates_program(&mut tx, coordinator_id, request.program_id).await? {
        // Não revela pedidos de outros programas
        return Err(AppError::not_found("Pedido"));
    }

    if !request.status.coordinator_can_resolve(payload.status, request.kind) {
        return Err(AppError::InvalidTransition {
            from: request.status.as_str().into(),
            to: payload.status.as_str().into(),
        });
    }

    sqlx::query(
        r#"
        UPDATE requests
        SET status = ?, coordinator_comment = COALESCE(?, coordinator_comment), updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(payload.status)
    .bind(payload.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()))
    .bind(request_id)
    .execute(&mut *tx)
    .await?;

    let appointment = live_appointment_in(&mut tx, request_id).await?;
    let appointment = match appointment {
        Some(mut appointment) => {
            let next = if payload.status == RequestStatus::NoShow {
                AppointmentStatus::NoShow
            } else {
                AppointmentStatus::Done
            };
            sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
                .bind(next)
                .bind(appointment.id)
                .execute(&mut *tx)
                .await?;
            appointment.status = next;
            Some(appointment)
        }
        None => None,
    };

    let request = request_in(&mut tx, request_id)
        .await?
        .ok_or(AppError::InternalServerError)?;
    tx.commit().await?;

    tracing::info!(
        "Pedido {} -> {} (coordenador {}).",
        request_id,
        payload.status.as_str(),
        coordinator_id
    );
    Ok((request, appointment))
}

pub async fn day_dashboard(
    db_pool: &SqlitePool,
    coordinator_id: i64,
    day: Option<NaiveDate>,
) -> AppResult<DayDashboard> {
    let programs = user_service::coordinator_program_ids(db_pool, coordinator_id).await?;

    let counts = sqlx::query_as::<_, (RequestStatus, i64)>(
        r#"
        SELECT r.status, COUNT(*)
        FROM requests r
        LEFT JOIN appointments a ON a.request_id = r.id
        LEFT JOIN time_slots s ON s.id = a.slot_id
        WHERE r.program_id IN (SELECT value FROM json_each(?1))
          AND (?2 IS NULL OR s.day = ?2)
        GROUP BY r.status
        "#,
    )
    .bind(ids_json(&programs)?)
    .bind(day)
    .fetch_all(db_pool)
    .await?;

    let mut dashboard = DayDashboard { day, ..Default::default() };
    for (status, count) in counts {
        dashboard.total += count;
        let slot = match status {
            RequestStatus::Pending => &mut dashboard.pending,
            RequestStatus::ResolvedSuccess => &mut dashboard.resolved_success,
            RequestStatus::ResolvedNotCompleted => &mut dashboard.resolved_not_completed,
            RequestStatus::NoShow => &mut dashboard.no_show,
            RequestStatus::AttendedOtherSlot => &mut dashboard.attended_other_slot,
            RequestStatus::Canceled => &mut dashboard.canceled,
        };
        *slot += count;
    }
    Ok(dashboard)
}

// --- Serviço social ---

pub async fn list_day_appointments(
    db_pool: &SqlitePool,
    day: NaiveDate,
    program_id: Option<i64>,
) -> AppResult<Vec<AppointmentView>> {
    let rows = sqlx::query_as::<_, AppointmentView>(
        r#"
        SELECT a.id, a.request_id, a.status,
               (u.first_name || ' ' || u.last_name) AS student_name, u.username AS student_username,
               a.program_id, a.coordinator_id, s.day, s.start_minute, s.end_minute
        FROM appointments a
        JOIN users u ON u.id = a.student_id
        JOIN time_slots s ON s.id = a.slot_id
        WHERE s.day = ?1 AND a.status <> 'CANCELED'
          AND (?2 IS NULL OR a.program_id = ?2)
        ORDER BY s.start_minute, a.coordinator_id
        "#,
    )
    .bind(day)
    .bind(program_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, models::agenda::hhmm, services::testing};

    struct Fixture {
        pool: SqlitePool,
        day: NaiveDate,
        coord: i64,
        student: i64,
        slots: Vec<TimeSlot>,
    }

    async fn fixture(max_cancellations: i64) -> Fixture {
        let pool = db::test_pool().await;
        let day = testing::future_day(2);
        testing::active_period(&pool, &[day], max_cancellations).await;
        let program = testing::insert_program(&pool, "ISC").await;
        let coord = testing::insert_user(&pool, "coord", &["coordinator"], None).await;
        testing::link_coordinator(&pool, program, coord).await;
        let student = testing::insert_user(&pool, "20110001", &["student"], Some(program)).await;
        let slots = slot_service::create_window(&pool, coord, day, hhmm::parse("09:00").unwrap(), hhmm::parse("10:00").unwrap(), 20)
            .await
            .unwrap()
            .slots;
        Fixture { pool, day, coord, student, slots }
    }

    fn appointment(slot_id: i64) -> CreateRequestPayload {
        CreateRequestPayload {
            kind: RequestKind::Appointment,
            description: Some("Alta de matéria".into()),
            slot_id: Some(slot_id),
        }
    }

    #[tokio::test]
    async fn appointment_books_the_slot() {
        let f = fixture(2).await;
        let created = create_request(&f.pool, f.student, &appointment(f.slots[0].id)).await.unwrap();

        assert_eq!(created.request.status, RequestStatus::Pending);
        assert_eq!(created.appointment.as_ref().unwrap().coordinator_id, f.coord);
        let free = free_slots_for_student(&f.pool, f.student, f.day).await.unwrap();
        assert_eq!(free.len(), 2);
        assert!(free.iter().all(|s| s.id != f.slots[0].id));
    }

    #[tokio::test]
    async fn booked_slot_cannot_be_taken_twice() {
        let f = fixture(2).await;
        let program: i64 = sqlx::query_scalar("SELECT id FROM programs").fetch_one(&f.pool).await.unwrap();
        let other = testing::insert_user(&f.pool, "20110002", &["student"], Some(program)).await;

        create_request(&f.pool, f.student, &appointment(f.slots[1].id)).await.unwrap();
        let err = create_request(&f.pool, other, &appointment(f.slots[1].id)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "slot_unavailable", .. }));

        // nada ficou gravado para o perdedor
        assert!(list_student_requests(&f.pool, other).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bookings_leave_one_winner() {
        let (pool, _dir) = db::test_file_pool().await;
        let day = testing::future_day(2);
        testing::active_period(&pool, &[day], 2).await;
        let program = testing::insert_program(&pool, "ISC").await;
        let coord = testing::insert_user(&pool, "coord", &["coordinator"], None).await;
        testing::link_coordinator(&pool, program, coord).await;
        let slot = slot_service::create_window(&pool, coord, day, hhmm::parse("09:00").unwrap(), hhmm::parse("09:20").unwrap(), 20)
            .await
            .unwrap()
            .slots[0]
            .id;

        let mut students = Vec::new();
        for i in 0..5 {
            students.push(testing::insert_user(&pool, &format!("2011000{}", i), &["student"], Some(program)).await);
        }

        let handles: Vec<_> = students
            .into_iter()
            .map(|student| {
                let pool = pool.clone();
                tokio::spawn(async move { create_request(&pool, student, &appointment(slot)).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(AppError::Conflict { code: "slot_unavailable", .. }) => {}
                Err(other) => panic!("erro inesperado: {:?}", other),
            }
        }
        assert_eq!(winners, 1);

        let booked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE slot_id = ?")
            .bind(slot)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(booked, 1);
    }

    #[tokio::test]
    async fn one_active_request_per_period() {
        let f = fixture(2).await;
        create_request(&f.pool, f.student, &appointment(f.slots[0].id)).await.unwrap();

        let drop = CreateRequestPayload { kind: RequestKind::Drop, description: None, slot_id: None };
        let err = create_request(&f.pool, f.student, &drop).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "request_exists", .. }));
    }

    #[tokio::test]
    async fn drop_request_rejects_a_slot() {
        let f = fixture(2).await;
        let bad = CreateRequestPayload { kind: RequestKind::Drop, description: None, slot_id: Some(f.slots[0].id) };
        assert!(matches!(create_request(&f.pool, f.student, &bad).await, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn slot_from_another_program_is_rejected() {
        let f = fixture(2).await;
        let other_program = testing::insert_program(&f.pool, "IIND").await;
        let outsider = testing::insert_user(&f.pool, "20119999", &["student"], Some(other_program)).await;

        let err = create_request(&f.pool, outsider, &appointment(f.slots[0].id)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn closed_admission_is_a_conflict() {
        let f = fixture(2).await;
        sqlx::query("UPDATE agendatec_period_configs SET student_admission_deadline = '2000-01-01 00:00:00'")
            .execute(&f.pool)
            .await
            .unwrap();

        let err = create_request(&f.pool, f.student, &appointment(f.slots[0].id)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "admission_closed", .. }));
    }

    #[tokio::test]
    async fn cancel_releases_slot_and_allows_a_new_request() {
        let f = fixture(2).await;
        let created = create_request(&f.pool, f.student, &appointment(f.slots[0].id)).await.unwrap();

        let canceled = cancel_request(&f.pool, f.student, created.request.id).await.unwrap();
        assert_eq!(canceled.request.status, RequestStatus::Canceled);
        assert!(!canceled.released_slot.unwrap().is_booked);

        // o mesmo slot pode ser reservado de novo
        create_request(&f.pool, f.student, &appointment(f.slots[0].id)).await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_limit_is_enforced() {
        let f = fixture(1).await;
        let first = create_request(&f.pool, f.student, &appointment(f.slots[0].id)).await.unwrap();
        cancel_request(&f.pool, f.student, first.request.id).await.unwrap();

        let second = create_request(&f.pool, f.student, &appointment(f.slots[1].id)).await.unwrap();
        let err = cancel_request(&f.pool, f.student, second.request.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "cancellation_limit", .. }));
    }

    #[tokio::test]
    async fn student_cannot_cancel_someone_elses_request() {
        let f = fixture(2).await;
        let created = create_request(&f.pool, f.student, &appointment(f.slots[0].id)).await.unwrap();
        let err = cancel_request(&f.pool, f.coord, created.request.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn coordinator_resolves_and_dashboard_counts() {
        let f = fixture(2).await;
        let created = create_request(&f.pool, f.student, &appointment(f.slots[2].id)).await.unwrap();

        let listed = list_coordinator_requests(&f.pool, f.coord, &RequestFilters { day: Some(f.day), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].start_minute, Some(hhmm::parse("09:40").unwrap()));

        let payload = UpdateRequestStatusPayload { status: RequestStatus::NoShow, comment: Some("Não veio".into()) };
        let (request, appointment) =
            update_request_status(&f.pool, f.coord, false, created.request.id, &payload).await.unwrap();
        assert_eq!(request.status, RequestStatus::NoShow);
        assert_eq!(appointment.unwrap().status, AppointmentStatus::NoShow);

        // já resolvido: nova resolução é transição inválida
        let again = UpdateRequestStatusPayload { status: RequestStatus::ResolvedSuccess, comment: None };
        let err = update_request_status(&f.pool, f.coord, false, created.request.id, &again).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let dash = day_dashboard(&f.pool, f.coord, Some(f.day)).await.unwrap();
        assert_eq!((dash.total, dash.no_show, dash.pending), (1, 1, 0));
    }

    #[tokio::test]
    async fn unrelated_coordinator_does_not_see_request() {
        let f = fixture(2).await;
        let created = create_request(&f.pool, f.student, &appointment(f.slots[0].id)).await.unwrap();
        let stranger = testing::insert_user(&f.pool, "coord2", &["coordinator"], None).await;

        let payload = UpdateRequestStatusPayload { status: RequestStatus::ResolvedSuccess, comment: None };
        let err = update_request_status(&f.pool, stranger, false, created.request.id, &payload).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(list_coordinator_requests(&f.pool, stranger, &RequestFilters::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn social_service_sees_day_appointments() {
        let f = fixture(2).await;
        create_request(&f.pool, f.student, &appointment(f.slots[0].id)).await.unwrap();

        let rows = list_day_appointments(&f.pool, f.day, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student_username, "20110001");
    }
}
