// src/services/testing.rs
// Dados de apoio partilhados pelos testes dos serviços e das rotas.
use chrono::{Duration, Local, NaiveDate};
use sqlx::SqlitePool;

pub fn future_day(days_ahead: i64) -> NaiveDate {
    Local::now().date_naive() + Duration::days(days_ahead)
}

pub async fn insert_program(pool: &SqlitePool, key: &str) -> i64 {
    sqlx::query("INSERT INTO programs (key, name) VALUES (?, ?)")
        .bind(key)
        .bind(format!("Programa {}", key))
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

/// Utilizador com hash fictício (não serve para login).
pub async fn insert_user(pool: &SqlitePool, username: &str, roles: &[&str], program_id: Option<i64>) -> i64 {
    let id = sqlx::query(
        "INSERT INTO users (username, password_hash, first_name, last_name, program_id) VALUES (?, 'x', ?, 'Teste', ?)",
    )
    .bind(username)
    .bind(username)
    .bind(program_id)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid();

    for role in roles {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES (?, ?)")
            .bind(id)
            .bind(*role)
            .execute(pool)
            .await
            .unwrap();
    }
    id
}

pub async fn link_coordinator(pool: &SqlitePool, program_id: i64, coordinator_id: i64) {
    sqlx::query("INSERT INTO program_coordinators (program_id, coordinator_id) VALUES (?, ?)")
        .bind(program_id)
        .bind(coordinator_id)
        .execute(pool)
        .await
        .unwrap();
}

/// Período ativo à volta de hoje, admissão aberta, com os dias indicados habilitados.
pub async fn active_period(pool: &SqlitePool, days: &[NaiveDate], max_cancellations: i64) -> i64 {
    let today = Local::now().date_naive();
    let id = sqlx::query(
        "INSERT INTO academic_periods (code, name, start_date, end_date, status) VALUES ('T-1', 'Teste', ?, ?, 'ACTIVE')",
    )
    .bind(today - Duration::days(30))
    .bind(today + Duration::days(90))
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid();

    let now = Local::now().naive_local();
    sqlx::query(
        r#"
        INSERT INTO agendatec_period_configs
            (period_id, student_admission_start, student_admission_deadline, max_cancellations_per_student,
             allow_drop_requests, allow_appointment_requests)
        VALUES (?, ?, ?, ?, 1, 1)
        "#,
    )
    .bind(id)
    .bind(now - Duration::days(1))
    .bind(now + Duration::days(1))
    .bind(max_cancellations)
    .execute(pool)
    .await
    .unwrap();

    for day in days {
        sqlx::query("INSERT INTO period_enabled_days (period_id, day) VALUES (?, ?)")
            .bind(id)
            .bind(day)
            .execute(pool)
            .await
            .unwrap();
    }
    id
}
