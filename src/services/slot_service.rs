// src/services/slot_service.rs
//
// Janelas de disponibilidade dos coordenadores e os slots gerados a partir delas.
// Todos os intervalos são semiabertos [início, fim), em minutos desde a meia-noite,
// e pertencem a um único coordenador num único dia.
use crate::{
    db,
    error::{AppError, AppResult},
    models::agenda::{hhmm, AvailabilityWindow, BulkDayOutcome, RangeDeletion, TimeSlot, WindowWithSlots},
    services::period_service,
};
use chrono::{Local, NaiveDate};
use sqlx::{SqliteConnection, SqlitePool};

const WINDOW_COLUMNS: &str = "id, coordinator_id, day, start_minute, end_minute, slot_minutes";
const SLOT_COLUMNS: &str = "id, coordinator_id, day, start_minute, end_minute, is_booked";

// --- Aritmética de intervalos ---

pub fn overlaps(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start < b_end && b_start < a_end
}

/// Slots `[t, t + step)` a partir de `start`, enquanto couberem inteiros antes de `end`.
pub fn slot_bounds(start: i64, end: i64, step: i64) -> Vec<(i64, i64)> {
    if step <= 0 {
        return Vec::new();
    }
    let mut bounds = Vec::new();
    let mut t = start;
    while t + step <= end {
        bounds.push((t, t + step));
        t += step;
    }
    bounds
}

/// O que sobra de `[w_start, w_end)` depois de cortar `[cut_start, cut_end)`: esquerda e/ou direita.
pub fn remainders(w_start: i64, w_end: i64, cut_start: i64, cut_end: i64) -> Vec<(i64, i64)> {
    let mut parts = Vec::with_capacity(2);
    if w_start < cut_start {
        parts.push((w_start, w_end.min(cut_start)));
    }
    if cut_end < w_end {
        parts.push((w_start.max(cut_end), w_end));
    }
    parts.retain(|(s, e)| s < e);
    parts
}

fn validate_range(start: i64, end: i64) -> AppResult<()> {
    if !(0..=24 * 60).contains(&start) || !(0..=24 * 60).contains(&end) {
        return Err(AppError::bad_request("Horas fora do dia."));
    }
    if start >= end {
        return Err(AppError::bad_request("A hora de início deve ser anterior à hora de fim."));
    }
    Ok(())
}

// --- Consultas dentro de uma transação ---

async fn count_booked_overlapping(
    conn: &mut SqliteConnection,
    coordinator_id: i64,
    day: NaiveDate,
    start: i64,
    end: i64,
) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM time_slots
        WHERE coordinator_id = ? AND day = ? AND is_booked = 1
          AND start_minute < ? AND end_minute > ?
        "#,
    )
    .bind(coordinator_id)
    .bind(day)
    .bind(end)
    .bind(start)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

async fn delete_free_overlapping(
    conn: &mut SqliteConnection,
    coordinator_id: i64,
    day: NaiveDate,
    start: i64,
    end: i64,
) -> AppResult<u64> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM time_slots
        WHERE coordinator_id = ? AND day = ? AND is_booked = 0
          AND start_minute < ? AND end_minute > ?
        "#,
    )
    .bind(coordinator_id)
    .bind(day)
    .bind(end)
    .bind(start)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(deleted)
}

/// Recorta as janelas que tocam `[start, end)`, mantendo só as sobras que ainda têm slots.
/// Devolve (janelas removidas, janelas criadas).
async fn clip_windows(
    conn: &mut SqliteConnection,
    coordinator_id: i64,
    day: NaiveDate,
    start: i64,
    end: i64,
) -> AppResult<(u64, u64)> {
    let overlapping = sqlx::query_as::<_, AvailabilityWindow>(&format!(
        r#"
        SELECT {} FROM availability_windows
        WHERE coordinator_id = ? AND day = ? AND start_minute < ? AND end_minute > ?
        ORDER BY start_minute
        "#,
        WINDOW_COLUMNS
    ))
    .bind(coordinator_id)
    .bind(day)
    .bind(end)
    .bind(start)
    .fetch_all(&mut *conn)
    .await?;

    let (mut removed, mut created) = (0u64, 0u64);
    for window in overlapping {
        sqlx::query("DELETE FROM availability_windows WHERE id = ?")
            .bind(window.id)
            .execute(&mut *conn)
            .await?;
        removed += 1;

        for (s, e) in remainders(window.start_minute, window.end_minute, start, end) {
            let slots_left: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM time_slots
                WHERE coordinator_id = ? AND day = ? AND start_minute >= ? AND end_minute <= ?
                "#,
            )
            .bind(coordinator_id)
            .bind(day)
            .bind(s)
            .bind(e)
            .fetch_one(&mut *conn)
            .await?;

            if slots_left == 0 {
                continue;
            }
            sqlx::query(
                "INSERT INTO availability_windows (coordinator_id, day, start_minute, end_minute, slot_minutes) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(coordinator_id)
            .bind(day)
            .bind(s)
            .bind(e)
            .bind(window.slot_minutes)
            .execute(&mut *conn)
            .await?;
            created += 1;
        }
    }
    Ok((removed, created))
}

// --- Operações ---

/// Cria uma janela e gera os seus slots. Janelas sobrepostas são recortadas;
/// qualquer slot já reservado no intervalo bloqueia a operação.
pub async fn create_window(
    db_pool: &SqlitePool,
    coordinator_id: i64,
    day: NaiveDate,
    start: i64,
    end: i64,
    slot_minutes: i64,
) -> AppResult<WindowWithSlots> {
    validate_range(start, end)?;
    if slot_minutes <= 0 {
        return Err(AppError::bad_request("A duração do slot deve ser positiva."));
    }
    if end - start < slot_minutes {
        return Err(AppError::bad_request("A janela é mais curta do que um slot."));
    }
    if day < Local::now().date_naive() {
        return Err(AppError::bad_request("Não é possível configurar dias passados."));
    }

    let mut tx = db::begin_write(db_pool).await?;

    if !period_service::is_day_enabled_in_active(&mut tx, day).await? {
        return Err(AppError::bad_request(format!("O dia {} não está habilitado no período ativo.", day)));
    }

    let booked = count_booked_overlapping(&mut tx, coordinator_id, day, start, end).await?;
    if booked > 0 {
        tracing::warn!(
            "Janela {} {}-{} do coordenador {} rejeitada: {} slots reservados no intervalo.",
            day,
            hhmm::format(start),
            hhmm::format(end),
            coordinator_id,
            booked
        );
        return Err(AppError::conflict(
            "booked_slots_overlap",
            format!("Existem {} slots reservados nesse intervalo.", booked),
        ));
    }

    let freed = delete_free_overlapping(&mut tx, coordinator_id, day, start, end).await?;
    let (removed, created) = clip_windows(&mut tx, coordinator_id, day, start, end).await?;

    let window_id = sqlx::query(
        "INSERT INTO availability_windows (coordinator_id, day, start_minute, end_minute, slot_minutes) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(coordinator_id)
    .bind(day)
    .bind(start)
    .bind(end)
    .bind(slot_minutes)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for (s, e) in slot_bounds(start, end, slot_minutes) {
        sqlx::query("INSERT INTO time_slots (coordinator_id, day, start_minute, end_minute) VALUES (?, ?, ?, ?)")
            .bind(coordinator_id)
            .bind(day)
            .bind(s)
            .bind(e)
            .execute(&mut *tx)
            .await?;
    }

    let window = sqlx::query_as::<_, AvailabilityWindow>(&format!(
        "SELECT {} FROM availability_windows WHERE id = ?",
        WINDOW_COLUMNS
    ))
    .bind(window_id)
    .fetch_one(&mut *tx)
    .await?;

    let slots = sqlx::query_as::<_, TimeSlot>(&format!(
        r#"
        SELECT {} FROM time_slots
        WHERE coordinator_id = ? AND day = ? AND start_minute >= ? AND end_minute <= ?
        ORDER BY start_minute
        "#,
        SLOT_COLUMNS
    ))
    .bind(coordinator_id)
    .bind(day)
    .bind(start)
    .bind(end)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(
        "🗓️ Janela {} {}-{} criada para coordenador {} ({} slots; {} livres apagados; janelas: -{} +{}).",
        day,
        hhmm::format(start),
        hhmm::format(end),
        coordinator_id,
        slots.len(),
        freed,
        removed,
        created
    );
    Ok(WindowWithSlots { window, slots })
}

/// Apaga o intervalo: slots livres saem, janelas são divididas nas sobras.
pub async fn delete_range(
    db_pool: &SqlitePool,
    coordinator_id: i64,
    day: NaiveDate,
    start: i64,
    end: i64,
) -> AppResult<RangeDeletion> {
    validate_range(start, end)?;

    let mut tx = db::begin_write(db_pool).await?;

    let booked = count_booked_overlapping(&mut tx, coordinator_id, day, start, end).await?;
    if booked > 0 {
        return Err(AppError::conflict(
            "booked_slots_overlap",
            format!("Existem {} slots reservados nesse intervalo.", booked),
        ));
    }

    let deleted_slots = delete_free_overlapping(&mut tx, coordinator_id, day, start, end).await?;
    let (removed_windows, created_windows) = clip_windows(&mut tx, coordinator_id, day, start, end).await?;

    tx.commit().await?;
    tracing::info!(
        "Intervalo {} {}-{} apagado para coordenador {}: {} slots, janelas -{} +{}.",
        day,
        hhmm::format(start),
        hhmm::format(end),
        coordinator_id,
        deleted_slots,
        removed_windows,
        created_windows
    );
    Ok(RangeDeletion {
        deleted_slots,
        removed_windows,
        created_windows,
    })
}

/// Remove a janela inteira. Devolve o dia afetado junto com as contagens.
pub async fn delete_window(
    db_pool: &SqlitePool,
    coordinator_id: i64,
    window_id: i64,
) -> AppResult<(NaiveDate, RangeDeletion)> {
    let window = sqlx::query_as::<_, AvailabilityWindow>(&format!(
        "SELECT {} FROM availability_windows WHERE id = ? AND coordinator_id = ?",
        WINDOW_COLUMNS
    ))
    .bind(window_id)
    .bind(coordinator_id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Janela"))?;

    let deletion = delete_range(db_pool, coordinator_id, window.day, window.start_minute, window.end_minute).await?;
    Ok((window.day, deletion))
}

/// Configuração em lote: cada dia na sua própria transação.
pub async fn bulk_create_windows(
    db_pool: &SqlitePool,
    coordinator_id: i64,
    days: &[NaiveDate],
    start: i64,
    end: i64,
    slot_minutes: i64,
) -> Vec<BulkDayOutcome> {
    let mut outcomes = Vec::with_capacity(days.len());
    for &day in days {
        let outcome = match create_window(db_pool, coordinator_id, day, start, end, slot_minutes).await {
            Ok(created) => BulkDayOutcome {
                day,
                ok: true,
                slots_created: created.slots.len(),
                error: None,
            },
            Err(e) => {
                tracing::warn!("Configuração do dia {} falhou: {}", day, e);
                BulkDayOutcome {
                    day,
                    ok: false,
                    slots_created: 0,
                    error: Some(e.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}

pub async fn list_windows(
    db_pool: &SqlitePool,
    coordinator_id: i64,
    day: Option<NaiveDate>,
) -> AppResult<Vec<AvailabilityWindow>> {
    let windows = sqlx::query_as::<_, AvailabilityWindow>(&format!(
        r#"
        SELECT {} FROM availability_windows
        WHERE coordinator_id = ?1 AND (?2 IS NULL OR day = ?2)
        ORDER BY day, start_minute
        "#,
        WINDOW_COLUMNS
    ))
    .bind(coordinator_id)
    .bind(day)
    .fetch_all(db_pool)
    .await?;
    Ok(windows)
}

/// Slots de vários coordenadores num dia (lista passada como JSON para o json_each).
pub async fn list_slots(
    db_pool: &SqlitePool,
    coordinator_ids: &[i64],
    day: NaiveDate,
    only_free: bool,
) -> AppResult<Vec<TimeSlot>> {
    let ids_json = serde_json::to_string(coordinator_ids).map_err(|e| {
        tracing::error!("Erro ao serializar ids para JSON: {:?}", e);
        AppError::InternalServerError
    })?;

    let slots = sqlx::query_as::<_, TimeSlot>(&format!(
        r#"
        SELECT {} FROM time_slots
        WHERE coordinator_id IN (SELECT value FROM json_each(?1))
          AND day = ?2
          AND (?3 = 0 OR is_booked = 0)
        ORDER BY start_minute, coordinator_id
        "#,
        SLOT_COLUMNS
    ))
    .bind(ids_json)
    .bind(day)
    .bind(only_free)
    .fetch_all(db_pool)
    .await?;
    Ok(slots)
}

pub async fn find_slot_in(conn: &mut SqliteConnection, slot_id: i64) -> AppResult<Option<TimeSlot>> {
    let slot = sqlx::query_as::<_, TimeSlot>(&format!("SELECT {} FROM time_slots WHERE id = ?", SLOT_COLUMNS))
        .bind(slot_id)
        .fetch_optional(conn)
        .await?;
    Ok(slot)
}

/// Reserva otimista: só uma transação consegue passar `is_booked` de 0 para 1.
pub async fn book_slot(conn: &mut SqliteConnection, slot_id: i64) -> AppResult<()> {
    let rows = sqlx::query("UPDATE time_slots SET is_booked = 1 WHERE id = ? AND is_booked = 0")
        .bind(slot_id)
        .execute(conn)
        .await?
        .rows_affected();

    if rows == 0 {
        tracing::info!("Slot {} já reservado (corrida perdida).", slot_id);
        return Err(AppError::conflict("slot_unavailable", "O horário escolhido já não está disponível."));
    }
    Ok(())
}

pub async fn release_slot(conn: &mut SqliteConnection, slot_id: i64) -> AppResult<()> {
    sqlx::query("UPDATE time_slots SET is_booked = 0 WHERE id = ?")
        .bind(slot_id)
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, services::testing};

    fn t(text: &str) -> i64 {
        hhmm::parse(text).unwrap()
    }

    #[test]
    fn slot_bounds_drops_partial_tail() {
        assert_eq!(slot_bounds(t("09:00"), t("09:25"), 10), vec![(540, 550), (550, 560)]);
        assert!(slot_bounds(t("09:00"), t("09:05"), 10).is_empty());
        assert!(slot_bounds(0, 100, 0).is_empty());
    }

    #[test]
    fn remainders_split_left_and_right() {
        assert_eq!(remainders(540, 720, 600, 660), vec![(540, 600), (660, 720)]);
        assert_eq!(remainders(540, 720, 500, 600), vec![(600, 720)]);
        assert_eq!(remainders(540, 720, 660, 800), vec![(540, 660)]);
        assert!(remainders(540, 720, 500, 800).is_empty());
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        assert!(!overlaps(540, 600, 600, 660));
        assert!(overlaps(540, 601, 600, 660));
    }

    async fn setup(pool: &SqlitePool) -> (i64, NaiveDate) {
        let day = testing::future_day(3);
        testing::active_period(pool, &[day], 2).await;
        let coord = testing::insert_user(pool, "coord", &["coordinator"], None).await;
        (coord, day)
    }

    async fn windows_of(pool: &SqlitePool, coord: i64, day: NaiveDate) -> Vec<(i64, i64)> {
        list_windows(pool, coord, Some(day))
            .await
            .unwrap()
            .into_iter()
            .map(|w| (w.start_minute, w.end_minute))
            .collect()
    }

    async fn slot_starts(pool: &SqlitePool, coord: i64, day: NaiveDate) -> Vec<i64> {
        list_slots(pool, &[coord], day, false)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.start_minute)
            .collect()
    }

    #[tokio::test]
    async fn create_window_generates_fixed_slots() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;

        let created = create_window(&pool, coord, day, t("09:00"), t("10:00"), 15).await.unwrap();
        assert_eq!(created.slots.len(), 4);
        assert_eq!(created.slots[3].end_minute, t("10:00"));
        assert!(created.slots.iter().all(|s| !s.is_booked));
    }

    #[tokio::test]
    async fn day_must_be_enabled() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;
        let other = day + chrono::Duration::days(1);

        let err = create_window(&pool, coord, other, t("09:00"), t("10:00"), 10).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn invalid_ranges_are_rejected() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;

        assert!(create_window(&pool, coord, day, t("10:00"), t("09:00"), 10).await.is_err());
        assert!(create_window(&pool, coord, day, t("09:00"), t("09:05"), 10).await.is_err());
        assert!(create_window(&pool, coord, day, t("09:00"), t("10:00"), 0).await.is_err());
    }

    #[tokio::test]
    async fn overlapping_window_clips_the_old_one() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;

        create_window(&pool, coord, day, t("09:00"), t("11:00"), 30).await.unwrap();
        create_window(&pool, coord, day, t("10:00"), t("12:00"), 20).await.unwrap();

        assert_eq!(windows_of(&pool, coord, day).await, vec![(t("09:00"), t("10:00")), (t("10:00"), t("12:00"))]);
        // 09:00 e 09:30 da janela antiga, depois slots de 20 min da nova
        assert_eq!(
            slot_starts(&pool, coord, day).await,
            vec![t("09:00"), t("09:30"), t("10:00"), t("10:20"), t("10:40"), t("11:00"), t("11:20"), t("11:40")]
        );
    }

    #[tokio::test]
    async fn window_over_booked_slot_is_rejected_and_nothing_changes() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;

        let created = create_window(&pool, coord, day, t("09:00"), t("10:00"), 30).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        book_slot(&mut conn, created.slots[1].id).await.unwrap();
        drop(conn);

        let err = create_window(&pool, coord, day, t("09:15"), t("11:00"), 15).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "booked_slots_overlap", .. }));
        assert_eq!(windows_of(&pool, coord, day).await, vec![(t("09:00"), t("10:00"))]);
        assert_eq!(slot_starts(&pool, coord, day).await, vec![t("09:00"), t("09:30")]);
    }

    #[tokio::test]
    async fn delete_range_splits_window_in_two() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;

        create_window(&pool, coord, day, t("09:00"), t("12:00"), 30).await.unwrap();
        let result = delete_range(&pool, coord, day, t("10:00"), t("11:00")).await.unwrap();

        assert_eq!(result, RangeDeletion { deleted_slots: 2, removed_windows: 1, created_windows: 2 });
        assert_eq!(windows_of(&pool, coord, day).await, vec![(t("09:00"), t("10:00")), (t("11:00"), t("12:00"))]);
        assert_eq!(slot_starts(&pool, coord, day).await, vec![t("09:00"), t("09:30"), t("11:00"), t("11:30")]);
    }

    #[tokio::test]
    async fn remainder_without_slots_is_dropped() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;

        create_window(&pool, coord, day, t("09:00"), t("10:00"), 30).await.unwrap();
        // corta a meio do primeiro slot: a sobra 09:00-09:10 fica sem slots
        let result = delete_range(&pool, coord, day, t("09:10"), t("09:40")).await.unwrap();

        assert_eq!(result.deleted_slots, 2);
        assert!(windows_of(&pool, coord, day).await.is_empty());
        assert!(slot_starts(&pool, coord, day).await.is_empty());
    }

    #[tokio::test]
    async fn delete_range_with_booked_slot_is_a_conflict() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;

        let created = create_window(&pool, coord, day, t("09:00"), t("10:00"), 30).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        book_slot(&mut conn, created.slots[0].id).await.unwrap();
        drop(conn);

        let err = delete_window(&pool, coord, created.window.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn other_coordinators_window_is_not_found() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;
        let other = testing::insert_user(&pool, "coord2", &["coordinator"], None).await;

        let created = create_window(&pool, coord, day, t("09:00"), t("10:00"), 30).await.unwrap();
        let err = delete_window(&pool, other, created.window.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn second_booking_loses_the_race() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;
        let created = create_window(&pool, coord, day, t("09:00"), t("09:30"), 30).await.unwrap();
        let slot_id = created.slots[0].id;

        let mut conn = pool.acquire().await.unwrap();
        book_slot(&mut conn, slot_id).await.unwrap();
        let err = book_slot(&mut conn, slot_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "slot_unavailable", .. }));

        release_slot(&mut conn, slot_id).await.unwrap();
        book_slot(&mut conn, slot_id).await.unwrap();
    }

    #[tokio::test]
    async fn bulk_reports_each_day() {
        let pool = db::test_pool().await;
        let (coord, day) = setup(&pool).await;
        let not_enabled = day + chrono::Duration::days(1);

        let outcomes = bulk_create_windows(&pool, coord, &[day, not_enabled], t("08:00"), t("09:00"), 20).await;
        assert!(outcomes[0].ok);
        assert_eq!(outcomes[0].slots_created, 3);
        assert!(!outcomes[1].ok);
        assert!(outcomes[1].error.is_some());
    }
}
