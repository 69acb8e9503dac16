// src/services/ticket_service.rs
use crate::{
    db,
    error::{AppError, AppResult},
    models::{
        helpdesk::{
            Area, AssignTicketPayload, CommentPayload, CountByKey, CreateTicketPayload, RateTicketPayload,
            ResolveTicketPayload, Ticket, TicketAssignment, TicketComment, TicketDetail, TicketFilters,
            TicketStats, TicketStatus,
        },
        inventory::ItemStatus,
        user::{CurrentUser, ROLE_HELPDESK_ADMIN, ROLE_TECH},
    },
    services::user_service,
};
use chrono::{Datelike, Local};
use sqlx::{SqliteConnection, SqlitePool};

const TICKET_COLUMNS: &str = r#"id, ticket_number, requester_id, area, category_id, title, description, priority,
    status, assigned_to_id, inventory_item_id, resolution_notes, rating, rating_comment,
    created_at, updated_at, resolved_at, closed_at"#;

pub const TITLE_LEN: std::ops::RangeInclusive<usize> = 5..=200;
pub const MIN_DESCRIPTION_LEN: usize = 10;
pub const MIN_RESOLUTION_LEN: usize = 10;

fn is_staff(user: &CurrentUser) -> bool {
    user.has_any_role(&[ROLE_TECH, ROLE_HELPDESK_ADMIN])
}

fn is_helpdesk_admin(user: &CurrentUser) -> bool {
    user.has_any_role(&[ROLE_HELPDESK_ADMIN])
}

fn can_view(user: &CurrentUser, ticket: &Ticket) -> bool {
    is_helpdesk_admin(user) || ticket.requester_id == user.id || ticket.assigned_to_id == Some(user.id)
}

fn ensure_transition(ticket: &Ticket, to: TicketStatus) -> AppResult<()> {
    if ticket.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: ticket.status.as_str().into(),
            to: to.as_str().into(),
        })
    }
}

async fn ticket_in(conn: &mut SqliteConnection, ticket_id: i64) -> AppResult<Option<Ticket>> {
    let ticket = sqlx::query_as::<_, Ticket>(&format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS))
        .bind(ticket_id)
        .fetch_optional(conn)
        .await?;
    Ok(ticket)
}

/// Lê o ticket e confirma que o utilizador o pode ver. Tickets alheios dão 404.
async fn visible_ticket_in(conn: &mut SqliteConnection, user: &CurrentUser, ticket_id: i64) -> AppResult<Ticket> {
    ticket_in(conn, ticket_id)
        .await?
        .filter(|t| can_view(user, t))
        .ok_or_else(|| AppError::not_found("Ticket"))
}

/// Próximo número `TK-<ano>-<seq>` com sequência por ano.
async fn next_ticket_number(conn: &mut SqliteConnection, year: i32) -> AppResult<String> {
    let prefix = format!("TK-{}-", year);
    let last: Option<String> = sqlx::query_scalar(
        r#"
        SELECT ticket_number FROM tickets
        WHERE ticket_number LIKE ? || '%'
        ORDER BY length(ticket_number) DESC, ticket_number DESC
        LIMIT 1
        "#,
    )
    .bind(&prefix)
    .fetch_optional(conn)
    .await?;

    let seq = last
        .and_then(|n| n.strip_prefix(&prefix).and_then(|s| s.parse::<u32>().ok()))
        .unwrap_or(0)
        + 1;
    Ok(format!("{}{:04}", prefix, seq))
}

pub async fn create_ticket(db_pool: &SqlitePool, user: &CurrentUser, payload: &CreateTicketPayload) -> AppResult<Ticket> {
    let title = payload.title.trim();
    let description = payload.description.trim();
    if !TITLE_LEN.contains(&title.chars().count()) {
        return Err(AppError::bad_request("O título deve ter entre 5 e 200 caracteres."));
    }
    if description.chars().count() < MIN_DESCRIPTION_LEN {
        return Err(AppError::bad_request("A descrição deve ter pelo menos 10 caracteres."));
    }

    let mut tx = db::begin_write(db_pool).await?;

    if let Some(category_id) = payload.category_id {
        let category: Option<(Area, bool)> =
            sqlx::query_as("SELECT area, is_active FROM helpdesk_categories WHERE id = ?")
                .bind(category_id)
                .fetch_optional(&mut *tx)
                .await?;
        match category {
            Some((area, true)) if area == payload.area => {}
            Some((_, true)) => return Err(AppError::bad_request("A categoria não pertence à área escolhida.")),
            Some((_, false)) => return Err(AppError::bad_request("A categoria está inativa.")),
            None => return Err(AppError::bad_request("Categoria inexistente.")),
        }
    }

    if let Some(item_id) = payload.inventory_item_id {
        let status: Option<ItemStatus> = sqlx::query_scalar("SELECT status FROM inventory_items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?;
        match status {
            None => return Err(AppError::bad_request("Equipamento inexistente.")),
            Some(ItemStatus::Retired) => return Err(AppError::bad_request("O equipamento foi dado de baixa.")),
            Some(_) => {}
        }
    }

    let number = next_ticket_number(&mut tx, Local::now().year()).await?;
    let ticket_id = sqlx::query(
        r#"
        INSERT INTO tickets (ticket_number, requester_id, area, category_id, title, description, priority, inventory_item_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&number)
    .bind(user.id)
    .bind(payload.area)
    .bind(payload.category_id)
    .bind(title)
    .bind(description)
    .bind(payload.priority)
    .bind(payload.inventory_item_id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let ticket = ticket_in(&mut tx, ticket_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;

    tracing::info!("🎫 Ticket {} criado por {}.", number, user.username);
    Ok(ticket)
}

pub async fn list_tickets(db_pool: &SqlitePool, user: &CurrentUser, filters: &TicketFilters) -> AppResult<Vec<Ticket>> {
    let tickets = sqlx::query_as::<_, Ticket>(&format!(
        r#"
        SELECT {} FROM tickets
        WHERE (?1 = 1 OR requester_id = ?2 OR (?3 = 1 AND assigned_to_id = ?2))
          AND (?4 = 0 OR requester_id = ?2)
          AND (?5 IS NULL OR status = ?5)
          AND (?6 IS NULL OR area = ?6)
          AND (?7 IS NULL OR priority = ?7)
          AND (?8 IS NULL OR assigned_to_id = ?8)
        ORDER BY created_at DESC, id DESC
        "#,
        TICKET_COLUMNS
    ))
    .bind(is_helpdesk_admin(user))
    .bind(user.id)
    .bind(user.has_any_role(&[ROLE_TECH]))
    .bind(filters.mine)
    .bind(filters.status)
    .bind(filters.area)
    .bind(filters.priority)
    .bind(filters.assigned_to)
    .fetch_all(db_pool)
    .await?;
    Ok(tickets)
}

pub async fn get_ticket_detail(db_pool: &SqlitePool, user: &CurrentUser, ticket_id: i64) -> AppResult<TicketDetail> {
    let mut conn = db_pool.acquire().await?;
    let ticket = visible_ticket_in(&mut conn, user, ticket_id).await?;

    let comments = sqlx::query_as::<_, TicketComment>(
        r#"
        SELECT c.id, c.ticket_id, c.author_id, (u.first_name || ' ' || u.last_name) AS author_name,
               c.content, c.is_internal, c.created_at
        FROM ticket_comments c
        JOIN users u ON u.id = c.author_id
        WHERE c.ticket_id = ?1 AND (?2 = 1 OR c.is_internal = 0)
        ORDER BY c.created_at, c.id
        "#,
    )
    .bind(ticket_id)
    // quem abriu o ticket nunca vê notas internas, mesmo sendo técnico
    .bind(is_staff(user) && ticket.requester_id != user.id)
    .fetch_all(&mut *conn)
    .await?;

    let assignments = sqlx::query_as::<_, TicketAssignment>(
        r#"
        SELECT id, ticket_id, assigned_by_id, assigned_to_id, reason, assigned_at, unassigned_at
        FROM ticket_assignments WHERE ticket_id = ? ORDER BY assigned_at, id
        "#,
    )
    .bind(ticket_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(TicketDetail {
        ticket,
        comments,
        assignments,
    })
}

/// Atribui (ou reatribui) o ticket a um técnico. Devolve o ticket e o técnico anterior.
pub async fn assign_ticket(
    db_pool: &SqlitePool,
    user: &CurrentUser,
    ticket_id: i64,
    payload: &AssignTicketPayload,
) -> AppResult<(Ticket, Option<i64>)> {
    let target_roles = user_service::get_user_roles(db_pool, payload.assigned_to_id).await?;
    if !target_roles.iter().any(|r| r.eq_ignore_ascii_case(ROLE_TECH)) {
        return Err(AppError::bad_request("O utilizador escolhido não é técnico."));
    }

    let mut tx = db::begin_write(db_pool).await?;
    let ticket = ticket_in(&mut tx, ticket_id)
        .await?
        .ok_or_else(|| AppError::not_found("Ticket"))?;
    ensure_transition(&ticket, TicketStatus::Assigned)?;

    sqlx::query("UPDATE ticket_assignments SET unassigned_at = CURRENT_TIMESTAMP WHERE ticket_id = ? AND unassigned_at IS NULL")
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO ticket_assignments (ticket_id, assigned_by_id, assigned_to_id, reason) VALUES (?, ?, ?, ?)")
        .bind(ticket_id)
        .bind(user.id)
        .bind(payload.assigned_to_id)
        .bind(payload.reason.as_deref())
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "UPDATE tickets SET status = 'ASSIGNED', assigned_to_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(payload.assigned_to_id)
    .bind(ticket_id)
    .execute(&mut *tx)
    .await?;

    let updated = ticket_in(&mut tx, ticket_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;

    tracing::info!(
        "Ticket {} atribuído ao técnico {} por {}.",
        updated.ticket_number,
        payload.assigned_to_id,
        user.username
    );
    let previous = ticket.assigned_to_id.filter(|&id| id != payload.assigned_to_id);
    Ok((updated, previous))
}

/// Só o técnico atribuído (ou um helpdesk_admin) trabalha o ticket.
fn ensure_assignee(user: &CurrentUser, ticket: &Ticket) -> AppResult<()> {
    if ticket.assigned_to_id == Some(user.id) || is_helpdesk_admin(user) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub async fn start_ticket(db_pool: &SqlitePool, user: &CurrentUser, ticket_id: i64) -> AppResult<Ticket> {
    let mut tx = db::begin_write(db_pool).await?;
    let ticket = visible_ticket_in(&mut tx, user, ticket_id).await?;
    ensure_assignee(user, &ticket)?;
    ensure_transition(&ticket, TicketStatus::InProgress)?;

    sqlx::query("UPDATE tickets SET status = 'IN_PROGRESS', updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;

    let updated = ticket_in(&mut tx, ticket_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn resolve_ticket(
    db_pool: &SqlitePool,
    user: &CurrentUser,
    ticket_id: i64,
    payload: &ResolveTicketPayload,
) -> AppResult<Ticket> {
    let notes = payload.resolution_notes.trim();
    if notes.chars().count() < MIN_RESOLUTION_LEN {
        return Err(AppError::bad_request("As notas de resolução devem ter pelo menos 10 caracteres."));
    }
    let to = if payload.success {
        TicketStatus::ResolvedSuccess
    } else {
        TicketStatus::ResolvedFailed
    };

    let mut tx = db::begin_write(db_pool).await?;
    let ticket = visible_ticket_in(&mut tx, user, ticket_id).await?;
    ensure_assignee(user, &ticket)?;
    ensure_transition(&ticket, to)?;

    sqlx::query(
        r#"
        UPDATE tickets
        SET status = ?, resolution_notes = ?, resolved_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(to)
    .bind(notes)
    .bind(ticket_id)
    .execute(&mut *tx)
    .await?;

    let updated = ticket_in(&mut tx, ticket_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;
    tracing::info!("Ticket {} resolvido ({}).", updated.ticket_number, to.as_str());
    Ok(updated)
}

pub async fn cancel_ticket(db_pool: &SqlitePool, user: &CurrentUser, ticket_id: i64) -> AppResult<Ticket> {
    let mut tx = db::begin_write(db_pool).await?;
    let ticket = visible_ticket_in(&mut tx, user, ticket_id).await?;
    if ticket.requester_id != user.id {
        return Err(AppError::Forbidden);
    }
    ensure_transition(&ticket, TicketStatus::Canceled)?;

    sqlx::query("UPDATE tickets SET status = 'CANCELED', updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE ticket_assignments SET unassigned_at = CURRENT_TIMESTAMP WHERE ticket_id = ? AND unassigned_at IS NULL")
        .bind(ticket_id)
        .execute(&mut *tx)
        .await?;

    let updated = ticket_in(&mut tx, ticket_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;
    Ok(updated)
}

/// Avaliação do requerente; fecha o ticket.
pub async fn rate_ticket(
    db_pool: &SqlitePool,
    user: &CurrentUser,
    ticket_id: i64,
    payload: &RateTicketPayload,
) -> AppResult<Ticket> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::bad_request("A avaliação deve estar entre 1 e 5."));
    }

    let mut tx = db::begin_write(db_pool).await?;
    let ticket = visible_ticket_in(&mut tx, user, ticket_id).await?;
    if ticket.requester_id != user.id {
        return Err(AppError::Forbidden);
    }
    ensure_transition(&ticket, TicketStatus::Closed)?;

    sqlx::query(
        r#"
        UPDATE tickets
        SET status = 'CLOSED', rating = ?, rating_comment = ?, closed_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(payload.rating)
    .bind(payload.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()))
    .bind(ticket_id)
    .execute(&mut *tx)
    .await?;

    let updated = ticket_in(&mut tx, ticket_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn add_comment(
    db_pool: &SqlitePool,
    user: &CurrentUser,
    ticket_id: i64,
    payload: &CommentPayload,
) -> AppResult<(Ticket, TicketComment)> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("O comentário está vazio."));
    }
    if payload.is_internal && !is_staff(user) {
        return Err(AppError::Forbidden);
    }

    let mut tx = db::begin_write(db_pool).await?;
    let ticket = visible_ticket_in(&mut tx, user, ticket_id).await?;
    if ticket.status.is_terminal() {
        return Err(AppError::conflict("ticket_closed", "Não é possível comentar um ticket fechado."));
    }

    let comment_id = sqlx::query("INSERT INTO ticket_comments (ticket_id, author_id, content, is_internal) VALUES (?, ?, ?, ?)")
        .bind(ticket_id)
        .bind(user.id)
        .bind(content)
        .bind(payload.is_internal)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    let comment = sqlx::query_as::<_, TicketComment>(
        r#"
        SELECT c.id, c.ticket_id, c.author_id, (u.first_name || ' ' || u.last_name) AS author_name,
               c.content, c.is_internal, c.created_at
        FROM ticket_comments c JOIN users u ON u.id = c.author_id
        WHERE c.id = ?
        "#,
    )
    .bind(comment_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((ticket, comment))
}

pub async fn ticket_stats(db_pool: &SqlitePool) -> AppResult<TicketStats> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets").fetch_one(db_pool).await?;
    let by_status = sqlx::query_as::<_, CountByKey>(
        "SELECT status AS key, COUNT(*) AS count FROM tickets GROUP BY status ORDER BY status",
    )
    .fetch_all(db_pool)
    .await?;
    let by_area =
        sqlx::query_as::<_, CountByKey>("SELECT area AS key, COUNT(*) AS count FROM tickets GROUP BY area ORDER BY area")
            .fetch_all(db_pool)
            .await?;

    Ok(TicketStats { total, by_status, by_area })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        models::helpdesk::Priority,
        services::testing,
    };

    fn actor(id: i64, username: &str, roles: &[&str]) -> CurrentUser {
        CurrentUser {
            id,
            username: username.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    struct Fixture {
        pool: SqlitePool,
        requester: CurrentUser,
        tech: CurrentUser,
        boss: CurrentUser,
    }

    async fn fixture() -> Fixture {
        let pool = db::test_pool().await;
        let requester = testing::insert_user(&pool, "docente", &["staff"], None).await;
        let tech = testing::insert_user(&pool, "tecnico", &["tech"], None).await;
        let boss = testing::insert_user(&pool, "chefe", &["helpdesk_admin"], None).await;
        Fixture {
            pool,
            requester: actor(requester, "docente", &["staff"]),
            tech: actor(tech, "tecnico", &["tech"]),
            boss: actor(boss, "chefe", &["helpdesk_admin"]),
        }
    }

    fn payload(title: &str) -> CreateTicketPayload {
        CreateTicketPayload {
            area: Area::Soporte,
            category_id: None,
            title: title.into(),
            description: "O projetor da sala 4 não liga.".into(),
            priority: Priority::Alta,
            inventory_item_id: None,
        }
    }

    async fn assigned(f: &Fixture) -> Ticket {
        let ticket = create_ticket(&f.pool, &f.requester, &payload("Projetor avariado")).await.unwrap();
        let assign = AssignTicketPayload { assigned_to_id: f.tech.id, reason: None };
        assign_ticket(&f.pool, &f.boss, ticket.id, &assign).await.unwrap().0
    }

    #[tokio::test]
    async fn ticket_numbers_are_sequential_per_year() {
        let f = fixture().await;
        let a = create_ticket(&f.pool, &f.requester, &payload("Projetor avariado")).await.unwrap();
        let b = create_ticket(&f.pool, &f.requester, &payload("Rede em baixo")).await.unwrap();

        let year = Local::now().year();
        assert_eq!(a.ticket_number, format!("TK-{}-0001", year));
        assert_eq!(b.ticket_number, format!("TK-{}-0002", year));
        assert_eq!(a.status, TicketStatus::Pending);
    }

    #[tokio::test]
    async fn create_validates_title_and_category_area() {
        let f = fixture().await;
        assert!(matches!(
            create_ticket(&f.pool, &f.requester, &payload("Oi")).await,
            Err(AppError::BadRequest(_))
        ));

        let dev_category = sqlx::query("INSERT INTO helpdesk_categories (area, name) VALUES ('DESARROLLO', 'Sistemas')")
            .execute(&f.pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let wrong_area = CreateTicketPayload { category_id: Some(dev_category), ..payload("Projetor avariado") };
        assert!(matches!(
            create_ticket(&f.pool, &f.requester, &wrong_area).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn full_lifecycle_until_closed() {
        let f = fixture().await;
        let ticket = assigned(&f).await;
        assert_eq!(ticket.status, TicketStatus::Assigned);

        // o requerente não pode trabalhar o ticket
        assert!(matches!(start_ticket(&f.pool, &f.requester, ticket.id).await, Err(AppError::Forbidden)));

        let started = start_ticket(&f.pool, &f.tech, ticket.id).await.unwrap();
        assert_eq!(started.status, TicketStatus::InProgress);

        let short = ResolveTicketPayload { success: true, resolution_notes: "feito".into() };
        assert!(matches!(resolve_ticket(&f.pool, &f.tech, ticket.id, &short).await, Err(AppError::BadRequest(_))));

        let resolve = ResolveTicketPayload { success: true, resolution_notes: "Cabo HDMI substituído.".into() };
        let resolved = resolve_ticket(&f.pool, &f.tech, ticket.id, &resolve).await.unwrap();
        assert_eq!(resolved.status, TicketStatus::ResolvedSuccess);
        assert!(resolved.resolved_at.is_some());

        let rate = RateTicketPayload { rating: 5, comment: Some("Rápido".into()) };
        let closed = rate_ticket(&f.pool, &f.requester, ticket.id, &rate).await.unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);
        assert_eq!(closed.rating, Some(5));

        let again = rate_ticket(&f.pool, &f.requester, ticket.id, &rate).await.unwrap_err();
        assert!(matches!(again, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn in_progress_ticket_cannot_be_canceled() {
        let f = fixture().await;
        let ticket = assigned(&f).await;
        start_ticket(&f.pool, &f.tech, ticket.id).await.unwrap();

        let err = cancel_ticket(&f.pool, &f.requester, ticket.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn reassign_closes_previous_assignment() {
        let f = fixture().await;
        let ticket = assigned(&f).await;
        let other = testing::insert_user(&f.pool, "tecnico2", &["tech"], None).await;

        let (ticket, previous) =
            assign_ticket(&f.pool, &f.boss, ticket.id, &AssignTicketPayload { assigned_to_id: other, reason: None })
                .await
                .unwrap();
        assert_eq!(previous, Some(f.tech.id));
        assert_eq!(ticket.assigned_to_id, Some(other));

        let detail = get_ticket_detail(&f.pool, &f.boss, ticket.id).await.unwrap();
        assert_eq!(detail.assignments.len(), 2);
        assert!(detail.assignments[0].unassigned_at.is_some());
        assert!(detail.assignments[1].unassigned_at.is_none());
    }

    #[tokio::test]
    async fn assign_requires_a_tech() {
        let f = fixture().await;
        let ticket = create_ticket(&f.pool, &f.requester, &payload("Projetor avariado")).await.unwrap();
        let err = assign_ticket(
            &f.pool,
            &f.boss,
            ticket.id,
            &AssignTicketPayload { assigned_to_id: f.requester.id, reason: None },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn internal_comments_are_hidden_from_requester() {
        let f = fixture().await;
        let ticket = assigned(&f).await;

        let internal = CommentPayload { content: "Trocar lâmpada".into(), is_internal: true };
        let public = CommentPayload { content: "A caminho".into(), is_internal: false };
        add_comment(&f.pool, &f.tech, ticket.id, &internal).await.unwrap();
        add_comment(&f.pool, &f.tech, ticket.id, &public).await.unwrap();

        assert!(matches!(add_comment(&f.pool, &f.requester, ticket.id, &internal).await, Err(AppError::Forbidden)));

        let seen_by_requester = get_ticket_detail(&f.pool, &f.requester, ticket.id).await.unwrap();
        assert_eq!(seen_by_requester.comments.len(), 1);
        let seen_by_tech = get_ticket_detail(&f.pool, &f.tech, ticket.id).await.unwrap();
        assert_eq!(seen_by_tech.comments.len(), 2);
    }

    #[tokio::test]
    async fn listing_is_scoped_by_role() {
        let f = fixture().await;
        assigned(&f).await;
        let stranger = testing::insert_user(&f.pool, "aluno", &["student"], None).await;
        let stranger = actor(stranger, "aluno", &["student"]);
        create_ticket(&f.pool, &stranger, &payload("Wi-Fi na biblioteca")).await.unwrap();

        let all = list_tickets(&f.pool, &f.boss, &TicketFilters::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        let tech_view = list_tickets(&f.pool, &f.tech, &TicketFilters::default()).await.unwrap();
        assert_eq!(tech_view.len(), 1);
        let own = list_tickets(&f.pool, &stranger, &TicketFilters::default()).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].requester_id, stranger.id);

        // ticket alheio é 404
        let err = get_ticket_detail(&f.pool, &stranger, tech_view[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let stats = ticket_stats(&f.pool).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_area.len(), 1);
    }

    #[tokio::test]
    async fn tech_as_requester_does_not_see_internal_notes() {
        let f = fixture().await;
        let own = create_ticket(&f.pool, &f.tech, &payload("Teclado sem teclas")).await.unwrap();
        let note = CommentPayload { content: "Pedir teclado novo".into(), is_internal: true };
        add_comment(&f.pool, &f.boss, own.id, &note).await.unwrap();

        let as_requester = get_ticket_detail(&f.pool, &f.tech, own.id).await.unwrap();
        assert!(as_requester.comments.is_empty());
        let as_boss = get_ticket_detail(&f.pool, &f.boss, own.id).await.unwrap();
        assert_eq!(as_boss.comments.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_tickets_get_distinct_numbers() {
        let (pool, _dir) = db::test_file_pool().await;
        let requester = testing::insert_user(&pool, "docente", &["staff"], None).await;
        let requester = actor(requester, "docente", &["staff"]);

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let pool = pool.clone();
                let requester = requester.clone();
                tokio::spawn(async move {
                    create_ticket(&pool, &requester, &payload(&format!("Monitor avariado {}", i))).await
                })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().ticket_number);
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 6);
    }
}
