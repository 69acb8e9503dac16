// src/services/user_service.rs
use crate::{
    db,
    error::{AppError, AppResult},
    models::user::{
        CreateUserPayload, Program, UpdateUserPayload, User, UserSummary, DEFINED_ROLES,
        ROLE_COORDINATOR, roles_include,
    },
    services::auth_service,
};
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, username, password_hash, first_name, last_name, email, program_id, is_active, created_at, updated_at";

pub const MIN_PASSWORD_LEN: usize = 6;

pub async fn find_user_by_id(db_pool: &SqlitePool, user_id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

pub async fn find_user_by_username(db_pool: &SqlitePool, username: &str) -> AppResult<Option<User>> {
    tracing::debug!("Buscando utilizador por username: {}", username);
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
        .bind(username.trim())
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

/// Busca as roles (funções) de um utilizador específico.
pub async fn get_user_roles(db_pool: &SqlitePool, user_id: i64) -> AppResult<Vec<String>> {
    let roles = sqlx::query_scalar::<_, String>("SELECT role FROM user_roles WHERE user_id = ? ORDER BY role ASC")
        .bind(user_id)
        .fetch_all(db_pool)
        .await?;
    tracing::debug!("Roles encontradas para {}: {:?}", user_id, roles);
    Ok(roles)
}

/// `true` se tiver alguma das roles pedidas. `admin` passa sempre.
pub async fn check_user_role_any(db_pool: &SqlitePool, user_id: i64, required_roles: &[&str]) -> AppResult<bool> {
    if required_roles.is_empty() {
        return Ok(true);
    }
    let roles = get_user_roles(db_pool, user_id).await?;
    Ok(roles_include(&roles, required_roles))
}


pub async fn get_user_summary(db_pool: &SqlitePool, user_id: i64) -> AppResult<UserSummary> {
    let user = find_user_by_id(db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Utilizador"))?;
    let roles = get_user_roles(db_pool, user_id).await?;
    Ok(UserSummary::new(user, roles))
}

/// Todos os utilizadores com as suas roles, ordenados por username.
pub async fn find_all_users(db_pool: &SqlitePool) -> AppResult<Vec<UserSummary>> {
    let users = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY username ASC", USER_COLUMNS))
        .fetch_all(db_pool)
        .await?;

    let mut summaries = Vec::with_capacity(users.len());
    for user in users {
        let roles = get_user_roles(db_pool, user.id).await?;
        summaries.push(UserSummary::new(user, roles));
    }
    tracing::debug!("Encontrados {} utilizadores.", summaries.len());
    Ok(summaries)
}

fn validate_roles(roles: &[String]) -> AppResult<()> {
    for role in roles {
        if !DEFINED_ROLES.iter().any(|defined| defined.eq_ignore_ascii_case(role)) {
            return Err(AppError::bad_request(format!("Role desconhecida: '{}'", role)));
        }
    }
    Ok(())
}

/// Cria um utilizador e as suas roles numa única transação. Devolve o novo id.
pub async fn create_user(db_pool: &SqlitePool, payload: &CreateUserPayload) -> AppResult<i64> {
    tracing::info!("Tentando criar utilizador: {}", payload.username);

    if payload.username.trim().is_empty()
        || payload.first_name.trim().is_empty()
        || payload.last_name.trim().is_empty()
    {
        return Err(AppError::bad_request("Username, nome e apelido são obrigatórios."));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "A senha precisa de pelo menos {} caracteres.",
            MIN_PASSWORD_LEN
        )));
    }
    validate_roles(&payload.roles)?;

    let password_hash = auth_service::hash_password(&payload.password).await?;

    let mut tx = db::begin_write(db_pool).await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, first_name, last_name, email, program_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(payload.username.trim())
    .bind(&password_hash)
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(&payload.email)
    .bind(payload.program_id)
    .execute(&mut *tx)
    .await;

    let user_id = match inserted {
        Ok(res) => res.last_insert_rowid(),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::warn!("Falha ao criar user: username '{}' já existe.", payload.username);
            return Err(AppError::conflict("duplicate_username", "Já existe um utilizador com esse username."));
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            return Err(AppError::bad_request("Programa inexistente."));
        }
        Err(e) => return Err(e.into()),
    };

    for role in &payload.roles {
        sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(role.to_ascii_lowercase())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::info!("✅ Utilizador '{}' criado com id {}.", payload.username, user_id);
    Ok(user_id)
}

/// Atualização parcial: só os campos presentes no payload mudam.
pub async fn update_user(db_pool: &SqlitePool, user_id: i64, payload: &UpdateUserPayload) -> AppResult<()> {
    tracing::info!("Atualizando dados para user: {}", user_id);
    if let Some(roles) = &payload.roles {
        validate_roles(roles)?;
    }

    let mut tx = db::begin_write(db_pool).await?;

    let current = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Utilizador"))?;

    let first_name = payload.first_name.as_deref().unwrap_or(&current.first_name);
    let last_name = payload.last_name.as_deref().unwrap_or(&current.last_name);
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(AppError::bad_request("Nome e apelido não podem ficar vazios."));
    }

    sqlx::query(
        r#"
        UPDATE users
        SET first_name = ?1, last_name = ?2, email = ?3, program_id = ?4, is_active = ?5
        WHERE id = ?6
        "#,
    )
    .bind(first_name.trim())
    .bind(last_name.trim())
    .bind(payload.email.as_ref().or(current.email.as_ref()))
    .bind(payload.program_id.or(current.program_id))
    .bind(payload.is_active.unwrap_or(current.is_active))
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    if let Some(roles) = &payload.roles {
        // Substitui todas as roles de uma vez
        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for role in roles {
            sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)")
                .bind(user_id)
                .bind(role.to_ascii_lowercase())
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    tracing::info!("✅ Dados atualizados com sucesso para user: {}", user_id);
    Ok(())
}

pub async fn update_user_password(db_pool: &SqlitePool, user_id: i64, new_raw_password: &str) -> AppResult<()> {
    if new_raw_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "A senha precisa de pelo menos {} caracteres.",
            MIN_PASSWORD_LEN
        )));
    }
    let new_password_hash = auth_service::hash_password(new_raw_password).await?;

    let rows_affected = sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
        .bind(new_password_hash)
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Falha ao alterar senha: Utilizador '{}' não encontrado.", user_id);
        return Err(AppError::not_found("Utilizador"));
    }
    tracing::info!("✅ Senha alterada com sucesso para user: {}", user_id);
    Ok(())
}

// --- Programas académicos e coordenadores ---

pub async fn list_programs(db_pool: &SqlitePool) -> AppResult<Vec<Program>> {
    let programs = sqlx::query_as::<_, Program>("SELECT id, key, name FROM programs ORDER BY name ASC")
        .fetch_all(db_pool)
        .await?;
    Ok(programs)
}

pub async fn find_program_by_key(db_pool: &SqlitePool, key: &str) -> AppResult<Option<Program>> {
    let program = sqlx::query_as::<_, Program>("SELECT id, key, name FROM programs WHERE key = ?")
        .bind(key)
        .fetch_optional(db_pool)
        .await?;
    Ok(program)
}

pub async fn add_program_coordinator(db_pool: &SqlitePool, program_id: i64, coordinator_id: i64) -> AppResult<()> {
    if !check_user_role_any(db_pool, coordinator_id, &[ROLE_COORDINATOR]).await? {
        return Err(AppError::bad_request("O utilizador indicado não é coordenador."));
    }
    let result = sqlx::query("INSERT OR IGNORE INTO program_coordinators (program_id, coordinator_id) VALUES (?, ?)")
        .bind(program_id)
        .bind(coordinator_id)
        .execute(db_pool)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            Err(AppError::not_found("Programa"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Programas de que o utilizador é coordenador.
pub async fn coordinator_program_ids(db_pool: &SqlitePool, coordinator_id: i64) -> AppResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT program_id FROM program_coordinators WHERE coordinator_id = ? ORDER BY program_id",
    )
    .bind(coordinator_id)
    .fetch_all(db_pool)
    .await?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, services::testing};

    fn payload(username: &str, roles: &[&str]) -> CreateUserPayload {
        CreateUserPayload {
            username: username.into(),
            password: "segredo123".into(),
            first_name: "Marta".into(),
            last_name: "Gil".into(),
            email: Some("marta@itcj.edu.mx".into()),
            program_id: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let pool = db::test_pool().await;
        create_user(&pool, &payload("mgil", &["staff"])).await.unwrap();
        let err = create_user(&pool, &payload("MGIL", &[])).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "duplicate_username", .. }));
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let pool = db::test_pool().await;
        let err = create_user(&pool, &payload("x1", &["superuser"])).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn update_replaces_roles_and_keeps_missing_fields() {
        let pool = db::test_pool().await;
        let id = testing::insert_user(&pool, "jtec", &["tech"], None).await;

        let changes = UpdateUserPayload {
            first_name: None,
            last_name: Some("Soto".into()),
            email: None,
            program_id: None,
            is_active: Some(false),
            roles: Some(vec!["helpdesk_admin".into(), "tech".into()]),
        };
        update_user(&pool, id, &changes).await.unwrap();

        let summary = get_user_summary(&pool, id).await.unwrap();
        assert_eq!(summary.roles, vec!["helpdesk_admin", "tech"]);
        assert!(summary.full_name.ends_with("Soto"));
        assert!(!summary.is_active);
    }

    #[tokio::test]
    async fn admin_passes_every_role_check() {
        let pool = db::test_pool().await;
        let admin = testing::insert_user(&pool, "root", &["admin"], None).await;
        let student = testing::insert_user(&pool, "alu", &["student"], None).await;

        assert!(check_user_role_any(&pool, admin, &["coordinator"]).await.unwrap());
        assert!(!check_user_role_any(&pool, student, &["coordinator"]).await.unwrap());
    }

    #[tokio::test]
    async fn only_coordinators_can_be_linked_to_programs() {
        let pool = db::test_pool().await;
        let program = testing::insert_program(&pool, "ISC").await;
        let coord = testing::insert_user(&pool, "coord", &["coordinator"], None).await;
        let student = testing::insert_user(&pool, "alu", &["student"], Some(program)).await;

        add_program_coordinator(&pool, program, coord).await.unwrap();
        assert_eq!(coordinator_program_ids(&pool, coord).await.unwrap(), vec![program]);

        let err = add_program_coordinator(&pool, program, student).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
