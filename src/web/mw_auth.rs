// src/web/mw_auth.rs
use crate::{
    error::AppError,
    models::user::CurrentUser,
    services::user_service,
    state::AppState,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

/// Chave da sessão onde fica o id do utilizador autenticado.
pub const SESSION_USER_KEY: &str = "user_id";

/// Resolve o utilizador da sessão. `None` se não houver sessão válida
/// (sem id, utilizador apagado ou desativado).
async fn load_current_user(state: &AppState, session: &Session) -> Result<Option<CurrentUser>, AppError> {
    let user_id = session
        .get::<i64>(SESSION_USER_KEY)
        .await
        .map_err(|e| AppError::SessionError(format!("Erro ao verificar sessão: {}", e)))?;
    let Some(user_id) = user_id else {
        return Ok(None);
    };

    match user_service::find_user_by_id(&state.db_pool, user_id).await? {
        Some(user) if user.is_active => {
            let roles = user_service::get_user_roles(&state.db_pool, user.id).await?;
            Ok(Some(CurrentUser {
                id: user.id,
                username: user.username,
                roles,
            }))
        }
        _ => {
            tracing::warn!("Sessão com utilizador {} inexistente ou inativo; a limpar.", user_id);
            session
                .flush()
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao limpar sessão: {}", e)))?;
            Ok(None)
        }
    }
}

// Middleware das rotas JSON: sem sessão -> 401
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match load_current_user(&state, &session).await? {
        Some(user) => {
            tracing::debug!("Autenticação MW: '{}' autenticado.", user.username);
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        None => {
            tracing::debug!("Autenticação MW: não autenticado.");
            Err(AppError::Unauthorized)
        }
    }
}

// Middleware das páginas HTML: sem sessão -> /login
pub async fn require_page_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match load_current_user(&state, &session).await? {
        Some(user) => {
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        None => {
            tracing::debug!("Autenticação MW: redirecionando para /login");
            Ok(Redirect::to("/login").into_response())
        }
    }
}
