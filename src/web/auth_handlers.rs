// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{CurrentUser, LoginForm, UserSummary},
    services::{auth_service, user_service},
    state::AppState,
    templates::LoginPage,
    web::mw_auth::SESSION_USER_KEY,
};
use askama::Template;
use axum::{
    extract::{Extension, Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    Json,
};
use tower_sessions::Session;

fn render_login(error: Option<String>) -> AppResult<Html<String>> {
    LoginPage { error }.render().map(Html).map_err(|e| {
        tracing::error!("Falha ao renderizar template de login: {}", e);
        AppError::InternalServerError
    })
}

/// Abre a sessão para o utilizador (id novo para evitar fixação de sessão).
async fn start_session(session: &Session, user_id: i64) -> AppResult<()> {
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao rodar ID: {}", e)))?;
    session
        .insert(SESSION_USER_KEY, user_id)
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao inserir na sessão: {}", e)))?;
    Ok(())
}

// GET /login
pub async fn show_login_form(session: Session) -> AppResult<impl IntoResponse> {
    if session.get::<i64>(SESSION_USER_KEY).await.ok().flatten().is_some() {
        tracing::debug!("GET /login: Utilizador já logado, redirecionando para /");
        return Ok(Redirect::to("/").into_response());
    }
    Ok(render_login(None)?.into_response())
}

// POST /login (formulário HTML)
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("Tentativa de login (formulário) para: {}", form.username);

    match auth_service::authenticate(&state.db_pool, &form.username, &form.password).await {
        Ok(user) => {
            start_session(&session, user.id).await?;
            tracing::info!("✅ Login bem-sucedido para: {}", user.username);
            Ok(Redirect::to("/").into_response())
        }
        Err(AppError::InvalidCredentials) => {
            // Mesma mensagem para utilizador inexistente, password errada ou conta inativa
            let page = render_login(Some("Utilizador ou password inválidos.".to_string()))?;
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(e),
    }
}

// GET /logout
pub async fn handle_logout(session: Session) -> AppResult<impl IntoResponse> {
    session
        .flush()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao terminar sessão: {}", e)))?;
    tracing::info!("Sessão terminada.");
    Ok(Redirect::to("/login"))
}

// --- API JSON ---

// POST /api/auth/login
pub async fn api_login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<UserSummary>> {
    tracing::info!("Tentativa de login (API) para: {}", form.username);
    let user = auth_service::authenticate(&state.db_pool, &form.username, &form.password).await?;
    start_session(&session, user.id).await?;

    let roles = user_service::get_user_roles(&state.db_pool, user.id).await?;
    tracing::info!("✅ Login bem-sucedido para: {}", user.username);
    Ok(Json(UserSummary::new(user, roles)))
}

// POST /api/auth/logout
pub async fn api_logout(session: Session) -> AppResult<StatusCode> {
    session
        .flush()
        .await
        .map_err(|e| AppError::SessionError(format!("Falha ao terminar sessão: {}", e)))?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/auth/me
pub async fn me(State(state): State<AppState>, Extension(user): Extension<CurrentUser>) -> AppResult<Json<UserSummary>> {
    Ok(Json(user_service::get_user_summary(&state.db_pool, user.id).await?))
}
