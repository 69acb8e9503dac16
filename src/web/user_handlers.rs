// src/web/user_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::CurrentUser,
    services::user_service,
    state::AppState,
    templates::HomePage,
};
use askama::Template;
use axum::{
    extract::{Extension, State},
    response::{Html, IntoResponse},
};

// Handler para GET / (protegido pelo middleware de páginas)
pub async fn home_page_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    tracing::debug!("GET /: Acesso para {}", current.username);

    let user = user_service::find_user_by_id(&state.db_pool, current.id)
        .await?
        .ok_or_else(|| {
            tracing::error!("CRÍTICO: utilizador {} autenticado não encontrado na DB!", current.id);
            AppError::InternalServerError
        })?;

    let template = HomePage::for_user(user.full_name(), &current);
    match template.render() {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            tracing::error!("Falha ao renderizar template HomePage: {}", e);
            Err(AppError::InternalServerError)
        }
    }
}
