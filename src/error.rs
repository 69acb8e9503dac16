// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro na base de dados: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Erro de migração da base de dados: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Erro ao processar password")]
    PasswordHashingError,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Erro na sessão: {0}")]
    SessionError(String),

    #[error("Erro interno inesperado")]
    InternalServerError,

    #[error("Não autenticado")]
    Unauthorized,

    #[error("Sem permissão")]
    Forbidden,

    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Pedido inválido: {0}")]
    BadRequest(String),

    // Regra de negócio violada; `code` vai para o cliente tal como está
    #[error("Conflito ({code}): {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Transição inválida: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl AppError {
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Conflict { code, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// Estado HTTP e código estável enviados ao cliente.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict { code, .. } => (StatusCode::CONFLICT, *code),
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            AppError::SqlxError(_)
            | AppError::SqlxMigrateError(_)
            | AppError::PasswordHashingError
            | AppError::SessionError(_)
            | AppError::InternalServerError => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

// Como converter AppError numa resposta HTTP
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();

        // Erros 5xx: detalhe só nos logs, mensagem genérica para o cliente
        let message = if status.is_server_error() {
            tracing::error!("Erro processado: {:?}", self);
            "Ocorreu um erro inesperado.".to_string()
        } else {
            tracing::debug!("Erro de cliente: {}", self);
            match &self {
                AppError::InvalidCredentials => "Utilizador ou senha inválidos.".to_string(),
                AppError::Conflict { message, .. } => message.clone(),
                AppError::BadRequest(msg) => msg.clone(),
                AppError::NotFound(what) => format!("{} não encontrado.", what),
                other => other.to_string(),
            }
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

// Tipo Result padrão para a aplicação
pub type AppResult<T = ()> = Result<T, AppError>;
