// src/web/mw_role.rs
// Deve correr *depois* de `require_auth` (precisa do CurrentUser nas extensões).
use crate::{
    error::AppError,
    models::user::{
        CurrentUser, ROLE_COORDINATOR, ROLE_HELPDESK_ADMIN, ROLE_SOCIAL_SERVICE, ROLE_STUDENT, ROLE_TECH,
    },
};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

pub const ADMIN_ROLES: &[&str] = &[];
pub const COORDINATOR_ROLES: &[&str] = &[ROLE_COORDINATOR];
pub const STUDENT_ROLES: &[&str] = &[ROLE_STUDENT];
pub const SOCIAL_SERVICE_ROLES: &[&str] = &[ROLE_SOCIAL_SERVICE];
pub const HELPDESK_ADMIN_ROLES: &[&str] = &[ROLE_HELPDESK_ADMIN];
pub const HELPDESK_STAFF_ROLES: &[&str] = &[ROLE_TECH, ROLE_HELPDESK_ADMIN];

async fn require_roles(
    user: &CurrentUser,
    required_roles: &[&str],
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if user.has_any_role(required_roles) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(
            "Role MW: acesso negado para {} (sem roles requeridas: {:?}).",
            user.username,
            required_roles
        );
        Err(AppError::Forbidden)
    }
}

/// Só `admin` (lista vazia: apenas o bypass de admin passa).
pub async fn require_admin(Extension(user): Extension<CurrentUser>, request: Request, next: Next) -> Result<Response, AppError> {
    require_roles(&user, ADMIN_ROLES, request, next).await
}

pub async fn require_coordinator(
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_roles(&user, COORDINATOR_ROLES, request, next).await
}

pub async fn require_student(Extension(user): Extension<CurrentUser>, request: Request, next: Next) -> Result<Response, AppError> {
    require_roles(&user, STUDENT_ROLES, request, next).await
}

pub async fn require_social_service(
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_roles(&user, SOCIAL_SERVICE_ROLES, request, next).await
}

pub async fn require_helpdesk_admin(
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_roles(&user, HELPDESK_ADMIN_ROLES, request, next).await
}

pub async fn require_helpdesk_staff(
    Extension(user): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_roles(&user, HELPDESK_STAFF_ROLES, request, next).await
}
