// src/models/user.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_COORDINATOR: &str = "coordinator";
pub const ROLE_SOCIAL_SERVICE: &str = "social_service";
pub const ROLE_STUDENT: &str = "student";
pub const ROLE_TECH: &str = "tech";
pub const ROLE_HELPDESK_ADMIN: &str = "helpdesk_admin";
pub const ROLE_STAFF: &str = "staff";

pub const DEFINED_ROLES: &[&str] = &[
    ROLE_ADMIN,
    ROLE_COORDINATOR,
    ROLE_SOCIAL_SERVICE,
    ROLE_STUDENT,
    ROLE_TECH,
    ROLE_HELPDESK_ADMIN,
    ROLE_STAFF,
];

/// `true` se alguma das roles estiver em `required`. `admin` passa sempre.
pub fn roles_include(roles: &[String], required: &[&str]) -> bool {
    roles.iter().any(|role| {
        role.eq_ignore_ascii_case(ROLE_ADMIN) || required.iter().any(|req| req.eq_ignore_ascii_case(role))
    })
}

// Representa um utilizador lido da tabela 'users'
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub program_id: Option<i64>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Versão pública do utilizador (sem hash), com as roles.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub program_id: Option<i64>,
    pub is_active: bool,
    pub roles: Vec<String>,
}

impl UserSummary {
    pub fn new(user: User, roles: Vec<String>) -> Self {
        UserSummary {
            full_name: user.full_name(),
            id: user.id,
            username: user.username,
            email: user.email,
            program_id: user.program_id,
            is_active: user.is_active,
            roles,
        }
    }
}

/// Utilizador autenticado do pedido atual (injetado pelo middleware de autenticação).
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub roles: Vec<String>,
}

impl CurrentUser {
    pub fn has_any_role(&self, required: &[&str]) -> bool {
        roles_include(&self.roles, required)
    }

    pub fn is_admin(&self) -> bool {
        self.has_any_role(&[])
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Program {
    pub id: i64,
    pub key: String,
    pub name: String,
}

// Struct para dados do formulário de login (HTML e JSON usam os mesmos nomes)
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserPayload {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub program_id: Option<i64>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub program_id: Option<i64>,
    pub is_active: Option<bool>,
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordPayload {
    pub new_password: String,
}
