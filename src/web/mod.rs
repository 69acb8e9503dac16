// src/web/mod.rs
pub mod admin_handlers;
pub mod auth_handlers;
pub mod coord_handlers;
pub mod inventory_handlers;
pub mod mw_auth;
pub mod mw_role;
pub mod routes;
pub mod student_handlers;
pub mod ticket_handlers;
pub mod user_handlers;
pub mod ws_handlers;
