// src/services/mod.rs
pub mod auth_service;
pub mod catalog_service;
pub mod inventory_service;
pub mod period_service;
pub mod request_service;
pub mod slot_service;
pub mod ticket_service;
pub mod user_service;

#[cfg(test)]
pub mod testing;
