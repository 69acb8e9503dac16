// src/models/mod.rs
pub mod agenda;
pub mod helpdesk;
pub mod inventory;
pub mod notification;
pub mod period;
pub mod user;
