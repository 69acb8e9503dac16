// src/models/inventory.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Active,
    Maintenance,
    Damaged,
    Retired,
    Lost,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "ACTIVE",
            ItemStatus::Maintenance => "MAINTENANCE",
            ItemStatus::Damaged => "DAMAGED",
            ItemStatus::Retired => "RETIRED",
            ItemStatus::Lost => "LOST",
        }
    }

    pub fn can_be_assigned(&self) -> bool {
        !matches!(self, ItemStatus::Retired | ItemStatus::Lost)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryItem {
    pub id: i64,
    pub inventory_number: String,
    pub category: String,
    pub brand: String,
    pub model: String,
    pub serial_number: Option<String>,
    pub department: String,
    pub location: Option<String>,
    pub assigned_to_user_id: Option<i64>,
    pub status: ItemStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub item_id: i64,
    pub event_type: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryStats {
    pub total: i64,
    pub by_status: Vec<crate::models::helpdesk::CountByKey>,
    pub by_category: Vec<crate::models::helpdesk::CountByKey>,
}

// --- Payloads da API ---

#[derive(Debug, Deserialize)]
pub struct CreateItemPayload {
    pub inventory_number: String,
    pub category: String,
    pub brand: String,
    pub model: String,
    pub serial_number: Option<String>,
    pub department: String,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemPayload {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignItemPayload {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ItemStatusPayload {
    pub status: ItemStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemFilters {
    pub category: Option<String>,
    pub status: Option<ItemStatus>,
    pub department: Option<String>,
    pub assigned_to: Option<i64>,
    /// Pesquisa livre em número de inventário, marca, modelo e série
    pub q: Option<String>,
}
