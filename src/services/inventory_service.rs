// src/services/inventory_service.rs
use crate::{
    db,
    error::{AppError, AppResult},
    models::{
        helpdesk::CountByKey,
        inventory::{
            CreateItemPayload, HistoryEntry, InventoryItem, InventoryStats, ItemFilters, ItemStatus, UpdateItemPayload,
        },
    },
};
use sqlx::{SqliteConnection, SqlitePool};

const ITEM_COLUMNS: &str = r#"id, inventory_number, category, brand, model, serial_number, department, location,
    assigned_to_user_id, status, notes, created_at, updated_at"#;

async fn item_in(conn: &mut SqliteConnection, item_id: i64) -> AppResult<Option<InventoryItem>> {
    let item = sqlx::query_as::<_, InventoryItem>(&format!("SELECT {} FROM inventory_items WHERE id = ?", ITEM_COLUMNS))
        .bind(item_id)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

async fn record_history(
    conn: &mut SqliteConnection,
    item_id: i64,
    event_type: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    performed_by: i64,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_history (item_id, event_type, old_value, new_value, performed_by_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(item_id)
    .bind(event_type)
    .bind(old_value)
    .bind(new_value)
    .bind(performed_by)
    .execute(conn)
    .await?;
    Ok(())
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::bad_request(format!("O campo '{}' é obrigatório.", field)));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub async fn create_item(db_pool: &SqlitePool, performed_by: i64, payload: &CreateItemPayload) -> AppResult<InventoryItem> {
    let number = required(&payload.inventory_number, "inventory_number")?;
    let category = required(&payload.category, "category")?;
    let brand = required(&payload.brand, "brand")?;
    let model = required(&payload.model, "model")?;
    let department = required(&payload.department, "department")?;

    let mut tx = db::begin_write(db_pool).await?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO inventory_items (inventory_number, category, brand, model, serial_number, department, location, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&number)
    .bind(&category)
    .bind(&brand)
    .bind(&model)
    .bind(optional(payload.serial_number.as_deref()))
    .bind(&department)
    .bind(optional(payload.location.as_deref()))
    .bind(optional(payload.notes.as_deref()))
    .execute(&mut *tx)
    .await;

    let item_id = match inserted {
        Ok(res) => res.last_insert_rowid(),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(AppError::conflict(
                "duplicate_inventory_number",
                format!("O número de inventário '{}' já existe.", number),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    record_history(&mut tx, item_id, "CREATED", None, Some(&number), performed_by).await?;
    let item = item_in(&mut tx, item_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;

    tracing::info!("📦 Equipamento {} registado.", number);
    Ok(item)
}

pub async fn list_items(db_pool: &SqlitePool, filters: &ItemFilters) -> AppResult<Vec<InventoryItem>> {
    let search = optional(filters.q.as_deref()).map(|q| format!("%{}%", q));
    let items = sqlx::query_as::<_, InventoryItem>(&format!(
        r#"
        SELECT {} FROM inventory_items
        WHERE (?1 IS NULL OR category = ?1)
          AND (?2 IS NULL OR status = ?2)
          AND (?3 IS NULL OR department = ?3)
          AND (?4 IS NULL OR assigned_to_user_id = ?4)
          AND (?5 IS NULL OR inventory_number LIKE ?5 OR brand LIKE ?5 OR model LIKE ?5 OR serial_number LIKE ?5)
        ORDER BY inventory_number
        "#,
        ITEM_COLUMNS
    ))
    .bind(optional(filters.category.as_deref()))
    .bind(filters.status)
    .bind(optional(filters.department.as_deref()))
    .bind(filters.assigned_to)
    .bind(search)
    .fetch_all(db_pool)
    .await?;
    Ok(items)
}

pub async fn get_item(db_pool: &SqlitePool, item_id: i64) -> AppResult<InventoryItem> {
    let mut conn = db_pool.acquire().await?;
    item_in(&mut conn, item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Equipamento"))
}

/// Atualização parcial; cada campo alterado fica no histórico.
pub async fn update_item(
    db_pool: &SqlitePool,
    performed_by: i64,
    item_id: i64,
    payload: &UpdateItemPayload,
) -> AppResult<InventoryItem> {
    let mut tx = db::begin_write(db_pool).await?;
    let item = item_in(&mut tx, item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Equipamento"))?;
    if item.status == ItemStatus::Retired {
        return Err(AppError::conflict("item_retired", "O equipamento foi dado de baixa."));
    }

    let changes: [(&str, Option<String>, Option<String>, bool); 7] = [
        ("category", Some(item.category.clone()), payload.category.as_deref().map(str::trim).map(str::to_string), true),
        ("brand", Some(item.brand.clone()), payload.brand.as_deref().map(str::trim).map(str::to_string), true),
        ("model", Some(item.model.clone()), payload.model.as_deref().map(str::trim).map(str::to_string), true),
        ("serial_number", item.serial_number.clone(), payload.serial_number.clone(), false),
        ("department", Some(item.department.clone()), payload.department.as_deref().map(str::trim).map(str::to_string), true),
        ("location", item.location.clone(), payload.location.clone(), false),
        ("notes", item.notes.clone(), payload.notes.clone(), false),
    ];

    for (column, old, new, mandatory) in changes {
        let Some(new) = new else { continue };
        let new = if mandatory {
            Some(required(&new, column)?)
        } else {
            optional(Some(&new))
        };
        if new == old {
            continue;
        }
        // `column` vem da lista fixa acima
        sqlx::query(&format!(
            "UPDATE inventory_items SET {} = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            column
        ))
        .bind(new.as_deref())
        .bind(item_id)
        .execute(&mut *tx)
        .await?;
        record_history(
            &mut tx,
            item_id,
            &format!("UPDATED_{}", column.to_uppercase()),
            old.as_deref(),
            new.as_deref(),
            performed_by,
        )
        .await?;
    }

    let item = item_in(&mut tx, item_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;
    Ok(item)
}

pub async fn assign_item(db_pool: &SqlitePool, performed_by: i64, item_id: i64, user_id: i64) -> AppResult<InventoryItem> {
    let mut tx = db::begin_write(db_pool).await?;
    let item = item_in(&mut tx, item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Equipamento"))?;
    if !item.status.can_be_assigned() {
        return Err(AppError::conflict(
            "item_not_assignable",
            format!("Equipamento em estado {} não pode ser atribuído.", item.status.as_str()),
        ));
    }

    let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if !user_exists {
        return Err(AppError::not_found("Utilizador"));
    }

    sqlx::query("UPDATE inventory_items SET assigned_to_user_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(user_id)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;
    record_history(
        &mut tx,
        item_id,
        "ASSIGNED",
        item.assigned_to_user_id.map(|id| id.to_string()).as_deref(),
        Some(&user_id.to_string()),
        performed_by,
    )
    .await?;

    let item = item_in(&mut tx, item_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;
    Ok(item)
}

pub async fn unassign_item(db_pool: &SqlitePool, performed_by: i64, item_id: i64) -> AppResult<InventoryItem> {
    let mut tx = db::begin_write(db_pool).await?;
    let item = item_in(&mut tx, item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Equipamento"))?;
    let Some(previous) = item.assigned_to_user_id else {
        return Err(AppError::bad_request("O equipamento não está atribuído."));
    };

    sqlx::query("UPDATE inventory_items SET assigned_to_user_id = NULL, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(item_id)
        .execute(&mut *tx)
        .await?;
    record_history(&mut tx, item_id, "UNASSIGNED", Some(&previous.to_string()), None, performed_by).await?;

    let item = item_in(&mut tx, item_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;
    Ok(item)
}

/// Muda o estado. RETIRED é final e tira a atribuição; LOST também a tira.
pub async fn change_status(
    db_pool: &SqlitePool,
    performed_by: i64,
    item_id: i64,
    status: ItemStatus,
    notes: Option<&str>,
) -> AppResult<InventoryItem> {
    let mut tx = db::begin_write(db_pool).await?;
    let item = item_in(&mut tx, item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Equipamento"))?;
    if item.status == ItemStatus::Retired {
        return Err(AppError::InvalidTransition {
            from: item.status.as_str().into(),
            to: status.as_str().into(),
        });
    }
    if item.status == status {
        return Err(AppError::bad_request(format!("O equipamento já está em {}.", status.as_str())));
    }

    sqlx::query(
        r#"
        UPDATE inventory_items
        SET status = ?1,
            assigned_to_user_id = CASE WHEN ?1 IN ('RETIRED', 'LOST') THEN NULL ELSE assigned_to_user_id END,
            notes = COALESCE(?2, notes),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?3
        "#,
    )
    .bind(status)
    .bind(optional(notes))
    .bind(item_id)
    .execute(&mut *tx)
    .await?;
    record_history(
        &mut tx,
        item_id,
        "STATUS_CHANGED",
        Some(item.status.as_str()),
        Some(status.as_str()),
        performed_by,
    )
    .await?;
    if !status.can_be_assigned() {
        if let Some(previous) = item.assigned_to_user_id {
            record_history(&mut tx, item_id, "UNASSIGNED", Some(&previous.to_string()), None, performed_by).await?;
        }
    }

    let item = item_in(&mut tx, item_id).await?.ok_or(AppError::InternalServerError)?;
    tx.commit().await?;
    tracing::info!("Equipamento {} -> {}.", item.inventory_number, status.as_str());
    Ok(item)
}

pub async fn item_history(db_pool: &SqlitePool, item_id: i64) -> AppResult<Vec<HistoryEntry>> {
    // 404 se o equipamento não existir
    get_item(db_pool, item_id).await?;
    let entries = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT id, item_id, event_type, old_value, new_value, performed_by_id, created_at
        FROM inventory_history WHERE item_id = ? ORDER BY created_at, id
        "#,
    )
    .bind(item_id)
    .fetch_all(db_pool)
    .await?;
    Ok(entries)
}

pub async fn inventory_stats(db_pool: &SqlitePool) -> AppResult<InventoryStats> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items").fetch_one(db_pool).await?;
    let by_status = sqlx::query_as::<_, CountByKey>(
        "SELECT status AS key, COUNT(*) AS count FROM inventory_items GROUP BY status ORDER BY status",
    )
    .fetch_all(db_pool)
    .await?;
    let by_category = sqlx::query_as::<_, CountByKey>(
        "SELECT category AS key, COUNT(*) AS count FROM inventory_items GROUP BY category ORDER BY category",
    )
    .fetch_all(db_pool)
    .await?;
    Ok(InventoryStats { total, by_status, by_category })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, services::testing};

    fn laptop(number: &str) -> CreateItemPayload {
        CreateItemPayload {
            inventory_number: number.into(),
            category: "Portátil".into(),
            brand: "Lenovo".into(),
            model: "T14".into(),
            serial_number: Some("SN-123".into()),
            department: "Sistemas".into(),
            location: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn duplicate_inventory_number_is_a_conflict() {
        let pool = db::test_pool().await;
        let admin = testing::insert_user(&pool, "chefe", &["helpdesk_admin"], None).await;
        create_item(&pool, admin, &laptop("INV-001")).await.unwrap();

        let err = create_item(&pool, admin, &laptop("INV-001")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "duplicate_inventory_number", .. }));
    }

    #[tokio::test]
    async fn assignment_and_status_are_tracked_in_history() {
        let pool = db::test_pool().await;
        let admin = testing::insert_user(&pool, "chefe", &["helpdesk_admin"], None).await;
        let owner = testing::insert_user(&pool, "docente", &["staff"], None).await;
        let item = create_item(&pool, admin, &laptop("INV-002")).await.unwrap();

        let item = assign_item(&pool, admin, item.id, owner).await.unwrap();
        assert_eq!(item.assigned_to_user_id, Some(owner));

        let item = change_status(&pool, admin, item.id, ItemStatus::Lost, Some("Perdido na mudança")).await.unwrap();
        assert_eq!(item.assigned_to_user_id, None);

        let err = assign_item(&pool, admin, item.id, owner).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { code: "item_not_assignable", .. }));

        let events: Vec<String> = item_history(&pool, item.id).await.unwrap().into_iter().map(|h| h.event_type).collect();
        assert_eq!(events, vec!["CREATED", "ASSIGNED", "STATUS_CHANGED", "UNASSIGNED"]);
    }

    #[tokio::test]
    async fn retired_is_terminal() {
        let pool = db::test_pool().await;
        let admin = testing::insert_user(&pool, "chefe", &["helpdesk_admin"], None).await;
        let item = create_item(&pool, admin, &laptop("INV-003")).await.unwrap();
        change_status(&pool, admin, item.id, ItemStatus::Retired, None).await.unwrap();

        let err = change_status(&pool, admin, item.id, ItemStatus::Active, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn update_records_only_changed_fields() {
        let pool = db::test_pool().await;
        let admin = testing::insert_user(&pool, "chefe", &["helpdesk_admin"], None).await;
        let item = create_item(&pool, admin, &laptop("INV-004")).await.unwrap();

        let payload = UpdateItemPayload {
            category: None,
            brand: Some("Lenovo".into()),
            model: None,
            serial_number: None,
            department: None,
            location: Some("Sala 12".into()),
            notes: None,
        };
        let item = update_item(&pool, admin, item.id, &payload).await.unwrap();
        assert_eq!(item.location.as_deref(), Some("Sala 12"));

        let history = item_history(&pool, item.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].event_type, "UPDATED_LOCATION");
    }

    #[tokio::test]
    async fn filters_and_stats() {
        let pool = db::test_pool().await;
        let admin = testing::insert_user(&pool, "chefe", &["helpdesk_admin"], None).await;
        create_item(&pool, admin, &laptop("INV-010")).await.unwrap();
        let mut printer = laptop("INV-011");
        printer.category = "Impressora".into();
        printer.brand = "HP".into();
        create_item(&pool, admin, &printer).await.unwrap();

        let hp = list_items(&pool, &ItemFilters { q: Some("hp".into()), ..Default::default() }).await.unwrap();
        assert_eq!(hp.len(), 1);
        assert_eq!(hp[0].inventory_number, "INV-011");

        let stats = inventory_stats(&pool).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_category.len(), 2);
    }
}
