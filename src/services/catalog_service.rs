// src/services/catalog_service.rs
// Catálogos base: programas académicos e categorias do helpdesk.
use crate::{
    db,
    error::AppResult,
    models::helpdesk::{Area, Category},
};
use sqlx::SqlitePool;

const DEFAULT_PROGRAMS: &[(&str, &str)] = &[
    ("ISC", "Ingeniería en Sistemas Computacionales"),
    ("IIND", "Ingeniería Industrial"),
    ("IELE", "Ingeniería Electrónica"),
    ("IMEC", "Ingeniería Mecánica"),
    ("IGE", "Ingeniería en Gestión Empresarial"),
    ("LA", "Licenciatura en Administración"),
];

const DEFAULT_CATEGORIES: &[(Area, &str)] = &[
    (Area::Desarrollo, "Sistemas institucionales"),
    (Area::Desarrollo, "Cuentas y accesos"),
    (Area::Desarrollo, "Reportes"),
    (Area::Soporte, "Equipo de cómputo"),
    (Area::Soporte, "Impresoras"),
    (Area::Soporte, "Red e Internet"),
    (Area::Soporte, "Proyectores"),
];

/// Insere os catálogos em falta. Pode correr várias vezes.
/// Devolve (programas inseridos, categorias inseridas).
pub async fn seed_catalog(db_pool: &SqlitePool) -> AppResult<(u64, u64)> {
    let mut tx = db::begin_write(db_pool).await?;

    let mut programs = 0;
    for &(key, name) in DEFAULT_PROGRAMS {
        programs += sqlx::query("INSERT OR IGNORE INTO programs (key, name) VALUES (?, ?)")
            .bind(key)
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    let mut categories = 0;
    for &(area, name) in DEFAULT_CATEGORIES {
        categories += sqlx::query("INSERT OR IGNORE INTO helpdesk_categories (area, name) VALUES (?, ?)")
            .bind(area)
            .bind(name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    tracing::info!("Catálogo: {} programas e {} categorias novos.", programs, categories);
    Ok((programs, categories))
}

pub async fn list_categories(db_pool: &SqlitePool, area: Option<Area>) -> AppResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT id, area, name, is_active FROM helpdesk_categories
        WHERE is_active = 1 AND (?1 IS NULL OR area = ?1)
        ORDER BY area, name
        "#,
    )
    .bind(area)
    .fetch_all(db_pool)
    .await?;
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = db::test_pool().await;
        let first = seed_catalog(&pool).await.unwrap();
        assert_eq!(first, (DEFAULT_PROGRAMS.len() as u64, DEFAULT_CATEGORIES.len() as u64));

        let second = seed_catalog(&pool).await.unwrap();
        assert_eq!(second, (0, 0));

        let soporte = list_categories(&pool, Some(Area::Soporte)).await.unwrap();
        assert_eq!(soporte.len(), 4);
    }
}
