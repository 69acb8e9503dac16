// src/db.rs
use crate::error::AppResult;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Sqlite, Transaction,
};
use std::str::FromStr;
use std::time::Duration; // Usar std::time::Duration aqui

pub async fn create_db_pool(database_url: &str) -> AppResult<SqlitePool> {
    tracing::info!("Ligando à base de dados: {}", database_url);

    // Opções de conexão (criar se não existir, timeout, chaves estrangeiras)
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::info!("Executando migrações da base de dados...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrações concluídas.");

    Ok(pool)
}

/// Transação de escrita. `BEGIN IMMEDIATE` reserva o lock de escrita à entrada:
/// duas escritas concorrentes esperam pelo busy_timeout em vez de falharem
/// com SQLITE_BUSY ao passar de leitura para escrita.
pub async fn begin_write(db_pool: &SqlitePool) -> AppResult<Transaction<'static, Sqlite>> {
    Ok(db_pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Pool em memória com o esquema completo, para os testes.
/// Uma única conexão: cada conexão `:memory:` teria a sua própria base de dados.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

/// Base em ficheiro temporário com várias conexões, para testes de concorrência.
/// O `TempDir` tem de viver enquanto o pool for usado.
#[cfg(test)]
pub async fn test_file_pool() -> (SqlitePool, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("itcj-test.db").display());
    let pool = create_db_pool(&url).await.unwrap();
    (pool, dir)
}
