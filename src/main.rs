// src/main.rs

// --- Declaração dos Módulos ---
mod cli;
mod db;
mod error;
mod models;
mod services;
mod state;
mod templates;
mod web;

// --- Imports ---
use crate::{
    cli::{Cli, Command, CreateUserArgs, ServeArgs},
    models::user::CreateUserPayload,
    services::{catalog_service, user_service},
    state::{AppState, NotificationHub},
};
use axum::serve;
use clap::Parser;
use sqlx::SqlitePool;
use time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::Key, ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuração do Logging (Tracing) ---
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "itcj=debug,tower_http=info,sqlx=warn,tower_sessions=info".into()),
        )
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    // --- Configuração da Base de Dados ---
    let db_pool = match db::create_db_pool(&cli.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Falha crítica ao inicializar a base de dados: {}", e);
            return Err(anyhow::anyhow!("Falha ao conectar/migrar DB: {}", e));
        }
    };

    match cli.command {
        Some(Command::Serve(args)) => run_server(db_pool, args).await,
        // Sem subcomando: servidor com a configuração do ambiente
        None => {
            let args = ServeArgs::try_parse_from(["itcj"])?;
            run_server(db_pool, args).await
        }
        Some(Command::CreateUser(args)) => create_user(&db_pool, args).await,
        Some(Command::SeedCatalog) => {
            let (programs, categories) = catalog_service::seed_catalog(&db_pool).await?;
            println!("Catálogo atualizado: {} programas e {} categorias novos.", programs, categories);
            Ok(())
        }
    }
}

async fn create_user(db_pool: &SqlitePool, args: CreateUserArgs) -> anyhow::Result<()> {
    let program_id = match &args.program {
        Some(key) => Some(
            user_service::find_program_by_key(db_pool, key)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Programa '{}' não existe (corra seed-catalog?)", key))?
                .id,
        ),
        None => None,
    };

    let payload = CreateUserPayload {
        username: args.username,
        password: args.password,
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        program_id,
        roles: args.roles,
    };
    let user_id = user_service::create_user(db_pool, &payload).await?;
    println!("Utilizador '{}' criado com id {}.", payload.username, user_id);
    Ok(())
}

async fn run_server(db_pool: SqlitePool, args: ServeArgs) -> anyhow::Result<()> {
    args.validate().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("🚀 Iniciando servidor ITCJ...");

    // --- Configuração das Sessões ---
    let session_store = SqliteStore::new(db_pool.clone())
        .with_table_name("sessions")
        .map_err(|e| anyhow::anyhow!("Falha ao criar session store: {}", e))?;
    session_store.migrate().await?;

    let session_store_clone = session_store.clone();
    tokio::spawn(async move {
        if let Err(e) = session_store_clone
            .continuously_delete_expired(tokio::time::Duration::from_secs(60 * 60))
            .await
        {
            tracing::error!("Erro na task de limpeza de sessões: {:?}", e);
        }
    });
    tracing::info!("🧹 Tarefa de limpeza de sessões iniciada.");

    let key = Key::try_from(args.session_secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("SESSION_SECRET inválida: {}", e))?;
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(args.secure_cookies)
        .with_http_only(true)
        .with_signed(key)
        .with_expiry(Expiry::OnInactivity(Duration::days(1)));
    tracing::info!("🔑 Camada de sessão configurada.");

    // --- Criação do Estado da Aplicação ---
    let app_state = AppState {
        db_pool,
        hub: NotificationHub::default(),
        default_slot_minutes: args.default_slot_minutes,
    };

    let listener = match TcpListener::bind(args.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("❌ Falha ao iniciar listener em {}: {}", args.bind_addr, e);
            return Err(e.into());
        }
    };
    tracing::info!("📡 Servidor escutando em http://{}", args.bind_addr);

    let app = web::routes::create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(session_layer),
    );

    if let Err(e) = serve(listener, app.into_make_service()).await {
        tracing::error!("❌ Erro fatal no servidor: {}", e);
        return Err(e.into());
    }
    Ok(())
}
