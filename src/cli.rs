// src/cli.rs
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

/// Configuração lida da linha de comandos ou do ambiente (.env incluído).
#[derive(Debug, Parser)]
#[command(name = "itcj", version, about = "Plataforma institucional ITCJ (AgendaTec + Helpdesk)")]
pub struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://itcj.db")]
    pub database_url: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Arranca o servidor HTTP (por omissão)
    Serve(ServeArgs),
    /// Cria um utilizador com as roles indicadas
    CreateUser(CreateUserArgs),
    /// Insere programas e categorias de helpdesk por omissão
    SeedCatalog,
}

// Parser também, para poder ler só do ambiente quando não há subcomando
#[derive(Debug, Clone, Parser)]
pub struct ServeArgs {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: SocketAddr,

    /// Chave para assinar o cookie de sessão (mínimo 64 bytes)
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: String,

    #[arg(long, env = "SECURE_COOKIES", default_value_t = false)]
    pub secure_cookies: bool,

    /// Duração por omissão de cada slot de atendimento, em minutos
    #[arg(long, env = "DEFAULT_SLOT_MINUTES", default_value_t = 10)]
    pub default_slot_minutes: i64,
}

#[derive(Debug, Args)]
pub struct CreateUserArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub email: Option<String>,
    /// Pode ser repetido: --role admin --role coordinator
    #[arg(long = "role")]
    pub roles: Vec<String>,
    /// Chave do programa académico (ex: ISC)
    #[arg(long)]
    pub program: Option<String>,
}

impl ServeArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.session_secret.len() < 64 {
            return Err("SESSION_SECRET tem de ter pelo menos 64 bytes".into());
        }
        if !(1..=240).contains(&self.default_slot_minutes) {
            return Err("DEFAULT_SLOT_MINUTES fora do intervalo 1..=240".into());
        }
        Ok(())
    }
}
