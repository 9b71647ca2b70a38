use std::env;

use anyhow::{bail, Context};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMode {
    Token,
    Session,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub auth_mode: AuthMode,
    pub session_cookie: String,
    pub seed_doctors: bool,
    pub bootstrap_admin: Option<(String, String)>,
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Err(_) | Ok("postgres") => StoreBackend::Postgres,
            Ok("memory") => StoreBackend::Memory,
            Ok(other) => bail!("STORE_BACKEND must be `postgres` or `memory`, got `{other}`"),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(s) => s
                .parse::<u32>()
                .with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {s}"))?,
            Err(_) => 10,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let auth_mode = match env::var("AUTH_MODE").as_deref() {
            Err(_) | Ok("token") => AuthMode::Token,
            Ok("session") => AuthMode::Session,
            Ok(other) => bail!("AUTH_MODE must be `token` or `session`, got `{other}`"),
        };

        let session_cookie =
            env::var("SESSION_COOKIE").unwrap_or_else(|_| "clinic_session".to_string());

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_USERNAME"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(u), Ok(p)) if !u.trim().is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        };

        Ok(Self {
            store_backend,
            database_url,
            db_max_connections,
            bind_addr,
            auth_mode,
            session_cookie,
            seed_doctors: flag("SEED_DOCTORS"),
            bootstrap_admin,
        })
    }
}
