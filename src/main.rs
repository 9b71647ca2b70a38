mod auth;
mod booking;
mod config;
mod middleware;

mod db;
mod error;
mod models;
mod routes;
mod seed;

use std::sync::Arc;

use anyhow::Context;

use crate::{
    config::{AuthMode, Config, StoreBackend},
    db::{MemoryStore, PgStore, Store},
    middleware::auth_context::CredentialResolver,
    models::AppState,
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;

    let store: Arc<dyn Store> = match cfg.store_backend {
        StoreBackend::Postgres => {
            let url = cfg
                .database_url
                .as_deref()
                .context("DATABASE_URL is not set")?;
            let pool = db::connect_pg(url, cfg.db_max_connections).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    if cfg.seed_doctors {
        seed::seed_doctors(store.as_ref()).await?;
    }
    if let Some((username, password)) = &cfg.bootstrap_admin {
        seed::bootstrap_admin(store.as_ref(), username, password).await?;
    }

    let resolver = match cfg.auth_mode {
        AuthMode::Token => CredentialResolver::TokenLookup,
        AuthMode::Session => CredentialResolver::SessionLookup {
            cookie_name: cfg.session_cookie.clone(),
        },
    };

    let state = AppState { store, resolver };

    // Browser SPA calls the API cross-origin in development.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(auth_mode = ?cfg.auth_mode, "Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
