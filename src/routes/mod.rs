use crate::models::AppState;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

pub mod admin_routes;
pub mod appointment_routes;
pub mod auth_routes;
pub mod doctor_routes;


fn api() -> Router<AppState> {
    Router::new()
        .merge(doctor_routes::router())
        .merge(appointment_routes::router())
        .nest("/auth", auth_routes::router())
        // staff console signs in here with `{name, password}`
        .nest("/staff/auth", auth_routes::router())
        .nest("/admin", admin_routes::router())
        .route("/health", get(health))
}

/// Served at the root and again under `/api`, which is where the SPA calls it.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(api())
        .nest("/api", api())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
