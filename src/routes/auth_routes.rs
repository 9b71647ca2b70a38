use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::verify_password,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, MessageResponse, StaffRole},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Staff consoles post `name`, the admin console posts `username`.
    #[serde(alias = "name")]
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub role: StaffRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub role: StaffRole,
}

fn set_cookie(resp: &mut Response, cookie: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::Internal(format!("cookie header: {e}")))?;
    resp.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let username = req.username.as_deref().map(str::trim).unwrap_or_default();
    let password = req.password.as_deref().unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".into(),
        ));
    }

    let Some(staff) = state.store.find_staff_by_login(username).await? else {
        tracing::warn!(%username, "login failed: unknown identity");
        return Err(ApiError::invalid_credentials());
    };

    if !verify_password(password, &staff.password_hash) {
        tracing::warn!(%username, "login failed: wrong password");
        return Err(ApiError::invalid_credentials());
    }

    state.store.touch_last_login(staff.id).await?;
    let issued = state.resolver.issue(state.store.as_ref(), staff.id).await?;

    tracing::info!(staff_id = %staff.id, role = %staff.role, "login");

    let mut resp = Json(LoginResponse {
        id: staff.id,
        username: staff.username,
        name: staff.name,
        role: staff.role,
        token: issued.token,
        message: "Login successful".into(),
    })
    .into_response();

    if let Some(cookie) = issued.set_cookie {
        set_cookie(&mut resp, &cookie)?;
    }
    Ok(resp)
}

pub async fn me(auth: AuthContext) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth.staff_id,
        username: auth.username,
        name: auth.name,
        role: auth.role,
    })
}

/// Always succeeds; revokes the presented credential when there is one.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if state.resolver.revoke(&headers, state.store.as_ref()).await? {
        tracing::info!("logout: credential revoked");
    }

    let mut resp = Json(MessageResponse::new("Logged out successfully")).into_response();
    if let Some(cookie) = state.resolver.expired_cookie() {
        set_cookie(&mut resp, &cookie)?;
    }
    Ok(resp)
}
