use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use headers::{Cookie, HeaderMapExt};
use uuid::Uuid;

use crate::auth::{generate_access_token, hash_access_token};
use crate::db::Store;
use crate::error::ApiError;
use crate::models::{AppState, Staff, StaffRole};

/// Authenticated staff or admin identity for the current request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub staff_id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub role: StaffRole,
}

impl From<&Staff> for AuthContext {
    fn from(s: &Staff) -> Self {
        AuthContext {
            staff_id: s.id,
            username: s.username.clone(),
            name: s.name.clone(),
            role: s.role,
        }
    }
}

/// Same as [`AuthContext`] but rejects identities whose role is not admin.
#[derive(Debug, Clone)]
pub struct AdminContext(pub AuthContext);

/// What a successful login hands back to the client.
#[derive(Debug, Default)]
pub struct IssuedCredential {
    /// Bearer token (token mode).
    pub token: Option<String>,
    /// `Set-Cookie` value (session mode).
    pub set_cookie: Option<String>,
}

/// How a presented credential is resolved to an identity.
#[derive(Debug, Clone)]
pub enum CredentialResolver {
    /// `Authorization: Bearer <token>`, matched against `staff.token_hash`.
    TokenLookup,
    /// Cookie-carried session id, matched against `staff_sessions`.
    SessionLookup { cookie_name: String },
}

/// Token after a case-sensitive `Bearer ` prefix.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl CredentialResolver {
    /// Raw credential carried by the request, if any.
    pub fn presented(&self, headers: &HeaderMap) -> Option<String> {
        match self {
            CredentialResolver::TokenLookup => bearer_token(headers).map(str::to_owned),
            CredentialResolver::SessionLookup { cookie_name } => headers
                .typed_get::<Cookie>()
                .and_then(|c| c.get(cookie_name).map(str::to_owned))
                .filter(|v| !v.is_empty()),
        }
    }

    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        store: &dyn Store,
    ) -> Result<AuthContext, ApiError> {
        let raw = self.presented(headers).ok_or_else(ApiError::unauthorized)?;
        let hash = hash_access_token(&raw);

        let staff = match self {
            CredentialResolver::TokenLookup => store.staff_by_token_hash(&hash).await?,
            CredentialResolver::SessionLookup { .. } => store.staff_by_session_hash(&hash).await?,
        }
        .ok_or_else(ApiError::unauthorized)?;

        Ok(AuthContext::from(&staff))
    }

    /// Issues a fresh credential, replacing whatever the identity held before.
    pub async fn issue(
        &self,
        store: &dyn Store,
        staff_id: Uuid,
    ) -> Result<IssuedCredential, ApiError> {
        let raw = generate_access_token();
        let hash = hash_access_token(&raw);

        match self {
            CredentialResolver::TokenLookup => {
                store.set_token_hash(staff_id, Some(&hash)).await?;
                Ok(IssuedCredential {
                    token: Some(raw),
                    set_cookie: None,
                })
            }
            CredentialResolver::SessionLookup { cookie_name } => {
                store.replace_session(staff_id, &hash).await?;
                Ok(IssuedCredential {
                    token: None,
                    set_cookie: Some(format!(
                        "{cookie_name}={raw}; HttpOnly; Path=/; SameSite=Lax"
                    )),
                })
            }
        }
    }

    /// Revokes the presented credential. Returns whether anything was revoked.
    pub async fn revoke(&self, headers: &HeaderMap, store: &dyn Store) -> Result<bool, ApiError> {
        let Some(raw) = self.presented(headers) else {
            return Ok(false);
        };
        let hash = hash_access_token(&raw);

        let revoked = match self {
            CredentialResolver::TokenLookup => store.clear_token_hash(&hash).await?,
            CredentialResolver::SessionLookup { .. } => store.delete_session(&hash).await?,
        };
        Ok(revoked)
    }

    /// `Set-Cookie` value that expires the session cookie (session mode only).
    pub fn expired_cookie(&self) -> Option<String> {
        match self {
            CredentialResolver::TokenLookup => None,
            CredentialResolver::SessionLookup { cookie_name } => Some(format!(
                "{cookie_name}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0"
            )),
        }
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            state
                .resolver
                .authenticate(&parts.headers, state.store.as_ref())
                .await
        }
    }
}

impl FromRequestParts<AppState> for AdminContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let auth = AuthContext::from_request_parts(parts, state).await?;
            if !auth.role.is_admin() {
                return Err(ApiError::Forbidden("Admin access required".into()));
            }
            Ok(AdminContext(auth))
        }
    }
}
