use axum::{extract::State, http::HeaderMap};
use chrono::Utc;
use serde::Serialize;

use super::current_claims;
use crate::auth::SessionClaims;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{Role, UserKind};

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub subject: String,
    pub role: Role,
    pub kind: UserKind,
    pub name: String,
    pub email: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub expires_in: i64,
    pub home: String,
}

impl SessionInfo {
    fn new(claims: SessionClaims, home: &str, now: i64) -> Self {
        Self {
            expires_in: claims.seconds_remaining(now),
            kind: claims.kind(),
            subject: claims.subject,
            role: claims.role,
            name: claims.name,
            email: claims.email,
            issued_at: claims.issued_at,
            expires_at: claims.expires_at,
            home: home.to_string(),
        }
    }
}

/// GET /api/auth/session - Current session from the cookie
///
/// Returns 401 when the cookie is missing, tampered with, or expired.
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "subject": "u-1", "role": "admin", "kind": "internal",
///     "name": "Ada", "email": "ada@example.com",
///     "issued_at": 1700000000, "expires_at": 1700000900,
///     "expires_in": 640, "home": "/clients"
///   }
/// }
/// ```
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<SessionInfo> {
    let claims = current_claims(&state, &headers)?;
    let home = state.policy.default_path(claims.role).to_string();
    Ok(ApiResponse::success(SessionInfo::new(claims, &home, Utc::now().timestamp())))
}

/// POST /api/auth/refresh - Extend a still-valid session
///
/// Re-issues the token for the same identity with a fresh lifetime.
/// Expired sessions cannot be refreshed; the user has to sign in again.
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<SessionInfo> {
    let current = current_claims(&state, &headers)?;
    let now = Utc::now().timestamp();

    let claims = SessionClaims::new(current.identity(), now, state.ttl_seconds);
    let token = state.tokens.sign(&claims)?;
    tracing::debug!(subject = %claims.subject, "Session refreshed");

    let home = state.policy.default_path(claims.role).to_string();
    Ok(ApiResponse::success(SessionInfo::new(claims, &home, now))
        .with_cookie(state.cookies.session(&token)))
}

/// POST /api/auth/logout - End the session
///
/// Clears the cookie. Tokens are not tracked server side, so a copied token
/// stays valid until it expires.
pub async fn logout(State(state): State<AppState>) -> ApiResult<()> {
    Ok(ApiResponse::no_content().with_cookie(state.cookies.cleared()))
}
