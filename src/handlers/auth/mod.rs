// handlers/auth/mod.rs - Session endpoints
//
// Token acquisition (login) and cookie-authenticated session management.

use axum::http::HeaderMap;

use crate::auth::{read_cookie, SessionClaims};
use crate::error::ApiError;
use crate::state::AppState;

pub mod login;   // POST /api/auth/login - check credentials, set session cookie
pub mod session; // GET /api/auth/session, POST /api/auth/refresh, POST /api/auth/logout

pub use login::login;
pub use session::{logout, refresh, session};

/// Verified claims from the session cookie, or 401.
pub(crate) fn current_claims(state: &AppState, headers: &HeaderMap) -> Result<SessionClaims, ApiError> {
    let token = read_cookie(headers, &state.cookies.name)
        .ok_or_else(|| ApiError::unauthorized("Not signed in"))?;

    state.tokens.verify(&token).map_err(|e| {
        tracing::debug!("Session cookie rejected: {}", e);
        ApiError::from(e)
    })
}
