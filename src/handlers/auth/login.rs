// handlers/auth/login.rs - POST /api/auth/login handler

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::access::{normalize_path, AccessPolicy};
use crate::auth::{SessionClaims, VerifiedUser};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Page the user originally asked for, from the `next` query parameter
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: VerifiedUser,
    pub redirect_to: String,
    pub expires_in: u64,
}

/// POST /api/auth/login - Check credentials and start a session
///
/// Expected Input:
/// ```json
/// {
///   "email": "string",      // Required
///   "password": "string",   // Required
///   "next": "/tasks/12"     // Optional: where the user was headed
/// }
/// ```
///
/// Expected Output (Success), plus `Set-Cookie: accessToken=...`:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "user": { "id": "u-1", "name": "Casey", "email": "casey@example.com", "role": "client" },
///     "redirect_to": "/dashboard",
///     "expires_in": 900
///   }
/// }
/// ```
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(payload) = payload?;
    let email = payload.email.trim();

    let mut field_errors = HashMap::new();
    if email.is_empty() {
        field_errors.insert("email".to_string(), "This field is required".to_string());
    }
    if payload.password.is_empty() {
        field_errors.insert("password".to_string(), "This field is required".to_string());
    }
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Missing required fields", Some(field_errors)));
    }

    let user = match state.credentials.verify(email, &payload.password).await? {
        Some(user) => user,
        None => {
            tracing::info!("Rejected login attempt");
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    };

    let claims = SessionClaims::new(user.clone().into(), Utc::now().timestamp(), state.ttl_seconds);
    let token = state.tokens.sign(&claims)?;
    let redirect_to = resolve_redirect(&state.policy, user.role, payload.next.as_deref());

    tracing::info!(subject = %user.id, role = %user.role, "Session started");

    Ok(ApiResponse::success(LoginResponse {
        user,
        redirect_to,
        expires_in: state.ttl_seconds,
    })
    .with_cookie(state.cookies.session(&token)))
}

/// Where to send the user after login: the requested page when it is a
/// local path the role may open, otherwise the role's landing page.
pub fn resolve_redirect(policy: &AccessPolicy, role: Role, next: Option<&str>) -> String {
    let local = next
        .map(str::trim)
        .filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'));

    if let Some(next) = local {
        let (path, suffix) = next.split_at(next.find(['?', '#']).unwrap_or(next.len()));
        let path = normalize_path(path);
        if policy.is_authorized(role, &path) {
            return format!("{}{}", path, suffix);
        }
    }
    policy.default_path(role).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_next_is_kept() {
        let policy = AccessPolicy::portal();
        assert_eq!(resolve_redirect(&policy, Role::Client, Some("/tasks/12?tab=files")), "/tasks/12?tab=files");
    }

    #[test]
    fn forbidden_or_missing_next_falls_back_to_default() {
        let policy = AccessPolicy::portal();
        assert_eq!(resolve_redirect(&policy, Role::Client, Some("/clients")), "/dashboard");
        assert_eq!(resolve_redirect(&policy, Role::Admin, None), "/clients");
    }

    #[test]
    fn next_with_dot_segments_is_normalized_before_the_role_check() {
        let policy = AccessPolicy::portal();
        assert_eq!(resolve_redirect(&policy, Role::Client, Some("/dashboard/../clients")), "/dashboard");
        assert_eq!(resolve_redirect(&policy, Role::Client, Some("/tasks/./12/../13?tab=files")), "/tasks/13?tab=files");
        assert_eq!(resolve_redirect(&policy, Role::Client, Some("/tasks//12")), "/tasks/12");
        assert_eq!(resolve_redirect(&policy, Role::Client, Some("/../..//evil.example")), "/dashboard");
    }

    #[test]
    fn off_site_next_is_ignored() {
        let policy = AccessPolicy::portal();
        for next in ["//evil.example/dashboard", "https://evil.example", "/\\evil.example", "dashboard"] {
            assert_eq!(resolve_redirect(&policy, Role::Client, Some(next)), "/dashboard", "{}", next);
        }
    }
}
