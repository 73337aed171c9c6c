use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;

use crate::access::{normalize_path, AccessPolicy};
use crate::auth::{read_cookie, SessionClaims, TokenError, TokenService};
use crate::state::AppState;
use crate::types::Role;

pub const LOGIN_PATH: &str = "/login";
pub const NEXT_PARAM: &str = "next";

/// Where a request ended up after the checks ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Public,
    NoToken,
    InvalidToken,
    Authorized,
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Public,
    NoToken { location: String },
    InvalidToken { location: String, error: TokenError },
    Authorized(SessionClaims),
    Forbidden { role: Role, location: String },
}

impl GateDecision {
    pub fn state(&self) -> GateState {
        match self {
            GateDecision::Public => GateState::Public,
            GateDecision::NoToken { .. } => GateState::NoToken,
            GateDecision::InvalidToken { .. } => GateState::InvalidToken,
            GateDecision::Authorized(_) => GateState::Authorized,
            GateDecision::Forbidden { .. } => GateState::Forbidden,
        }
    }

    /// Redirect target, or `None` when the request passes through.
    pub fn location(&self) -> Option<&str> {
        match self {
            GateDecision::Public | GateDecision::Authorized(_) => None,
            GateDecision::NoToken { location }
            | GateDecision::InvalidToken { location, .. }
            | GateDecision::Forbidden { location, .. } => Some(location),
        }
    }
}

/// `/login?next=<path>`
pub fn login_redirect(path: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(NEXT_PARAM, path)
        .finish();
    format!("{}?{}", LOGIN_PATH, query)
}

/// Per-request route check over the shared policy and token service.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationGate<'a> {
    policy: &'a AccessPolicy,
    tokens: &'a TokenService,
    cookie_name: &'a str,
}

impl<'a> AuthorizationGate<'a> {
    pub fn new(policy: &'a AccessPolicy, tokens: &'a TokenService, cookie_name: &'a str) -> Self {
        Self {
            policy,
            tokens,
            cookie_name,
        }
    }

    pub fn evaluate(&self, path: &str, headers: &HeaderMap) -> GateDecision {
        self.evaluate_at(path, headers, Utc::now().timestamp())
    }

    /// Public check, then token presence, then token validity, then role prefixes.
    ///
    /// Every step sees the normalized path, and `next` carries it too.
    pub fn evaluate_at(&self, path: &str, headers: &HeaderMap, now: i64) -> GateDecision {
        let path = normalize_path(path);
        if self.policy.is_public(&path) {
            return GateDecision::Public;
        }

        let Some(token) = read_cookie(headers, self.cookie_name) else {
            return GateDecision::NoToken {
                location: login_redirect(&path),
            };
        };

        let claims = match self.tokens.verify_at(&token, now) {
            Ok(claims) => claims,
            Err(error) => {
                return GateDecision::InvalidToken {
                    location: login_redirect(&path),
                    error,
                }
            }
        };

        if self.policy.is_authorized(claims.role, &path) {
            GateDecision::Authorized(claims)
        } else {
            GateDecision::Forbidden {
                role: claims.role,
                location: self.policy.default_path(claims.role).to_string(),
            }
        }
    }
}

/// Route authorization middleware for every page request.
///
/// Authorized requests carry their [`SessionClaims`] as a request extension.
/// A request that would pass through on a non-canonical path (dot segments,
/// repeated slashes) is redirected to the canonical one instead, so handlers
/// only ever see the path that was checked.
pub async fn session_gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let canonical = normalize_path(&path);
    let decision = state.gate().evaluate(&canonical, request.headers());

    if decision.location().is_none() && canonical != path {
        let location = match request.uri().query() {
            Some(query) => format!("{}?{}", canonical, query),
            None => canonical,
        };
        tracing::debug!(path = %path, "redirecting to canonical path {}", location);
        return Redirect::temporary(&location).into_response();
    }

    match decision {
        GateDecision::Public => next.run(request).await,
        GateDecision::Authorized(claims) => {
            tracing::debug!(path = %path, role = %claims.role, "session authorized");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        GateDecision::NoToken { location } => {
            tracing::debug!(path = %path, "no session cookie, redirecting to login");
            Redirect::temporary(&location).into_response()
        }
        GateDecision::InvalidToken { location, error } => {
            tracing::debug!(path = %path, reason = %error, "rejected session token");
            Redirect::temporary(&location).into_response()
        }
        GateDecision::Forbidden { role, location } => {
            tracing::info!(path = %path, role = %role, "role not allowed here, redirecting to {}", location);
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionIdentity;
    use axum::http::{header, HeaderValue};

    const NOW: i64 = 1_700_000_000;

    fn tokens() -> TokenService {
        TokenService::new(b"gate-test-secret").unwrap()
    }

    fn with_cookie(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("accessToken={}", token)).unwrap(),
        );
        headers
    }

    fn token_for(role: Role, ttl: u64) -> String {
        tokens()
            .issue_at(SessionIdentity::new("u-1", role, "User", "u@example.com"), ttl, NOW)
            .unwrap()
    }

    fn decide(path: &str, headers: &HeaderMap, now: i64) -> GateDecision {
        let policy = AccessPolicy::portal();
        let tokens = tokens();
        AuthorizationGate::new(&policy, &tokens, "accessToken").evaluate_at(path, headers, now)
    }

    #[test]
    fn login_redirect_carries_original_path() {
        assert_eq!(login_redirect("/dashboard"), "/login?next=%2Fdashboard");
    }

    #[test]
    fn public_login_page_needs_no_cookie() {
        assert_eq!(decide("/login", &HeaderMap::new(), NOW), GateDecision::Public);
    }

    #[test]
    fn public_paths_win_even_with_a_bad_cookie() {
        let decision = decide("/api/auth/session", &with_cookie("garbage"), NOW);
        assert_eq!(decision.state(), GateState::Public);
    }

    #[test]
    fn missing_cookie_redirects_to_login_with_next() {
        let decision = decide("/dashboard", &HeaderMap::new(), NOW);
        assert_eq!(decision.state(), GateState::NoToken);
        assert_eq!(decision.location(), Some("/login?next=%2Fdashboard"));
    }

    #[test]
    fn invalid_token_redirects_to_login() {
        let decision = decide("/dashboard", &with_cookie("not.a.token"), NOW);
        assert_eq!(decision.state(), GateState::InvalidToken);
        assert_eq!(decision.location(), Some("/login?next=%2Fdashboard"));
    }

    #[test]
    fn expired_token_redirects_to_login_before_role_check() {
        let token = token_for(Role::Client, 900);
        let decision = decide("/tickets", &with_cookie(&token), NOW + 901);
        assert!(matches!(
            decision,
            GateDecision::InvalidToken { error: TokenError::Expired { .. }, .. }
        ));
    }

    #[test]
    fn client_on_admin_area_goes_to_client_default() {
        let token = token_for(Role::Client, 900);
        let decision = decide("/tickets", &with_cookie(&token), NOW);
        assert_eq!(decision.state(), GateState::Forbidden);
        assert_eq!(decision.location(), Some("/dashboard"));
    }

    #[test]
    fn admin_reaches_nested_client_pages() {
        let token = token_for(Role::Admin, 900);
        match decide("/clients/add", &with_cookie(&token), NOW) {
            GateDecision::Authorized(claims) => assert_eq!(claims.role, Role::Admin),
            other => panic!("expected pass-through, got {:?}", other),
        }
    }

    #[test]
    fn dot_segments_do_not_make_a_path_public() {
        let decision = decide("/api/../tickets", &HeaderMap::new(), NOW);
        assert_eq!(decision.state(), GateState::NoToken);
        assert_eq!(decision.location(), Some("/login?next=%2Ftickets"));
    }

    #[test]
    fn dot_segments_do_not_widen_a_role() {
        let token = token_for(Role::Client, 900);
        let decision = decide("/dashboard/../tickets", &with_cookie(&token), NOW);
        assert_eq!(decision.state(), GateState::Forbidden);
        assert_eq!(decision.location(), Some("/dashboard"));

        let decision = decide("/dashboard/%2e%2e/tickets", &with_cookie(&token), NOW);
        assert_eq!(decision.state(), GateState::Forbidden);
    }

    #[test]
    fn repeated_slashes_are_collapsed_before_matching() {
        let token = token_for(Role::Admin, 900);
        let decision = decide("//clients//add", &with_cookie(&token), NOW);
        assert_eq!(decision.state(), GateState::Authorized);

        let decision = decide("//dashboard", &HeaderMap::new(), NOW);
        assert_eq!(decision.location(), Some("/login?next=%2Fdashboard"));
    }

    #[test]
    fn every_role_is_authorized_on_its_default_page() {
        let policy = AccessPolicy::portal();
        for role in Role::ALL {
            let token = token_for(role, 900);
            let decision = decide(policy.default_path(role), &with_cookie(&token), NOW);
            assert_eq!(decision.state(), GateState::Authorized, "{}", role);
        }
    }
}
