use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::handlers;
use crate::middleware::session_gate_middleware;
use crate::state::AppState;

/// Full portal router. The gate wraps every route and the page fallback.
pub fn app(state: AppState, security: &SecurityConfig) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        // Session API
        .merge(auth_routes())
        // UI pages behind the gate
        .fallback(handlers::page)
        .layer(from_fn_with_state(state.clone(), session_gate_middleware))
        .with_state(state);

    let router = match cors_layer(security) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/session", get(auth::session))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::access::AccessPolicy;
    use crate::auth::{hash_password, CookieSettings, SessionIdentity, TokenService, UserDirectory};
    use crate::types::Role;

    fn state() -> AppState {
        let directory = UserDirectory::from_yaml(
            &format!(
                "users:\n  - id: a-1\n    name: Ada\n    email: ada@example.com\n    role: admin\n    password_hash: \"{}\"\n",
                hash_password("correct horse", 4).unwrap()
            ),
            "inline",
        )
        .unwrap();

        AppState::new(
            TokenService::new(b"router-test-secret").unwrap(),
            Arc::new(AccessPolicy::portal()),
            CookieSettings {
                name: "accessToken".to_string(),
                secure: false,
                max_age_seconds: 900,
            },
            Arc::new(directory),
        )
    }

    fn router() -> Router {
        let security = SecurityConfig {
            enable_cors: false,
            cors_origins: Vec::new(),
        };
        app(state(), &security)
    }

    fn cookie_for(role: Role) -> String {
        let token = state()
            .tokens
            .issue(SessionIdentity::new("u-9", role, "Tester", "t@example.com"), 900)
            .unwrap();
        format!("accessToken={}", token)
    }

    async fn send_get(path: &str, cookie: Option<&str>) -> axum::response::Response {
        let mut request = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        router()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn dashboard_without_cookie_redirects_to_login() {
        let response = send_get("/dashboard", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/login?next=%2Fdashboard");
    }

    #[tokio::test]
    async fn login_page_is_served_without_cookie() {
        let response = send_get("/login", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn client_is_sent_home_from_tickets() {
        let cookie = cookie_for(Role::Client);
        let response = send_get("/tickets", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn admin_passes_through_to_client_pages() {
        let cookie = cookie_for(Role::Admin);
        let response = send_get("/clients/add", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tampered_cookie_redirects_to_login() {
        let mut cookie = cookie_for(Role::Admin);
        cookie.push('x');
        let response = send_get("/clients", Some(&cookie)).await;
        assert_eq!(location(&response), "/login?next=%2Fclients");
    }

    #[tokio::test]
    async fn dot_segments_under_public_prefix_still_need_a_session() {
        let response = send_get("/api/../tickets", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/login?next=%2Ftickets");
    }

    #[tokio::test]
    async fn dot_segments_do_not_escape_the_role_area() {
        let cookie = cookie_for(Role::Client);
        let response = send_get("/dashboard/../tickets", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn allowed_non_canonical_paths_redirect_to_the_canonical_page() {
        let cookie = cookie_for(Role::Admin);
        let response = send_get("//clients//add?tab=1", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/clients/add?tab=1");

        let response = send_get("/api/auth/../health", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/api/health");
    }

    #[tokio::test]
    async fn session_endpoint_answers_401_instead_of_redirecting() {
        let response = send_get("/api/auth/session", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_sets_http_only_cookie() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"ada@example.com","password":"correct horse"}"#))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("accessToken="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=900"));
    }

    #[tokio::test]
    async fn malformed_login_body_gets_the_error_envelope() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_401() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"ada@example.com","password":"wrong"}"#))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
