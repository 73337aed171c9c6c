use axum::response::Json;
use serde_json::{json, Value};

/// GET / - Service descriptor
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Portal Gate",
            "version": version,
            "description": "Session tokens and role-based route authorization for the client portal",
            "endpoints": {
                "home": "/ (public)",
                "health": "/api/health (public)",
                "login": "/api/auth/login (public - starts a session)",
                "session": "/api/auth/session, /api/auth/refresh, /api/auth/logout (session cookie)",
                "pages": "everything else (role gated, redirects to /login or the role home)",
            }
        }
    }))
}

/// GET /api/health - Liveness check
pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}
