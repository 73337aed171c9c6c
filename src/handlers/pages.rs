use axum::{http::Uri, Extension};
use serde::Serialize;

use crate::auth::SessionClaims;
use crate::middleware::ApiResponse;
use crate::types::{Role, UserKind};

/// Stand-in for the rendered UI page.
#[derive(Debug, Serialize)]
pub struct PageView {
    pub path: String,
    pub public: bool,
    pub role: Option<Role>,
    pub kind: Option<UserKind>,
    pub name: Option<String>,
}

/// Fallback for every path without an API route.
///
/// The gate has already run: claims are present for authorized pages and
/// absent for public ones.
pub async fn page(uri: Uri, claims: Option<Extension<SessionClaims>>) -> ApiResponse<PageView> {
    let view = match claims {
        Some(Extension(claims)) => PageView {
            path: uri.path().to_string(),
            public: false,
            role: Some(claims.role),
            kind: Some(claims.kind()),
            name: Some(claims.name),
        },
        None => PageView {
            path: uri.path().to_string(),
            public: true,
            role: None,
            kind: None,
            name: None,
        },
    };
    ApiResponse::success(view)
}
