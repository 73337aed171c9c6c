use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::auth::CookieSettings;

/// Success envelope `{ "success": true, "data": ... }`, optionally writing
/// the session cookie alongside.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
    pub set_cookie: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::OK,
            set_cookie: None,
        }
    }

    /// Attach a rendered `Set-Cookie` value.
    pub fn with_cookie(mut self, cookie: String) -> Self {
        self.set_cookie = Some(cookie);
        self
    }
}

impl ApiResponse<()> {
    /// 204 with no body; the cookie, if any, is still sent.
    pub fn no_content() -> Self {
        Self {
            data: (),
            status_code: StatusCode::NO_CONTENT,
            set_cookie: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let mut response = if self.status_code == StatusCode::NO_CONTENT {
            self.status_code.into_response()
        } else {
            match serde_json::to_value(&self.data) {
                Ok(data) => (
                    self.status_code,
                    Json(json!({ "success": true, "data": data })),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!("Failed to serialize response data: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "success": false,
                            "error": "Failed to serialize response data"
                        })),
                    )
                        .into_response();
                }
            }
        };

        if let Some(cookie) = self.set_cookie.as_deref() {
            match CookieSettings::header_value(cookie) {
                Some(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                None => tracing::error!("Dropping Set-Cookie value that is not a valid header"),
            }
        }
        response
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
