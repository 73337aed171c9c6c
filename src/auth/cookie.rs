use axum::http::{header, HeaderMap, HeaderValue};

/// Attributes shared by every session cookie the portal writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub max_age_seconds: u64,
}

impl CookieSettings {
    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn session(&self, token: &str) -> String {
        self.render(token, self.max_age_seconds)
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn cleared(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn header_value(cookie: &str) -> Option<HeaderValue> {
        HeaderValue::from_str(cookie).ok()
    }
}

/// Find a cookie by name across every `Cookie` header of the request.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
