use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::DEFAULT_TTL_SECONDS;

/// Signing key used when no secret is configured outside staging and production.
pub const DEVELOPMENT_SECRET: &str = "portal-gate-development-secret-do-not-deploy";

pub const DEFAULT_COOKIE_NAME: &str = "accessToken";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORTAL_JWT_SECRET must be set when running in {0:?} mode")]
    MissingSecret(Environment),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("PORTAL_TOKEN_TTL_SECS must be greater than zero")]
    ZeroTtl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
    pub access: AccessConfig,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(skip_serializing, default)]
    pub secret: String,
    pub secret_source: SecretSource,
    pub ttl_seconds: u64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("secret_source", &self.secret_source)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretSource {
    Environment,
    DevelopmentFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Replaces the built-in route table when set
    pub policy_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub users_file: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub backend_timeout_secs: u64,
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Session overrides
        match lookup("PORTAL_JWT_SECRET").filter(|s| !s.trim().is_empty()) {
            Some(secret) => {
                self.session.secret = secret;
                self.session.secret_source = SecretSource::Environment;
            }
            None if self.environment == Environment::Development => {
                self.session.secret = DEVELOPMENT_SECRET.to_string();
                self.session.secret_source = SecretSource::DevelopmentFallback;
            }
            None => return Err(ConfigError::MissingSecret(self.environment)),
        }
        if let Some(v) = lookup("PORTAL_TOKEN_TTL_SECS") {
            self.session.ttl_seconds = parse("PORTAL_TOKEN_TTL_SECS", v)?;
        }
        if self.session.ttl_seconds == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if let Some(v) = lookup("PORTAL_COOKIE_NAME").filter(|s| !s.trim().is_empty()) {
            self.session.cookie_name = v.trim().to_string();
        }
        if let Some(v) = lookup("PORTAL_COOKIE_SECURE") {
            self.session.cookie_secure = parse("PORTAL_COOKIE_SECURE", v)?;
        }

        // Server overrides
        if let Some(v) = lookup("PORTAL_PORT").or_else(|| lookup("PORT")) {
            self.server.port = parse("PORTAL_PORT", v)?;
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = parse("SECURITY_ENABLE_CORS", v)?;
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Access and credential sources
        if let Some(v) = lookup("PORTAL_POLICY_FILE").filter(|s| !s.trim().is_empty()) {
            self.access.policy_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PORTAL_USERS_FILE").filter(|s| !s.trim().is_empty()) {
            self.credentials.users_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("PORTAL_BACKEND_URL").filter(|s| !s.trim().is_empty()) {
            url::Url::parse(&v).map_err(|_| ConfigError::InvalidValue {
                key: "PORTAL_BACKEND_URL",
                value: v.clone(),
            })?;
            self.credentials.backend_url = Some(v);
        }
        if let Some(v) = lookup("PORTAL_BACKEND_TIMEOUT_SECS") {
            self.credentials.backend_timeout_secs = parse("PORTAL_BACKEND_TIMEOUT_SECS", v)?;
        }

        Ok(self)
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            session: SessionConfig {
                secret: String::new(),
                secret_source: SecretSource::DevelopmentFallback,
                ttl_seconds: DEFAULT_TTL_SECONDS,
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
                cookie_secure: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            access: AccessConfig { policy_file: None },
            credentials: CredentialsConfig {
                users_file: None,
                backend_url: None,
                backend_timeout_secs: 10,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            session: SessionConfig {
                secret: String::new(),
                secret_source: SecretSource::Environment,
                ttl_seconds: DEFAULT_TTL_SECONDS,
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
                cookie_secure: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            access: AccessConfig { policy_file: None },
            credentials: CredentialsConfig {
                users_file: None,
                backend_url: None,
                backend_timeout_secs: 5,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            session: SessionConfig {
                secret: String::new(),
                secret_source: SecretSource::Environment,
                ttl_seconds: DEFAULT_TTL_SECONDS,
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
                cookie_secure: true,
            },
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            access: AccessConfig { policy_file: None },
            credentials: CredentialsConfig {
                users_file: None,
                backend_url: None,
                backend_timeout_secs: 5,
            },
        }
    }
}
