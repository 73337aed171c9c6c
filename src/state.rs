use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::access::{AccessPolicy, PolicyError};
use crate::auth::{
    BackendVerifier, CookieSettings, CredentialError, CredentialVerifier, TokenError,
    TokenService, UserDirectory,
};
use crate::config::{AppConfig, SecretSource};
use crate::middleware::AuthorizationGate;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("invalid signing secret: {0}")]
    Secret(#[from] TokenError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Everything a request needs, shared read-only across the server.
#[derive(Clone)]
pub struct AppState {
    pub tokens: TokenService,
    pub policy: Arc<AccessPolicy>,
    pub cookies: CookieSettings,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub ttl_seconds: u64,
}

impl AppState {
    pub fn new(
        tokens: TokenService,
        policy: Arc<AccessPolicy>,
        cookies: CookieSettings,
        credentials: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let ttl_seconds = cookies.max_age_seconds;
        Self {
            tokens,
            policy,
            cookies,
            credentials,
            ttl_seconds,
        }
    }

    pub fn gate(&self) -> AuthorizationGate<'_> {
        AuthorizationGate::new(&self.policy, &self.tokens, &self.cookies.name)
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        if config.session.secret_source == SecretSource::DevelopmentFallback {
            tracing::warn!(
                "PORTAL_JWT_SECRET is not set; signing sessions with the development fallback secret"
            );
        }
        let tokens = TokenService::new(config.session.secret.as_bytes())?;

        let policy = match &config.access.policy_file {
            Some(path) => {
                let policy = AccessPolicy::load(path)?;
                tracing::info!("Loaded access policy from {}", path.display());
                policy
            }
            None => AccessPolicy::builtin().clone(),
        };

        let credentials = credential_verifier(config)?;
        tracing::info!("Verifying logins against {}", credentials.describe());

        let cookies = CookieSettings {
            name: config.session.cookie_name.clone(),
            secure: config.session.cookie_secure,
            max_age_seconds: config.session.ttl_seconds,
        };

        Ok(Self::new(tokens, Arc::new(policy), cookies, credentials))
    }
}

fn credential_verifier(config: &AppConfig) -> Result<Arc<dyn CredentialVerifier>, StartupError> {
    let settings = &config.credentials;
    if let Some(url) = &settings.backend_url {
        let timeout = Duration::from_secs(settings.backend_timeout_secs);
        return Ok(Arc::new(BackendVerifier::new(url, timeout)?));
    }
    if let Some(path) = &settings.users_file {
        return Ok(Arc::new(UserDirectory::load(path)?));
    }

    tracing::warn!("No PORTAL_BACKEND_URL or PORTAL_USERS_FILE configured; every login will be rejected");
    Ok(Arc::new(UserDirectory::empty()))
}
