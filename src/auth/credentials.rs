use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::types::Role;

use super::claims::SessionIdentity;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("failed to read user directory {path}: {source}")]
    DirectoryRead {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid user directory {path}: {source}")]
    DirectoryParse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("duplicate user email in directory: {0}")]
    DuplicateEmail(String),

    #[error("user {email} has an empty id")]
    MissingId { email: String },

    #[error("user {email} does not have a bcrypt password hash")]
    InvalidHash { email: String },

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password check was interrupted: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("authentication backend unavailable: {0}")]
    Backend(#[from] reqwest::Error),

    #[error("authentication backend returned status {0}")]
    BackendStatus(u16),

    #[error("authentication backend returned a user without an id")]
    BackendIncompleteUser,
}

/// User identity returned by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<VerifiedUser> for SessionIdentity {
    fn from(user: VerifiedUser) -> Self {
        SessionIdentity::new(user.id, user.role, user.name, user.email)
    }
}

/// Checks a login attempt. `Ok(None)` means the credentials were rejected.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, email: &str, password: &str)
        -> Result<Option<VerifiedUser>, CredentialError>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    users: Vec<DirectoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// bcrypt hash (`$2b$...`, `$2y$...`)
    pub password_hash: String,
}

/// Fixed set of users loaded from a YAML file.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    entries: Vec<DirectoryEntry>,
}

impl UserDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Result<Self, CredentialError> {
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.email.to_lowercase()) {
                return Err(CredentialError::DuplicateEmail(entry.email.clone()));
            }
            if entry.id.trim().is_empty() {
                return Err(CredentialError::MissingId {
                    email: entry.email.clone(),
                });
            }
            if !entry.password_hash.starts_with("$2") {
                return Err(CredentialError::InvalidHash {
                    email: entry.email.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn from_yaml(source: &str, origin: &str) -> Result<Self, CredentialError> {
        let file: DirectoryFile =
            serde_yaml::from_str(source).map_err(|source| CredentialError::DirectoryParse {
                path: origin.to_string(),
                source,
            })?;
        Self::from_entries(file.users)
    }

    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|source| {
            CredentialError::DirectoryRead {
                path: display.clone(),
                source,
            }
        })?;
        Self::from_yaml(&source, &display)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CredentialVerifier for UserDirectory {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedUser>, CredentialError> {
        let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.email.eq_ignore_ascii_case(email.trim()))
        else {
            return Ok(None);
        };

        // bcrypt is CPU bound; run it off the async workers
        let hash = entry.password_hash.clone();
        let password = password.to_owned();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;

        Ok(matches.then(|| VerifiedUser {
            id: entry.id.clone(),
            name: entry.name.clone(),
            email: entry.email.clone(),
            role: entry.role,
        }))
    }

    fn describe(&self) -> String {
        format!("user directory ({} users)", self.entries.len())
    }
}

/// bcrypt hash in the format stored in user directory files.
pub fn hash_password(password: &str, cost: u32) -> Result<String, CredentialError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Delegates the password check to the portal backend API.
#[derive(Debug, Clone)]
pub struct BackendVerifier {
    client: reqwest::Client,
    login_url: String,
}

#[derive(Debug, Deserialize)]
struct BackendLoginResponse {
    user: VerifiedUser,
}

impl BackendVerifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CredentialError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            login_url: format!("{}/auth/login", base_url.trim_end_matches('/')),
        })
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

#[async_trait]
impl CredentialVerifier for BackendVerifier {
    async fn verify(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<VerifiedUser>, CredentialError> {
        let response = self
            .client
            .post(&self.login_url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: BackendLoginResponse = response.json().await?;
            if body.user.id.trim().is_empty() {
                return Err(CredentialError::BackendIncompleteUser);
            }
            return Ok(Some(body.user));
        }

        match status.as_u16() {
            400 | 401 | 403 | 404 => Ok(None),
            other => {
                tracing::warn!("Authentication backend answered {} for login", other);
                Err(CredentialError::BackendStatus(other))
            }
        }
    }

    fn describe(&self) -> String {
        format!("backend {}", self.login_url)
    }
}
