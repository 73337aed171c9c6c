use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::error::PolicyError;
use crate::types::Role;

/// Allowed prefixes and landing page for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    pub allow: BTreeSet<String>,
    pub default: String,
}

/// Public routes plus the role tables. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    #[serde(default)]
    public_paths: BTreeSet<String>,
    #[serde(default)]
    public_prefixes: BTreeSet<String>,
    roles: BTreeMap<Role, RoleRule>,
}

static PORTAL_POLICY: Lazy<AccessPolicy> = Lazy::new(AccessPolicy::portal);

fn rule(allow: &[&str], default: &str) -> RoleRule {
    RoleRule {
        allow: allow.iter().map(|p| p.to_string()).collect(),
        default: default.to_string(),
    }
}

/// `path` is `prefix` itself or lies beneath it.
pub fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Resolves `.` and `..` segments (plain or `%2e` encoded) and collapses
/// repeated separators, treating `\` as `/`. `..` never climbs above the root.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let mut trailing_slash = false;

    for segment in path.split(['/', '\\']) {
        match dot_segment(segment) {
            Some(DotSegment::Current) => trailing_slash = true,
            Some(DotSegment::Parent) => {
                segments.pop();
                trailing_slash = true;
            }
            None if segment.is_empty() => trailing_slash = true,
            None => {
                segments.push(segment);
                trailing_slash = false;
            }
        }
    }

    let mut normalized = format!("/{}", segments.join("/"));
    if trailing_slash && !segments.is_empty() {
        normalized.push('/');
    }
    normalized
}

enum DotSegment {
    Current,
    Parent,
}

fn dot_segment(segment: &str) -> Option<DotSegment> {
    if !segment.contains('.') && !segment.contains('%') {
        return None;
    }
    match segment.to_ascii_lowercase().replace("%2e", ".").as_str() {
        "." => Some(DotSegment::Current),
        ".." => Some(DotSegment::Parent),
        _ => None,
    }
}

fn check_path(path: &str, context: impl FnOnce() -> String) -> Result<(), PolicyError> {
    if !path.starts_with('/') || (path.len() > 1 && path.ends_with('/')) {
        return Err(PolicyError::InvalidPath {
            path: path.to_string(),
            context: context(),
        });
    }
    Ok(())
}

impl AccessPolicy {
    /// The portal's built-in route table.
    pub fn portal() -> Self {
        let roles = BTreeMap::from([
            (Role::Client, rule(&["/dashboard", "/tasks", "/support"], "/dashboard")),
            (
                Role::Admin,
                rule(&["/clients", "/projects", "/tickets", "/team", "/settings"], "/clients"),
            ),
            (Role::SupportAdmin, rule(&["/tickets"], "/tickets")),
            (Role::SupportHeadAdmin, rule(&["/tickets", "/team"], "/tickets")),
        ]);

        Self {
            public_paths: ["/", "/login", "/signup", "/forgot-password"]
                .into_iter()
                .map(String::from)
                .collect(),
            public_prefixes: ["/api", "/assets"].into_iter().map(String::from).collect(),
            roles,
        }
    }

    /// Shared instance of [`AccessPolicy::portal`].
    pub fn builtin() -> &'static AccessPolicy {
        &PORTAL_POLICY
    }

    pub fn new(
        public_paths: impl IntoIterator<Item = String>,
        public_prefixes: impl IntoIterator<Item = String>,
        roles: BTreeMap<Role, RoleRule>,
    ) -> Result<Self, PolicyError> {
        let policy = Self {
            public_paths: public_paths.into_iter().collect(),
            public_prefixes: public_prefixes.into_iter().collect(),
            roles,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_yaml(source: &str, origin: &str) -> Result<Self, PolicyError> {
        let policy: AccessPolicy =
            serde_yaml::from_str(source).map_err(|source| PolicyError::Parse {
                path: origin.to_string(),
                source,
            })?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_yaml(&source, &display)
    }

    /// Every role has a non-empty allow-set whose prefixes are well formed,
    /// and each role's default path is reachable by that role.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for path in &self.public_paths {
            if !path.starts_with('/') {
                return Err(PolicyError::InvalidPath {
                    path: path.clone(),
                    context: "public_paths".to_string(),
                });
            }
        }
        for prefix in &self.public_prefixes {
            check_path(prefix, || "public_prefixes".to_string())?;
        }

        for role in Role::ALL {
            let rule = self.roles.get(&role).ok_or(PolicyError::MissingRole(role))?;
            if rule.allow.is_empty() {
                return Err(PolicyError::EmptyAllowList(role));
            }
            for prefix in &rule.allow {
                check_path(prefix, || format!("allow list of '{}'", role))?;
            }
            check_path(&rule.default, || format!("default of '{}'", role))?;
            if !self.is_authorized(role, &rule.default) {
                return Err(PolicyError::DefaultNotAllowed {
                    role,
                    default: rule.default.clone(),
                });
            }
        }
        Ok(())
    }

    /// Exact public literal or under a reserved public prefix.
    ///
    /// Checked against the normalized path, so `/api/../tickets` is not public.
    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.public_paths.contains(&path)
            || self
                .public_prefixes
                .iter()
                .any(|prefix| matches_prefix(&path, prefix))
    }

    /// Role may open the normalized path.
    pub fn is_authorized(&self, role: Role, path: &str) -> bool {
        let path = normalize_path(path);
        self.roles
            .get(&role)
            .map(|rule| rule.allow.iter().any(|prefix| matches_prefix(&path, prefix)))
            .unwrap_or(false)
    }

    /// Landing page for the role; `/login` if the table lacks the role,
    /// which validation rules out.
    pub fn default_path(&self, role: Role) -> &str {
        self.roles
            .get(&role)
            .map(|rule| rule.default.as_str())
            .unwrap_or("/login")
    }

    pub fn rule(&self, role: Role) -> Option<&RoleRule> {
        self.roles.get(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = (Role, &RoleRule)> {
        self.roles.iter().map(|(role, rule)| (*role, rule))
    }

    pub fn public_paths(&self) -> impl Iterator<Item = &str> {
        self.public_paths.iter().map(String::as_str)
    }

    pub fn public_prefixes(&self) -> impl Iterator<Item = &str> {
        self.public_prefixes.iter().map(String::as_str)
    }
}
