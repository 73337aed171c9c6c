use thiserror::Error;

use crate::types::Role;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("failed to read access policy {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid access policy {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("no access rule for role '{0}'")]
    MissingRole(Role),

    #[error("role '{0}' has no allowed path prefixes")]
    EmptyAllowList(Role),

    #[error("invalid path '{path}' in {context}: paths must start with '/' and must not end with '/'")]
    InvalidPath { path: String, context: String },

    #[error("default path '{default}' for role '{role}' is not inside its allowed prefixes")]
    DefaultNotAllowed { role: Role, default: String },
}
