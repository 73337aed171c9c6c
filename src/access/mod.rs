pub mod error;
pub mod policy;

pub use error::PolicyError;
pub use policy::{matches_prefix, normalize_path, AccessPolicy, RoleRule};
