pub mod policy;
pub mod token;
pub mod user;
