// handlers/mod.rs - HTTP handlers
//
// Everything under /api is public to the route gate; the session handlers
// check the cookie themselves and answer 401 instead of redirecting.
// Page requests fall through to `pages::page`, which only runs once the
// gate has authorized them.

pub mod auth;   // /api/auth/* - login, session, refresh, logout
pub mod health; // /api/health and / service descriptor
pub mod pages;  // Fallback for UI routes behind the gate

pub use health::{health, root};
pub use pages::page;
