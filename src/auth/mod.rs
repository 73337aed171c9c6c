pub mod claims;
pub mod cookie;
pub mod credentials;
pub mod token;

pub use claims::{SessionClaims, SessionIdentity};
pub use cookie::{read_cookie, CookieSettings};
pub use credentials::{
    hash_password, BackendVerifier, CredentialError, CredentialVerifier, UserDirectory,
    VerifiedUser,
};
pub use token::{decode_unverified, TokenError, TokenHeader, TokenService, DEFAULT_TTL_SECONDS};
