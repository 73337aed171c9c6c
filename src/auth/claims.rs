use serde::{Deserialize, Serialize};

use crate::types::{Role, UserKind};

/// Identity fields supplied at login; timestamps are added on issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub subject: String,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl SessionIdentity {
    pub fn new(
        subject: impl Into<String>,
        role: Role,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            role,
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Opaque user identifier
    #[serde(rename = "sub")]
    pub subject: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl SessionClaims {
    pub fn new(identity: SessionIdentity, issued_at: i64, ttl_seconds: u64) -> Self {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        Self {
            subject: identity.subject,
            role: identity.role,
            name: identity.name,
            email: identity.email,
            issued_at,
            expires_at: issued_at.saturating_add(ttl),
        }
    }

    /// Valid up to and including the expiry second.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }

    pub fn seconds_remaining(&self, now: i64) -> i64 {
        (self.expires_at - now).max(0)
    }

    pub fn kind(&self) -> UserKind {
        self.role.kind()
    }

    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            subject: self.subject.clone(),
            role: self.role,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SessionIdentity {
        SessionIdentity::new("user-1", Role::Admin, "Ada", "ada@example.com")
    }

    #[test]
    fn new_claims_expire_ttl_seconds_after_issue() {
        let claims = SessionClaims::new(identity(), 1_700_000_000, 900);
        assert_eq!(claims.issued_at, 1_700_000_000);
        assert_eq!(claims.expires_at, 1_700_000_900);
        assert!(claims.expires_at > claims.issued_at);
    }

    #[test]
    fn expiry_second_itself_is_still_valid() {
        let claims = SessionClaims::new(identity(), 100, 10);
        assert!(!claims.is_expired_at(109));
        assert!(!claims.is_expired_at(110));
        assert!(claims.is_expired_at(111));
    }

    #[test]
    fn claims_use_short_wire_keys() {
        let claims = SessionClaims::new(identity(), 100, 10);
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["sub"], "user-1");
        assert_eq!(value["role"], "admin");
        assert_eq!(value["iat"], 100);
        assert_eq!(value["exp"], 110);
    }
}
