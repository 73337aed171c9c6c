use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::claims::{SessionClaims, SessionIdentity};

type HmacSha256 = Hmac<Sha256>;

/// Default session lifetime: 15 minutes.
pub const DEFAULT_TTL_SECONDS: u64 = 900;

pub const TOKEN_ALGORITHM: &str = "HMAC-SHA256";
pub const TOKEN_TYPE: &str = "session-token";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("token ttl must be a positive number of seconds")]
    InvalidTtl,

    #[error("token subject must not be empty")]
    EmptySubject,

    #[error("malformed token: {0}")]
    Malformed(&'static str),

    #[error("token signature does not match")]
    BadSignature,

    #[error("unsupported token header: alg={alg}, type={typ}")]
    UnsupportedHeader { alg: String, typ: String },

    #[error("token expired at {expires_at}")]
    Expired { expires_at: i64 },

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// First token segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(rename = "type")]
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// Issues and verifies `header.claims.signature` session tokens.
///
/// The keyed MAC is prepared once from the secret and cloned per operation,
/// so the service is cheap to share across requests.
#[derive(Clone)]
pub struct TokenService {
    mac: HmacSha256,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("mac", &"<redacted>").finish()
    }
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::EmptySecret)?;
        Ok(Self { mac })
    }

    pub fn issue(&self, identity: SessionIdentity, ttl_seconds: u64) -> Result<String, TokenError> {
        self.issue_at(identity, ttl_seconds, Utc::now().timestamp())
    }

    pub fn issue_at(
        &self,
        identity: SessionIdentity,
        ttl_seconds: u64,
        now: i64,
    ) -> Result<String, TokenError> {
        if ttl_seconds == 0 {
            return Err(TokenError::InvalidTtl);
        }
        self.sign(&SessionClaims::new(identity, now, ttl_seconds))
    }

    /// Signs fully populated claims.
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        if claims.expires_at <= claims.issued_at {
            return Err(TokenError::InvalidTtl);
        }
        if claims.subject.trim().is_empty() {
            return Err(TokenError::EmptySubject);
        }

        let header = encode_segment(&TokenHeader::default())?;
        let payload = encode_segment(claims)?;
        let signing_input = format!("{}.{}", header, payload);
        let signature = URL_SAFE_NO_PAD.encode(self.signature(signing_input.as_bytes()));

        Ok(format!("{}.{}", signing_input, signature))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
        let parts = split_token(token)?;

        let signature = URL_SAFE_NO_PAD
            .decode(parts.signature)
            .map_err(|_| TokenError::Malformed("signature is not base64url"))?;

        let mut mac = self.mac.clone();
        mac.update(parts.signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let header: TokenHeader = decode_segment(parts.header, Segment::Header)?;
        check_header(&header)?;

        let claims: SessionClaims = decode_segment(parts.claims, Segment::Claims)?;
        if claims.subject.trim().is_empty() {
            return Err(TokenError::Malformed("subject is empty"));
        }
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired {
                expires_at: claims.expires_at,
            });
        }

        Ok(claims)
    }

    fn signature(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Reads header and claims without checking the signature or expiry.
///
/// Claims are only integrity protected, so anyone holding the token can do this.
pub fn decode_unverified(token: &str) -> Result<(TokenHeader, SessionClaims), TokenError> {
    let parts = split_token(token)?;
    let header = decode_segment(parts.header, Segment::Header)?;
    let claims = decode_segment(parts.claims, Segment::Claims)?;
    Ok((header, claims))
}

struct TokenParts<'a> {
    header: &'a str,
    claims: &'a str,
    signature: &'a str,
    signing_input: &'a str,
}

fn split_token(token: &str) -> Result<TokenParts<'_>, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed("expected three segments"));
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(TokenError::Malformed("empty segment"));
    }

    let signing_len = segments[0].len() + 1 + segments[1].len();
    Ok(TokenParts {
        header: segments[0],
        claims: segments[1],
        signature: segments[2],
        signing_input: &token[..signing_len],
    })
}

fn check_header(header: &TokenHeader) -> Result<(), TokenError> {
    if header.alg != TOKEN_ALGORITHM || header.typ != TOKEN_TYPE {
        return Err(TokenError::UnsupportedHeader {
            alg: header.alg.clone(),
            typ: header.typ.clone(),
        });
    }
    Ok(())
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Encoding(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

#[derive(Clone, Copy)]
enum Segment {
    Header,
    Claims,
}

impl Segment {
    fn not_base64(self) -> &'static str {
        match self {
            Segment::Header => "header is not base64url",
            Segment::Claims => "claims are not base64url",
        }
    }

    fn not_json(self) -> &'static str {
        match self {
            Segment::Header => "header is not valid JSON",
            Segment::Claims => "claims are not valid JSON",
        }
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, kind: Segment) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed(kind.not_base64()))?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed(kind.not_json()))
}
