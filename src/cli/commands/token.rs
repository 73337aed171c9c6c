use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{decode_unverified, SessionIdentity, TokenError, TokenService};
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::{AppConfig, SecretSource};
use crate::types::Role;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a session token signed with PORTAL_JWT_SECRET")]
    Issue {
        #[arg(long, help = "Role: client, admin, support_admin, support_head_admin")]
        role: Role,
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Email address")]
        email: String,
        #[arg(long, help = "User identifier (random if omitted)")]
        subject: Option<String>,
        #[arg(long, help = "Lifetime in seconds (defaults to PORTAL_TOKEN_TTL_SECS)")]
        ttl: Option<u64>,
    },

    #[command(about = "Verify a token's signature and expiry")]
    Verify {
        #[arg(help = "Session token")]
        token: String,
    },

    #[command(about = "Decode a token's header and claims without verifying")]
    Inspect {
        #[arg(help = "Session token")]
        token: String,
    },
}

fn token_service() -> anyhow::Result<(TokenService, AppConfig)> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.session.secret_source == SecretSource::DevelopmentFallback {
        tracing::warn!("PORTAL_JWT_SECRET is not set; using the development fallback secret");
    }
    let tokens = TokenService::new(config.session.secret.as_bytes())?;
    Ok((tokens, config))
}

fn error_code(err: &TokenError) -> &'static str {
    match err {
        TokenError::Malformed(_) => "MALFORMED",
        TokenError::BadSignature => "BAD_SIGNATURE",
        TokenError::UnsupportedHeader { .. } => "UNSUPPORTED_HEADER",
        TokenError::Expired { .. } => "EXPIRED",
        TokenError::EmptySubject => "INVALID_CLAIMS",
        TokenError::EmptySecret | TokenError::InvalidTtl | TokenError::Encoding(_) => "CONFIGURATION",
    }
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { role, name, email, subject, ttl } => {
            let (tokens, config) = token_service()?;
            let ttl = ttl.unwrap_or(config.session.ttl_seconds);
            let subject = subject.unwrap_or_else(|| Uuid::new_v4().to_string());

            let identity = SessionIdentity::new(subject.clone(), role, name, email);
            let token = tokens.issue(identity, ttl)?;

            output_success(
                output_format,
                &format!("Issued {} token for {}", role, subject),
                Some(json!({ "token": token, "expires_in": ttl })),
            )
        }
        TokenCommands::Verify { token } => {
            let (tokens, _) = token_service()?;
            match tokens.verify(token.trim()) {
                Ok(claims) => output_success(
                    output_format,
                    "Token is valid",
                    Some(json!({ "claims": claims })),
                ),
                Err(err) => {
                    output_error(output_format, &format!("Token rejected: {}", err), Some(error_code(&err)))?;
                    std::process::exit(1);
                }
            }
        }
        TokenCommands::Inspect { token } => {
            let (header, claims) = decode_unverified(token.trim())?;
            output_success(
                output_format,
                "Decoded token (signature not checked)",
                Some(json!({ "header": header, "claims": claims })),
            )
        }
    }
}
