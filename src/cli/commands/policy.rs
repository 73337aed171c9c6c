use std::path::PathBuf;

use clap::Subcommand;
use serde_json::json;

use crate::access::AccessPolicy;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::types::Role;

#[derive(Subcommand)]
pub enum PolicyCommands {
    #[command(about = "Show public routes and each role's allowed prefixes")]
    Show {
        #[arg(long, help = "Policy YAML file (defaults to the built-in table)")]
        file: Option<PathBuf>,
    },

    #[command(about = "Check whether a role may open a path")]
    Check {
        #[arg(help = "Role: client, admin, support_admin, support_head_admin")]
        role: Role,
        #[arg(help = "Request path, e.g. /clients/add")]
        path: String,
        #[arg(long, help = "Policy YAML file (defaults to the built-in table)")]
        file: Option<PathBuf>,
    },

    #[command(about = "Validate a policy YAML file")]
    Validate {
        #[arg(help = "Policy YAML file")]
        file: PathBuf,
    },
}

fn load(file: Option<PathBuf>) -> anyhow::Result<AccessPolicy> {
    Ok(match file {
        Some(path) => AccessPolicy::load(&path)?,
        None => AccessPolicy::builtin().clone(),
    })
}

/// Outcome of a request to `path` by a signed-in user with `role`.
pub fn describe_access(policy: &AccessPolicy, role: Role, path: &str) -> (&'static str, Option<String>) {
    if policy.is_public(path) {
        ("public", None)
    } else if policy.is_authorized(role, path) {
        ("authorized", None)
    } else {
        ("forbidden", Some(policy.default_path(role).to_string()))
    }
}

pub async fn handle(cmd: PolicyCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PolicyCommands::Show { file } => {
            let policy = load(file)?;
            let roles: serde_json::Map<String, serde_json::Value> = policy
                .roles()
                .map(|(role, rule)| {
                    (
                        role.to_string(),
                        json!({ "allow": rule.allow, "default": rule.default }),
                    )
                })
                .collect();

            output_success(
                output_format,
                "Access policy",
                Some(json!({
                    "public_paths": policy.public_paths().collect::<Vec<_>>(),
                    "public_prefixes": policy.public_prefixes().collect::<Vec<_>>(),
                    "roles": roles,
                })),
            )
        }
        PolicyCommands::Check { role, path, file } => {
            let policy = load(file)?;
            let (outcome, redirect) = describe_access(&policy, role, &path);

            let message = match &redirect {
                Some(location) => format!("{} may not open {}; redirected to {}", role, path, location),
                None => format!("{} may open {} ({})", role, path, outcome),
            };
            output_success(
                output_format,
                &message,
                Some(json!({ "role": role, "path": path, "outcome": outcome, "redirect_to": redirect })),
            )
        }
        PolicyCommands::Validate { file } => {
            AccessPolicy::load(&file)?;
            output_success(
                output_format,
                &format!("{} is a valid access policy", file.display()),
                None,
            )
        }
    }
}
