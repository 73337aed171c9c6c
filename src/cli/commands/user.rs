use clap::Subcommand;
use serde_json::json;

use crate::auth::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Hash a password for the users file (password_hash field)")]
    HashPassword {
        #[arg(help = "Plain text password")]
        password: String,
        #[arg(long, default_value_t = bcrypt::DEFAULT_COST, help = "bcrypt cost factor (4-31)")]
        cost: u32,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::HashPassword { password, cost } => {
            if password.is_empty() {
                anyhow::bail!("password must not be empty");
            }
            let hash = hash_password(&password, cost)?;
            output_success(
                output_format,
                "Password hashed",
                Some(json!({ "password_hash": hash })),
            )
        }
    }
}
