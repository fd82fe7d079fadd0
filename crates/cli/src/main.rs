//! Sticker Shop CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! ss-cli migrate
//!
//! # Make an existing account an admin (or take it away)
//! ss-cli user promote -e admin@example.com
//! ss-cli user demote -e admin@example.com
//!
//! # Load catalog entries from YAML
//! ss-cli seed stickers -f data/stickers.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sticker_shop_core::UserRole;

mod commands;

#[derive(Parser)]
#[command(name = "ss-cli")]
#[command(author, version, about = "Sticker Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage account roles
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Grant the admin role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an admin to the regular user role
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert stickers listed in a YAML file
    Stickers {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::User { action } => match action {
            UserAction::Promote { email } => {
                commands::user::set_role(&email, UserRole::Admin).await?;
            }
            UserAction::Demote { email } => {
                commands::user::set_role(&email, UserRole::User).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Stickers { file } => commands::seed::stickers(&file).await?,
        },
    }
    Ok(())
}
