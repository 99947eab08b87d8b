//! Pastelería CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the database (if needed) and apply migrations
//! pasteleria-cli migrate
//!
//! # Load the product catalog
//! pasteleria-cli seed --file crates/storefront/data/catalog.json
//!
//! # Create a back-office account
//! pasteleria-cli user create -c admin@duoc.cl -n Ana -a Rojas -r admin
//! ```
//!
//! Every command reads `DATABASE_PATH` (default `pasteleria.db`), or
//! `--database` when given.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "pasteleria-cli")]
#[command(author, version, about = "Pastelería CLI tools")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "DATABASE_PATH", default_value = "pasteleria.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database if needed and apply migrations
    Migrate,
    /// Load categories and products from a JSON catalog
    Seed {
        /// Seed file path
        #[arg(short, long, default_value = "crates/storefront/data/catalog.json")]
        file: PathBuf,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Email address
        #[arg(short, long)]
        correo: String,

        /// First name
        #[arg(short, long)]
        nombre: String,

        /// Last name
        #[arg(short, long)]
        apellido: String,

        /// Role (`user`, `vendedor`, `admin`)
        #[arg(short, long, default_value = "user")]
        role: String,

        /// Password (at least 8 characters)
        #[arg(long, env = "PASTELERIA_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

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
        Commands::Migrate => commands::migrate::run(&cli.database).await?,
        Commands::Seed { file } => commands::seed::catalog(&cli.database, &file).await?,
        Commands::User { action } => match action {
            UserAction::Create {
                correo,
                nombre,
                apellido,
                role,
                password,
            } => {
                let account = commands::user::NewAccount {
                    correo,
                    nombre,
                    apellido,
                    role,
                    password: SecretString::from(password),
                };
                commands::user::create(&cli.database, &account).await?;
            }
        },
    }
    Ok(())
}
