//! Shopfloor CLI - Database migrations and account bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Run catalog database migrations
//! sf-cli migrate catalog
//!
//! # Run users database migrations
//! sf-cli migrate users
//!
//! # Run all database migrations
//! sf-cli migrate all
//!
//! # Create the first admin account
//! sf-cli admin create -e admin@example.com -p 'a long password'
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(author, version, about = "Shopfloor CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run catalog database migrations
    Catalog,
    /// Run users database migrations
    Users,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin (or staff) account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// Role (`admin` or `staff`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Catalog => commands::migrate::catalog().await?,
            MigrateTarget::Users => commands::migrate::users().await?,
            MigrateTarget::All => {
                commands::migrate::catalog().await?;
                commands::migrate::users().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                password,
                role,
                first_name,
                last_name,
            } => {
                commands::admin::create_user(commands::admin::NewAdmin {
                    email,
                    password,
                    role,
                    first_name,
                    last_name,
                })
                .await?;
            }
        },
    }
    Ok(())
}
