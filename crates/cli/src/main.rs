//! Loyalty card CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! loyalty-cli migrate
//!
//! # Create the first admin user
//! loyalty-cli user create -u admin -p 'correct horse battery' -r admin
//!
//! # Import customers from a workbook
//! loyalty-cli customers import customers.xlsx
//!
//! # Export users and customers
//! loyalty-cli export backup.xlsx
//! ```
//!
//! # Environment Variables
//!
//! - `LOYALTY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "loyalty-cli")]
#[command(author, version, about = "Loyalty card CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage customers
    Customers {
        #[command(subcommand)]
        action: CustomersAction,
    },
    /// Export users and customers to an xlsx workbook
    Export {
        /// Output file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Password (min 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`admin`, `staff`)
        #[arg(short, long, default_value = "staff")]
        role: String,
    },
}

#[derive(Subcommand)]
enum CustomersAction {
    /// Import customers from an xlsx workbook
    Import {
        /// Workbook with `name` and `unique_id` columns
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                password,
                role,
            } => {
                commands::user::create(&username, &password, &role).await?;
            }
        },
        Commands::Customers { action } => match action {
            CustomersAction::Import { file } => commands::customers::import(&file).await?,
        },
        Commands::Export { file } => commands::export::run(&file).await?,
    }
    Ok(())
}
