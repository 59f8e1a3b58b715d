//! AgriVerse CLI - cart client for the marketplace API.
//!
//! # Usage
//!
//! ```bash
//! # Remember who is logged in
//! agriverse login -u 65f1c0ffee0123456789abcd -n "Asha" -r Buyer
//!
//! # Show the cart
//! agriverse cart show
//!
//! # Add a product, then change its quantity
//! agriverse cart add --product-id p1 --name Rice --price 50 --image rice.jpg
//! agriverse cart increase p1
//! agriverse cart decrease p1
//!
//! # Drop a product, or everything
//! agriverse cart remove p1
//! agriverse cart clear
//!
//! # Forget the session
//! agriverse logout
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `whoami` - Manage the persisted session record
//! - `cart` - Show or change the logged-in user's cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::cart::CartAction;
use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "agriverse")]
#[command(author, version, about = "AgriVerse marketplace cart client")]
struct Cli {
    /// Marketplace API base URL (overrides `AGRIVERSE_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session record path (overrides `AGRIVERSE_SESSION_FILE`)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the logged-in user
    Login {
        /// Backend user id
        #[arg(short, long)]
        user_id: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Account role (`Farmer`, `Buyer`)
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Forget the logged-in user
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agriverse_cart=info,agriverse_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::load(cli.api_url.as_deref(), cli.session_file)?;

    match cli.command {
        Commands::Login {
            user_id,
            name,
            role,
        } => commands::session::login(&ctx, user_id, name, role)?,
        Commands::Logout => commands::session::logout(&ctx)?,
        Commands::Whoami => commands::session::whoami(&ctx)?,
        Commands::Cart { action } => commands::cart::run(&ctx, action).await?,
    }
    Ok(())
}
