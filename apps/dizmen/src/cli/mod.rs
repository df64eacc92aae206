//! # Dizmen CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Write a default `dizmen.toml` and create the database
//! - `token` - Issue an API token for a user
//! - `restaurants` - List restaurants, optionally by status
//! - `verify` / `reject` / `block` / `unblock` - Administrator actions
//! - `menu` - Show a restaurant's public menu
//! - `check` - Validate configuration and storage

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use dizmen_core::{DizmenError, VerificationAction};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Dizmen - QR restaurant menus with time-of-day availability.
#[derive(Parser, Debug)]
#[command(name = "dizmen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Path to the database (overrides storage.path)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "memory" or "redb" (overrides storage.backend)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides server.host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a default configuration file and create the database
    Init {
        /// Overwrite an existing configuration file and database
        #[arg(short, long)]
        force: bool,
    },

    /// Issue a signed API token
    Token {
        /// User id placed in the token subject
        #[arg(short, long)]
        user: String,

        /// Role: admin, owner or customer
        #[arg(short, long, default_value = "owner")]
        role: String,

        /// Lifetime in seconds (overrides auth.token_ttl_secs)
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// List restaurants
    Restaurants {
        /// Only restaurants in this status (pending, verified, rejected, blocked)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Verify a pending restaurant
    Verify {
        id: String,

        /// Revision last seen; fails if the restaurant changed since
        #[arg(long)]
        revision: Option<u64>,
    },

    /// Reject a pending restaurant
    Reject {
        id: String,

        #[arg(short, long)]
        reason: String,

        #[arg(long)]
        revision: Option<u64>,
    },

    /// Block a verified restaurant
    Block {
        id: String,

        #[arg(short, long)]
        reason: String,

        #[arg(long)]
        revision: Option<u64>,
    },

    /// Lift a block
    Unblock {
        id: String,

        #[arg(long)]
        revision: Option<u64>,
    },

    /// Show the public menu of a restaurant
    Menu {
        /// Restaurant id (the QR code payload)
        restaurant_id: String,

        /// Time of day to evaluate, HH:mm (default: now)
        #[arg(short, long)]
        at: Option<String>,
    },

    /// Validate configuration and storage
    Check,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Load configuration and run the chosen command.
pub async fn execute(cli: Cli) -> Result<(), DizmenError> {
    let mut config = Config::load(&cli.config)?;
    if let Some(path) = cli.database {
        config.storage.path = path;
    }
    if let Some(backend) = cli.backend.as_deref() {
        config.storage.backend = backend.parse()?;
    }
    if cli.verbose {
        tracing::info!("Configuration: {:?}", config.storage);
    }
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(config, host, port).await,
        Some(Commands::Init { force }) => cmd_init(&config, &cli.config, force),
        Some(Commands::Token { user, role, ttl }) => {
            cmd_token(&config, json_mode, &user, &role, ttl)
        }
        Some(Commands::Restaurants { status }) => {
            cmd_restaurants(&config, json_mode, status.as_deref())
        }
        Some(Commands::Verify { id, revision }) => {
            cmd_verification(&config, json_mode, &id, VerificationAction::Verify, revision)
        }
        Some(Commands::Reject {
            id,
            reason,
            revision,
        }) => cmd_verification(
            &config,
            json_mode,
            &id,
            VerificationAction::Reject { reason },
            revision,
        ),
        Some(Commands::Block {
            id,
            reason,
            revision,
        }) => cmd_verification(
            &config,
            json_mode,
            &id,
            VerificationAction::Block { reason },
            revision,
        ),
        Some(Commands::Unblock { id, revision }) => {
            cmd_verification(&config, json_mode, &id, VerificationAction::Unblock, revision)
        }
        Some(Commands::Menu { restaurant_id, at }) => {
            cmd_menu(&config, json_mode, &restaurant_id, at.as_deref())
        }
        // No subcommand - validate the setup by default
        Some(Commands::Check) | None => cmd_check(&config, json_mode),
    }
}
