//! # Dizmen
//!
//! The Dizmen server and operator CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 apps/dizmen (THE BINARY)             │
//! │                                                      │
//! │   ┌─────────────┐            ┌─────────────┐         │
//! │   │    CLI      │            │  HTTP API   │         │
//! │   │   (clap)    │            │   (axum)    │         │
//! │   └──────┬──────┘            └──────┬──────┘         │
//! │          └──────────────┬───────────┘                │
//! │                         ▼                            │
//! │                 ┌───────────────┐                    │
//! │                 │  dizmen-core  │                    │
//! │                 │  (THE RULES)  │                    │
//! │                 └───────────────┘                    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! dizmen init
//! dizmen server --host 0.0.0.0 --port 8080
//! dizmen token --user admin-1 --role admin
//! dizmen restaurants --status pending
//! dizmen reject rest-... --reason "Document unreadable"
//! ```

use clap::Parser;
use dizmen::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // DIZMEN_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("DIZMEN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dizmen=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  ██████╗ ██╗███████╗███╗   ███╗███████╗███╗   ██╗
  ██╔══██╗██║╚══███╔╝████╗ ████║██╔════╝████╗  ██║
  ██║  ██║██║  ███╔╝ ██╔████╔██║█████╗  ██╔██╗ ██║
  ██║  ██║██║ ███╔╝  ██║╚██╔╝██║██╔══╝  ██║╚██╗██║
  ██████╔╝██║███████╗██║ ╚═╝ ██║███████╗██║ ╚████║
  ╚═════╝ ╚═╝╚══════╝╚═╝     ╚═╝╚══════╝╚═╝  ╚═══╝

  Restaurant Menus v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
