//! # Introspec - Metamodel Workbench
//!
//! The main binary for the Introspec metamodel engine.
//!
//! This application provides:
//! - CLI interface over the composition engine
//! - Startup metamodel validation driving
//! - A wired demo domain with in-memory and redb object stores
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                apps/introspec (THE BINARY)           │
//! │                                                      │
//! │   ┌─────────────┐        ┌───────────────────────┐   │
//! │   │    CLI      │        │     Demo Domain       │   │
//! │   │   (clap)    │        │  (registered models)  │   │
//! │   └──────┬──────┘        └──────────┬────────────┘   │
//! │          │                          │                │
//! │          └───────────┬──────────────┘                │
//! │                      ▼                               │
//! │             ┌────────────────┐                       │
//! │             │ introspec-core │                       │
//! │             │  (THE LOGIC)   │                       │
//! │             └────────────────┘                       │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Validate the metamodel at startup
//! introspec validate --strict
//!
//! # Inspect one composed class
//! introspec inspect Invoice --json-mode
//!
//! # Walk the identity lifecycle against a redb store
//! introspec demo -D objects.redb
//! ```

use clap::Parser;
use introspec::cli::{self, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing — INTROSPEC_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("INTROSPEC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "introspec=info".into());

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

    let cli = Cli::parse();
    std::process::exit(run(cli));
}

/// Dispatch the parsed command and map the outcome to an exit code.
fn run(cli: Cli) -> i32 {
    let loader = match cli::build_loader(cli.config.as_deref()) {
        Ok(loader) => loader,
        Err(err) => {
            eprintln!("Error: {}", err);
            return 1;
        }
    };

    let result = match cli.command {
        Some(Commands::Validate { strict }) => {
            match cli::cmd_validate(&loader, cli.json_mode) {
                Ok(failures) if strict && failures > 0 => {
                    tracing::warn!(failures, "strict validation failed");
                    return 1;
                }
                Ok(_) => Ok(()),
                Err(err) => Err(err),
            }
        }
        Some(Commands::Inspect { class }) => cli::cmd_inspect(&loader, &class, cli.json_mode),
        Some(Commands::Export { output }) => cli::cmd_export(&loader, output.as_deref()),
        Some(Commands::Demo { database }) => cli::cmd_demo(&loader, database.as_deref()),
        None => {
            // Default to a non-strict validation report.
            cli::cmd_validate(&loader, cli.json_mode).map(|_| ())
        }
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    }
}
