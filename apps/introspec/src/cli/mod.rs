//! # Introspec CLI Module
//!
//! This module implements the CLI interface for Introspec.
//!
//! ## Available Commands
//!
//! - `validate` - Compose the whole metamodel and report validation failures
//! - `inspect` - Show one composed Specification
//! - `export` - Export the composed metamodel
//! - `demo` - Walk an instance through its identity lifecycle

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Introspec - Metamodel Workbench
///
/// Composes registered domain classes into validated, introspectable
/// descriptors and tracks object identity across persistence states.
#[derive(Parser, Debug)]
#[command(name = "introspec")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose every registered class and report validation failures
    Validate {
        /// Exit nonzero if any validation failure is recorded
        #[arg(short, long)]
        strict: bool,
    },

    /// Show the composed Specification for one class
    Inspect {
        /// Class name to inspect
        class: String,
    },

    /// Export the composed metamodel as JSON
    Export {
        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Walk a demo instance through its identity lifecycle
    Demo {
        /// Persist through a redb database at this path instead of memory
        #[arg(short = 'D', long)]
        database: Option<PathBuf>,
    },
}
