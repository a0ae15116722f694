//! CLI argument definitions using clap
//!
//! Commands:
//! - resolveplan plan [--config <path>]
//! - resolveplan cache-key [--config <path>]
//! - resolveplan validate-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// resolveplan - turn request parameters into query plans
#[derive(Parser, Debug)]
#[command(name = "resolveplan")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a request from stdin and print its options, plan and cache key
    Plan {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Read a request from stdin and print only its cache key and tags
    CacheKey {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load and validate a configuration file
    ValidateConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./resolveplan.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
