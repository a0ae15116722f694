//! CLI module for resolveplan
//!
//! Provides command-line interface for:
//! - plan: parse and plan one request read from stdin
//! - cache-key: print the cache key and tags of one request
//! - validate-config: check a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    cache_key, cache_key_request, load_engine, plan, plan_request, run, run_command,
    validate_config,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response, CliRequest};
