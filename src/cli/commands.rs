//! Subcommands
//!
//! Each command builds one engine, handles one request and exits.

use std::path::Path;

use serde_json::{json, Value};

use crate::engine::{Engine, EngineConfig};

use super::args::Command;
use super::errors::CliResult;
use super::io::{read_request, write_error, write_response, CliRequest};

/// Parses process arguments and runs the selected subcommand
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Plan { config } => plan(config.as_deref()),
        Command::CacheKey { config } => cache_key(config.as_deref()),
        Command::ValidateConfig { config } => validate_config(&config),
    }
}

/// Engine from a config file, or with defaults when no path is given
pub fn load_engine(config_path: Option<&Path>) -> CliResult<Engine> {
    match config_path {
        Some(path) => Ok(Engine::from_file(path)?),
        None => Ok(Engine::new(EngineConfig::default())),
    }
}

/// Parse and plan the stdin request
pub fn plan(config_path: Option<&Path>) -> CliResult<()> {
    let engine = load_engine(config_path)?;
    let request = read_request()?;
    respond(plan_request(&engine, &request))
}

/// Print the cache key and tags of the stdin request
pub fn cache_key(config_path: Option<&Path>) -> CliResult<()> {
    let engine = load_engine(config_path)?;
    let request = read_request()?;
    respond(cache_key_request(&engine, &request))
}

/// Load and validate a configuration file
pub fn validate_config(config_path: &Path) -> CliResult<()> {
    let config = EngineConfig::load(config_path)?;
    write_response(json!({
        "valid": true,
        "models": config.models.len(),
        "default_primary_key": config.default_primary_key,
    }))
}

/// Options, plan, cache key and tags for one request
pub fn plan_request(engine: &Engine, request: &CliRequest) -> CliResult<Value> {
    let resolution = engine.resolve(&request.table, &request.headers, &request.query)?;
    Ok(serde_json::to_value(&resolution)?)
}

/// Cache key and tags for one request
pub fn cache_key_request(engine: &Engine, request: &CliRequest) -> CliResult<Value> {
    let resolution = engine.resolve(&request.table, &request.headers, &request.query)?;
    Ok(json!({
        "cache_key": resolution.cache_key,
        "cache_tags": resolution.cache_tags,
    }))
}

/// Rejections are reported on stdout as well, then fail the process
fn respond(result: CliResult<Value>) -> CliResult<()> {
    match result {
        Ok(data) => write_response(data),
        Err(err) => {
            write_error(err.code().as_str(), &err.message())?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::errors::{CliError, CliErrorCode};
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn request(json: &str) -> CliRequest {
        CliRequest::from_json(json).unwrap()
    }

    #[test]
    fn test_plan_request_output() {
        let engine = load_engine(None).unwrap();
        let out = plan_request(
            &engine,
            &request(r#"{"table": "posts", "headers": [["x-limit", "5"]], "query": [["x-sort", "-created_at"]]}"#),
        )
        .unwrap();

        assert_eq!(out["plan"]["table"], "posts");
        assert_eq!(out["plan"]["limit"], 5);
        assert_eq!(out["plan"]["order"][0], "created_at DESC");
        assert_eq!(out["cache_key"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_plan_request_rejection() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("resolveplan.json");
        fs::write(
            &path,
            r#"{"models": [{"table_name": "posts", "columns": ["id", "title"]}]}"#,
        )
        .unwrap();
        let engine = load_engine(Some(&path)).unwrap();

        let err = plan_request(
            &engine,
            &request(r#"{"table": "posts", "query": [["x-cursor-forward", "5"], ["x-sort", "ghost"]]}"#),
        )
        .unwrap_err();
        assert_eq!(err.code(), CliErrorCode::PlanRejected);
        assert!(err.message().contains("RP_SORT_REQUIRED"));
    }

    #[test]
    fn test_cache_key_request() {
        let engine = load_engine(None).unwrap();
        let out = cache_key_request(
            &engine,
            &request(r#"{"table": "blog.posts"}"#),
        )
        .unwrap();
        assert_eq!(out["cache_tags"][0], "schema:blog");
        assert_eq!(out["cache_tags"][1], "table:posts");
    }

    #[test]
    fn test_load_engine_bad_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("resolveplan.json");
        fs::write(&path, r#"{"default_primary_key": ""}"#).unwrap();

        let err = load_engine(Some(&path)).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::ConfigError);
    }

    #[test]
    fn test_plan_error_maps_to_cli_error() {
        let err: CliError = crate::planner::PlanError::no_sort_columns().into();
        assert_eq!(err.code(), CliErrorCode::PlanRejected);
        assert!(err.message().contains("RP_SORT_REQUIRED"));
    }
}
