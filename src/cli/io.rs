//! Request and response framing
//!
//! - Input: one JSON request object on stdin
//! - Output: one JSON object on stdout
//! - Logs go to stderr and never mix with the response

use std::io::{self, Read, Write};

use serde::Deserialize;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Request read from stdin
///
/// ```json
/// {"table": "posts", "headers": [["x-limit", "10"]], "query": [["x-sort", "-id"]]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CliRequest {
    pub table: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub query: Vec<(String, String)>,
}

impl CliRequest {
    pub fn from_json(input: &str) -> CliResult<Self> {
        if input.trim().is_empty() {
            return Err(CliError::invalid_request("Empty input"));
        }
        let request: CliRequest = serde_json::from_str(input)
            .map_err(|e| CliError::invalid_request(format!("Invalid request JSON: {}", e)))?;
        if request.table.trim().is_empty() {
            return Err(CliError::invalid_request("Request has no table"));
        }
        Ok(request)
    }
}

/// Read the request from stdin
pub fn read_request() -> CliResult<CliRequest> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    CliRequest::from_json(&input)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_value(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_value(&response)
}

fn write_value(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
