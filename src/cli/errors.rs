//! CLI errors
//!
//! Each variant wraps the failure of one stage (loading the config, reading
//! the request, planning it) and maps to a stable `RP_CLI_*` code that is
//! written to stdout before the process exits non-zero.

use std::io;

use thiserror::Error;

use crate::engine::ConfigError;
use crate::planner::PlanError;

/// Stable code reported alongside every CLI failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    ConfigError,
    IoError,
    InvalidRequest,
    PlanRejected,
}

impl CliErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "RP_CLI_CONFIG_ERROR",
            Self::IoError => "RP_CLI_IO_ERROR",
            Self::InvalidRequest => "RP_CLI_INVALID_REQUEST",
            Self::PlanRejected => "RP_CLI_PLAN_REJECTED",
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{} ({})", .0, .0.code())]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Rejected(#[from] PlanError),
}

impl CliError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn code(&self) -> CliErrorCode {
        match self {
            Self::Config(_) => CliErrorCode::ConfigError,
            Self::Io(_) | Self::Json(_) => CliErrorCode::IoError,
            Self::InvalidRequest(_) => CliErrorCode::InvalidRequest,
            Self::Rejected(_) => CliErrorCode::PlanRejected,
        }
    }

    /// Human-readable detail, without the CLI code prefix
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub type CliResult<T> = Result<T, CliError>;
