//! Planner error types
//!
//! Error codes:
//! - RP_CURSOR_MISSING (REJECT)
//! - RP_SORT_REQUIRED (REJECT)
//! - RP_TABLE_REQUIRED (REJECT)
//!
//! Parse-level problems never reach this type; they are logged and skipped
//! by the parser. Reaching the recursion bound is not an error either.

use std::fmt;

/// Planner error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanErrorCode {
    /// Keyset pagination requested without a cursor token
    NoCursor,
    /// Keyset pagination requested without sort columns
    NoSortColumns,
    /// No target table known for the request
    TableRequired,
}

impl PlanErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlanErrorCode::NoCursor => "RP_CURSOR_MISSING",
            PlanErrorCode::NoSortColumns => "RP_SORT_REQUIRED",
            PlanErrorCode::TableRequired => "RP_TABLE_REQUIRED",
        }
    }
}

impl fmt::Display for PlanErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanError {
    code: PlanErrorCode,
    message: String,
    table: Option<String>,
}

impl PlanError {
    /// No cursor token present
    pub fn no_cursor(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: PlanErrorCode::NoCursor,
            message: format!("no cursor provided for table {}", table),
            table: Some(table),
        }
    }

    /// Sort list empty (or nothing usable left after column resolution)
    pub fn no_sort_columns() -> Self {
        Self {
            code: PlanErrorCode::NoSortColumns,
            message: "no sort columns defined".into(),
            table: None,
        }
    }

    pub fn table_required() -> Self {
        Self {
            code: PlanErrorCode::TableRequired,
            message: "request does not name a target table".into(),
            table: None,
        }
    }

    pub fn code(&self) -> PlanErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for PlanError {}

/// Result type for planner operations
pub type PlanResult<T> = Result<T, PlanError>;
