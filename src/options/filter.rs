//! # Filter Options
//!
//! One entry of the ordered filter list. Position in the list matters: the
//! logic tag of the *following* entry decides OR grouping.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators understood by the filter grouping engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Equals
    Eq,
    /// Not equals
    Neq,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Case-insensitive pattern match
    Ilike,
    /// Value in list
    In,
    /// Exclusive range
    Between,
    /// Inclusive range
    BetweenInclusive,
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
}

impl FilterOperator {
    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Ilike => "ilike",
            FilterOperator::In => "in",
            FilterOperator::Between => "between",
            FilterOperator::BetweenInclusive => "between_inclusive",
            FilterOperator::IsNull => "is_null",
            FilterOperator::IsNotNull => "is_not_null",
        }
    }

    /// Parse a canonical operator name. Returns `None` for anything else.
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name.trim().to_ascii_lowercase().as_str() {
            "eq" => FilterOperator::Eq,
            "neq" => FilterOperator::Neq,
            "gt" => FilterOperator::Gt,
            "gte" => FilterOperator::Gte,
            "lt" => FilterOperator::Lt,
            "lte" => FilterOperator::Lte,
            "ilike" => FilterOperator::Ilike,
            "in" => FilterOperator::In,
            "between" => FilterOperator::Between,
            "between_inclusive" => FilterOperator::BetweenInclusive,
            "is_null" => FilterOperator::IsNull,
            "is_not_null" => FilterOperator::IsNotNull,
            _ => return None,
        };
        Some(op)
    }

    /// Returns true if the operator takes no value
    pub fn is_nullary(&self) -> bool {
        matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }
}

/// How a filter joins the filter before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogicOperator {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicOperator::And => "AND",
            LogicOperator::Or => "OR",
        }
    }
}

/// A single filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    /// Column to filter on
    pub column: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against (array for `in` and the range operators)
    #[serde(default)]
    pub value: Value,

    /// AND / OR tag
    #[serde(default)]
    pub logic_operator: LogicOperator,
}

impl FilterOption {
    /// Create a new AND-tagged filter
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
            logic_operator: LogicOperator::And,
        }
    }

    /// Create an equality filter
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, FilterOperator::Eq, value)
    }

    /// Re-tag this filter
    pub fn with_logic(mut self, logic: LogicOperator) -> Self {
        self.logic_operator = logic;
        self
    }

    /// Re-tag this filter as OR
    pub fn or(self) -> Self {
        self.with_logic(LogicOperator::Or)
    }

    pub fn is_or(&self) -> bool {
        self.logic_operator == LogicOperator::Or
    }
}
