//! # Request Options
//!
//! The canonical model produced by the parameter parser and consumed by the
//! planners. Built fresh for every request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::filter::FilterOption;
use super::preload::{ExpandOption, PreloadOption};
use super::sort::SortOption;

/// Active cursor direction, derived from the cursor tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorDirection {
    None,
    Forward,
    Backward,
}

/// Response envelope requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Simple,
    Detail,
    Syncfusion,
}

impl ResponseFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(ResponseFormat::Simple),
            "detail" => Some(ResponseFormat::Detail),
            "syncfusion" => Some(ResponseFormat::Syncfusion),
            _ => None,
        }
    }
}

/// Aggregate request options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Target table, possibly schema-qualified
    pub table_name: Option<String>,
    pub schema: Option<String>,
    /// Primary key requested by the structured block
    pub primary_key: Option<String>,

    pub columns: Vec<String>,
    pub omit_columns: Vec<String>,
    pub clean_json: bool,

    pub filters: Vec<FilterOption>,
    pub search_columns: Vec<String>,
    pub sort: Vec<SortOption>,

    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub cursor_forward: Option<String>,
    pub cursor_backward: Option<String>,

    pub preload: Vec<PreloadOption>,
    pub expand: Vec<ExpandOption>,

    pub custom_where: Vec<String>,
    pub custom_or: Vec<String>,
    pub custom_joins: Vec<String>,

    /// column -> SQL expression
    pub advanced_sql: BTreeMap<String, String>,
    /// computed column -> SQL expression
    pub computed_columns: BTreeMap<String, String>,

    pub distinct: bool,
    pub skip_count: bool,
    pub skip_cache: bool,
    pub fetch_row_number: Option<String>,

    pub response_format: ResponseFormat,
    pub single_record_as_object: bool,
    pub atomic_transaction: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            table_name: None,
            schema: None,
            primary_key: None,
            columns: Vec::new(),
            omit_columns: Vec::new(),
            clean_json: false,
            filters: Vec::new(),
            search_columns: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
            cursor_forward: None,
            cursor_backward: None,
            preload: Vec::new(),
            expand: Vec::new(),
            custom_where: Vec::new(),
            custom_or: Vec::new(),
            custom_joins: Vec::new(),
            advanced_sql: BTreeMap::new(),
            computed_columns: BTreeMap::new(),
            distinct: false,
            skip_count: false,
            skip_cache: false,
            fetch_row_number: None,
            response_format: ResponseFormat::Simple,
            single_record_as_object: true,
            atomic_transaction: false,
        }
    }
}

impl RequestOptions {
    /// Active cursor token and its direction. Forward wins when both are set;
    /// empty tokens count as absent.
    pub fn active_cursor(&self) -> (Option<&str>, CursorDirection) {
        fn non_empty(c: &Option<String>) -> Option<&str> {
            c.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        if let Some(token) = non_empty(&self.cursor_forward) {
            return (Some(token), CursorDirection::Forward);
        }
        if let Some(token) = non_empty(&self.cursor_backward) {
            return (Some(token), CursorDirection::Backward);
        }
        (None, CursorDirection::None)
    }

    pub fn cursor_direction(&self) -> CursorDirection {
        self.active_cursor().1
    }
}
