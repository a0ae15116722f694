//! Cache keys for total counts
//!
//! A key is the hex SHA-256 of the canonical JSON of everything that
//! changes the result set of a list query. Paging size is not part of it.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::observability::{log_event, Event, Severity};
use crate::options::{ExpandOption, FilterOption, RequestOptions, SortOption};

#[derive(Debug, Serialize)]
struct KeyMaterial<'a> {
    table_name: &'a str,
    filters: &'a [FilterOption],
    sort: &'a [SortOption],
    custom_where: &'a [String],
    custom_or: &'a [String],
    custom_joins: &'a [String],
    expand: &'a [ExpandOption],
    distinct: bool,
    cursor_forward: Option<&'a str>,
    cursor_backward: Option<&'a str>,
}

impl<'a> KeyMaterial<'a> {
    fn new(table: &'a str, options: &'a RequestOptions) -> Self {
        Self {
            table_name: table,
            filters: &options.filters,
            sort: &options.sort,
            custom_where: &options.custom_where,
            custom_or: &options.custom_or,
            custom_joins: &options.custom_joins,
            expand: &options.expand,
            distinct: options.distinct,
            cursor_forward: options.cursor_forward.as_deref(),
            cursor_backward: options.cursor_backward.as_deref(),
        }
    }

    /// Plain concatenation used when JSON encoding fails
    fn concatenated(&self) -> String {
        let filters: Vec<String> = self
            .filters
            .iter()
            .map(|f| {
                format!(
                    "{}:{}:{}:{}",
                    f.column,
                    f.operator.as_str(),
                    f.value,
                    f.logic_operator.as_str()
                )
            })
            .collect();
        let sort: Vec<String> = self.sort.iter().map(SortOption::to_order_expr).collect();
        let expand: Vec<&str> = self.expand.iter().map(|e| e.relation.as_str()).collect();

        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.table_name,
            filters.join(","),
            sort.join(","),
            self.custom_where.join(","),
            self.custom_or.join(","),
            self.custom_joins.join(","),
            expand.join(","),
            self.distinct,
            self.cursor_forward.unwrap_or(""),
            self.cursor_backward.unwrap_or(""),
        )
    }
}

/// Cache key for the total count of a query on `table`
pub fn build_cache_key(table: &str, options: &RequestOptions) -> String {
    let material = KeyMaterial::new(table, options);
    key_from_material(serde_json::to_vec(&material), || material.concatenated())
}

/// Hashes the serialized material, or the fallback string when
/// serialization failed. Both paths produce a 64 character hex key.
fn key_from_material(
    serialized: Result<Vec<u8>, serde_json::Error>,
    fallback: impl FnOnce() -> String,
) -> String {
    match serialized {
        Ok(bytes) => hex_digest(&bytes),
        Err(err) => {
            let reason = err.to_string();
            log_event(
                Severity::Warn,
                Event::CacheKeyFallback,
                &[("reason", reason.as_str())],
            );
            hex_digest(fallback().as_bytes())
        }
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Invalidation tags for entries of `table`. The schema comes from a
/// `schema.table` name, else from `schema`.
pub fn cache_tags(schema: Option<&str>, table: &str) -> Vec<String> {
    let (schema, bare) = match table.split_once('.') {
        Some((schema, bare)) => (Some(schema), bare),
        None => (schema.map(str::trim).filter(|s| !s.is_empty()), table),
    };

    let mut tags = Vec::with_capacity(2);
    if let Some(schema) = schema {
        tags.push(format!("schema:{}", schema.to_lowercase()));
    }
    tags.push(format!("table:{}", bare.to_lowercase()));
    tags
}
