//! # Cursor Pagination
//!
//! Keyset pagination: instead of an offset, the caller passes the primary
//! key of the last row seen, and the engine emits a predicate that selects
//! rows strictly after (or before) that row in the active sort order.
//!
//! The predicate is an `EXISTS` subquery that looks the anchor row up under
//! the alias `cursor_select` and compares the outer row against it with a
//! lexicographic priority chain:
//!
//! ```text
//! (c1 > a.c1) OR (c1 = a.c1 AND c2 > a.c2) OR ...
//! ```
//!
//! Each comparison follows its column's direction; backward pagination flips
//! every one of them.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::observability::{log_event, Event, Severity};
use crate::options::{CursorDirection, RequestOptions, SortDirection, SortOption};
use crate::schema::bare_table_name;

use super::errors::{PlanError, PlanResult};

/// Alias of the anchor row inside the subquery
pub const CURSOR_ALIAS: &str = "cursor_select";

fn order_suffix() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(.*?)(?:\s+(?:asc|desc))?(?:\s+nulls\s+(?:first|last))?\s*$").ok()
    })
    .as_ref()
}

/// Strips a trailing direction and `NULLS FIRST|LAST` from a sort column
/// expression, plus surrounding whitespace.
pub fn clean_sort_field(field: &str) -> String {
    let trimmed = field.trim();
    order_suffix()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// One sort column as seen from both sides of the comparison
#[derive(Debug, Clone, PartialEq, Eq)]
struct CursorColumn {
    /// Expression on the outer query row
    target: String,
    /// Same expression on the anchor row
    anchor: String,
    direction: SortDirection,
}

/// Builds cursor predicates for one table
#[derive(Debug, Clone)]
pub struct CursorPaginator<'a> {
    table: &'a str,
    primary_key: &'a str,
    model_columns: Option<&'a [String]>,
    expand_joins: Option<&'a BTreeMap<String, String>>,
}

impl<'a> CursorPaginator<'a> {
    /// `table` may be bare or `schema.table`
    pub fn new(table: &'a str, primary_key: &'a str) -> Self {
        Self {
            table,
            primary_key,
            model_columns: None,
            expand_joins: None,
        }
    }

    /// Known model columns. Sort columns outside this list, and not
    /// reachable through a join, are skipped.
    pub fn with_model_columns(mut self, columns: &'a [String]) -> Self {
        if !columns.is_empty() {
            self.model_columns = Some(columns);
        }
        self
    }

    /// Join SQL keyed by the relation prefix used in sort columns, written
    /// against the bare table name (e.g. `LEFT JOIN users author ON
    /// author.id = posts.author_id`).
    pub fn with_expand_joins(mut self, joins: &'a BTreeMap<String, String>) -> Self {
        self.expand_joins = Some(joins);
        self
    }

    fn bare_table(&self) -> &'a str {
        bare_table_name(self.table)
    }

    /// Predicate for the active cursor of `options`
    pub fn filter_for(&self, options: &RequestOptions) -> PlanResult<String> {
        let (token, direction) = options.active_cursor();
        self.filter(&options.sort, token, direction)
    }

    /// Predicate selecting rows after (forward) or before (backward) the
    /// anchor row identified by `token`.
    pub fn filter(
        &self,
        sort: &[SortOption],
        token: Option<&str>,
        direction: CursorDirection,
    ) -> PlanResult<String> {
        let token = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) if direction != CursorDirection::None => token,
            _ => return Err(PlanError::no_cursor(self.table)),
        };
        if sort.is_empty() {
            return Err(PlanError::no_sort_columns());
        }

        let mut columns = Vec::with_capacity(sort.len());
        let mut joins: Vec<String> = Vec::new();
        for option in sort {
            if let Some((column, join)) = self.resolve_column(option) {
                if let Some(join) = join {
                    if !joins.contains(&join) {
                        joins.push(join);
                    }
                }
                columns.push(column);
            }
        }
        if columns.is_empty() {
            return Err(PlanError::no_sort_columns());
        }

        let backward = direction == CursorDirection::Backward;
        let chain = priority_chain(&columns, backward);

        let mut sql = format!("EXISTS (SELECT 1 FROM {} {}", self.table, CURSOR_ALIAS);
        for join in &joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql.push_str(&format!(
            " WHERE {}.{} = {} AND ({}))",
            CURSOR_ALIAS,
            self.primary_key,
            anchor_literal(token),
            chain
        ));
        Ok(sql)
    }

    /// Maps a sort option onto outer/anchor expressions, plus the join the
    /// subquery needs for it. `None` skips the column.
    fn resolve_column(&self, option: &SortOption) -> Option<(CursorColumn, Option<String>)> {
        let cleaned = clean_sort_field(&option.column);
        if cleaned.is_empty() {
            return None;
        }
        let bare = self.bare_table();

        // JSON paths compare against the anchor with the same operator chain
        if cleaned.contains("->") {
            let field = cleaned
                .strip_prefix(bare)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(cleaned.as_str());
            return Some((self.plain(field, option.direction), None));
        }

        let (prefix, field) = match cleaned.rsplit_once('.') {
            Some((prefix, field)) => (Some(prefix), field),
            None => (None, cleaned.as_str()),
        };

        match prefix {
            Some(prefix) if !prefix.eq_ignore_ascii_case(bare) => {
                self.joined(prefix, field, option.direction)
            }
            _ => {
                if let Some(known) = self.model_columns {
                    if !known.iter().any(|c| c.eq_ignore_ascii_case(field)) {
                        log_event(
                            Severity::Trace,
                            Event::FragmentSkipped,
                            &[("cursor_column", field), ("table", bare)],
                        );
                        return None;
                    }
                }
                Some((self.plain(field, option.direction), None))
            }
        }
    }

    fn plain(&self, field: &str, direction: SortDirection) -> CursorColumn {
        CursorColumn {
            target: format!("{}.{}", self.bare_table(), field),
            anchor: format!("{}.{}", CURSOR_ALIAS, field),
            direction,
        }
    }

    /// Column on an expanded relation. The relation is joined again inside
    /// the subquery under a `cursor_`-prefixed alias so both sides stay
    /// distinguishable.
    fn joined(
        &self,
        prefix: &str,
        field: &str,
        direction: SortDirection,
    ) -> Option<(CursorColumn, Option<String>)> {
        let join = self.expand_joins.and_then(|joins| joins.get(prefix));
        let join = match join {
            Some(join) => join,
            None => {
                log_event(
                    Severity::Trace,
                    Event::FragmentSkipped,
                    &[("cursor_column", field), ("relation", prefix)],
                );
                return None;
            }
        };

        let alias = format!("cursor_{}", prefix);
        let rewritten = rewrite_join(join, self.bare_table(), prefix, &alias);
        Some((
            CursorColumn {
                target: format!("{}.{}", prefix, field),
                anchor: format!("{}.{}", alias, field),
                direction,
            },
            Some(rewritten),
        ))
    }
}

/// Points a join written for the outer query at the anchor row: the base
/// table becomes `cursor_select` and the relation alias becomes `alias`.
fn rewrite_join(join: &str, bare_table: &str, prefix: &str, alias: &str) -> String {
    let replace = |input: &str, word: &str, with: &str| -> String {
        match Regex::new(&format!(r"\b{}\b", regex::escape(word))) {
            Ok(re) => re.replace_all(input, with).into_owned(),
            Err(_) => input.to_string(),
        }
    };
    let anchored = replace(join, &format!("{}.", bare_table), &format!("{}.", CURSOR_ALIAS));
    replace(&anchored, prefix, alias)
}

fn priority_chain(columns: &[CursorColumn], backward: bool) -> String {
    let mut disjuncts = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        let mut terms: Vec<String> = columns[..i]
            .iter()
            .map(|prev| format!("{} = {}", prev.target, prev.anchor))
            .collect();

        let ascending = match column.direction {
            SortDirection::Asc => !backward,
            SortDirection::Desc => backward,
        };
        let op = if ascending { ">" } else { "<" };
        terms.push(format!("{} {} {}", column.target, op, column.anchor));

        disjuncts.push(format!("({})", terms.join(" AND ")));
    }
    disjuncts.join(" OR ")
}

/// Numeric tokens are inlined; anything else becomes a quoted literal
fn anchor_literal(token: &str) -> String {
    let digits = token.strip_prefix('-').unwrap_or(token);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', "''"))
    }
}
