//! Nesting-aware splitting of list values
//!
//! Lists such as `x-sort` or `x-select-fields` may contain function-call
//! shaped fragments (`coalesce(a, b)`); only top-level separators split.

use std::sync::OnceLock;

use regex::Regex;

use crate::options::{SortDirection, SortOption};

/// Splits on `sep` outside parentheses and single-quoted strings.
/// Parts are trimmed; empty parts are dropped.
pub fn split_top_level(value: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;
    let mut in_quote = false;

    for c in value.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                current.push(c);
            }
            '(' if !in_quote => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c == sep && depth == 0 && !in_quote => {
                push_part(&mut parts, &current);
                current.clear();
            }
            c => current.push(c),
        }
    }
    push_part(&mut parts, &current);

    parts
}

fn push_part(parts: &mut Vec<String>, part: &str) {
    let trimmed = part.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
}

/// Comma list, nesting aware
pub fn split_list(value: &str) -> Vec<String> {
    split_top_level(value, ',')
}

fn direction_suffix() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(.*?)\s+(asc|desc)(?:\s+nulls\s+(?:first|last))?\s*$").ok()
    })
    .as_ref()
}

/// Parses one sort term: `-col`, `+col`, `col`, `col desc`, `col asc nulls last`
pub fn parse_sort_term(term: &str) -> Option<SortOption> {
    let term = term.trim();
    if let Some(column) = term.strip_prefix('-') {
        return non_empty_sort(column, SortDirection::Desc);
    }
    if let Some(column) = term.strip_prefix('+') {
        return non_empty_sort(column, SortDirection::Asc);
    }
    if let Some(caps) = direction_suffix().and_then(|re| re.captures(term)) {
        let direction = SortDirection::parse(&caps[2]).unwrap_or_default();
        return non_empty_sort(&caps[1], direction);
    }
    non_empty_sort(term, SortDirection::Asc)
}

fn non_empty_sort(column: &str, direction: SortDirection) -> Option<SortOption> {
    let column = column.trim();
    if column.is_empty() {
        return None;
    }
    Some(SortOption {
        column: column.to_string(),
        direction,
    })
}

/// Parses a comma-separated sort list
pub fn parse_sort_list(value: &str) -> Vec<SortOption> {
    split_list(value)
        .iter()
        .filter_map(|term| parse_sort_term(term))
        .collect()
}

/// Contents between the first `(` and the last `)` of a key such as
/// `sort(a,-b)`
pub fn positional_args(key: &str) -> Option<&str> {
    let open = key.find('(')?;
    let close = key.rfind(')')?;
    (close > open).then(|| &key[open + 1..close])
}
