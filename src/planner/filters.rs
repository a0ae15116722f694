//! # Filter Grouping
//!
//! Turns the ordered filter list into AND-ed clauses with explicit OR groups.
//!
//! A filter opens an OR group when the *next* filter is tagged OR; the group
//! takes every consecutive OR-tagged filter after it. So
//! `[A(AND), B(OR), C(OR), D(AND)]` becomes `A AND (B OR C) AND D`.
//! The tag of the first filter in a group is not consulted, which includes a
//! list whose first entry is tagged OR.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::{FilterOperator, FilterOption};

/// A SQL-shaped condition with positional `?` placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

impl Condition {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Condition without bound arguments
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Builds the condition for one filter. `None` when the filter cannot be
/// expressed (range without two bounds, empty IN list, pattern without a
/// value).
pub fn build_condition(filter: &FilterOption) -> Option<Condition> {
    let col = filter.column.trim();
    if col.is_empty() {
        return None;
    }
    let value = &filter.value;

    let condition = match filter.operator {
        FilterOperator::Eq if value.is_null() => Condition::raw(format!("{} IS NULL", col)),
        FilterOperator::Neq if value.is_null() => Condition::raw(format!("{} IS NOT NULL", col)),
        FilterOperator::Eq => compare(col, "=", value),
        FilterOperator::Neq => compare(col, "<>", value),
        FilterOperator::Gt => compare(col, ">", value),
        FilterOperator::Gte => compare(col, ">=", value),
        FilterOperator::Lt => compare(col, "<", value),
        FilterOperator::Lte => compare(col, "<=", value),
        FilterOperator::Ilike => {
            if value.is_null() {
                return None;
            }
            compare(col, "ILIKE", value)
        }
        FilterOperator::In => {
            let items = match value {
                Value::Array(items) => items.clone(),
                Value::Null => Vec::new(),
                scalar => vec![scalar.clone()],
            };
            if items.is_empty() {
                return None;
            }
            Condition::new(format!("{} IN (?)", col), vec![Value::Array(items)])
        }
        FilterOperator::Between => {
            let (low, high) = bounds(value)?;
            Condition::new(format!("{} > ? AND {} < ?", col, col), vec![low, high])
        }
        FilterOperator::BetweenInclusive => {
            let (low, high) = bounds(value)?;
            Condition::new(format!("{} BETWEEN ? AND ?", col), vec![low, high])
        }
        FilterOperator::IsNull => Condition::raw(format!("{} IS NULL", col)),
        FilterOperator::IsNotNull => Condition::raw(format!("{} IS NOT NULL", col)),
    };

    Some(condition)
}

fn compare(col: &str, op: &str, value: &Value) -> Condition {
    Condition::new(format!("{} {} ?", col, op), vec![value.clone()])
}

fn bounds(value: &Value) -> Option<(Value, Value)> {
    match value.as_array().map(Vec::as_slice) {
        Some([low, high]) => Some((low.clone(), high.clone())),
        _ => None,
    }
}

/// Groups filters into clauses that are AND-ed together
///
/// An AND-tagged filter is a clause of its own. A run of consecutive
/// OR-tagged filters forms one OR group, so `[A, B(OR), C(OR), D]` becomes
/// `A AND (B OR C) AND D`. A run of one has nothing to be OR-ed with and
/// stays a plain clause.
pub fn group_filters(filters: &[FilterOption]) -> Vec<Condition> {
    let mut clauses = Vec::new();
    let mut i = 0;

    while i < filters.len() {
        let mut end = i + 1;
        if filters[i].is_or() {
            while end < filters.len() && filters[end].is_or() {
                end += 1;
            }
        }

        let members: Vec<Condition> = filters[i..end].iter().filter_map(build_condition).collect();
        if let Some(clause) = join_or_group(members) {
            clauses.push(clause);
        }

        i = end;
    }

    clauses
}

/// Joins group members with OR; parentheses only for more than one member
fn join_or_group(members: Vec<Condition>) -> Option<Condition> {
    match members.len() {
        0 => None,
        1 => members.into_iter().next(),
        _ => {
            let mut sql = Vec::with_capacity(members.len());
            let mut args = Vec::new();
            for member in members {
                if member.sql.contains(" AND ") {
                    sql.push(format!("({})", member.sql));
                } else {
                    sql.push(member.sql);
                }
                args.extend(member.args);
            }
            Some(Condition::new(format!("({})", sql.join(" OR ")), args))
        }
    }
}

/// Renders AND-ed clauses as one predicate
pub fn render_predicate(clauses: &[Condition]) -> Option<Condition> {
    if clauses.is_empty() {
        return None;
    }
    let sql = clauses
        .iter()
        .map(|c| c.sql.as_str())
        .collect::<Vec<_>>()
        .join(" AND ");
    let args = clauses.iter().flat_map(|c| c.args.iter().cloned()).collect();
    Some(Condition::new(sql, args))
}
