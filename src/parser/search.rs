//! Search operator vocabulary
//!
//! Maps the operator names accepted in `x-searchop-{op}-{col}` keys and in
//! structured filter fields to canonical operators and typed values.

use serde_json::Value;

use crate::observability::{log_event, Event, Severity};
use crate::options::FilterOperator;

use super::split::split_list;

/// Resolves an operator name and raw value into a canonical operator and
/// typed value. Unknown operators fall back to equality.
pub fn resolve_search_op(op: &str, raw: &str) -> (FilterOperator, Value) {
    match op.trim().to_ascii_lowercase().as_str() {
        "contains" | "ilike" | "like" => (FilterOperator::Ilike, pattern(raw, true, true)),
        "beginswith" | "startswith" => (FilterOperator::Ilike, pattern(raw, false, true)),
        "endswith" => (FilterOperator::Ilike, pattern(raw, true, false)),
        "equals" | "eq" => (FilterOperator::Eq, parse_filter_value(raw)),
        "notequals" | "neq" | "ne" => (FilterOperator::Neq, parse_filter_value(raw)),
        "greaterthan" | "gt" => (FilterOperator::Gt, parse_filter_value(raw)),
        "greaterthanorequal" | "gte" | "ge" => (FilterOperator::Gte, parse_filter_value(raw)),
        "lessthan" | "lt" => (FilterOperator::Lt, parse_filter_value(raw)),
        "lessthanorequal" | "lte" | "le" => (FilterOperator::Lte, parse_filter_value(raw)),
        "in" => (FilterOperator::In, list_value(raw)),
        "between" => (FilterOperator::Between, list_value(raw)),
        "betweeninclusive" | "between_inclusive" => {
            (FilterOperator::BetweenInclusive, list_value(raw))
        }
        "empty" | "isnull" | "is_null" => (FilterOperator::IsNull, Value::Null),
        "notempty" | "isnotnull" | "is_not_null" => (FilterOperator::IsNotNull, Value::Null),
        other => {
            log_event(
                Severity::Warn,
                Event::OperatorFallback,
                &[("operator", other)],
            );
            (FilterOperator::Eq, parse_filter_value(raw))
        }
    }
}

fn pattern(raw: &str, leading: bool, trailing: bool) -> Value {
    let mut s = String::with_capacity(raw.len() + 2);
    if leading {
        s.push('%');
    }
    s.push_str(raw);
    if trailing {
        s.push('%');
    }
    Value::String(s)
}

/// `(a,b,c)` or `a,b,c` into an array of typed scalars
pub fn list_value(raw: &str) -> Value {
    let inner = raw
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(raw);
    Value::Array(split_list(inner).iter().map(|s| parse_filter_value(s)).collect())
}

/// Parses a scalar filter value: null, booleans, integers, floats, else string
///
/// Numbers are only typed when their canonical form is the exact input, so
/// `00123` or `1.50` stay strings and still match text columns.
pub fn parse_filter_value(value: &str) -> Value {
    let trimmed = value.trim();

    if trimmed == "null" {
        return Value::Null;
    }
    if trimmed == "true" {
        return Value::Bool(true);
    }
    if trimmed == "false" {
        return Value::Bool(false);
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        if n.to_string() == trimmed {
            return Value::Number(n.into());
        }
    }
    if let Some(num) = trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        if num.to_string() == trimmed {
            return Value::Number(num);
        }
    }

    Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pattern_operators() {
        assert_eq!(resolve_search_op("contains", "ann"), (FilterOperator::Ilike, json!("%ann%")));
        assert_eq!(resolve_search_op("beginswith", "ann"), (FilterOperator::Ilike, json!("ann%")));
        assert_eq!(resolve_search_op("endswith", "ann"), (FilterOperator::Ilike, json!("%ann")));
    }

    #[test]
    fn test_comparison_operators_type_values() {
        assert_eq!(resolve_search_op("greaterthan", "18"), (FilterOperator::Gt, json!(18)));
        assert_eq!(resolve_search_op("lte", "2.5"), (FilterOperator::Lte, json!(2.5)));
        assert_eq!(resolve_search_op("equals", "true"), (FilterOperator::Eq, json!(true)));
    }

    #[test]
    fn test_lossy_numbers_stay_strings() {
        assert_eq!(parse_filter_value("00123"), json!("00123"));
        assert_eq!(parse_filter_value("+5"), json!("+5"));
        assert_eq!(parse_filter_value("1.50"), json!("1.50"));
        assert_eq!(parse_filter_value("-7"), json!(-7));
        assert_eq!(parse_filter_value(" 42 "), json!(42));
    }

    #[test]
    fn test_list_operators() {
        assert_eq!(
            resolve_search_op("in", "(open,closed)"),
            (FilterOperator::In, json!(["open", "closed"]))
        );
        assert_eq!(
            resolve_search_op("betweeninclusive", "1,10"),
            (FilterOperator::BetweenInclusive, json!([1, 10]))
        );
    }

    #[test]
    fn test_null_operators() {
        assert_eq!(resolve_search_op("empty", ""), (FilterOperator::IsNull, Value::Null));
        assert_eq!(resolve_search_op("notempty", "x"), (FilterOperator::IsNotNull, Value::Null));
    }

    #[test]
    fn test_unknown_operator_falls_back_to_eq() {
        assert_eq!(resolve_search_op("soundslike", "bob"), (FilterOperator::Eq, json!("bob")));
    }
}
