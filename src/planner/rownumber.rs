//! Row number lookup
//!
//! Finds the 1-based position of a record in the current ordering and
//! filtering, so a caller can jump to the page containing it.

use serde_json::Value;

use crate::options::SortOption;
use crate::schema::bare_table_name;

use super::filters::{render_predicate, Condition};

/// Alias of the numbered inner query
pub const ROW_NUMBER_ALIAS: &str = "search";

/// Builds `SELECT search.rn FROM (... ROW_NUMBER() OVER (ORDER BY ...) ...)
/// search WHERE search.<pk> = ?`.
///
/// The inner query carries the same joins as the main query so that where
/// clauses naming joined aliases still resolve. Without sort options the
/// numbering follows the primary key.
pub fn row_number_query(
    table: &str,
    primary_key: &str,
    sort: &[SortOption],
    joins: &[String],
    clauses: &[Condition],
    record_id: &str,
) -> Condition {
    let bare = bare_table_name(table);

    let order = if sort.is_empty() {
        format!("{}.{} ASC", bare, primary_key)
    } else {
        sort.iter()
            .map(SortOption::to_order_expr)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut sql = format!(
        "SELECT {alias}.rn FROM (SELECT {bare}.{pk}, ROW_NUMBER() OVER (ORDER BY {order}) AS rn FROM {table}",
        alias = ROW_NUMBER_ALIAS,
        bare = bare,
        pk = primary_key,
        order = order,
        table = table,
    );
    if bare != table {
        sql.push_str(&format!(" {}", bare));
    }
    for join in joins {
        sql.push(' ');
        sql.push_str(join);
    }

    let mut args = Vec::new();
    if let Some(predicate) = render_predicate(clauses) {
        sql.push_str(" WHERE ");
        sql.push_str(&predicate.sql);
        args = predicate.args;
    }

    sql.push_str(&format!(
        ") {alias} WHERE {alias}.{pk} = ?",
        alias = ROW_NUMBER_ALIAS,
        pk = primary_key
    ));
    args.push(Value::String(record_id.to_string()));

    Condition::new(sql, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_number_query() {
        let clauses = vec![Condition::new("status = ?", vec![json!("open")])];
        let q = row_number_query("posts", "id", &[SortOption::desc("created_at")], &[], &clauses, "42");

        assert!(q.sql.contains("ROW_NUMBER() OVER (ORDER BY created_at DESC)"));
        assert!(q.sql.contains("WHERE status = ?"));
        assert!(q.sql.ends_with("search WHERE search.id = ?"));
        assert_eq!(q.args, vec![json!("open"), json!("42")]);
    }

    #[test]
    fn test_row_number_defaults_to_primary_key() {
        let q = row_number_query("app.posts", "id", &[], &[], &[], "1");
        assert!(q.sql.contains("ORDER BY posts.id ASC"));
        assert!(q.sql.contains("FROM app.posts posts)"));
    }

    #[test]
    fn test_row_number_keeps_joins_for_joined_filters() {
        let joins = vec!["LEFT JOIN tags t ON t.post_id = posts.id".to_string()];
        let clauses = vec![Condition::raw("t.name = 'rust'")];
        let q = row_number_query("posts", "id", &[], &joins, &clauses, "42");

        assert!(q.sql.contains(
            "FROM posts LEFT JOIN tags t ON t.post_id = posts.id WHERE t.name = 'rust') search"
        ));
    }
}
