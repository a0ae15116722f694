//! Query builder seam
//!
//! The plan is applied to an abstract builder; persistence providers
//! implement [`QueryBuilder`] on top of their own query types.

use std::convert::Infallible;

use serde_json::Value;

use super::preload::RelationScope;

/// Operations a provider's query builder must support
pub trait QueryBuilder {
    type Error;

    fn select_columns(&mut self, columns: &[String]);
    fn distinct(&mut self);
    fn join(&mut self, sql: &str);
    fn where_clause(&mut self, sql: &str, args: &[Value]);
    fn order(&mut self, expr: &str);
    fn limit(&mut self, n: u64);
    fn offset(&mut self, n: u64);
    fn preload_relation(&mut self, path: &str, scope: &RelationScope);

    fn count(&mut self) -> Result<u64, Self::Error>;
    fn scan(&mut self) -> Result<Vec<Value>, Self::Error>;
}

/// Builder that records every call and renders the main query as SQL.
///
/// It executes nothing: `count` is always 0 and `scan` returns no rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRecorder {
    table: String,
    columns: Vec<String>,
    distinct: bool,
    joins: Vec<String>,
    wheres: Vec<(String, Vec<Value>)>,
    orders: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    preloads: Vec<(String, RelationScope)>,
}

impl SqlRecorder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn preloads(&self) -> &[(String, RelationScope)] {
        &self.preloads
    }

    pub fn where_clauses(&self) -> impl Iterator<Item = &str> {
        self.wheres.iter().map(|(sql, _)| sql.as_str())
    }

    /// Bound arguments in placeholder order
    pub fn args(&self) -> Vec<Value> {
        self.wheres
            .iter()
            .flat_map(|(_, args)| args.iter().cloned())
            .collect()
    }

    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.wheres.is_empty() {
            let parts: Vec<String> = self
                .wheres
                .iter()
                .map(|(clause, _)| format!("({})", clause))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&parts.join(" AND "));
        }

        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.orders.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        sql
    }
}

impl QueryBuilder for SqlRecorder {
    type Error = Infallible;

    fn select_columns(&mut self, columns: &[String]) {
        self.columns.extend(columns.iter().cloned());
    }

    fn distinct(&mut self) {
        self.distinct = true;
    }

    fn join(&mut self, sql: &str) {
        self.joins.push(sql.to_string());
    }

    fn where_clause(&mut self, sql: &str, args: &[Value]) {
        self.wheres.push((sql.to_string(), args.to_vec()));
    }

    fn order(&mut self, expr: &str) {
        self.orders.push(expr.to_string());
    }

    fn limit(&mut self, n: u64) {
        self.limit = Some(n);
    }

    fn offset(&mut self, n: u64) {
        self.offset = Some(n);
    }

    fn preload_relation(&mut self, path: &str, scope: &RelationScope) {
        self.preloads.push((path.to_string(), scope.clone()));
    }

    fn count(&mut self) -> Result<u64, Self::Error> {
        Ok(0)
    }

    fn scan(&mut self) -> Result<Vec<Value>, Self::Error> {
        Ok(Vec::new())
    }
}
