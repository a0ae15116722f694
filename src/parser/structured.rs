//! # Structured configuration block
//!
//! A single parameter (`x-files`) may carry a JSON object describing a whole
//! sub-query: columns, sort, filters, raw SQL, paging, cursors, and nested
//! parent/child table trees. The JSON is decoded into a typed model first;
//! a block whose shape does not match is rejected as a whole.
//!
//! Contributions are merged into the same [`RequestOptions`] as the flat
//! keys. List fields accumulate; scalar fields are set when present.

use serde::Deserialize;
use serde_json::Value;

use crate::options::{FilterOperator, FilterOption, LogicOperator, PreloadOption, RequestOptions};

use super::search::resolve_search_op;
use super::split::parse_sort_list;

/// A count that may arrive as a JSON number or as a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(u64),
    Text(String),
    /// Negative, fractional or non-scalar values; ignored
    Other(Value),
}

impl Count {
    /// The count, or `None` when the text is not a non-negative integer
    pub fn value(&self) -> Option<u64> {
        match self {
            Count::Number(n) => Some(*n),
            Count::Text(s) => s.trim().parse().ok(),
            Count::Other(_) => None,
        }
    }
}

/// Filter entry of a structured block
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructuredFilter {
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default)]
    pub value: Value,
    /// `and` / `or`, case-insensitive
    #[serde(default)]
    pub logic: Option<String>,
}

fn default_operator() -> String {
    "eq".to_string()
}

impl StructuredFilter {
    fn to_filter_option(&self) -> FilterOption {
        let raw = match &self.value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let (operator, parsed) = resolve_search_op(&self.operator, &raw);
        let value = typed_value(&self.value, operator).unwrap_or(parsed);
        let logic = match self.logic.as_deref() {
            Some(l) if l.eq_ignore_ascii_case("or") => LogicOperator::Or,
            _ => LogicOperator::And,
        };
        FilterOption::new(self.field.clone(), operator, value).with_logic(logic)
    }
}

/// JSON that is already typed is bound as-is instead of being re-parsed
/// from text. Arrays feed list operators, scalars feed comparisons.
fn typed_value(value: &Value, operator: FilterOperator) -> Option<Value> {
    let list = matches!(
        operator,
        FilterOperator::In | FilterOperator::Between | FilterOperator::BetweenInclusive
    );
    let comparison = matches!(
        operator,
        FilterOperator::Eq
            | FilterOperator::Neq
            | FilterOperator::Gt
            | FilterOperator::Gte
            | FilterOperator::Lt
            | FilterOperator::Lte
    );

    match value {
        Value::Array(_) if list => Some(value.clone()),
        Value::Number(_) | Value::Bool(_) if comparison => Some(value.clone()),
        Value::Number(_) | Value::Bool(_) if operator == FilterOperator::In => {
            Some(Value::Array(vec![value.clone()]))
        }
        _ => None,
    }
}

/// Typed shape of the structured block
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StructuredBlock {
    pub tablename: Option<String>,
    pub schema: Option<String>,
    pub prefix: Option<String>,
    pub primarykey: Option<String>,
    pub relatedkey: Option<String>,
    pub foreignkey: Option<String>,
    pub recursivechildkey: Option<String>,
    pub columns: Vec<String>,
    pub omit_columns: Vec<String>,
    pub cql_columns: Vec<String>,
    pub sort: Vec<String>,
    pub filter_fields: Vec<StructuredFilter>,
    pub sql_and: Vec<String>,
    pub sql_or: Vec<String>,
    pub sql_joins: Vec<String>,
    pub limit: Option<Count>,
    pub offset: Option<Count>,
    pub cursor_forward: Option<String>,
    pub cursor_backward: Option<String>,
    pub skipcount: bool,
    pub recursive: bool,
    pub parenttables: Vec<StructuredBlock>,
    pub childtables: Vec<StructuredBlock>,
}

impl StructuredBlock {
    /// Decodes a block from JSON text
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Name used for this block as a relation segment: table name, else prefix
    fn relation_name(&self) -> Option<&str> {
        non_blank(&self.tablename).or_else(|| non_blank(&self.prefix))
    }

    /// Where clause scoped to this block when used as a relation
    fn scoped_where(&self) -> Option<String> {
        let and_part = join_conditions(&self.sql_and, "AND");
        if self.sql_or.is_empty() {
            return and_part;
        }
        let mut parts: Vec<String> = and_part.into_iter().collect();
        parts.extend(self.sql_or.iter().map(|c| c.trim().to_string()));
        join_conditions(&parts, "OR")
    }

    /// Merges the root block into `options`. Nested tables become preload
    /// entries whose paths are built from raw table names.
    pub fn merge_into(&self, options: &mut RequestOptions) {
        if options.table_name.is_none() {
            options.table_name = non_blank(&self.tablename).map(str::to_string);
        }
        if let Some(schema) = non_blank(&self.schema) {
            options.schema = Some(schema.to_string());
        }
        if let Some(pk) = non_blank(&self.primarykey) {
            options.primary_key = Some(pk.to_string());
        }

        options.columns.extend(self.columns.iter().cloned());
        options.omit_columns.extend(self.omit_columns.iter().cloned());
        for (i, expr) in self.cql_columns.iter().enumerate() {
            options
                .computed_columns
                .insert(format!("cql{}", i + 1), expr.clone());
        }

        for term in &self.sort {
            options.sort.extend(parse_sort_list(term));
        }
        options
            .filters
            .extend(self.filter_fields.iter().map(StructuredFilter::to_filter_option));

        options.custom_where.extend(non_blank_items(&self.sql_and));
        options.custom_or.extend(non_blank_items(&self.sql_or));
        options.custom_joins.extend(non_blank_items(&self.sql_joins));

        if let Some(limit) = self.limit.as_ref().and_then(Count::value) {
            options.limit = Some(limit);
        }
        if let Some(offset) = self.offset.as_ref().and_then(Count::value) {
            options.offset = Some(offset);
        }
        if let Some(cursor) = non_blank(&self.cursor_forward) {
            options.cursor_forward = Some(cursor.to_string());
        }
        if let Some(cursor) = non_blank(&self.cursor_backward) {
            options.cursor_backward = Some(cursor.to_string());
        }
        options.skip_count |= self.skipcount;

        self.collect_relations("", &mut options.preload);
    }

    fn collect_relations(&self, parent_path: &str, out: &mut Vec<PreloadOption>) {
        for child in self.parenttables.iter().chain(self.childtables.iter()) {
            let Some(name) = child.relation_name() else {
                continue;
            };
            let path = if parent_path.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", parent_path, name)
            };
            out.push(child.to_preload(&path));
            child.collect_relations(&path, out);
        }
    }

    fn to_preload(&self, path: &str) -> PreloadOption {
        let recursive_child_key = if self.recursive {
            non_blank(&self.recursivechildkey)
                .or_else(|| non_blank(&self.relatedkey))
                .or_else(|| non_blank(&self.foreignkey))
                .map(str::to_string)
        } else {
            None
        };

        PreloadOption {
            relation: path.to_string(),
            columns: self.columns.clone(),
            omit_columns: self.omit_columns.clone(),
            where_clause: self.scoped_where(),
            sort: self.sort.iter().flat_map(|t| parse_sort_list(t)).collect(),
            limit: self.limit.as_ref().and_then(Count::value),
            offset: self.offset.as_ref().and_then(Count::value),
            foreign_key: non_blank(&self.foreignkey).map(str::to_string),
            primary_key: non_blank(&self.primarykey).map(str::to_string),
            related_key: non_blank(&self.relatedkey).map(str::to_string),
            recursive: self.recursive,
            recursive_child_key,
            table_name: non_blank(&self.tablename).map(str::to_string),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn non_blank_items(items: &[String]) -> impl Iterator<Item = String> + '_ {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Joins conditions with `op`, parenthesizing each when there is more than one
pub(crate) fn join_conditions(conditions: &[String], op: &str) -> Option<String> {
    let items: Vec<String> = non_blank_items(conditions).collect();
    match items.len() {
        0 => None,
        1 => items.into_iter().next(),
        _ => Some(
            items
                .iter()
                .map(|c| format!("({})", c))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", op)),
        ),
    }
}
