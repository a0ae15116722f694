//! Plan assembly
//!
//! Combines the parsed options, the filter grouping, the cursor predicate
//! and the preload expansion into one immutable [`QueryPlan`], which is then
//! applied to a provider's [`QueryBuilder`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::observability::{log_event, Event, Severity};
use crate::options::{CursorDirection, RequestOptions, SortOption};
use crate::parser::{join_conditions, parse_sort_list};
use crate::schema::{bare_table_name, ModelDescriptor, ModelRegistry, RelationKind};

use super::builder::QueryBuilder;
use super::cursor::CursorPaginator;
use super::errors::{PlanError, PlanResult};
use super::filters::{group_filters, Condition};
use super::preload::{PreloadExpander, PreloadStep};
use super::rownumber::row_number_query;

/// Immutable query plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    /// Table as queried, schema-qualified when known
    pub table: String,
    pub primary_key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    pub distinct: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<String>,
    /// Clauses AND-ed together, cursor predicate last
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub where_clauses: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Always `None` while a cursor is active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    pub cursor: CursorDirection,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preloads: Vec<PreloadStep>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_number: Option<Condition>,
    pub skip_count: bool,
}

impl QueryPlan {
    /// Applies the plan to a builder in a fixed order: columns, joins,
    /// where clauses, order, limit/offset, preloads.
    pub fn apply<B: QueryBuilder>(&self, builder: &mut B) {
        if !self.columns.is_empty() {
            builder.select_columns(&self.columns);
        }
        if self.distinct {
            builder.distinct();
        }
        for join in &self.joins {
            builder.join(join);
        }
        for clause in &self.where_clauses {
            builder.where_clause(&clause.sql, &clause.args);
        }
        for expr in &self.order {
            builder.order(expr);
        }
        if let Some(limit) = self.limit {
            builder.limit(limit);
        }
        if let Some(offset) = self.offset {
            builder.offset(offset);
        }
        for step in &self.preloads {
            builder.preload_relation(&step.path, &step.scope);
        }
    }

    /// Runs the count query on a fresh builder with the plan's joins and
    /// where clauses. `None` when counting is skipped.
    pub fn total<B: QueryBuilder>(&self, builder: &mut B) -> Result<Option<u64>, B::Error> {
        if self.skip_count {
            return Ok(None);
        }
        for join in &self.joins {
            builder.join(join);
        }
        for clause in &self.where_clauses {
            builder.where_clause(&clause.sql, &clause.args);
        }
        builder.count().map(Some)
    }
}

/// Turns request options into query plans
#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner<'a> {
    registry: &'a ModelRegistry,
    default_primary_key: &'a str,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(registry: &'a ModelRegistry, default_primary_key: &'a str) -> Self {
        Self {
            registry,
            default_primary_key,
        }
    }

    /// Plans a request. Fails only when no table is named, or when a
    /// cursor is requested without usable sort columns.
    pub fn plan(&self, options: &RequestOptions) -> PlanResult<QueryPlan> {
        let result = self.build(options);
        if let Err(err) = &result {
            log_event(
                Severity::Warn,
                Event::PlanRejected,
                &[("code", err.code().code()), ("message", err.message())],
            );
        }
        result
    }

    fn build(&self, options: &RequestOptions) -> PlanResult<QueryPlan> {
        let table = options
            .table_name
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(PlanError::table_required)?;
        let model = self.registry.get(table);
        let qualified = qualified_table(table, options.schema.as_deref(), model);
        let bare = bare_table_name(&qualified).to_string();

        // Same precedence as the parser's default sort
        let primary_key = model
            .map(|m| m.primary_key.clone())
            .or_else(|| options.primary_key.clone().filter(|pk| !pk.trim().is_empty()))
            .unwrap_or_else(|| self.default_primary_key.to_string());

        // LEFT JOINs for expanded relations, keyed by the relation name
        let mut expand_joins = BTreeMap::new();
        let mut expand_columns = Vec::new();
        let mut expand_wheres = Vec::new();
        let mut expand_order = Vec::new();
        for expand in &options.expand {
            let join = match model.and_then(|m| self.expand_join(m, &bare, &expand.relation)) {
                Some(join) => join,
                None => {
                    log_event(
                        Severity::Warn,
                        Event::FragmentSkipped,
                        &[("expand", expand.relation.as_str()), ("table", bare.as_str())],
                    );
                    continue;
                }
            };
            expand_joins.insert(expand.relation.clone(), join);
            expand_columns.extend(
                expand
                    .columns
                    .iter()
                    .map(|c| format!("{}.{}", expand.relation, c)),
            );
            if let Some(clause) = expand.where_clause.as_deref().filter(|w| !w.trim().is_empty()) {
                expand_wheres.push(Condition::raw(clause.trim()));
            }
            if let Some(sort) = expand.sort.as_deref() {
                expand_order.extend(parse_sort_list(sort).iter().map(SortOption::to_order_expr));
            }
        }

        let mut columns = select_columns(options, model);
        if columns.is_empty() && !expand_columns.is_empty() {
            columns.push(format!("{}.*", bare));
        }
        columns.extend(expand_columns);

        let mut joins: Vec<String> = options
            .custom_joins
            .iter()
            .map(|j| j.trim())
            .filter(|j| !j.is_empty())
            .map(str::to_string)
            .collect();
        joins.extend(expand_joins.values().cloned());

        let mut where_clauses = group_filters(&options.filters);
        where_clauses.extend(
            options
                .custom_where
                .iter()
                .map(|w| w.trim())
                .filter(|w| !w.is_empty())
                .map(Condition::raw),
        );
        if let Some(any) = join_conditions(&options.custom_or, "OR") {
            where_clauses.push(Condition::raw(format!("({})", any)));
        }
        where_clauses.extend(expand_wheres);

        let row_number = options
            .fetch_row_number
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                row_number_query(
                    &qualified,
                    &primary_key,
                    &options.sort,
                    &joins,
                    &where_clauses,
                    id,
                )
            });

        let cursor = options.cursor_direction();
        if cursor != CursorDirection::None {
            let mut paginator =
                CursorPaginator::new(&qualified, &primary_key).with_expand_joins(&expand_joins);
            if let Some(model) = model {
                paginator = paginator.with_model_columns(&model.columns);
            }
            where_clauses.push(Condition::raw(paginator.filter_for(options)?));
        }

        let mut order: Vec<String> = options.sort.iter().map(SortOption::to_order_expr).collect();
        order.extend(expand_order);

        let preloads = PreloadExpander::new(&options.preload).expand();

        let plan = QueryPlan {
            table: qualified,
            primary_key,
            columns,
            distinct: options.distinct,
            joins,
            where_clauses,
            order,
            limit: options.limit,
            offset: if cursor == CursorDirection::None {
                options.offset
            } else {
                None
            },
            cursor,
            preloads,
            search_columns: options.search_columns.clone(),
            row_number,
            skip_count: options.skip_count,
        };

        let clauses = plan.where_clauses.len().to_string();
        let preloads = plan.preloads.len().to_string();
        log_event(
            Severity::Trace,
            Event::PlanBuilt,
            &[
                ("table", plan.table.as_str()),
                ("where_clauses", clauses.as_str()),
                ("preloads", preloads.as_str()),
            ],
        );
        Ok(plan)
    }

    /// LEFT JOIN for one expanded relation of `model`
    fn expand_join(&self, model: &ModelDescriptor, bare: &str, relation: &str) -> Option<String> {
        let rel = model.find_relation(relation)?;
        let target = self.registry.get(&rel.target_table);
        let target_table = target
            .map(ModelDescriptor::qualified_table)
            .unwrap_or_else(|| rel.target_table.clone());
        let target_pk = target
            .map(|t| t.primary_key.as_str())
            .unwrap_or(self.default_primary_key);

        match rel.kind {
            RelationKind::BelongsTo => {
                let fk = rel
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_{}", rel.field_name.to_lowercase(), target_pk));
                Some(format!(
                    "LEFT JOIN {} {} ON {}.{} = {}.{}",
                    target_table, relation, relation, target_pk, bare, fk
                ))
            }
            RelationKind::HasOne | RelationKind::HasMany => {
                let fk = rel
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_{}", bare, model.primary_key));
                Some(format!(
                    "LEFT JOIN {} {} ON {}.{} = {}.{}",
                    target_table, relation, relation, fk, bare, model.primary_key
                ))
            }
            RelationKind::ManyToMany => None,
        }
    }
}

fn qualified_table(table: &str, schema: Option<&str>, model: Option<&ModelDescriptor>) -> String {
    if table.contains('.') {
        return table.to_string();
    }
    match schema.map(str::trim).filter(|s| !s.is_empty()) {
        Some(schema) => format!("{}.{}", schema, table),
        None => model
            .map(ModelDescriptor::qualified_table)
            .unwrap_or_else(|| table.to_string()),
    }
}

/// Selected columns after omissions, with advanced-SQL overrides and
/// computed columns appended as `(expr) AS name`.
fn select_columns(options: &RequestOptions, model: Option<&ModelDescriptor>) -> Vec<String> {
    let base: Vec<String> = if !options.columns.is_empty() {
        options.columns.clone()
    } else if !options.omit_columns.is_empty() || !options.advanced_sql.is_empty() {
        model.map(|m| m.columns.clone()).unwrap_or_default()
    } else {
        Vec::new()
    };

    let mut columns: Vec<String> = base
        .into_iter()
        .filter(|c| !options.omit_columns.iter().any(|o| o.eq_ignore_ascii_case(c)))
        .map(|c| match options.advanced_sql.get(&c) {
            Some(expr) => format!("({}) AS {}", expr, c),
            None => c,
        })
        .collect();

    if !columns.is_empty() || !options.computed_columns.is_empty() {
        if columns.is_empty() {
            columns.push("*".to_string());
        }
        columns.extend(
            options
                .computed_columns
                .iter()
                .map(|(name, expr)| format!("({}) AS {}", expr, name)),
        );
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ExpandOption, FilterOption, PreloadOption};
    use crate::planner::builder::SqlRecorder;
    use crate::schema::RelationDescriptor;
    use serde_json::json;

    fn registry() -> ModelRegistry {
        ModelRegistry::from_descriptors(vec![
            ModelDescriptor::new("blog.posts")
                .with_columns(["id", "title", "created_at", "author_id", "body"])
                .with_relation(
                    RelationDescriptor::new("author", "users", RelationKind::BelongsTo)
                        .with_foreign_key("author_id"),
                ),
            ModelDescriptor::new("users").with_columns(["id", "name"]),
        ])
    }

    fn options(table: &str) -> RequestOptions {
        RequestOptions {
            table_name: Some(table.to_string()),
            ..RequestOptions::default()
        }
    }

    #[test]
    fn test_plan_requires_table() {
        let reg = ModelRegistry::new();
        let err = QueryPlanner::new(&reg, "id")
            .plan(&RequestOptions::default())
            .unwrap_err();
        assert_eq!(err.code().code(), "RP_TABLE_REQUIRED");
    }

    #[test]
    fn test_offset_ignored_with_cursor() {
        let reg = registry();
        let mut opts = options("posts");
        opts.sort = vec![SortOption::asc("id")];
        opts.limit = Some(10);
        opts.offset = Some(40);
        opts.cursor_forward = Some("12".into());

        let plan = QueryPlanner::new(&reg, "id").plan(&opts).unwrap();
        assert_eq!(plan.table, "blog.posts");
        assert_eq!(plan.offset, None);
        assert_eq!(plan.limit, Some(10));
        assert!(plan.where_clauses.last().unwrap().sql.starts_with("EXISTS"));
    }

    #[test]
    fn test_cursor_without_sort_is_rejected() {
        let reg = registry();
        let mut opts = options("posts");
        opts.cursor_backward = Some("3".into());
        let err = QueryPlanner::new(&reg, "id").plan(&opts).unwrap_err();
        assert_eq!(err.code().code(), "RP_SORT_REQUIRED");
    }

    #[test]
    fn test_apply_to_recorder() {
        let reg = registry();
        let mut opts = options("posts");
        opts.columns = vec!["id".into(), "title".into()];
        opts.filters = vec![
            FilterOption::eq("status", json!("open")),
            FilterOption::eq("a", json!(1)).or(),
            FilterOption::eq("b", json!(2)).or(),
            FilterOption::eq("c", json!(3)),
        ];
        opts.custom_where = vec!["deleted_at IS NULL".into()];
        opts.sort = vec![SortOption::desc("created_at")];
        opts.limit = Some(5);
        opts.offset = Some(10);
        opts.preload = vec![PreloadOption::new("comments")];

        let plan = QueryPlanner::new(&reg, "id").plan(&opts).unwrap();
        let mut rec = SqlRecorder::new(plan.table.clone());
        plan.apply(&mut rec);

        assert_eq!(
            rec.to_sql(),
            "SELECT id, title FROM blog.posts WHERE (status = ?) AND ((a = ? OR b = ?)) \
             AND (c = ?) AND (deleted_at IS NULL) ORDER BY created_at DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(rec.preloads().len(), 1);
    }

    #[test]
    fn test_expand_adds_join_and_cursor_can_use_it() {
        let reg = registry();
        let mut opts = options("posts");
        opts.expand = vec![ExpandOption {
            relation: "author".into(),
            columns: vec!["name".into()],
            ..ExpandOption::default()
        }];
        opts.sort = vec![SortOption::asc("author.name"), SortOption::asc("id")];
        opts.cursor_forward = Some("8".into());

        let plan = QueryPlanner::new(&reg, "id").plan(&opts).unwrap();
        assert_eq!(plan.joins, vec!["LEFT JOIN users author ON author.id = posts.author_id"]);
        assert_eq!(plan.columns, vec!["posts.*", "author.name"]);
        let cursor = &plan.where_clauses.last().unwrap().sql;
        assert!(cursor.contains("cursor_author.name"));
    }

    #[test]
    fn test_omit_and_computed_columns() {
        let reg = registry();
        let mut opts = options("posts");
        opts.omit_columns = vec!["body".into()];
        opts.computed_columns.insert("words".into(), "length(body)".into());

        let plan = QueryPlanner::new(&reg, "id").plan(&opts).unwrap();
        assert!(!plan.columns.contains(&"body".to_string()));
        assert!(plan.columns.contains(&"title".to_string()));
        assert_eq!(plan.columns.last().unwrap(), "(length(body)) AS words");
    }

    #[test]
    fn test_custom_or_is_one_clause() {
        let reg = ModelRegistry::new();
        let mut opts = options("posts");
        opts.custom_or = vec!["a = 1".into(), "b = 2".into()];
        let plan = QueryPlanner::new(&reg, "id").plan(&opts).unwrap();
        assert_eq!(plan.where_clauses[0].sql, "((a = 1) OR (b = 2))");
    }

    #[test]
    fn test_row_number_requested() {
        let reg = ModelRegistry::new();
        let mut opts = options("posts");
        opts.fetch_row_number = Some("42".into());
        let plan = QueryPlanner::new(&reg, "id").plan(&opts).unwrap();
        let rn = plan.row_number.unwrap();
        assert!(rn.sql.contains("ROW_NUMBER()"));
        assert_eq!(rn.args, vec![json!("42")]);
    }

    #[test]
    fn test_row_number_sees_custom_joins() {
        let reg = ModelRegistry::new();
        let mut opts = options("posts");
        opts.custom_joins = vec!["LEFT JOIN tags t ON t.post_id = posts.id".into()];
        opts.custom_where = vec!["t.name = 'rust'".into()];
        opts.fetch_row_number = Some("42".into());

        let plan = QueryPlanner::new(&reg, "id").plan(&opts).unwrap();
        let rn = plan.row_number.unwrap();
        assert!(rn.sql.contains(
            "FROM posts LEFT JOIN tags t ON t.post_id = posts.id WHERE t.name = 'rust') search"
        ));
    }
}
