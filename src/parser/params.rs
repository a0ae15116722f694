//! # Parameter Parser
//!
//! Turns merged key/value parameters into [`RequestOptions`].
//!
//! Keys are dispatched by prefix, not by exact match, so callers can append
//! suffixes (`x-sort-1`, `x-sort-2`) to send several instances of a family.
//! Nothing here fails: fragments that cannot be used are logged and skipped.

use crate::observability::{log_event, Event, Severity};
use crate::options::{
    ExpandOption, FilterOption, LogicOperator, PreloadOption, RequestOptions, ResponseFormat,
    SortOption,
};
use crate::schema::ModelRegistry;

use super::decode::decode_value;
use super::search::{parse_filter_value, resolve_search_op};
use super::sources::{lookup, merge_sources, Param};
use super::split::{parse_sort_list, positional_args, split_list, split_top_level};
use super::structured::StructuredBlock;

/// Semantic family of a parameter key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    SelectFields,
    OmitFields,
    CleanJson,
    FieldFilter,
    SearchFilter,
    SearchOp(LogicOperator),
    SearchColumns,
    CustomWhere,
    CustomOr,
    CustomJoin,
    Preload,
    Expand,
    Sort,
    LegacySort,
    Limit,
    LegacyLimit,
    Offset,
    CursorForward,
    CursorBackward,
    AdvancedSql,
    ComputedColumn,
    Distinct,
    SkipCount,
    SkipCache,
    FetchRowNumber,
    ResponseFormat,
    SimpleApi,
    DetailApi,
    SyncfusionApi,
    SingleRecordAsObject,
    AtomicTransaction,
    StructuredBlock,
}

/// Prefix dispatch table, checked in order
pub const KEY_FAMILIES: &[(&str, KeyFamily)] = &[
    ("x-select-fields", KeyFamily::SelectFields),
    ("x-not-select-fields", KeyFamily::OmitFields),
    ("x-clean-json", KeyFamily::CleanJson),
    ("x-fieldfilter-", KeyFamily::FieldFilter),
    ("x-searchfilter-", KeyFamily::SearchFilter),
    ("x-searchop-", KeyFamily::SearchOp(LogicOperator::And)),
    ("x-searchor-", KeyFamily::SearchOp(LogicOperator::Or)),
    ("x-searchand-", KeyFamily::SearchOp(LogicOperator::And)),
    ("x-searchcols", KeyFamily::SearchColumns),
    ("x-custom-sql-w", KeyFamily::CustomWhere),
    ("x-custom-sql-or", KeyFamily::CustomOr),
    ("x-custom-sql-join", KeyFamily::CustomJoin),
    ("x-preload", KeyFamily::Preload),
    ("x-expand", KeyFamily::Expand),
    ("x-sort", KeyFamily::Sort),
    ("sort(", KeyFamily::LegacySort),
    ("x-limit", KeyFamily::Limit),
    ("limit(", KeyFamily::LegacyLimit),
    ("x-offset", KeyFamily::Offset),
    ("x-cursor-forward", KeyFamily::CursorForward),
    ("x-cursor-backward", KeyFamily::CursorBackward),
    ("x-advsql-", KeyFamily::AdvancedSql),
    ("x-cql-sel-", KeyFamily::ComputedColumn),
    ("x-distinct", KeyFamily::Distinct),
    ("x-skipcount", KeyFamily::SkipCount),
    ("x-skipcache", KeyFamily::SkipCache),
    ("x-fetch-rownumber", KeyFamily::FetchRowNumber),
    ("x-response-format", KeyFamily::ResponseFormat),
    ("x-simpleapi", KeyFamily::SimpleApi),
    ("x-detailapi", KeyFamily::DetailApi),
    ("x-syncfusion", KeyFamily::SyncfusionApi),
    ("x-single-record-as-object", KeyFamily::SingleRecordAsObject),
    ("x-transaction-atomic", KeyFamily::AtomicTransaction),
    ("x-files", KeyFamily::StructuredBlock),
];

/// Finds the family of a lower-cased key and the length of the matched prefix
pub fn classify_key(key: &str) -> Option<(KeyFamily, usize)> {
    KEY_FAMILIES
        .iter()
        .find(|(prefix, _)| key.starts_with(prefix))
        .map(|(prefix, family)| (*family, prefix.len()))
}

/// Parameter parser bound to a model registry
#[derive(Debug, Clone)]
pub struct ParameterParser<'a> {
    registry: &'a ModelRegistry,
    default_primary_key: &'a str,
    table: Option<String>,
}

impl<'a> ParameterParser<'a> {
    pub fn new(registry: &'a ModelRegistry, default_primary_key: &'a str) -> Self {
        Self {
            registry,
            default_primary_key,
            table: None,
        }
    }

    /// Sets the target table (relation resolution root, default sort key)
    pub fn for_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Parses headers and query-string pairs; the query string wins on
    /// case-insensitive key collision.
    pub fn parse_sources<K, V>(&self, headers: &[(K, V)], query: &[(K, V)]) -> RequestOptions
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.parse_params(&merge_sources(headers, query))
    }

    /// Parses a single ordered source
    pub fn parse<K, V>(&self, pairs: &[(K, V)]) -> RequestOptions
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.parse_params(&merge_sources(pairs, &[]))
    }

    /// Parses already merged parameters
    pub fn parse_params(&self, params: &[Param]) -> RequestOptions {
        let mut options = RequestOptions {
            table_name: self.table.clone(),
            ..Default::default()
        };

        for param in params {
            let Some((family, prefix_len)) = classify_key(&param.key) else {
                continue;
            };
            let value = decode_value(&param.value);
            self.apply(&mut options, family, param, prefix_len, &value, params);
        }

        self.resolve_relations(&mut options);
        self.inject_default_sort(&mut options);

        options
    }

    fn apply(
        &self,
        options: &mut RequestOptions,
        family: KeyFamily,
        param: &Param,
        prefix_len: usize,
        value: &str,
        params: &[Param],
    ) {
        match family {
            KeyFamily::SelectFields => options.columns.extend(split_list(value)),
            KeyFamily::OmitFields => options.omit_columns.extend(split_list(value)),
            KeyFamily::CleanJson => options.clean_json = parse_flag(value),
            KeyFamily::FieldFilter => {
                if let Some(column) = suffix_column(param, prefix_len) {
                    options
                        .filters
                        .push(FilterOption::eq(column, parse_filter_value(value)));
                }
            }
            KeyFamily::SearchFilter => {
                if let Some(column) = suffix_column(param, prefix_len) {
                    let (operator, typed) = resolve_search_op("contains", value);
                    options.filters.push(FilterOption::new(column, operator, typed));
                }
            }
            KeyFamily::SearchOp(logic) => {
                let rest = param.raw_suffix(prefix_len);
                match rest.split_once('-') {
                    Some((op, column)) if !column.trim().is_empty() => {
                        let (operator, typed) = resolve_search_op(op, value);
                        options.filters.push(
                            FilterOption::new(column.trim(), operator, typed).with_logic(logic),
                        );
                    }
                    _ => skipped(param, "search operator key needs {op}-{column}"),
                }
            }
            KeyFamily::SearchColumns => options.search_columns.extend(split_list(value)),
            KeyFamily::CustomWhere => push_non_blank(&mut options.custom_where, value),
            KeyFamily::CustomOr => push_non_blank(&mut options.custom_or, value),
            KeyFamily::CustomJoin => options.custom_joins.extend(split_top_level(value, '|')),
            KeyFamily::Preload => {
                if param.key.ends_with("-where") {
                    return;
                }
                let where_clause = sibling(params, param, "where");
                options.preload.extend(parse_preloads(value, where_clause));
            }
            KeyFamily::Expand => {
                if param.key.ends_with("-where") || param.key.ends_with("-sort") {
                    return;
                }
                let where_clause = sibling(params, param, "where");
                let sort = sibling(params, param, "sort");
                options.expand.extend(parse_expands(value, where_clause, sort));
            }
            KeyFamily::Sort => options.sort.extend(parse_sort_list(value)),
            KeyFamily::LegacySort => match positional_args(param.raw_key.as_str()) {
                Some(args) => options.sort.extend(parse_sort_list(args)),
                None => skipped(param, "unterminated positional sort"),
            },
            KeyFamily::Limit => set_count(&mut options.limit, param, value),
            KeyFamily::Offset => set_count(&mut options.offset, param, value),
            KeyFamily::LegacyLimit => match positional_args(&param.key) {
                Some(args) => apply_legacy_limit(options, param, args),
                None => skipped(param, "unterminated positional limit"),
            },
            KeyFamily::CursorForward => options.cursor_forward = non_blank(value),
            KeyFamily::CursorBackward => options.cursor_backward = non_blank(value),
            KeyFamily::AdvancedSql => {
                if let Some(column) = suffix_column(param, prefix_len) {
                    options.advanced_sql.insert(column, value.to_string());
                }
            }
            KeyFamily::ComputedColumn => {
                if let Some(column) = suffix_column(param, prefix_len) {
                    options.computed_columns.insert(column, value.to_string());
                }
            }
            KeyFamily::Distinct => options.distinct = parse_flag(value),
            KeyFamily::SkipCount => options.skip_count = parse_flag(value),
            KeyFamily::SkipCache => options.skip_cache = parse_flag(value),
            KeyFamily::FetchRowNumber => options.fetch_row_number = non_blank(value),
            KeyFamily::ResponseFormat => match ResponseFormat::parse(value) {
                Some(format) => options.response_format = format,
                None => skipped(param, "unknown response format"),
            },
            KeyFamily::SimpleApi => options.response_format = ResponseFormat::Simple,
            KeyFamily::DetailApi => options.response_format = ResponseFormat::Detail,
            KeyFamily::SyncfusionApi => options.response_format = ResponseFormat::Syncfusion,
            KeyFamily::SingleRecordAsObject => {
                options.single_record_as_object = !value.trim().eq_ignore_ascii_case("false");
            }
            KeyFamily::AtomicTransaction => options.atomic_transaction = parse_flag(value),
            KeyFamily::StructuredBlock => match StructuredBlock::from_json(value) {
                Ok(block) => block.merge_into(options),
                Err(e) => {
                    let reason = e.to_string();
                    log_event(
                        Severity::Warn,
                        Event::StructuredBlockInvalid,
                        &[("key", param.key.as_str()), ("reason", reason.as_str())],
                    );
                }
            },
        }
    }

    /// Rewrites table-shaped relation segments into logical relation fields
    fn resolve_relations(&self, options: &mut RequestOptions) {
        if self.registry.is_empty() {
            return;
        }
        let root = options.table_name.clone();
        for preload in &mut options.preload {
            preload.relation = self
                .registry
                .resolve_relation_path(root.as_deref(), &preload.relation);
        }
        for expand in &mut options.expand {
            expand.relation = self
                .registry
                .resolve_relation_path(root.as_deref(), &expand.relation);
        }
    }

    /// Primary key of the target: registry, then structured block, then default
    pub fn primary_key_for(&self, options: &RequestOptions) -> String {
        options
            .table_name
            .as_deref()
            .and_then(|t| self.registry.get(t))
            .map(|m| m.primary_key.clone())
            .or_else(|| options.primary_key.clone())
            .unwrap_or_else(|| self.default_primary_key.to_string())
    }

    fn inject_default_sort(&self, options: &mut RequestOptions) {
        if !options.sort.is_empty() {
            return;
        }
        let pk = self.primary_key_for(options);
        log_event(Severity::Trace, Event::DefaultSortInjected, &[("column", pk.as_str())]);
        options.sort.push(SortOption::asc(pk));
    }
}

/// `Rel:col1,col2|Rel2` into preload entries sharing one where clause
pub fn parse_preloads(value: &str, where_clause: Option<String>) -> Vec<PreloadOption> {
    split_top_level(value, '|')
        .iter()
        .filter_map(|part| {
            let (relation, columns) = split_relation_entry(part)?;
            Some(PreloadOption {
                relation,
                columns,
                where_clause: where_clause.clone(),
                ..Default::default()
            })
        })
        .collect()
}

/// `Rel:col1,col2|Rel2` into LEFT JOIN expansions sharing one where clause
/// and one extra order term
pub fn parse_expands(
    value: &str,
    where_clause: Option<String>,
    sort: Option<String>,
) -> Vec<ExpandOption> {
    split_top_level(value, '|')
        .iter()
        .filter_map(|part| {
            let (relation, columns) = split_relation_entry(part)?;
            Some(ExpandOption {
                relation,
                columns,
                where_clause: where_clause.clone(),
                sort: sort.clone(),
            })
        })
        .collect()
}

/// Decoded, non-blank value of `<key>-<suffix>`
fn sibling(params: &[Param], param: &Param, suffix: &str) -> Option<String> {
    lookup(params, &format!("{}-{}", param.key, suffix))
        .map(decode_value)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_relation_entry(part: &str) -> Option<(String, Vec<String>)> {
    let (relation, columns) = match part.split_once(':') {
        Some((relation, columns)) => (relation, split_list(columns)),
        None => (part, Vec::new()),
    };
    let relation = relation.trim();
    if relation.is_empty() {
        return None;
    }
    Some((relation.to_string(), columns))
}

fn apply_legacy_limit(options: &mut RequestOptions, param: &Param, args: &str) {
    let parts = split_list(args);
    match parts.as_slice() {
        [count] => set_count(&mut options.limit, param, count),
        [offset, count] => {
            set_count(&mut options.offset, param, offset);
            set_count(&mut options.limit, param, count);
        }
        _ => skipped(param, "positional limit takes (count) or (offset,count)"),
    }
}

/// Sets a count field; malformed numbers leave the field untouched
fn set_count(field: &mut Option<u64>, param: &Param, value: &str) {
    match value.trim().parse::<u64>() {
        Ok(n) => *field = Some(n),
        Err(_) => skipped(param, "not a non-negative integer"),
    }
}

fn suffix_column(param: &Param, prefix_len: usize) -> Option<String> {
    let column = param.raw_suffix(prefix_len).trim();
    if column.is_empty() {
        skipped(param, "missing column name");
        return None;
    }
    Some(column.to_string())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn push_non_blank(list: &mut Vec<String>, value: &str) {
    if let Some(v) = non_blank(value) {
        list.push(v);
    }
}

fn skipped(param: &Param, reason: &str) {
    log_event(
        Severity::Warn,
        Event::FragmentSkipped,
        &[("key", param.key.as_str()), ("reason", reason)],
    );
}
