//! Statically declared model descriptors
//!
//! Every entity the engine plans queries for is described by a
//! `ModelDescriptor`: its table, primary key, columns and relation fields.
//! Descriptors come from configuration or from types implementing
//! [`DescribeModel`]; nothing is discovered at runtime.

use serde::{Deserialize, Serialize};

/// Relation cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    ManyToMany,
}

/// A logical relation field on a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Logical field name used in preload paths (e.g. `Comments`)
    pub field_name: String,
    /// Physical table of the related model, possibly schema-qualified
    pub target_table: String,
    pub kind: RelationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

impl RelationDescriptor {
    pub fn new(
        field_name: impl Into<String>,
        target_table: impl Into<String>,
        kind: RelationKind,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            target_table: target_table.into(),
            kind,
            foreign_key: None,
        }
    }

    pub fn with_foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = Some(key.into());
        self
    }

    /// Target table without schema prefix
    pub fn target_bare_table(&self) -> &str {
        bare_table_name(&self.target_table)
    }
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Description of one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Physical table name, possibly `schema.table`
    pub table_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Known column names. Empty means "unknown", not "no columns".
    #[serde(default)]
    pub columns: Vec<String>,

    #[serde(default)]
    pub relations: Vec<RelationDescriptor>,
}

impl ModelDescriptor {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            schema: None,
            primary_key: default_primary_key(),
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relation(mut self, relation: RelationDescriptor) -> Self {
        self.relations.push(relation);
        self
    }

    /// Table name without schema prefix
    pub fn bare_table(&self) -> &str {
        bare_table_name(&self.table_name)
    }

    /// Fully qualified name: explicit schema wins over an embedded prefix
    pub fn qualified_table(&self) -> String {
        match &self.schema {
            Some(schema) if !schema.is_empty() => format!("{}.{}", schema, self.bare_table()),
            _ => self.table_name.clone(),
        }
    }

    /// Schema name, explicit or taken from a qualified table name
    pub fn schema_name(&self) -> Option<&str> {
        self.schema
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.table_name.split_once('.').map(|(schema, _)| schema))
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Finds the relation a path segment refers to.
    ///
    /// Exact field name first, then a case/underscore-insensitive match on
    /// the field name, then the same match on the related table name.
    pub fn find_relation(&self, segment: &str) -> Option<&RelationDescriptor> {
        if let Some(rel) = self.relations.iter().find(|r| r.field_name == segment) {
            return Some(rel);
        }
        let wanted = normalize_name(segment);
        self.relations
            .iter()
            .find(|r| normalize_name(&r.field_name) == wanted)
            .or_else(|| {
                self.relations
                    .iter()
                    .find(|r| normalize_name(r.target_bare_table()) == wanted)
            })
    }
}

/// Types that carry a static model description
pub trait DescribeModel {
    fn describe() -> ModelDescriptor;
}

/// Strips a `schema.` prefix
pub fn bare_table_name(table: &str) -> &str {
    table.split_once('.').map(|(_, t)| t).unwrap_or(table)
}

/// Lower-case, underscores removed
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}
