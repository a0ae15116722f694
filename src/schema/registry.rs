//! Model registry
//!
//! One registry per engine, filled at startup and read-only afterwards.
//! Lookups accept bare or schema-qualified table names, case-insensitive.

use std::collections::BTreeMap;

use crate::observability::{log_event, Event, Severity};

use super::model::{bare_table_name, DescribeModel, ModelDescriptor};

/// Registry of model descriptors keyed by lower-case bare table name
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from descriptors; later duplicates replace earlier ones
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ModelDescriptor>) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor);
        }
        registry
    }

    pub fn register(&mut self, descriptor: ModelDescriptor) {
        let key = descriptor.bare_table().to_ascii_lowercase();
        self.models.insert(key, descriptor);
    }

    /// Register a type carrying its own description
    pub fn register_model<M: DescribeModel>(&mut self) {
        self.register(M::describe());
    }

    pub fn get(&self, table: &str) -> Option<&ModelDescriptor> {
        self.models
            .get(&bare_table_name(table).to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Registered tables in sorted order
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.models.values().map(|m| m.table_name.as_str())
    }

    /// Rewrites every segment of a dot-separated relation path that names a
    /// physical table into the logical relation field name.
    ///
    /// Resolution walks the relation graph from `root_table`. A segment that
    /// cannot be resolved is kept as given, and so is everything below it.
    pub fn resolve_relation_path(&self, root_table: Option<&str>, path: &str) -> String {
        let mut current = root_table.and_then(|t| self.get(t));
        let mut resolved = Vec::new();

        for segment in path.split('.') {
            let segment = segment.trim();
            match current.and_then(|model| model.find_relation(segment)) {
                Some(rel) => {
                    resolved.push(rel.field_name.clone());
                    current = self.get(&rel.target_table);
                }
                None => {
                    if current.is_some() {
                        log_event(
                            Severity::Trace,
                            Event::RelationUnresolved,
                            &[("path", path), ("segment", segment)],
                        );
                    }
                    resolved.push(segment.to_string());
                    current = None;
                }
            }
        }

        resolved.join(".")
    }
}
