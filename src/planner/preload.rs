//! # Preload Expansion
//!
//! Flattens the requested preloads into an ordered list of relation paths,
//! each with the scope it is loaded with.
//!
//! Nested entries (`A.B` below `A`) are applied after their parent. A
//! recursive entry is additionally unrolled into a chain of self-relations:
//!
//! ```text
//! MAL
//! MAL.DEF
//! MAL.MAL_RID_PARENT            (level 1, no where clause)
//! MAL.MAL_RID_PARENT.DEF        (child re-rooted under level 1)
//! MAL.MAL_RID_PARENT.MAL_RID_PARENT
//! ...
//! ```
//!
//! Unrolling stops after [`MAX_RECURSION_DEPTH`] levels.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event, Event, Severity};
use crate::options::{PreloadOption, SortOption};

/// Deepest synthesized recursion level
pub const MAX_RECURSION_DEPTH: usize = 8;

/// Options a relation is loaded with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationScope {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub omit_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl RelationScope {
    pub fn from_option(option: &PreloadOption) -> Self {
        Self {
            columns: option.columns.clone(),
            omit_columns: option.omit_columns.clone(),
            where_clause: option
                .where_clause
                .as_deref()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_string),
            sort: option.sort.clone(),
            limit: option.limit,
            offset: option.offset,
        }
    }

    /// Same scope with the where clause dropped
    pub fn without_where(mut self) -> Self {
        self.where_clause = None;
        self
    }
}

/// One relation to load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreloadStep {
    pub path: String,
    pub scope: RelationScope,
    /// Recursion level this step belongs to, 0 outside recursion
    pub depth: usize,
}

/// Name of the self-relation a recursive entry unrolls into
pub fn recursive_relation_name(option: &PreloadOption) -> String {
    let key = option
        .recursive_child_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty());
    match key {
        Some(key) => format!("{}_{}", option.leaf(), key).to_uppercase(),
        None => option.leaf().to_string(),
    }
}

/// Expands a list of preload options
#[derive(Debug, Clone, Copy)]
pub struct PreloadExpander<'a> {
    preloads: &'a [PreloadOption],
}

impl<'a> PreloadExpander<'a> {
    pub fn new(preloads: &'a [PreloadOption]) -> Self {
        Self { preloads }
    }

    /// All steps in application order, each path at most once
    pub fn expand(&self) -> Vec<PreloadStep> {
        let mut steps = Vec::new();
        for root in self.preloads.iter().filter(|p| self.nearest_ancestor(p).is_none()) {
            self.visit(root, &mut steps);
        }

        let mut seen = HashSet::new();
        steps.retain(|step| seen.insert(step.path.clone()));
        steps
    }

    fn visit(&self, option: &'a PreloadOption, steps: &mut Vec<PreloadStep>) {
        steps.push(PreloadStep {
            path: option.relation.clone(),
            scope: RelationScope::from_option(option),
            depth: 0,
        });

        for child in self.children(option) {
            self.visit(child, steps);
        }

        if option.recursive {
            steps.extend(self.expand_recursive(option, &option.relation, 0));
        }
    }

    /// Synthesizes the recursion levels below `current_path`. `depth` is
    /// the level `current_path` sits at; a new level is created only while
    /// it is below [`MAX_RECURSION_DEPTH`].
    pub fn expand_recursive(
        &self,
        original: &PreloadOption,
        current_path: &str,
        depth: usize,
    ) -> Vec<PreloadStep> {
        let mut steps = Vec::new();
        let mut path = current_path.to_string();
        let name = recursive_relation_name(original);
        let descendants = self.descendants(original);

        for level in depth + 1..=MAX_RECURSION_DEPTH {
            path = format!("{}.{}", path, name);
            steps.push(PreloadStep {
                path: path.clone(),
                scope: RelationScope::from_option(original).without_where(),
                depth: level,
            });

            // Children keep their own scope, including their where clause
            for child in &descendants {
                let suffix = &child.relation[original.relation.len()..];
                steps.push(PreloadStep {
                    path: format!("{}{}", path, suffix),
                    scope: RelationScope::from_option(child),
                    depth: level,
                });
            }
        }

        if depth < MAX_RECURSION_DEPTH {
            let levels = (MAX_RECURSION_DEPTH - depth).to_string();
            log_event(
                Severity::Trace,
                Event::RecursionBounded,
                &[("relation", original.relation.as_str()), ("levels", levels.as_str())],
            );
        }
        steps
    }

    /// Longest listed relation that is an ancestor of `option`
    fn nearest_ancestor(&self, option: &PreloadOption) -> Option<&'a PreloadOption> {
        self.preloads
            .iter()
            .filter(|p| p.is_ancestor_of(option))
            .max_by_key(|p| p.relation.len())
    }

    fn children(&self, option: &PreloadOption) -> Vec<&'a PreloadOption> {
        self.preloads
            .iter()
            .filter(|p| {
                self.nearest_ancestor(p)
                    .map_or(false, |parent| parent.relation == option.relation)
            })
            .collect()
    }

    fn descendants(&self, option: &PreloadOption) -> Vec<&'a PreloadOption> {
        self.preloads
            .iter()
            .filter(|p| option.is_ancestor_of(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recursive(relation: &str, key: Option<&str>) -> PreloadOption {
        PreloadOption {
            recursive: true,
            recursive_child_key: key.map(str::to_string),
            where_clause: Some("active = true".into()),
            ..PreloadOption::new(relation)
        }
    }

    fn paths(steps: &[PreloadStep]) -> Vec<&str> {
        steps.iter().map(|s| s.path.as_str()).collect()
    }

    #[test]
    fn test_relation_name_from_key() {
        let opt = recursive("MAL", Some("rid_parentmastertaskitem"));
        assert_eq!(recursive_relation_name(&opt), "MAL_RID_PARENTMASTERTASKITEM");

        let opt = recursive("tasks.Sub", None);
        assert_eq!(recursive_relation_name(&opt), "Sub");
    }

    #[test]
    fn test_nested_children_follow_parent() {
        let preloads = vec![PreloadOption::new("A.B"), PreloadOption::new("A"), PreloadOption::new("C")];
        let steps = PreloadExpander::new(&preloads).expand();
        assert_eq!(paths(&steps), vec!["A", "A.B", "C"]);
    }

    #[test]
    fn test_recursive_levels_are_bounded() {
        let preloads = vec![recursive("MAL", Some("rid_parent"))];
        let steps = PreloadExpander::new(&preloads).expand();

        assert_eq!(steps.len(), 1 + MAX_RECURSION_DEPTH);
        assert_eq!(steps[1].path, "MAL.MAL_RID_PARENT");
        assert_eq!(steps[1].depth, 1);
        assert_eq!(steps.last().unwrap().depth, MAX_RECURSION_DEPTH);
        assert_eq!(steps.last().unwrap().path.matches("MAL_RID_PARENT").count(), 8);
    }

    #[test]
    fn test_where_only_on_original_level() {
        let preloads = vec![recursive("MAL", Some("rid_parent"))];
        let steps = PreloadExpander::new(&preloads).expand();
        assert_eq!(steps[0].scope.where_clause.as_deref(), Some("active = true"));
        assert!(steps[1..].iter().all(|s| s.scope.where_clause.is_none()));
    }

    #[test]
    fn test_children_are_rerooted_at_every_level() {
        let mut child = PreloadOption::new("MAL.DEF");
        child.where_clause = Some("kind = 'x'".into());
        let preloads = vec![recursive("MAL", Some("rid_parent")), child];
        let steps = PreloadExpander::new(&preloads).expand();

        let p = paths(&steps);
        assert_eq!(&p[..4], &["MAL", "MAL.DEF", "MAL.MAL_RID_PARENT", "MAL.MAL_RID_PARENT.DEF"]);
        let rerooted: Vec<_> = steps.iter().filter(|s| s.path.ends_with(".DEF")).collect();
        assert_eq!(rerooted.len(), 1 + MAX_RECURSION_DEPTH);
        assert!(rerooted.iter().all(|s| s.scope.where_clause.as_deref() == Some("kind = 'x'")));
    }

    #[test]
    fn test_expand_recursive_at_bound() {
        let opt = recursive("MAL", Some("rid_parent"));
        let preloads = vec![opt.clone()];
        let expander = PreloadExpander::new(&preloads);

        assert_eq!(expander.expand_recursive(&opt, "MAL", 7).len(), 1);
        assert!(expander.expand_recursive(&opt, "MAL", MAX_RECURSION_DEPTH).is_empty());
    }

    #[test]
    fn test_fallback_name_stays_bounded() {
        let preloads = vec![recursive("tasks", None)];
        let steps = PreloadExpander::new(&preloads).expand();
        assert_eq!(steps[1].path, "tasks.tasks");
        assert_eq!(steps.len(), 1 + MAX_RECURSION_DEPTH);
    }
}
