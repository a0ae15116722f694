//! # Preload and Expand Options
//!
//! Preloads are eager-loaded relations fetched as separate nested queries.
//! Expands are relations joined into the main query with a LEFT JOIN.

use serde::{Deserialize, Serialize};

use super::sort::SortOption;

/// A requested eager-load. `relation` is a dot-separated path; a child entry
/// must extend its parent's path to be recognized as nested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreloadOption {
    pub relation: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub omit_columns: Vec<String>,
    /// Raw SQL condition scoped to this relation
    #[serde(default)]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub sort: Vec<SortOption>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub related_key: Option<String>,
    /// Expand this relation into a bounded chain of self-joins
    #[serde(default)]
    pub recursive: bool,
    /// Column on the same table pointing back at the parent row
    #[serde(default)]
    pub recursive_child_key: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
}

impl PreloadOption {
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            ..Self::default()
        }
    }

    /// Last segment of the relation path
    pub fn leaf(&self) -> &str {
        self.relation.rsplit('.').next().unwrap_or(&self.relation)
    }

    /// Path of the parent relation, `None` for top-level entries
    pub fn parent_path(&self) -> Option<&str> {
        self.relation.rsplit_once('.').map(|(parent, _)| parent)
    }

    /// True if `other` hangs directly or transitively below this entry
    pub fn is_ancestor_of(&self, other: &PreloadOption) -> bool {
        other.relation.len() > self.relation.len()
            && other.relation.starts_with(&self.relation)
            && other.relation.as_bytes()[self.relation.len()] == b'.'
    }
}

/// A relation expanded with a LEFT JOIN into the main query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandOption {
    pub relation: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub where_clause: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_and_parent() {
        let p = PreloadOption::new("MAL.DEF.GHI");
        assert_eq!(p.leaf(), "GHI");
        assert_eq!(p.parent_path(), Some("MAL.DEF"));
        assert_eq!(PreloadOption::new("MAL").parent_path(), None);
    }

    #[test]
    fn test_ancestor_requires_dot_boundary() {
        let mal = PreloadOption::new("MAL");
        assert!(mal.is_ancestor_of(&PreloadOption::new("MAL.DEF")));
        assert!(mal.is_ancestor_of(&PreloadOption::new("MAL.DEF.X")));
        assert!(!mal.is_ancestor_of(&PreloadOption::new("MALFORMED")));
        assert!(!mal.is_ancestor_of(&PreloadOption::new("MAL")));
    }
}
