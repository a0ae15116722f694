//! Recursive Preload Expansion Tests
//!
//! Recursive relations unroll into at most `MAX_RECURSION_DEPTH` synthesized
//! levels named `<LEAF>_<KEY>`; children are re-rooted under every level.

use serde_json::json;

use resolveplan::engine::{Engine, EngineConfig};
use resolveplan::options::PreloadOption;
use resolveplan::planner::{
    recursive_relation_name, PreloadExpander, PreloadStep, QueryBuilder, SqlRecorder,
    MAX_RECURSION_DEPTH,
};

fn recursive(relation: &str, key: Option<&str>, where_clause: Option<&str>) -> PreloadOption {
    PreloadOption {
        recursive: true,
        recursive_child_key: key.map(str::to_string),
        where_clause: where_clause.map(str::to_string),
        ..PreloadOption::new(relation)
    }
}

fn paths(steps: &[PreloadStep]) -> Vec<String> {
    steps.iter().map(|s| s.path.clone()).collect()
}

// =============================================================================
// NAMING
// =============================================================================

/// The child key names the synthesized relation.
#[test]
fn test_recursive_child_name_from_key() {
    let preloads = vec![recursive("MAL", Some("rid_parentmastertaskitem"), None)];
    let steps = PreloadExpander::new(&preloads).expand();
    assert_eq!(steps[1].path, "MAL.MAL_RID_PARENTMASTERTASKITEM");
}

/// Without a key the leaf name repeats.
#[test]
fn test_recursive_child_name_fallback() {
    let preloads = vec![recursive("MAL", None, None)];
    let steps = PreloadExpander::new(&preloads).expand();
    assert_eq!(steps[1].path, "MAL.MAL");
    assert_eq!(recursive_relation_name(&preloads[0]), "MAL");
}

/// Only the leaf of a nested recursive relation is used in the name.
#[test]
fn test_nested_recursive_relation_uses_leaf() {
    let preloads = vec![
        PreloadOption::new("Project"),
        recursive("Project.Task", Some("rid_parent"), None),
    ];
    let steps = PreloadExpander::new(&preloads).expand();
    assert_eq!(steps[2].path, "Project.Task.TASK_RID_PARENT");
}

// =============================================================================
// DEPTH BOUND
// =============================================================================

/// Expansion from depth 7 adds one level; from depth 8 none.
#[test]
fn test_depth_bound() {
    let original = recursive("MAL", Some("rid_parent"), None);
    let preloads = vec![original.clone()];
    let expander = PreloadExpander::new(&preloads);

    let from_seven = expander.expand_recursive(&original, "MAL", 7);
    assert_eq!(from_seven.len(), 1);
    assert_eq!(from_seven[0].depth, 8);

    assert!(expander.expand_recursive(&original, "MAL", 8).is_empty());
}

/// A full expansion stops after eight levels.
#[test]
fn test_full_expansion_has_eight_levels() {
    let preloads = vec![recursive("MAL", Some("rid_parent"), None)];
    let steps = PreloadExpander::new(&preloads).expand();

    assert_eq!(steps.len(), 1 + MAX_RECURSION_DEPTH);
    let deepest = steps.last().unwrap();
    assert_eq!(deepest.depth, MAX_RECURSION_DEPTH);
    assert_eq!(deepest.path.split('.').count(), 1 + MAX_RECURSION_DEPTH);
}

// =============================================================================
// SCOPE ISOLATION AND CHILD RE-ROOTING
// =============================================================================

/// The root where clause does not reach synthesized levels.
#[test]
fn test_where_not_reapplied_to_synthesized_levels() {
    let preloads = vec![recursive("MAL", Some("rid_parent"), Some("status = 'active'"))];
    let steps = PreloadExpander::new(&preloads).expand();

    assert_eq!(steps[0].scope.where_clause.as_deref(), Some("status = 'active'"));
    for step in &steps[1..] {
        assert!(step.scope.where_clause.is_none(), "{} kept where", step.path);
    }
}

/// Other scope fields are inherited by synthesized levels.
#[test]
fn test_synthesized_levels_inherit_columns() {
    let mut root = recursive("MAL", Some("rid_parent"), Some("x = 1"));
    root.columns = vec!["id".into(), "name".into()];
    root.limit = Some(50);
    let preloads = vec![root];
    let steps = PreloadExpander::new(&preloads).expand();

    assert!(steps.iter().all(|s| s.scope.columns == vec!["id", "name"]));
    assert!(steps.iter().all(|s| s.scope.limit == Some(50)));
}

/// A sibling child appears under every synthesized level.
#[test]
fn test_child_rerooted_under_every_level() {
    let preloads = vec![
        recursive("MAL", Some("rid_parent"), None),
        PreloadOption::new("MAL.DEF"),
    ];
    let steps = paths(&PreloadExpander::new(&preloads).expand());

    assert!(steps.contains(&"MAL.DEF".to_string()));
    let mut level = "MAL".to_string();
    for _ in 0..MAX_RECURSION_DEPTH {
        level.push_str(".MAL_RID_PARENT");
        assert!(steps.contains(&level), "missing {}", level);
        assert!(steps.contains(&format!("{}.DEF", level)), "missing {}.DEF", level);
    }
}

/// Grandchildren are re-rooted with their full suffix.
#[test]
fn test_grandchildren_rerooted() {
    let preloads = vec![
        recursive("MAL", Some("rid_parent"), None),
        PreloadOption::new("MAL.DEF"),
        PreloadOption::new("MAL.DEF.GHI"),
    ];
    let steps = paths(&PreloadExpander::new(&preloads).expand());
    assert!(steps.contains(&"MAL.MAL_RID_PARENT.DEF.GHI".to_string()));
}

/// Each path is applied once.
#[test]
fn test_paths_are_unique() {
    let preloads = vec![
        recursive("MAL", Some("rid_parent"), None),
        PreloadOption::new("MAL.DEF"),
        PreloadOption::new("MAL.DEF"),
    ];
    let steps = paths(&PreloadExpander::new(&preloads).expand());
    let mut deduped = steps.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), steps.len());
}

// =============================================================================
// THROUGH THE ENGINE
// =============================================================================

/// A recursive child table from the structured block reaches the builder.
#[test]
fn test_structured_recursive_tree_reaches_builder() {
    let engine = Engine::new(EngineConfig::default());
    let block = json!({
        "childtables": [{
            "tablename": "MAL",
            "recursive": true,
            "recursivechildkey": "rid_parentmastertaskitem",
            "sql_and": ["archived = false"],
            "childtables": [{"tablename": "DEF"}]
        }]
    })
    .to_string();

    let res = engine
        .resolve::<&str, &str>("mastertask", &[("x-files", block.as_str())], &[])
        .unwrap();

    let mut builder = SqlRecorder::new("mastertask");
    res.plan.apply(&mut builder);
    let loaded: Vec<&str> = builder.preloads().iter().map(|(p, _)| p.as_str()).collect();

    assert_eq!(loaded[0], "MAL");
    assert_eq!(loaded[1], "MAL.DEF");
    assert_eq!(loaded[2], "MAL.MAL_RID_PARENTMASTERTASKITEM");
    assert_eq!(loaded[3], "MAL.MAL_RID_PARENTMASTERTASKITEM.DEF");
    assert_eq!(loaded.len(), 2 + 2 * MAX_RECURSION_DEPTH);
    assert_eq!(builder.count().unwrap(), 0);
}
