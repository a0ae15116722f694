//! Plan Cache Key Tests

use serde_json::json;

use resolveplan::cache::{build_cache_key, cache_tags, MemoryTotalCache, TotalCountCache};
use resolveplan::engine::{Engine, EngineConfig};
use resolveplan::options::{FilterOption, RequestOptions, SortOption};
use resolveplan::planner::SqlRecorder;

fn options() -> RequestOptions {
    RequestOptions {
        filters: vec![
            FilterOption::eq("status", json!("open")),
            FilterOption::eq("kind", json!({"b": 1, "a": 2})).or(),
        ],
        sort: vec![SortOption::asc("id")],
        ..RequestOptions::default()
    }
}

// =============================================================================
// KEY STABILITY
// =============================================================================

/// Equal inputs, equal keys, across independently built options.
#[test]
fn test_key_is_stable() {
    let key = build_cache_key("posts", &options());
    assert_eq!(key, build_cache_key("posts", &options()));
    assert_eq!(key.len(), 64);
}

/// Filter order is part of the key: it changes grouping.
#[test]
fn test_filter_order_changes_key() {
    let mut swapped = options();
    swapped.filters.reverse();
    assert_ne!(build_cache_key("posts", &options()), build_cache_key("posts", &swapped));
}

/// Fields outside the key material leave it unchanged.
#[test]
fn test_non_key_fields_ignored() {
    let mut other = options();
    other.limit = Some(100);
    other.offset = Some(300);
    other.columns = vec!["id".into()];
    other.skip_count = true;
    assert_eq!(build_cache_key("posts", &options()), build_cache_key("posts", &other));
}

/// Every part of the key material matters.
#[test]
fn test_key_material_fields_change_key() {
    let base = build_cache_key("posts", &options());
    let variants: Vec<Box<dyn Fn(&mut RequestOptions)>> = vec![
        Box::new(|o| o.sort.push(SortOption::desc("created_at"))),
        Box::new(|o| o.custom_where.push("a = 1".into())),
        Box::new(|o| o.custom_or.push("b = 2".into())),
        Box::new(|o| o.custom_joins.push("JOIN x ON x.id = posts.x_id".into())),
        Box::new(|o| o.distinct = true),
        Box::new(|o| o.cursor_backward = Some("3".into())),
    ];
    for change in variants {
        let mut opts = options();
        change(&mut opts);
        assert_ne!(base, build_cache_key("posts", &opts));
    }
}

// =============================================================================
// TAGS AND INVALIDATION
// =============================================================================

/// Tags are lower-cased schema and table names.
#[test]
fn test_tags() {
    assert_eq!(cache_tags(None, "Sales.Orders"), vec!["schema:sales", "table:orders"]);
    assert_eq!(cache_tags(Some("Public"), "Users"), vec!["schema:public", "table:users"]);
}

/// Invalidating a table tag drops its totals and keeps the rest.
#[test]
fn test_invalidate_table() {
    let engine = Engine::new(EngineConfig {
        default_schema: Some("public".into()),
        ..EngineConfig::default()
    });
    let cache = MemoryTotalCache::new();

    let posts = engine.resolve::<&str, &str>("posts", &[], &[]).unwrap();
    let users = engine.resolve::<&str, &str>("users", &[], &[]).unwrap();
    cache.put(&posts.cache_key, 10, &posts.cache_tags);
    cache.put(&users.cache_key, 20, &users.cache_tags);

    assert_eq!(cache.invalidate_tag("table:posts"), 1);
    assert_eq!(cache.get(&posts.cache_key), None);
    assert_eq!(cache.get(&users.cache_key), Some(20));

    assert_eq!(cache.invalidate_tag("schema:public"), 1);
    assert!(cache.is_empty());
}

/// A counted total is stored and served on the next call.
#[test]
fn test_total_is_memoized() {
    let engine = Engine::new(EngineConfig::default());
    let cache = MemoryTotalCache::new();
    let res = engine
        .resolve::<&str, &str>("posts", &[], &[("x-fieldfilter-status", "open")])
        .unwrap();

    let mut builder = SqlRecorder::new("posts");
    assert_eq!(engine.total(&res, &cache, &mut builder).unwrap(), Some(0));
    assert_eq!(cache.get(&res.cache_key), Some(0));

    cache.put(&res.cache_key, 12, &res.cache_tags);
    assert_eq!(engine.total(&res, &cache, &mut builder).unwrap(), Some(12));
}
