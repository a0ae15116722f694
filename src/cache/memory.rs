//! In-memory total count cache

use std::collections::HashMap;
use std::sync::RwLock;

use crate::observability::{log_event, Event, Severity};

/// Storage for cached total counts
pub trait TotalCountCache: Send + Sync {
    fn get(&self, key: &str) -> Option<u64>;
    fn put(&self, key: &str, total: u64, tags: &[String]);
    /// Removes every entry carrying `tag`; returns how many were removed
    fn invalidate_tag(&self, tag: &str) -> usize;
}

#[derive(Debug, Clone)]
struct CachedTotal {
    total: u64,
    tags: Vec<String>,
}

/// Process-local cache. A poisoned lock reads as a miss and drops writes.
#[derive(Debug, Default)]
pub struct MemoryTotalCache {
    entries: RwLock<HashMap<String, CachedTotal>>,
}

impl MemoryTotalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TotalCountCache for MemoryTotalCache {
    fn get(&self, key: &str) -> Option<u64> {
        let entries = self.entries.read().ok()?;
        entries.get(key).map(|e| e.total)
    }

    fn put(&self, key: &str, total: u64, tags: &[String]) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key.to_string(),
                CachedTotal {
                    total,
                    tags: tags.to_vec(),
                },
            );
        }
    }

    fn invalidate_tag(&self, tag: &str) -> usize {
        let removed = match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, e| !e.tags.iter().any(|t| t == tag));
                before - entries.len()
            }
            Err(_) => 0,
        };

        let count = removed.to_string();
        log_event(
            Severity::Info,
            Event::CacheInvalidated,
            &[("tag", tag), ("removed", count.as_str())],
        );
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(t: &[&str]) -> Vec<String> {
        t.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_put_get() {
        let cache = MemoryTotalCache::new();
        assert_eq!(cache.get("k"), None);
        cache.put("k", 42, &tags(&["table:posts"]));
        assert_eq!(cache.get("k"), Some(42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_by_tag() {
        let cache = MemoryTotalCache::new();
        cache.put("a", 1, &tags(&["schema:blog", "table:posts"]));
        cache.put("b", 2, &tags(&["schema:blog", "table:comments"]));
        cache.put("c", 3, &tags(&["table:users"]));

        assert_eq!(cache.invalidate_tag("table:posts"), 1);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));

        assert_eq!(cache.invalidate_tag("schema:blog"), 1);
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.invalidate_tag("schema:none"), 0);
    }
}
