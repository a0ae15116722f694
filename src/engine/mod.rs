//! # Engine
//!
//! The one object a process builds at startup: configuration plus the model
//! registry. Everything else is derived per request and discarded.
//!
//! ```ignore
//! let engine = Engine::new(EngineConfig::default());
//! let resolution = engine.resolve("posts", &headers, &query)?;
//! resolution.plan.apply(&mut builder);
//! ```

mod config;
mod errors;

use std::path::Path;

use serde::Serialize;

use crate::cache::{build_cache_key, cache_tags, TotalCountCache};
use crate::observability::{log_event, Event, Severity};
use crate::options::RequestOptions;
use crate::parser::ParameterParser;
use crate::planner::{PlanResult, QueryBuilder, QueryPlan, QueryPlanner};
use crate::schema::{DescribeModel, ModelRegistry};

pub use config::EngineConfig;
pub use errors::{ConfigError, ConfigResult};

/// Everything derived from one request
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub options: RequestOptions,
    pub plan: QueryPlan,
    pub cache_key: String,
    pub cache_tags: Vec<String>,
}

/// Resolution engine context
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    registry: ModelRegistry,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let registry = ModelRegistry::from_descriptors(config.models.iter().cloned());
        let count = registry.len().to_string();
        log_event(Severity::Info, Event::ModelsRegistered, &[("models", count.as_str())]);
        Self { config, registry }
    }

    /// Builds an engine from a configuration file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        Ok(Self::new(EngineConfig::load(path)?))
    }

    /// Registers a statically described model in addition to the configured ones
    pub fn with_model<M: DescribeModel>(mut self) -> Self {
        self.registry.register_model::<M>();
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn parser(&self, table: &str) -> ParameterParser<'_> {
        ParameterParser::new(&self.registry, &self.config.default_primary_key).for_table(table)
    }

    pub fn planner(&self) -> QueryPlanner<'_> {
        QueryPlanner::new(&self.registry, &self.config.default_primary_key)
    }

    /// Parses request parameters for `table`; the query string wins over
    /// headers on key collision.
    pub fn parse<K, V>(&self, table: &str, headers: &[(K, V)], query: &[(K, V)]) -> RequestOptions
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.parser(table).parse_sources(headers, query)
    }

    /// Parses and plans one request
    pub fn resolve<K, V>(
        &self,
        table: &str,
        headers: &[(K, V)],
        query: &[(K, V)],
    ) -> PlanResult<Resolution>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let options = self.parse(table, headers, query);
        self.resolve_options(options)
    }

    /// Plans already parsed options
    pub fn resolve_options(&self, options: RequestOptions) -> PlanResult<Resolution> {
        let plan = self.planner().plan(&options)?;
        let cache_key = build_cache_key(&plan.table, &options);
        let cache_tags = cache_tags(self.config.default_schema.as_deref(), &plan.table);
        Ok(Resolution {
            options,
            plan,
            cache_key,
            cache_tags,
        })
    }

    /// Total row count for a resolution. Served from `cache` unless the
    /// request skips caching; a fresh count is stored back. `None` when the
    /// request skips counting.
    pub fn total<B: QueryBuilder>(
        &self,
        resolution: &Resolution,
        cache: &dyn TotalCountCache,
        builder: &mut B,
    ) -> Result<Option<u64>, B::Error> {
        if resolution.plan.skip_count {
            return Ok(None);
        }
        let use_cache = !resolution.options.skip_cache;
        if use_cache {
            if let Some(total) = cache.get(&resolution.cache_key) {
                return Ok(Some(total));
            }
        }

        let total = resolution.plan.total(builder)?;
        if let (true, Some(total)) = (use_cache, total) {
            cache.put(&resolution.cache_key, total, &resolution.cache_tags);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTotalCache;
    use crate::planner::SqlRecorder;
    use crate::schema::ModelDescriptor;

    struct Task;

    impl DescribeModel for Task {
        fn describe() -> ModelDescriptor {
            ModelDescriptor::new("tasks").with_primary_key("rid_task")
        }
    }

    #[test]
    fn test_resolve_injects_model_primary_key() {
        let engine = Engine::new(EngineConfig::default()).with_model::<Task>();
        let res = engine
            .resolve::<&str, &str>("tasks", &[], &[("x-limit", "5")])
            .unwrap();

        assert_eq!(res.plan.order, vec!["rid_task ASC"]);
        assert_eq!(res.plan.limit, Some(5));
        assert_eq!(res.cache_tags, vec!["table:tasks"]);
        assert_eq!(res.cache_key.len(), 64);
    }

    #[test]
    fn test_total_uses_cache() {
        let engine = Engine::new(EngineConfig::default());
        let cache = MemoryTotalCache::new();
        let res = engine.resolve::<&str, &str>("posts", &[], &[]).unwrap();

        cache.put(&res.cache_key, 77, &res.cache_tags);
        let mut builder = SqlRecorder::new("posts");
        assert_eq!(engine.total(&res, &cache, &mut builder).unwrap(), Some(77));
    }

    #[test]
    fn test_total_skips_count_and_cache() {
        let engine = Engine::new(EngineConfig::default());
        let cache = MemoryTotalCache::new();

        let res = engine
            .resolve::<&str, &str>("posts", &[], &[("x-skipcount", "true")])
            .unwrap();
        let mut builder = SqlRecorder::new("posts");
        assert_eq!(engine.total(&res, &cache, &mut builder).unwrap(), None);

        let res = engine
            .resolve::<&str, &str>("posts", &[], &[("x-skipcache", "true")])
            .unwrap();
        cache.put(&res.cache_key, 9, &res.cache_tags);
        assert_eq!(engine.total(&res, &cache, &mut builder).unwrap(), Some(0));
    }
}
