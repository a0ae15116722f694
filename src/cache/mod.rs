//! # Plan Cache
//!
//! Deterministic keys for cached total counts, invalidation tags, and a
//! small in-memory store. Key building never fails.

mod key;
mod memory;

pub use key::{build_cache_key, cache_tags};
pub use memory::{MemoryTotalCache, TotalCountCache};
