//! Observable events
//!
//! Every log line emitted by the engine names one of these events.

use std::fmt;

/// Observable engine events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded
    ConfigLoaded,
    /// Model descriptors registered
    ModelsRegistered,

    // Parsing
    /// A parameter fragment could not be used and was skipped
    FragmentSkipped,
    /// Structured configuration block was not valid JSON
    StructuredBlockInvalid,
    /// Unknown search operator, treated as equality
    OperatorFallback,
    /// Relation segment kept as given
    RelationUnresolved,
    /// Default primary key sort injected
    DefaultSortInjected,

    // Planning
    /// Plan assembled
    PlanBuilt,
    /// Plan rejected (cursor or sort missing)
    PlanRejected,
    /// Recursive preload stopped at the depth bound
    RecursionBounded,

    // Cache
    /// Cache key fell back to string concatenation
    CacheKeyFallback,
    /// Cache entries invalidated by tag
    CacheInvalidated,
}

impl Event {
    /// Returns the event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ModelsRegistered => "MODELS_REGISTERED",
            Event::FragmentSkipped => "PARSE_FRAGMENT_SKIPPED",
            Event::StructuredBlockInvalid => "PARSE_STRUCTURED_BLOCK_INVALID",
            Event::OperatorFallback => "PARSE_OPERATOR_FALLBACK",
            Event::RelationUnresolved => "PARSE_RELATION_UNRESOLVED",
            Event::DefaultSortInjected => "PARSE_DEFAULT_SORT",
            Event::PlanBuilt => "PLAN_BUILT",
            Event::PlanRejected => "PLAN_REJECTED",
            Event::RecursionBounded => "PRELOAD_RECURSION_BOUNDED",
            Event::CacheKeyFallback => "CACHE_KEY_FALLBACK",
            Event::CacheInvalidated => "CACHE_INVALIDATED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
