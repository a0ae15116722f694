//! resolveplan - provider-agnostic query resolution and pagination planning
//!
//! Request parameters (headers, query string, an optional structured JSON
//! block) are parsed into canonical [`options::RequestOptions`], which the
//! planner turns into a [`planner::QueryPlan`]: grouped filters, a keyset
//! cursor predicate, bounded recursive preloads and a deterministic cache key.

pub mod cache;
pub mod cli;
pub mod engine;
pub mod observability;
pub mod options;
pub mod parser;
pub mod planner;
pub mod schema;
