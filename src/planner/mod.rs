//! # Query Planning
//!
//! Turns [`RequestOptions`] into a [`QueryPlan`]:
//!
//! - filters grouped into AND-ed clauses with OR groups
//! - keyset pagination through an `EXISTS` predicate on the anchor row
//! - preloads flattened, recursive ones unrolled to a bounded depth
//! - optional row-number lookup for a single record
//!
//! Planning is pure: the same options and models always give the same plan.
//!
//! [`RequestOptions`]: crate::options::RequestOptions

mod builder;
mod cursor;
mod errors;
mod filters;
mod plan;
mod preload;
mod rownumber;

pub use builder::{QueryBuilder, SqlRecorder};
pub use cursor::{clean_sort_field, CursorPaginator, CURSOR_ALIAS};
pub use errors::{PlanError, PlanErrorCode, PlanResult};
pub use filters::{build_condition, group_filters, render_predicate, Condition};
pub use plan::{QueryPlan, QueryPlanner};
pub use preload::{
    recursive_relation_name, PreloadExpander, PreloadStep, RelationScope, MAX_RECURSION_DEPTH,
};
pub use rownumber::{row_number_query, ROW_NUMBER_ALIAS};
