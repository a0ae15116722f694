//! # Canonical Option Model
//!
//! Plain data shared by the parser, the planners and the cache key builder.
//! No behavior beyond small accessors.

mod filter;
mod preload;
mod request;
mod sort;

pub use filter::{FilterOperator, FilterOption, LogicOperator};
pub use preload::{ExpandOption, PreloadOption};
pub use request::{CursorDirection, RequestOptions, ResponseFormat};
pub use sort::{SortDirection, SortOption};
