//! # Parameter Parser
//!
//! Merges transport metadata and query-string parameters, decodes wrapped
//! values, dispatches key families by prefix, and merges the structured
//! configuration block, producing one [`RequestOptions`].
//!
//! [`RequestOptions`]: crate::options::RequestOptions

mod decode;
mod params;
mod search;
mod sources;
mod split;
mod structured;

pub use decode::{decode_value, ENCODING_MARKERS};
pub use params::{classify_key, parse_expands, parse_preloads, KeyFamily, ParameterParser, KEY_FAMILIES};
pub use search::{list_value, parse_filter_value, resolve_search_op};
pub use sources::{lookup, merge_sources, Param};
pub use split::{parse_sort_list, parse_sort_term, positional_args, split_list, split_top_level};
pub use structured::{Count, StructuredBlock, StructuredFilter};

pub(crate) use structured::join_conditions;
