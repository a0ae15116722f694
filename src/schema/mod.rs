//! Model descriptions
//!
//! Explicit, statically declared descriptions of the entities queries are
//! planned for. Used to pick primary keys for the default sort, to validate
//! cursor columns, and to rewrite table-shaped relation names into logical
//! relation fields.

mod model;
mod registry;

pub use model::{
    bare_table_name, normalize_name, DescribeModel, ModelDescriptor, RelationDescriptor,
    RelationKind,
};
pub use registry::ModelRegistry;
