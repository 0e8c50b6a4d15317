//! Targetprocess Query Compiler
//!
//! Turns semantic query options (where, include, take, orderBy, format) into
//! a wire-ready query string. Follows the same pattern as the rest of the
//! API layer: a fluent [`QueryBuilder`] accumulates options and compiles
//! them into an immutable [`Query`].

pub mod builder;
pub mod filters;
pub mod orderby;
pub mod query;
pub mod result;

pub use builder::QueryBuilder;
pub use filters::{Filter, FilterValue, Operator, compile_where, format_field, split_conditions};
pub use orderby::OrderBy;
pub use query::Query;
pub use result::QueryResponse;
