//! Mapping between Rust field types and PostgreSQL column types
//!
//! Used by `table-derive` at expansion time to describe model columns.

pub mod sql;

pub use sql::{is_optional_type, normalize_type, rust_type_to_pg_type};
