//! Query builder utilities
//!
//! This module provides SQL query construction utilities.

pub mod builder;
pub mod evaluate;
pub mod filter;
pub mod ordering;
pub mod sql_generation;
pub mod update;

#[cfg(test)]
mod tests;

pub use builder::QueryBuilder;
pub use filter::{QueryFilter, QueryOperator};
pub use ordering::SortOrder;
pub use sql_generation::QueryParam;
pub use update::UpdateSet;
