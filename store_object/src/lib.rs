//! Store Object - Core database abstraction layer for SoftHaus
//!
//! This crate provides the foundational types and traits for soft-deletable records:
//! lifecycle stamps, table schemas, the cascade registry, storage backends, generic
//! stores with filtered collections, query builders and validation utilities.

pub mod clock;
pub mod errors;
pub mod generic_store;
pub mod lifecycle;
pub mod prelude;
pub mod query_builder;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod traits;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CascadeScope;
pub use errors::StoreError;
pub use generic_store::{Collection, GenericStore, StoreTransaction};
pub use lifecycle::{Lifecycle, CREATED_AT, DELETED_AT, UPDATED_AT};
pub use query_builder::{QueryBuilder, QueryFilter, QueryOperator, SortOrder, UpdateSet};
pub use registry::{CascadeEdge, CascadeRegistry};
pub use schema::{ColumnDef, ForeignKey, OnDelete, TableSchema};
pub use storage::{Executor, MemoryStorage, PgStorage, Row, Storage, Transaction};
pub use traits::*;
pub use validation::{ValidatedIdentifier, ValidationError};
