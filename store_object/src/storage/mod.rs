//! Storage seam
//!
//! The generic store speaks to storage only through these traits. Rows travel as JSON
//! objects keyed by column name, which keeps the backends independent of model types.

pub mod memory;
pub mod postgres;

use crate::errors::StoreError;
use crate::query_builder::{QueryBuilder, UpdateSet};
use crate::schema::TableSchema;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Debug;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

/// One table row, column name to value
pub type Row = Map<String, Value>;

/// Statement execution against one table
#[async_trait]
pub trait Executor: Send {
    /// Insert a row and return it as stored (defaults applied)
    async fn insert(&mut self, schema: &TableSchema, row: Row) -> Result<Row, StoreError>;

    async fn select(
        &mut self,
        schema: &TableSchema,
        query: &QueryBuilder,
    ) -> Result<Vec<Row>, StoreError>;

    async fn count(&mut self, schema: &TableSchema, query: &QueryBuilder)
        -> Result<i64, StoreError>;

    /// Apply `update` to every row matching `query`, returning the affected count
    async fn update(
        &mut self,
        schema: &TableSchema,
        update: &UpdateSet,
        query: &QueryBuilder,
    ) -> Result<u64, StoreError>;

    /// Physically delete matching rows. Foreign key actions of dependents apply.
    async fn delete(&mut self, schema: &TableSchema, query: &QueryBuilder)
        -> Result<u64, StoreError>;
}

/// An open storage transaction. Dropping it without commit rolls back.
#[async_trait]
pub trait Transaction: Executor {
    fn as_executor(&mut self) -> &mut dyn Executor;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait Storage: Send + Sync + Debug {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;

    /// Executor where every statement commits on its own
    async fn executor(&self) -> Result<Box<dyn Executor>, StoreError>;

    /// Create the table and its indexes, dropping it first when `recreate` is set
    async fn migrate(&self, schema: &TableSchema, recreate: bool) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
