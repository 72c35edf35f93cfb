//! Filtered collections of records
//!
//! A [`Collection`] is a lazily evaluated query over one table. Nothing touches storage
//! until a read or bulk operation is awaited. Visibility predicates combine with AND,
//! so `store.alive().dead()` is always empty.

use crate::clock::Clock;
use crate::errors::StoreError;
use crate::lifecycle::{DELETED_AT, UPDATED_AT};
use crate::query_builder::{QueryBuilder, QueryFilter, SortOrder, UpdateSet};
use crate::schema::TableSchema;
use crate::storage::{Executor, Storage};
use crate::traits::TableMetadata;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

pub struct Collection<T: TableMetadata> {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    schema: Arc<TableSchema>,
    query: QueryBuilder,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: TableMetadata> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            clock: Arc::clone(&self.clock),
            schema: Arc::clone(&self.schema),
            query: self.query.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: TableMetadata> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("table", &self.schema.name)
            .field("query", &self.query)
            .finish()
    }
}

/// Set the deletion stamp and refresh `__updated_at__` on every matching row
pub(crate) async fn mark_deleted_where(
    exec: &mut dyn Executor,
    schema: &TableSchema,
    query: &QueryBuilder,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let stamp = serde_json::to_value(now)?;
    let update = UpdateSet::new()
        .set(DELETED_AT, stamp.clone())
        .set(UPDATED_AT, stamp);
    exec.update(schema, &update, query).await
}

impl<T: TableMetadata> Collection<T> {
    pub(crate) fn new(
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        schema: Arc<TableSchema>,
    ) -> Self {
        Self {
            storage,
            clock,
            schema,
            query: QueryBuilder::new(),
            _phantom: PhantomData,
        }
    }

    /// Narrow to records whose `__deleted_at__` is null
    pub fn alive(self) -> Self {
        self.filter(QueryFilter::is_null(DELETED_AT))
    }

    /// Narrow to records whose `__deleted_at__` is set
    pub fn dead(self) -> Self {
        self.filter(QueryFilter::is_not_null(DELETED_AT))
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.query = self.query.filter(filter);
        self
    }

    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.query = self.query.order_by(field, order);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    pub fn query(&self) -> &QueryBuilder {
        &self.query
    }

    pub async fn fetch(&self) -> Result<Vec<T>, StoreError> {
        let mut exec = self.storage.executor().await?;
        self.fetch_in(exec.as_mut()).await
    }

    pub async fn fetch_in(&self, exec: &mut dyn Executor) -> Result<Vec<T>, StoreError> {
        exec.select(&self.schema, &self.query)
            .await?
            .into_iter()
            .map(T::from_row)
            .collect()
    }

    pub async fn first(&self) -> Result<Option<T>, StoreError> {
        let first = self.clone().limit(1);
        Ok(first.fetch().await?.into_iter().next())
    }

    /// Record with the given primary key, if it is in this collection
    pub async fn get(&self, id: &T::Id) -> Result<Option<T>, StoreError> {
        let by_id = self
            .clone()
            .filter(QueryFilter::eq(T::primary_key_field(), T::id_value(id)?));
        by_id.first().await
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let mut exec = self.storage.executor().await?;
        self.count_in(exec.as_mut()).await
    }

    pub async fn count_in(&self, exec: &mut dyn Executor) -> Result<i64, StoreError> {
        exec.count(&self.schema, &self.query.conditions_only()).await
    }

    pub async fn exists(&self) -> Result<bool, StoreError> {
        Ok(self.count().await? > 0)
    }

    /// Soft delete every matched record in one statement. Does not cascade.
    ///
    /// Ordering, limit and offset are ignored by bulk operations.
    pub async fn mark_deleted(&self) -> Result<u64, StoreError> {
        let mut exec = self.storage.executor().await?;
        self.mark_deleted_in(exec.as_mut()).await
    }

    pub async fn mark_deleted_in(&self, exec: &mut dyn Executor) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let count =
            mark_deleted_where(exec, &self.schema, &self.query.conditions_only(), now).await?;
        debug!("[MARK_DELETED] '{}' rows={}", self.schema.name, count);
        Ok(count)
    }

    /// Clear the deletion stamp on every matched record
    pub async fn mark_undeleted(&self) -> Result<u64, StoreError> {
        let mut exec = self.storage.executor().await?;
        self.mark_undeleted_in(exec.as_mut()).await
    }

    pub async fn mark_undeleted_in(&self, exec: &mut dyn Executor) -> Result<u64, StoreError> {
        let now = serde_json::to_value(self.clock.now())?;
        let update = UpdateSet::new()
            .set(DELETED_AT, Value::Null)
            .set(UPDATED_AT, now);
        let count = exec
            .update(&self.schema, &update, &self.query.conditions_only())
            .await?;
        debug!("[MARK_UNDELETED] '{}' rows={}", self.schema.name, count);
        Ok(count)
    }

    /// Physically delete every matched record, bypassing soft deletion
    pub async fn hard_delete(&self) -> Result<u64, StoreError> {
        let mut exec = self.storage.executor().await?;
        self.hard_delete_in(exec.as_mut()).await
    }

    pub async fn hard_delete_in(&self, exec: &mut dyn Executor) -> Result<u64, StoreError> {
        let count = exec
            .delete(&self.schema, &self.query.conditions_only())
            .await?;
        debug!("[HARD_DELETE] '{}' rows={}", self.schema.name, count);
        Ok(count)
    }
}
