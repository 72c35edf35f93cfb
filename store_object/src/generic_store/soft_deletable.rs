//! Deletion engine
//!
//! Soft delete marks one record dead and follows every registered cascade edge exactly
//! one level with a single bulk update per edge. The bulk path never recurses.

use super::collection::{mark_deleted_where, Collection};
use super::core::GenericStore;
use crate::errors::StoreError;
use crate::lifecycle::{DELETED_AT, UPDATED_AT};
use crate::query_builder::{QueryBuilder, QueryFilter};
use crate::storage::Executor;
use crate::traits::{SoftDeletable, SoftDeleteStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config::CascadeScope;
use serde_json::Value;
use tracing::{debug, trace, warn};

impl<T: SoftDeletable> GenericStore<T> {
    /// Persist the dead record and mark its direct dependents
    async fn soft_delete_steps(
        &self,
        exec: &mut dyn Executor,
        record: &mut T,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        record.mark_deleted(now);
        record.lifecycle_mut().touch_updated(now);

        let row = record.to_row()?;
        let stamp = serde_json::to_value(now)?;
        let update = self
            .update_fields_set(&row)
            .set(UPDATED_AT, stamp.clone())
            .set(DELETED_AT, stamp);

        let affected = exec
            .update(&self.schema, &update, &self.id_query(record)?)
            .await?;
        if affected == 0 {
            return Err(StoreError::not_found(T::table_name(), record.extract_id()));
        }
        debug!("[SOFT_DELETE] '{}' {:?}", T::table_name(), record.extract_id());

        for edge in self.registry.edges_for(T::table_name()) {
            let key = row.get(&edge.references_column).cloned().unwrap_or(Value::Null);
            if key.is_null() {
                trace!(
                    "[CASCADE] skipping {}.{}: referenced value is null",
                    edge.dependent.name,
                    edge.column
                );
                continue;
            }

            let mut query = QueryBuilder::new().filter(QueryFilter::eq(&edge.column, key));
            if self.cascade_scope == CascadeScope::Alive {
                query = query.filter(QueryFilter::is_null(DELETED_AT));
            }

            let count = mark_deleted_where(exec, &edge.dependent, &query, now).await?;
            debug!(
                "[CASCADE] {} -> {}.{}: {} rows marked",
                T::table_name(),
                edge.dependent.name,
                edge.column,
                count
            );
        }

        Ok(())
    }
}

#[async_trait]
impl<T: SoftDeletable> SoftDeleteStore for GenericStore<T> {
    fn alive(&self) -> Collection<T> {
        self.all().alive()
    }

    fn dead(&self) -> Collection<T> {
        self.all().dead()
    }

    fn all(&self) -> Collection<T> {
        Collection::new(
            self.storage.clone(),
            self.clock.clone(),
            self.schema.clone(),
        )
    }

    async fn soft_delete(&self, record: &mut T) -> Result<(), StoreError> {
        let previous = record.lifecycle().clone();
        let mut tx = self.storage.begin().await?;

        let result = self.soft_delete_in(tx.as_executor(), record).await;
        if let Err(err) = result {
            warn!(
                "[SOFT_DELETE] rolling back '{}' {:?}: {}",
                T::table_name(),
                record.extract_id(),
                err
            );
            if let Err(rollback_err) = tx.rollback().await {
                warn!("[SOFT_DELETE] rollback failed: {}", rollback_err);
            }
            return Err(err);
        }

        if let Err(err) = tx.commit().await {
            *record.lifecycle_mut() = previous;
            return Err(err);
        }
        Ok(())
    }

    async fn soft_delete_in(&self, exec: &mut dyn Executor, record: &mut T) -> Result<(), StoreError> {
        let previous = record.lifecycle().clone();
        let now = self.clock.now();

        let result = self.soft_delete_steps(exec, record, now).await;
        if result.is_err() {
            *record.lifecycle_mut() = previous;
        }
        result
    }

    async fn hard_delete(&self, record: &T) -> Result<bool, StoreError> {
        let mut exec = self.storage.executor().await?;
        let removed = exec.delete(&self.schema, &self.id_query(record)?).await?;

        debug!(
            "[HARD_DELETE] '{}' {:?} removed={}",
            T::table_name(),
            record.extract_id(),
            removed
        );
        Ok(removed > 0)
    }
}
