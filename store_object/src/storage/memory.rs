//! In-process storage engine
//!
//! Tables are vectors of JSON rows behind one async mutex. A transaction owns the lock
//! for its whole life and restores a snapshot on rollback or drop, so concurrent callers
//! simply wait. Enforces primary key, NOT NULL, UNIQUE and foreign key constraints and
//! applies `ON DELETE` actions on physical deletes.
//!
//! Using the autocommit executor while a transaction is open in the same task deadlocks.

use super::{Executor, Row, Storage, Transaction};
use crate::errors::StoreError;
use crate::lifecycle::{CREATED_AT, UPDATED_AT};
use crate::query_builder::evaluate::{compare_values, sort_rows};
use crate::query_builder::{QueryBuilder, QueryFilter, UpdateSet};
use crate::schema::{OnDelete, TableSchema};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace};
use uuid::Uuid;

type Tables = HashMap<String, Vec<Row>>;

#[derive(Debug, Default)]
struct MemoryState {
    schemas: HashMap<String, TableSchema>,
    tables: Tables,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physical rows in a table, dead or alive
    pub async fn row_count(&self, table: &str) -> usize {
        let state = self.state.lock().await;
        state.tables.get(table).map(Vec::len).unwrap_or(0)
    }
}

fn same_value(left: &Value, right: &Value) -> bool {
    compare_values(left, right) == Some(Ordering::Equal)
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

impl MemoryState {
    fn schema(&self, table: &str) -> Result<&TableSchema, StoreError> {
        self.schemas
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn rows(&self, table: &str) -> Result<&Vec<Row>, StoreError> {
        self.tables
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn rows_mut(&mut self, table: &str) -> Result<&mut Vec<Row>, StoreError> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    /// Run `op` so that a failure leaves every table as it was
    fn atomically<R>(
        &mut self,
        op: impl FnOnce(&mut MemoryState) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let before = self.tables.clone();
        let result = op(self);
        if result.is_err() {
            self.tables = before;
        }
        result
    }

    fn migrate(&mut self, schema: &TableSchema, recreate: bool) -> Result<(), StoreError> {
        for fk in &schema.foreign_keys {
            if fk.references != schema.name && !self.schemas.contains_key(&fk.references) {
                return Err(StoreError::UnknownTable(fk.references.clone()));
            }
        }

        if recreate {
            self.tables.remove(&schema.name);
        }
        self.schemas.insert(schema.name.clone(), schema.clone());
        self.tables.entry(schema.name.clone()).or_default();
        debug!("[MIGRATE] memory table '{}' ready", schema.name);
        Ok(())
    }

    fn insert(&mut self, table: &str, mut row: Row) -> Result<Row, StoreError> {
        let schema = self.schema(table)?.clone();

        if let Some(column) = row.keys().find(|k| !schema.has_column(k)) {
            return Err(StoreError::validation(table, column, "unknown column"));
        }

        for column in &schema.columns {
            let value = row.entry(column.name.clone()).or_insert(Value::Null);
            if !value.is_null() {
                continue;
            }
            if column.name == schema.primary_key && column.sql_type == "UUID" {
                *value = Value::String(Uuid::new_v4().to_string());
            } else if column.name == CREATED_AT || column.name == UPDATED_AT {
                *value = now_value();
            }
        }

        self.check_row(&schema, &row, None)?;
        self.rows_mut(table)?.push(row.clone());
        trace!("[INSERT] memory row into '{}'", table);
        Ok(row)
    }

    /// NOT NULL, primary key, UNIQUE and foreign key checks for one row.
    /// `position` is the row's own index when it is already stored.
    fn check_row(
        &self,
        schema: &TableSchema,
        row: &Row,
        position: Option<usize>,
    ) -> Result<(), StoreError> {
        let table = schema.name.as_str();
        let existing = self.rows(table)?;

        for column in &schema.columns {
            let value = row.get(&column.name).unwrap_or(&Value::Null);
            let is_key = column.name == schema.primary_key;

            if value.is_null() {
                if is_key || !column.nullable {
                    return Err(StoreError::constraint(
                        table,
                        &format!("{}_{}_not_null", table, column.name),
                        format!("null value in column \"{}\"", column.name),
                    ));
                }
                continue;
            }

            if is_key || column.unique {
                let clash = existing.iter().enumerate().any(|(i, other)| {
                    Some(i) != position
                        && other
                            .get(&column.name)
                            .is_some_and(|v| same_value(v, value))
                });
                if clash {
                    let constraint = if is_key {
                        format!("{}_pkey", table)
                    } else {
                        format!("{}_{}_key", table, column.name)
                    };
                    return Err(StoreError::constraint(
                        table,
                        &constraint,
                        format!("duplicate key value {} for \"{}\"", value, column.name),
                    ));
                }
            }
        }

        for fk in &schema.foreign_keys {
            let value = row.get(&fk.column).unwrap_or(&Value::Null);
            if value.is_null() {
                continue;
            }
            let referenced = if fk.references == table {
                existing
            } else {
                self.rows(&fk.references)?
            };
            let found = referenced.iter().any(|r| {
                r.get(&fk.references_column)
                    .is_some_and(|v| same_value(v, value))
            }) || (fk.references == table && row.get(&fk.references_column) == Some(value));
            if !found {
                return Err(StoreError::constraint(
                    table,
                    &format!("{}_{}_fkey", table, fk.column),
                    format!(
                        "key ({})=({}) is not present in table \"{}\"",
                        fk.column, value, fk.references
                    ),
                ));
            }
        }

        Ok(())
    }

    fn select(&self, table: &str, query: &QueryBuilder) -> Result<Vec<Row>, StoreError> {
        let mut rows: Vec<Row> = self
            .rows(table)?
            .iter()
            .filter(|row| query.conditions().iter().all(|c| c.matches(row)))
            .cloned()
            .collect();

        sort_rows(&mut rows, query.ordering());

        let offset = query.offset_value().unwrap_or(0).max(0) as usize;
        let limit = query
            .limit_value()
            .map(|l| l.max(0) as usize)
            .unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    fn count(&self, table: &str, query: &QueryBuilder) -> Result<i64, StoreError> {
        Ok(self
            .rows(table)?
            .iter()
            .filter(|row| query.conditions().iter().all(|c| c.matches(row)))
            .count() as i64)
    }

    fn update(&mut self, table: &str, update: &UpdateSet, query: &QueryBuilder) -> Result<u64, StoreError> {
        let schema = self.schema(table)?.clone();
        if let Some((column, _)) = update.operations.iter().find(|(c, _)| !schema.has_column(c)) {
            return Err(StoreError::validation(table, column, "unknown column"));
        }

        let matched: Vec<usize> = self
            .rows(table)?
            .iter()
            .enumerate()
            .filter(|(_, row)| query.conditions().iter().all(|c| c.matches(row)))
            .map(|(i, _)| i)
            .collect();

        let rows = self.rows_mut(table)?;
        for &i in &matched {
            for (column, value) in &update.operations {
                rows[i].insert(column.clone(), value.clone());
            }
        }

        for &i in &matched {
            let row = self.rows(table)?[i].clone();
            self.check_row(&schema, &row, Some(i))?;
        }

        trace!("[UPDATE] memory '{}' rows={}", table, matched.len());
        Ok(matched.len() as u64)
    }

    fn delete(&mut self, table: &str, query: &QueryBuilder) -> Result<u64, StoreError> {
        self.schema(table)?;

        let rows = self.rows_mut(table)?;
        let (removed, kept): (Vec<Row>, Vec<Row>) = std::mem::take(rows)
            .into_iter()
            .partition(|row| query.conditions().iter().all(|c| c.matches(row)));
        *rows = kept;

        if !removed.is_empty() {
            self.apply_on_delete(table, &removed)?;
        }
        Ok(removed.len() as u64)
    }

    /// Apply dependents' ON DELETE actions for rows just removed from `table`
    fn apply_on_delete(&mut self, table: &str, removed: &[Row]) -> Result<(), StoreError> {
        let dependents: Vec<(String, String, String, OnDelete)> = self
            .schemas
            .values()
            .flat_map(|schema| {
                schema
                    .foreign_keys
                    .iter()
                    .filter(|fk| fk.references == table)
                    .map(|fk| {
                        (
                            schema.name.clone(),
                            fk.column.clone(),
                            fk.references_column.clone(),
                            fk.on_delete,
                        )
                    })
            })
            .collect();

        for (dependent, column, references_column, on_delete) in dependents {
            let keys: Vec<Value> = removed
                .iter()
                .filter_map(|row| row.get(&references_column))
                .filter(|v| !v.is_null())
                .cloned()
                .collect();
            if keys.is_empty() {
                continue;
            }

            let referencing = QueryBuilder::new().filter(QueryFilter::in_values(&column, keys));
            match on_delete {
                OnDelete::Cascade => {
                    let count = self.delete(&dependent, &referencing)?;
                    debug!(
                        "[ON_DELETE] cascade removed {} rows from '{}'",
                        count, dependent
                    );
                }
                OnDelete::SetNull => {
                    let nulls = UpdateSet::new().set(column.clone(), Value::Null);
                    self.update(&dependent, &nulls, &referencing)?;
                }
                OnDelete::Restrict | OnDelete::NoAction => {
                    if self.count(&dependent, &referencing)? > 0 {
                        return Err(StoreError::constraint(
                            &dependent,
                            &format!("{}_{}_fkey", dependent, column),
                            format!("rows in \"{}\" are still referenced", table),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Autocommit executor: each statement locks, runs and releases
#[derive(Debug)]
pub struct MemoryExecutor {
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl Executor for MemoryExecutor {
    async fn insert(&mut self, schema: &TableSchema, row: Row) -> Result<Row, StoreError> {
        let mut state = self.state.lock().await;
        state.atomically(|s| s.insert(&schema.name, row))
    }

    async fn select(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<Vec<Row>, StoreError> {
        self.state.lock().await.select(&schema.name, query)
    }

    async fn count(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<i64, StoreError> {
        self.state.lock().await.count(&schema.name, query)
    }

    async fn update(
        &mut self,
        schema: &TableSchema,
        update: &UpdateSet,
        query: &QueryBuilder,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        state.atomically(|s| s.update(&schema.name, update, query))
    }

    async fn delete(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        state.atomically(|s| s.delete(&schema.name, query))
    }
}

/// Holds the state lock until commit or rollback
#[derive(Debug)]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: Option<Tables>,
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            debug!("[TRANSACTION] memory transaction dropped, rolling back");
            self.guard.tables = snapshot;
        }
    }
}

#[async_trait]
impl Executor for MemoryTransaction {
    async fn insert(&mut self, schema: &TableSchema, row: Row) -> Result<Row, StoreError> {
        self.guard.atomically(|s| s.insert(&schema.name, row))
    }

    async fn select(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<Vec<Row>, StoreError> {
        self.guard.select(&schema.name, query)
    }

    async fn count(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<i64, StoreError> {
        self.guard.count(&schema.name, query)
    }

    async fn update(
        &mut self,
        schema: &TableSchema,
        update: &UpdateSet,
        query: &QueryBuilder,
    ) -> Result<u64, StoreError> {
        self.guard.atomically(|s| s.update(&schema.name, update, query))
    }

    async fn delete(&mut self, schema: &TableSchema, query: &QueryBuilder) -> Result<u64, StoreError> {
        self.guard.atomically(|s| s.delete(&schema.name, query))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn as_executor(&mut self) -> &mut dyn Executor {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        this.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        if let Some(snapshot) = this.snapshot.take() {
            this.guard.tables = snapshot;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = Some(guard.tables.clone());
        Ok(Box::new(MemoryTransaction { guard, snapshot }))
    }

    async fn executor(&self) -> Result<Box<dyn Executor>, StoreError> {
        Ok(Box::new(MemoryExecutor {
            state: Arc::clone(&self.state),
        }))
    }

    async fn migrate(&self, schema: &TableSchema, recreate: bool) -> Result<(), StoreError> {
        self.state.lock().await.migrate(schema, recreate)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ForeignKey};
    use serde_json::json;

    fn parents() -> TableSchema {
        TableSchema::new("parents", "id")
            .column(ColumnDef::new("id", "UUID", false))
            .column(ColumnDef::new("name", "VARCHAR", false).unique())
            .with_lifecycle()
    }

    fn children(on_delete: OnDelete) -> TableSchema {
        TableSchema::new("children", "id")
            .column(ColumnDef::new("id", "UUID", false))
            .column(ColumnDef::new("parent_id", "UUID", true))
            .foreign_key(ForeignKey::new("parent_id", "parents", "id", on_delete))
            .with_lifecycle()
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    async fn setup(on_delete: OnDelete) -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.migrate(&parents(), false).await.unwrap();
        storage.migrate(&children(on_delete), false).await.unwrap();
        storage
    }

    async fn insert_family(storage: &MemoryStorage) -> Value {
        let mut exec = storage.executor().await.unwrap();
        let parent = exec
            .insert(&parents(), row(json!({"name": "Parent#1"})))
            .await
            .unwrap();
        let id = parent["id"].clone();
        exec.insert(&children(OnDelete::Cascade), row(json!({"parent_id": id})))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn insert_applies_defaults() {
        let storage = setup(OnDelete::Cascade).await;
        let mut exec = storage.executor().await.unwrap();

        let stored = exec
            .insert(&parents(), row(json!({"name": "Parent#1"})))
            .await
            .unwrap();

        assert!(Uuid::parse_str(stored["id"].as_str().unwrap()).is_ok());
        assert!(stored["__created_at__"].is_string());
        assert!(stored["__deleted_at__"].is_null());
    }

    #[tokio::test]
    async fn unique_and_foreign_key_violations() {
        let storage = setup(OnDelete::Cascade).await;
        let mut exec = storage.executor().await.unwrap();
        exec.insert(&parents(), row(json!({"name": "dup"})))
            .await
            .unwrap();

        let err = exec
            .insert(&parents(), row(json!({"name": "dup"})))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());

        let err = exec
            .insert(
                &children(OnDelete::Cascade),
                row(json!({"parent_id": Uuid::new_v4().to_string()})),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("children_parent_id_fkey"));
        assert_eq!(storage.row_count("parents").await, 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_dependents() {
        let storage = setup(OnDelete::Cascade).await;
        let id = insert_family(&storage).await;

        let mut exec = storage.executor().await.unwrap();
        let removed = exec
            .delete(&parents(), &QueryBuilder::new().filter(QueryFilter::eq("id", id)))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(storage.row_count("children").await, 0);
    }

    #[tokio::test]
    async fn delete_set_null_and_restrict() {
        let storage = setup(OnDelete::SetNull).await;
        let id = insert_family(&storage).await;
        let mut exec = storage.executor().await.unwrap();
        exec.delete(&parents(), &QueryBuilder::new().filter(QueryFilter::eq("id", id)))
            .await
            .unwrap();
        let orphans = exec
            .select(&children(OnDelete::SetNull), &QueryBuilder::new())
            .await
            .unwrap();
        assert!(orphans[0]["parent_id"].is_null());

        let storage = setup(OnDelete::Restrict).await;
        let id = insert_family(&storage).await;
        let mut exec = storage.executor().await.unwrap();
        let err = exec
            .delete(&parents(), &QueryBuilder::new().filter(QueryFilter::eq("id", id)))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(storage.row_count("parents").await, 1);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let storage = setup(OnDelete::Cascade).await;
        {
            let mut tx = storage.begin().await.unwrap();
            tx.insert(&parents(), row(json!({"name": "gone"})))
                .await
                .unwrap();
        }
        assert_eq!(storage.row_count("parents").await, 0);

        let mut tx = storage.begin().await.unwrap();
        tx.insert(&parents(), row(json!({"name": "kept"})))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(storage.row_count("parents").await, 1);
    }

    #[tokio::test]
    async fn unknown_table_is_reported() {
        let storage = MemoryStorage::new();
        let mut exec = storage.executor().await.unwrap();
        let err = exec.count(&parents(), &QueryBuilder::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownTable(name) if name == "parents"));
    }
}
