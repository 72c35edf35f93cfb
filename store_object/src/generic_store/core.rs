use crate::clock::Clock;
use crate::errors::StoreError;
use crate::query_builder::{QueryBuilder, QueryFilter, UpdateSet};
use crate::registry::CascadeRegistry;
use crate::schema::TableSchema;
use crate::storage::{Row, Storage};
use crate::traits::SoftDeletable;
use config::CascadeScope;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Generic database store that provides default implementations for all database operations
pub struct GenericStore<T: SoftDeletable> {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) registry: Arc<CascadeRegistry>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) cascade_scope: CascadeScope,
    pub(crate) schema: Arc<TableSchema>,
    pub(crate) _phantom: PhantomData<fn() -> T>,
}

impl<T: SoftDeletable> Clone for GenericStore<T> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            registry: Arc::clone(&self.registry),
            clock: Arc::clone(&self.clock),
            cascade_scope: self.cascade_scope,
            schema: Arc::clone(&self.schema),
            _phantom: PhantomData,
        }
    }
}

impl<T: SoftDeletable> std::fmt::Debug for GenericStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericStore")
            .field("table", &self.schema.name)
            .field("storage", &self.storage)
            .field("cascade_scope", &self.cascade_scope)
            .field("cascade_edges", &self.registry.edges_for(&self.schema.name).len())
            .finish()
    }
}

impl<T: SoftDeletable> GenericStore<T> {
    /// Build a store for `T`. The table must be part of the registry.
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: Arc<CascadeRegistry>,
        clock: Arc<dyn Clock>,
        cascade_scope: CascadeScope,
    ) -> Result<Self, StoreError> {
        let schema = registry
            .schema(T::table_name())
            .cloned()
            .ok_or_else(|| {
                StoreError::invalid_configuration(format!(
                    "table '{}' is not registered",
                    T::table_name()
                ))
            })?;
        if !schema.soft_delete {
            return Err(StoreError::invalid_configuration(format!(
                "table '{}' has no lifecycle columns",
                T::table_name()
            )));
        }

        Ok(Self {
            storage,
            registry,
            clock,
            cascade_scope,
            schema,
            _phantom: PhantomData,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn cascade_scope(&self) -> CascadeScope {
        self.cascade_scope
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Filter selecting exactly one record by primary key
    pub(crate) fn id_query(&self, record: &T) -> Result<QueryBuilder, StoreError> {
        let id = T::id_value(&record.extract_id())?;
        Ok(QueryBuilder::new().filter(QueryFilter::eq(T::primary_key_field(), id)))
    }

    /// Assignments for every update field, taken from the record's serialized row
    pub(crate) fn update_fields_set(&self, row: &Row) -> UpdateSet {
        T::update_fields()
            .into_iter()
            .fold(UpdateSet::new(), |set, field| {
                set.set(field, row.get(field).cloned().unwrap_or(Value::Null))
            })
    }
}
