//! Trait definitions
//!
//! This module defines core traits for database operations.

use crate::errors::StoreError;
use crate::generic_store::Collection;
use crate::storage::Executor;
use crate::traits::SoftDeletable;
use async_trait::async_trait;

/// Trait that defines persistence operations for soft-deletable entities
#[async_trait]
pub trait StoreObject: Send + Sync {
    /// The model type that this object represents
    type Model: SoftDeletable;

    /// Insert a new record, stamping `__created_at__` and `__updated_at__`
    async fn create(&self, data: Self::Model) -> Result<Self::Model, StoreError>;

    /// Insert a new record inside a caller-owned transaction
    async fn create_in(
        &self,
        exec: &mut dyn Executor,
        data: Self::Model,
    ) -> Result<Self::Model, StoreError>;

    /// Insert several records in one transaction
    async fn create_many(&self, data: Vec<Self::Model>) -> Result<Vec<Self::Model>, StoreError>;

    /// Persist update fields and refresh `__updated_at__`. Never writes `__deleted_at__`.
    async fn save(&self, record: &mut Self::Model) -> Result<(), StoreError>;

    /// Reload a record from storage regardless of its deletion state
    async fn refresh(&self, record: &mut Self::Model) -> Result<(), StoreError>;
}

/// Deletion engine and visibility entry points
#[async_trait]
pub trait SoftDeleteStore: StoreObject {
    /// Records whose `__deleted_at__` is null
    fn alive(&self) -> Collection<Self::Model>;

    /// Records whose `__deleted_at__` is set
    fn dead(&self) -> Collection<Self::Model>;

    /// Every record, regardless of deletion state
    fn all(&self) -> Collection<Self::Model>;

    /// Mark the record dead and cascade to direct dependents, atomically
    async fn soft_delete(&self, record: &mut Self::Model) -> Result<(), StoreError>;

    /// Same as [`soft_delete`](Self::soft_delete) within a caller-owned transaction
    async fn soft_delete_in(
        &self,
        exec: &mut dyn Executor,
        record: &mut Self::Model,
    ) -> Result<(), StoreError>;

    /// Physically remove the record. Dependents follow only via storage foreign keys.
    async fn hard_delete(&self, record: &Self::Model) -> Result<bool, StoreError>;
}
