//! Transaction support for GenericStore
//!
//! This module provides database transaction functionality for GenericStore,
//! allowing multiple operations to be executed atomically.

use super::GenericStore;
use crate::errors::StoreError;
use crate::storage::{Executor, Transaction};
use crate::traits::SoftDeletable;

/// A transactional context shared by any number of stores
///
/// Pass `tx.as_mut()` to the `_in` variants of store and collection operations.
/// Dropping the context without committing rolls everything back.
///
/// # Example
/// ```ignore
/// let mut tx = parents.begin_transaction().await?;
///
/// parents.soft_delete_in(tx.as_mut(), &mut parent).await?;
/// children.dead().mark_undeleted_in(tx.as_mut()).await?;
///
/// tx.commit().await?;
/// ```
pub struct StoreTransaction {
    inner: Box<dyn Transaction>,
}

impl<T: SoftDeletable> GenericStore<T> {
    /// Begin a new storage transaction
    pub async fn begin_transaction(&self) -> Result<StoreTransaction, StoreError> {
        let inner = self.storage.begin().await?;
        Ok(StoreTransaction { inner })
    }
}

impl StoreTransaction {
    pub fn new(inner: Box<dyn Transaction>) -> Self {
        Self { inner }
    }

    /// Commit the transaction
    pub async fn commit(self) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    /// Rollback the transaction
    pub async fn rollback(self) -> Result<(), StoreError> {
        self.inner.rollback().await
    }

    /// Executor bound to this transaction
    pub fn as_mut(&mut self) -> &mut dyn Executor {
        self.inner.as_executor()
    }
}
