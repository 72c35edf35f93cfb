//! Trait definitions
//!
//! Record-level view of the lifecycle columns.

use super::table_metadata::TableMetadata;
use crate::lifecycle::Lifecycle;
use chrono::{DateTime, Utc};

/// Records composed with a [`Lifecycle`] field (`#[lifecycle]` under `#[model]`)
///
/// Everything here is in-memory only. Persisting a state change goes through
/// [`SoftDeleteStore`](super::SoftDeleteStore) or a collection.
pub trait SoftDeletable: TableMetadata {
    fn lifecycle(&self) -> &Lifecycle;

    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    fn is_alive(&self) -> bool {
        self.lifecycle().is_alive()
    }

    fn is_dead(&self) -> bool {
        !self.is_alive()
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().deleted_at
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().updated_at
    }

    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.lifecycle_mut().mark_deleted(at);
    }

    fn mark_undeleted(&mut self) {
        self.lifecycle_mut().mark_undeleted();
    }
}
