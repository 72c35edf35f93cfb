//! Convenience re-exports for common store-object usage

// Core traits
pub use crate::traits::{SoftDeletable, SoftDeleteStore, StoreObject, TableMetadata};

// Error types
pub use crate::errors::StoreError;

// Core store functionality
pub use crate::generic_store::{Collection, GenericStore, StoreTransaction};
pub use crate::lifecycle::Lifecycle;
pub use crate::registry::CascadeRegistry;
pub use crate::storage::{MemoryStorage, PgStorage, Storage};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use config::CascadeScope;

// Query building
pub use crate::query_builder::{QueryBuilder, QueryFilter, SortOrder};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use uuid::Uuid;
