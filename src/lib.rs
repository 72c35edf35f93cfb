//! # SoftHaus
//!
//! Soft deletion for relational records. Deleting a record stamps `__deleted_at__`
//! instead of removing the row, and the stamp follows `ON DELETE CASCADE` foreign keys
//! one level down inside the same transaction.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use softhaus::prelude::*;
//!
//! #[model]
//! #[table(name = "parents")]
//! pub struct Parent {
//!     #[primary_key]
//!     pub id: Uuid,
//!
//!     #[field(create, update)]
//!     pub name: String,
//!
//!     #[lifecycle]
//!     pub lifecycle: Lifecycle,
//! }
//!
//! #[model]
//! #[table(name = "children")]
//! pub struct Child {
//!     #[primary_key]
//!     pub id: Uuid,
//!
//!     #[field(create)]
//!     #[foreign_key(references = "parents", on_delete = "cascade")]
//!     pub parent_id: Uuid,
//!
//!     #[lifecycle]
//!     pub lifecycle: Lifecycle,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let softhaus = SoftHaus::builder(MemoryStorage::new())
//!         .model::<Parent>()
//!         .model::<Child>()
//!         .build()
//!         .await?;
//!
//!     let parents = softhaus.store::<Parent>()?;
//!     let children = softhaus.store::<Child>()?;
//!
//!     let mut parent = parents.create(Parent::new(Uuid::new_v4(), "P1".into())).await?;
//!     children.create(Child::new(Uuid::new_v4(), parent.id)).await?;
//!
//!     parents.soft_delete(&mut parent).await?;
//!     assert_eq!(children.alive().count().await?, 0);
//!     assert_eq!(children.all().count().await?, 1);
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod migration;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::{SoftHaus, SoftHausBuilder};
pub use errors::SoftHausError;

// Re-export centralized config
pub use config::{AppConfig, CascadeScope, DatabaseConfig, SoftDeleteConfig};

// Re-export internal crates used by macros and public API
// These MUST be public for the generated macro code to work correctly
pub use store_object;
pub use table_derive;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
