//! Traits for database operations
//!
//! This module contains all the traits that define the interface for database operations
//! in the softhaus library.

pub mod core;
pub mod soft_deletable;
pub mod table_metadata;

pub use core::{SoftDeleteStore, StoreObject};
pub use soft_deletable::SoftDeletable;
pub use table_metadata::TableMetadata;
