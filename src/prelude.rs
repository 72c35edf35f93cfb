//! Convenience re-exports for common SoftHaus usage
//!
//! # Example
//!
//! ```rust
//! use softhaus::prelude::*;
//! ```

// Core SoftHaus components
pub use crate::core::{SoftHaus, SoftHausBuilder};
pub use crate::errors::SoftHausError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, SoftDeleteConfig};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Re-export store_object module for macro-generated code
pub use store_object;

// Re-export table derive for model creation
pub use table_derive::{TableMetadata, model};

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;
