//! Trait definitions
//!
//! This module defines the static description every model provides.

use crate::errors::StoreError;
use crate::schema::TableSchema;
use crate::storage::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

/// Metadata about database table structure and operations
/// This trait should be derived using the `#[model]` attribute macro, which
/// automatically includes all necessary derives.
///
/// Recommended usage:
/// ```ignore
/// use softhaus::prelude::*;
///
/// #[model]
/// #[table(name = "children")]
/// pub struct Child {
///     #[primary_key]
///     pub id: Uuid,
///
///     #[field(create, update)]
///     #[unique]
///     pub name: String,
///
///     #[field(create)]
///     #[foreign_key(references = "parents", on_delete = "cascade")]
///     pub parent_id: Uuid,
///
///     #[lifecycle]
///     pub lifecycle: Lifecycle,
/// }
/// ```
pub trait TableMetadata:
    Clone + Send + Sync + Debug + Serialize + DeserializeOwned + 'static
{
    /// The type used for the primary key
    type Id: Clone + Send + Sync + Debug + Serialize + DeserializeOwned + PartialEq;

    /// The table name in the database
    fn table_name() -> &'static str;

    /// Get the primary key field name
    fn primary_key_field() -> &'static str;

    /// Extract ID from model instance
    fn extract_id(&self) -> Self::Id;

    /// Columns, foreign keys and lifecycle flag for this table
    fn schema() -> TableSchema;

    /// Get field names for CREATE operation
    fn create_fields() -> Vec<&'static str>;

    /// Get field names for UPDATE operation
    fn update_fields() -> Vec<&'static str>;

    /// Whether this entity carries lifecycle columns
    fn supports_soft_delete() -> bool {
        false
    }

    /// Serialize this record into a storage row
    fn to_row(&self) -> Result<Row, StoreError> {
        match serde_json::to_value(self)? {
            Value::Object(row) => Ok(row),
            other => Err(StoreError::validation(
                Self::table_name(),
                "*",
                format!("model must serialize to an object, got {}", other),
            )),
        }
    }

    /// Rebuild a record from a storage row
    fn from_row(row: Row) -> Result<Self, StoreError> {
        Ok(serde_json::from_value(Value::Object(row))?)
    }

    /// Primary key as a JSON value usable in filters
    fn id_value(id: &Self::Id) -> Result<Value, StoreError> {
        Ok(serde_json::to_value(id)?)
    }
}
