//! Lifecycle timestamps shared by every soft-deletable record
//!
//! Models embed a [`Lifecycle`] field (marked `#[lifecycle]` when using `#[model]`)
//! instead of inheriting the columns from a base type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CREATED_AT: &str = "__created_at__";
pub const UPDATED_AT: &str = "__updated_at__";
pub const DELETED_AT: &str = "__deleted_at__";

/// All lifecycle columns, in table order
pub const LIFECYCLE_COLUMNS: [&str; 3] = [CREATED_AT, UPDATED_AT, DELETED_AT];

/// Creation, modification and deletion stamps of a record.
///
/// `created_at` and `updated_at` are `None` only until the record is first persisted.
/// A `None` deletion stamp means the record is alive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    #[serde(rename = "__created_at__", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "__updated_at__", default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "__deleted_at__", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alive(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Stamp the first persist. Later calls keep the original creation time.
    pub fn touch_created(&mut self, now: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }

    pub fn touch_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }

    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.deleted_at = Some(now);
    }

    pub fn mark_undeleted(&mut self) {
        self.deleted_at = None;
    }
}

/// Returns true when `column` is one of the lifecycle system columns
pub fn is_lifecycle_column(column: &str) -> bool {
    LIFECYCLE_COLUMNS.contains(&column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn created_stamp_is_set_once() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.touch_created(at(10));
        lifecycle.touch_created(at(20));

        assert_eq!(lifecycle.created_at, Some(at(10)));
        assert_eq!(lifecycle.updated_at, Some(at(20)));
    }

    #[test]
    fn delete_and_undelete_flip_liveness() {
        let mut lifecycle = Lifecycle::new();
        assert!(lifecycle.is_alive());

        lifecycle.mark_deleted(at(5));
        assert!(!lifecycle.is_alive());
        assert_eq!(lifecycle.deleted_at, Some(at(5)));

        lifecycle.mark_undeleted();
        assert!(lifecycle.is_alive());
    }

    #[test]
    fn serializes_with_system_column_names() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.touch_created(at(0));

        let value = serde_json::to_value(&lifecycle).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key(CREATED_AT));
        assert!(object.contains_key(UPDATED_AT));
        assert!(object[DELETED_AT].is_null());
    }

    #[test]
    fn missing_columns_deserialize_as_none() {
        let lifecycle: Lifecycle = serde_json::from_str("{}").unwrap();
        assert_eq!(lifecycle, Lifecycle::default());
    }
}
