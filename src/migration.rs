//! Table migration
//!
//! Creates every registered table in foreign-key order so referenced tables exist
//! before the tables that point at them.

use crate::core::SoftHaus;
use crate::errors::SoftHausError;

impl SoftHaus {
    /// Create tables and indexes for every registered model
    /// If recreate is true, drops existing tables first
    pub async fn auto_migrate(&self, recreate: bool) -> Result<(), SoftHausError> {
        for schema in self.registry().migration_order()? {
            crate::trace_log!(
                "[MIGRATE] '{}' ({} columns, {} foreign keys, recreate={})",
                schema.name,
                schema.columns.len(),
                schema.foreign_keys.len(),
                recreate
            );
            self.storage().migrate(&schema, recreate).await?;
        }

        Ok(())
    }
}
