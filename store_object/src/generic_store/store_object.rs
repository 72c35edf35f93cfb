//! Generic store implementations
//!
//! Record persistence: create, save and refresh.

use super::core::GenericStore;
use crate::errors::StoreError;
use crate::lifecycle::{LIFECYCLE_COLUMNS, UPDATED_AT};
use crate::storage::{Executor, Row};
use crate::traits::{SoftDeletable, SoftDeleteStore, StoreObject};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Keep only the named columns of a row
fn project<'a>(row: &Row, columns: impl IntoIterator<Item = &'a str>) -> Row {
    columns
        .into_iter()
        .filter_map(|c| row.get(c).map(|v| (c.to_string(), v.clone())))
        .collect()
}

#[async_trait]
impl<T: SoftDeletable> StoreObject for GenericStore<T> {
    type Model = T;

    async fn create(&self, data: T) -> Result<T, StoreError> {
        let mut exec = self.storage.executor().await?;
        self.create_in(exec.as_mut(), data).await
    }

    async fn create_in(&self, exec: &mut dyn Executor, mut data: T) -> Result<T, StoreError> {
        data.lifecycle_mut().touch_created(self.clock.now());

        let row = data.to_row()?;
        let columns = std::iter::once(T::primary_key_field())
            .chain(T::create_fields())
            .chain(LIFECYCLE_COLUMNS);
        let stored = exec.insert(&self.schema, project(&row, columns)).await?;

        debug!("[CREATE] Table: {}", T::table_name());
        T::from_row(stored)
    }

    async fn create_many(&self, data: Vec<T>) -> Result<Vec<T>, StoreError> {
        let mut tx = self.storage.begin().await?;
        let mut created = Vec::with_capacity(data.len());

        for record in data {
            let result = self.create_in(tx.as_executor(), record).await;
            match result {
                Ok(record) => created.push(record),
                Err(err) => {
                    warn!(
                        "[CREATE_MANY] rolling back '{}' after {} rows: {}",
                        T::table_name(),
                        created.len(),
                        err
                    );
                    tx.rollback().await?;
                    return Err(err);
                }
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn save(&self, record: &mut T) -> Result<(), StoreError> {
        let now = self.clock.now();
        let row = record.to_row()?;
        let update = self
            .update_fields_set(&row)
            .set(UPDATED_AT, serde_json::to_value(now)?);

        let mut exec = self.storage.executor().await?;
        let affected = exec
            .update(&self.schema, &update, &self.id_query(record)?)
            .await?;
        if affected == 0 {
            return Err(StoreError::not_found(T::table_name(), record.extract_id()));
        }

        record.lifecycle_mut().touch_updated(now);
        debug!("[SAVE] Table: {}", T::table_name());
        Ok(())
    }

    async fn refresh(&self, record: &mut T) -> Result<(), StoreError> {
        let id = record.extract_id();
        match self.all().get(&id).await? {
            Some(fresh) => {
                *record = fresh;
                Ok(())
            }
            None => Err(StoreError::not_found(T::table_name(), id)),
        }
    }
}
