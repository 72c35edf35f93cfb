//! Core SoftHaus functionality
//!
//! This module contains the main SoftHaus coordinator. It owns the storage backend,
//! the clock and the cascade registry shared by every store it hands out.

use std::sync::Arc;

use config::{AppConfig, CascadeScope};
use store_object::traits::{SoftDeletable, TableMetadata};
use store_object::{
    CascadeRegistry, Clock, GenericStore, PgStorage, Storage, StoreTransaction, SystemClock,
    TableSchema,
};
use tracing::info;

use crate::errors::SoftHausError;

/// Main SoftHaus coordinator
///
/// Built with [`SoftHausBuilder`]; every model that takes part in cascades must be
/// registered before `build()` so its foreign keys become registry edges.
#[derive(Debug, Clone)]
pub struct SoftHaus {
    storage: Arc<dyn Storage>,
    registry: Arc<CascadeRegistry>,
    clock: Arc<dyn Clock>,
    cascade_scope: CascadeScope,
}

pub struct SoftHausBuilder {
    storage: Arc<dyn Storage>,
    schemas: Vec<TableSchema>,
    clock: Arc<dyn Clock>,
    cascade_scope: CascadeScope,
    auto_migrate: bool,
    recreate_tables: bool,
}

impl SoftHaus {
    /// Start a builder over any storage backend
    pub fn builder<S: Storage + 'static>(storage: S) -> SoftHausBuilder {
        SoftHausBuilder::new(Arc::new(storage))
    }

    /// Connect to PostgreSQL and apply the `[soft_delete]` settings
    pub async fn connect(config: &AppConfig) -> Result<SoftHausBuilder, SoftHausError> {
        let storage = PgStorage::connect(&config.database).await?;
        info!(
            "[SOFTHAUS] connected to {}:{}/{}",
            config.database.host, config.database.port, config.database.database
        );

        Ok(SoftHausBuilder::new(Arc::new(storage))
            .cascade_scope(config.soft_delete.cascade_scope)
            .auto_migrate(config.soft_delete.auto_migrate)
            .recreate_tables(config.soft_delete.recreate_tables))
    }

    /// Store for a registered model
    pub fn store<T: SoftDeletable>(&self) -> Result<GenericStore<T>, SoftHausError> {
        if !self.registry.contains(T::table_name()) {
            return Err(SoftHausError::ModelNotRegistered(T::table_name().to_string()));
        }

        Ok(GenericStore::new(
            self.storage.clone(),
            self.registry.clone(),
            self.clock.clone(),
            self.cascade_scope,
        )?)
    }

    /// Transaction shared by any number of stores
    pub async fn begin_transaction(&self) -> Result<StoreTransaction, SoftHausError> {
        let inner = self.storage.begin().await?;
        Ok(StoreTransaction::new(inner))
    }

    pub fn registry(&self) -> &CascadeRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn cascade_scope(&self) -> CascadeScope {
        self.cascade_scope
    }

    /// Check storage connection health
    pub async fn health_check(&self) -> Result<(), SoftHausError> {
        self.storage.ping().await?;
        Ok(())
    }
}

impl SoftHausBuilder {
    fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            schemas: Vec::new(),
            clock: Arc::new(SystemClock),
            cascade_scope: CascadeScope::default(),
            auto_migrate: true,
            recreate_tables: false,
        }
    }

    /// Register a model's table and foreign keys
    pub fn model<T: TableMetadata>(mut self) -> Self {
        crate::debug_log!("[SOFTHAUS] registering model '{}'", T::table_name());
        self.schemas.push(T::schema());
        self
    }

    /// Clock used for every lifecycle stamp. A cloned `ManualClock` shares its time.
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn cascade_scope(mut self, scope: CascadeScope) -> Self {
        self.cascade_scope = scope;
        self
    }

    /// Create every registered table on `build()`
    pub fn auto_migrate(mut self, enabled: bool) -> Self {
        self.auto_migrate = enabled;
        self
    }

    /// Drop and recreate tables while migrating
    pub fn recreate_tables(mut self, enabled: bool) -> Self {
        self.recreate_tables = enabled;
        self
    }

    /// Validate the registered models, build the cascade registry and migrate
    pub async fn build(self) -> Result<SoftHaus, SoftHausError> {
        let registry = CascadeRegistry::build(self.schemas)?;

        let softhaus = SoftHaus {
            storage: self.storage,
            registry: Arc::new(registry),
            clock: self.clock,
            cascade_scope: self.cascade_scope,
        };

        if self.auto_migrate {
            softhaus.auto_migrate(self.recreate_tables).await?;
        }

        info!(
            "[SOFTHAUS] ready: {} tables, cascade scope {:?}",
            softhaus.registry.schemas().count(),
            softhaus.cascade_scope
        );
        Ok(softhaus)
    }
}
