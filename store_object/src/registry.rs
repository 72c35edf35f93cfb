//! Static cascade registry
//!
//! Built once from the registered models' schemas. Maps each referenced table to the
//! dependent tables whose foreign keys are declared `ON DELETE CASCADE`, which is the
//! set of relationships a soft delete follows.

use crate::errors::StoreError;
use crate::schema::TableSchema;
use crate::validation::validate_schema;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A dependent relationship followed by soft delete
#[derive(Debug, Clone)]
pub struct CascadeEdge {
    pub dependent: Arc<TableSchema>,
    /// Foreign key column on the dependent table
    pub column: String,
    /// Column of the referenced table the key points at
    pub references_column: String,
}

#[derive(Debug, Clone, Default)]
pub struct CascadeRegistry {
    schemas: Vec<Arc<TableSchema>>,
    by_table: HashMap<String, usize>,
    edges: HashMap<String, Vec<CascadeEdge>>,
}

impl CascadeRegistry {
    /// Validate the schemas and build the cascade edges
    pub fn build(schemas: Vec<TableSchema>) -> Result<Self, StoreError> {
        let mut registry = Self::default();

        for schema in schemas {
            validate_schema(&schema).map_err(|e| {
                StoreError::invalid_configuration(format!("table '{}': {}", schema.name, e))
            })?;
            if registry.by_table.contains_key(&schema.name) {
                return Err(StoreError::invalid_configuration(format!(
                    "table '{}' is registered twice",
                    schema.name
                )));
            }
            if !schema.has_column(&schema.primary_key) {
                return Err(StoreError::invalid_configuration(format!(
                    "table '{}' has no primary key column '{}'",
                    schema.name, schema.primary_key
                )));
            }
            registry
                .by_table
                .insert(schema.name.clone(), registry.schemas.len());
            registry.schemas.push(Arc::new(schema));
        }

        for dependent in &registry.schemas {
            for fk in &dependent.foreign_keys {
                if !dependent.has_column(&fk.column) {
                    return Err(StoreError::invalid_configuration(format!(
                        "foreign key column '{}.{}' is not a column",
                        dependent.name, fk.column
                    )));
                }
                let referenced = registry.schema(&fk.references).ok_or_else(|| {
                    StoreError::invalid_configuration(format!(
                        "'{}.{}' references unregistered table '{}'",
                        dependent.name, fk.column, fk.references
                    ))
                })?;
                if !referenced.has_column(&fk.references_column) {
                    return Err(StoreError::invalid_configuration(format!(
                        "'{}.{}' references missing column '{}.{}'",
                        dependent.name, fk.column, fk.references, fk.references_column
                    )));
                }
                if !fk.on_delete.cascades() {
                    continue;
                }
                if !dependent.soft_delete {
                    return Err(StoreError::invalid_configuration(format!(
                        "'{}.{}' cascades from '{}' but '{}' has no lifecycle columns",
                        dependent.name, fk.column, fk.references, dependent.name
                    )));
                }

                debug!(
                    "[CASCADE] registered edge {} -> {}.{}",
                    fk.references, dependent.name, fk.column
                );
                registry
                    .edges
                    .entry(fk.references.clone())
                    .or_default()
                    .push(CascadeEdge {
                        dependent: Arc::clone(dependent),
                        column: fk.column.clone(),
                        references_column: fk.references_column.clone(),
                    });
            }
        }

        // Fails on cycles; the order itself is recomputed on demand
        registry.migration_order()?;
        Ok(registry)
    }

    pub fn schema(&self, table: &str) -> Option<&Arc<TableSchema>> {
        self.by_table.get(table).map(|&i| &self.schemas[i])
    }

    pub fn contains(&self, table: &str) -> bool {
        self.by_table.contains_key(table)
    }

    /// Cascade edges whose referenced table is `table`
    pub fn edges_for(&self, table: &str) -> &[CascadeEdge] {
        self.edges.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Registered schemas in registration order
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<TableSchema>> {
        self.schemas.iter()
    }

    /// Schemas ordered so every referenced table precedes its dependents.
    ///
    /// Self-references are allowed; any longer cycle is a configuration error.
    pub fn migration_order(&self) -> Result<Vec<Arc<TableSchema>>, StoreError> {
        let mut ordered: Vec<Arc<TableSchema>> = Vec::with_capacity(self.schemas.len());
        let mut placed: HashSet<&str> = HashSet::new();

        while ordered.len() < self.schemas.len() {
            let ready: Vec<&Arc<TableSchema>> = self
                .schemas
                .iter()
                .filter(|s| !placed.contains(s.name.as_str()))
                .filter(|s| {
                    s.foreign_keys
                        .iter()
                        .all(|fk| fk.references == s.name || placed.contains(fk.references.as_str()))
                })
                .collect();

            if ready.is_empty() {
                let remaining: Vec<&str> = self
                    .schemas
                    .iter()
                    .map(|s| s.name.as_str())
                    .filter(|name| !placed.contains(name))
                    .collect();
                return Err(StoreError::invalid_configuration(format!(
                    "foreign keys form a cycle between: {}",
                    remaining.join(", ")
                )));
            }

            for schema in ready {
                placed.insert(schema.name.as_str());
                ordered.push(Arc::clone(schema));
            }
        }

        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ForeignKey, OnDelete};

    fn table(name: &str) -> TableSchema {
        TableSchema::new(name, "id")
            .column(ColumnDef::new("id", "UUID", false))
            .with_lifecycle()
    }

    fn with_fk(schema: TableSchema, column: &str, references: &str, on_delete: OnDelete) -> TableSchema {
        schema
            .column(ColumnDef::new(column, "UUID", true))
            .foreign_key(ForeignKey::new(column, references, "id", on_delete))
    }

    #[test]
    fn builds_cascade_edges_only_for_cascade_keys() {
        let registry = CascadeRegistry::build(vec![
            table("parents"),
            with_fk(table("children"), "parent_id", "parents", OnDelete::Cascade),
            with_fk(table("notes"), "parent_id", "parents", OnDelete::SetNull),
        ])
        .expect("valid registry");

        let edges = registry.edges_for("parents");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].dependent.name, "children");
        assert_eq!(edges[0].column, "parent_id");
        assert!(registry.edges_for("children").is_empty());
    }

    #[test]
    fn migration_order_puts_referenced_tables_first() {
        let registry = CascadeRegistry::build(vec![
            with_fk(table("grandchildren"), "child_id", "children", OnDelete::Cascade),
            with_fk(table("children"), "parent_id", "parents", OnDelete::Cascade),
            table("parents"),
        ])
        .expect("valid registry");

        let order: Vec<String> = registry
            .migration_order()
            .expect("acyclic")
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(order, vec!["parents", "children", "grandchildren"]);
    }

    #[test]
    fn self_reference_is_allowed() {
        let registry = CascadeRegistry::build(vec![with_fk(
            table("comments"),
            "reply_to",
            "comments",
            OnDelete::Cascade,
        )])
        .expect("self reference is fine");

        assert_eq!(registry.edges_for("comments").len(), 1);
    }

    #[test]
    fn rejects_unregistered_reference() {
        let err = CascadeRegistry::build(vec![with_fk(
            table("children"),
            "parent_id",
            "parents",
            OnDelete::Cascade,
        )])
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("unregistered table 'parents'"));
    }

    #[test]
    fn rejects_cascade_into_table_without_lifecycle() {
        let plain = TableSchema::new("logs", "id")
            .column(ColumnDef::new("id", "UUID", false))
            .column(ColumnDef::new("parent_id", "UUID", true))
            .foreign_key(ForeignKey::new("parent_id", "parents", "id", OnDelete::Cascade));

        let err = CascadeRegistry::build(vec![table("parents"), plain]).unwrap_err();
        assert!(err.to_string().contains("no lifecycle columns"));
    }

    #[test]
    fn rejects_missing_foreign_key_column() {
        let broken = table("children").foreign_key(ForeignKey::new(
            "parent_id",
            "parents",
            "id",
            OnDelete::Cascade,
        ));

        let err = CascadeRegistry::build(vec![table("parents"), broken]).unwrap_err();
        assert!(err.to_string().contains("is not a column"));
    }

    #[test]
    fn rejects_duplicates_and_cycles() {
        let err = CascadeRegistry::build(vec![table("parents"), table("parents")]).unwrap_err();
        assert!(err.to_string().contains("registered twice"));

        let err = CascadeRegistry::build(vec![
            with_fk(table("a"), "b_id", "b", OnDelete::Restrict),
            with_fk(table("b"), "a_id", "a", OnDelete::Restrict),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn rejects_invalid_identifiers() {
        let err = CascadeRegistry::build(vec![table("bad-name")]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfiguration { .. }));
    }
}
