//! Table schema descriptions and DDL generation
//!
//! A [`TableSchema`] is produced once per model (normally by `#[model]`) and is the
//! single source for migrations, foreign key actions and cascade registration.

use crate::lifecycle::{CREATED_AT, DELETED_AT, UPDATED_AT};
use serde::{Deserialize, Serialize};

const TIMESTAMP_TYPE: &str = "TIMESTAMP WITH TIME ZONE";

/// Action taken by the storage layer when a referenced row is physically deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnDelete {
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

impl OnDelete {
    pub fn to_sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::Restrict => "RESTRICT",
            OnDelete::SetNull => "SET NULL",
            OnDelete::NoAction => "NO ACTION",
        }
    }

    /// Parse the spelling used in `#[foreign_key(on_delete = "...")]`
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().replace(' ', "_").as_str() {
            "cascade" => Some(OnDelete::Cascade),
            "restrict" => Some(OnDelete::Restrict),
            "set_null" => Some(OnDelete::SetNull),
            "no_action" => Some(OnDelete::NoAction),
            _ => None,
        }
    }

    /// Whether soft deletes of the referenced row should propagate along this key
    pub fn cascades(&self) -> bool {
        matches!(self, OnDelete::Cascade)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub unique: bool,
    pub indexed: bool,
}

impl ColumnDef {
    pub fn new(name: &str, sql_type: &str, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable,
            unique: false,
            indexed: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn is_timestamp(&self) -> bool {
        self.sql_type.starts_with("TIMESTAMP")
    }
}

/// A relationship column on the dependent table pointing at another table's key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
    pub references_column: String,
    pub on_delete: OnDelete,
}

impl ForeignKey {
    pub fn new(column: &str, references: &str, references_column: &str, on_delete: OnDelete) -> Self {
        Self {
            column: column.to_string(),
            references: references.to_string(),
            references_column: references_column.to_string(),
            on_delete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnDef>,
    pub foreign_keys: Vec<ForeignKey>,
    pub soft_delete: bool,
}

impl TableSchema {
    pub fn new(name: &str, primary_key: &str) -> Self {
        Self {
            name: name.to_string(),
            primary_key: primary_key.to_string(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            soft_delete: false,
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Append the three lifecycle columns and mark the table soft-deletable
    pub fn with_lifecycle(mut self) -> Self {
        for name in [CREATED_AT, UPDATED_AT, DELETED_AT] {
            if !self.has_column(name) {
                self.columns.push(ColumnDef::new(name, TIMESTAMP_TYPE, true));
            }
        }
        self.soft_delete = true;
        self
    }

    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_def(name).is_some()
    }

    /// SQL type of a column, used to bind parameters with the right Postgres type
    pub fn sql_type_of(&self, name: &str) -> Option<&str> {
        self.column_def(name).map(|c| c.sql_type.as_str())
    }

    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    /// Generate CREATE TABLE SQL statement
    pub fn create_table_sql(&self) -> String {
        let definitions: Vec<String> = self
            .columns
            .iter()
            .map(|column| self.column_definition_sql(column))
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&self.name),
            definitions.join(", ")
        )
    }

    fn column_definition_sql(&self, column: &ColumnDef) -> String {
        let mut sql = format!("{} {}", quote_identifier(&column.name), column.sql_type);

        if column.name == self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if column.sql_type == "UUID" {
                sql.push_str(" DEFAULT gen_random_uuid()");
            }
            return sql;
        }

        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if column.unique {
            sql.push_str(" UNIQUE");
        }
        if column.name == CREATED_AT || column.name == UPDATED_AT {
            sql.push_str(" DEFAULT NOW()");
        }
        if let Some(fk) = self.foreign_key_for(&column.name) {
            sql.push_str(&format!(
                " REFERENCES {} ({}) ON DELETE {}",
                quote_identifier(&fk.references),
                quote_identifier(&fk.references_column),
                fk.on_delete.to_sql()
            ));
        }
        sql
    }

    /// Generate DROP TABLE SQL statement
    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", quote_identifier(&self.name))
    }

    /// Generate CREATE INDEX SQL statements
    ///
    /// The deletion stamp is always indexed since every default query filters on it.
    pub fn create_indexes_sql(&self) -> Vec<String> {
        let mut indexed: Vec<&str> = Vec::new();
        let candidates = self
            .soft_delete
            .then_some(DELETED_AT)
            .into_iter()
            .chain(self.foreign_keys.iter().map(|fk| fk.column.as_str()))
            .chain(
                self.columns
                    .iter()
                    .filter(|c| c.indexed)
                    .map(|c| c.name.as_str()),
            );
        for column in candidates {
            if !indexed.contains(&column) {
                indexed.push(column);
            }
        }

        indexed
            .into_iter()
            .map(|column| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    quote_identifier(&format!(
                        "idx_{}_{}",
                        self.name,
                        column.trim_matches('_')
                    )),
                    quote_identifier(&self.name),
                    quote_identifier(column)
                )
            })
            .collect()
    }
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children() -> TableSchema {
        TableSchema::new("children", "id")
            .column(ColumnDef::new("id", "UUID", false))
            .column(ColumnDef::new("name", "VARCHAR", false).unique())
            .column(ColumnDef::new("parent_id", "UUID", false))
            .foreign_key(ForeignKey::new("parent_id", "parents", "id", OnDelete::Cascade))
            .with_lifecycle()
    }

    #[test]
    fn create_table_includes_lifecycle_and_foreign_key() {
        let sql = children().create_table_sql();

        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"children\""));
        assert!(sql.contains("\"id\" UUID PRIMARY KEY DEFAULT gen_random_uuid()"));
        assert!(sql.contains("\"name\" VARCHAR NOT NULL UNIQUE"));
        assert!(sql.contains(
            "\"parent_id\" UUID NOT NULL REFERENCES \"parents\" (\"id\") ON DELETE CASCADE"
        ));
        assert!(sql.contains("\"__created_at__\" TIMESTAMP WITH TIME ZONE DEFAULT NOW()"));
        assert!(sql.contains("\"__deleted_at__\" TIMESTAMP WITH TIME ZONE"));
        assert!(!sql.contains("\"__deleted_at__\" TIMESTAMP WITH TIME ZONE DEFAULT"));
    }

    #[test]
    fn indexes_cover_deletion_stamp_and_foreign_keys() {
        let indexes = children().create_indexes_sql();

        assert_eq!(indexes.len(), 2);
        assert!(indexes[0].contains("\"idx_children_deleted_at\""));
        assert!(indexes[1].contains("(\"parent_id\")"));
    }

    #[test]
    fn with_lifecycle_is_idempotent() {
        let schema = children().with_lifecycle();
        let stamps = schema
            .columns
            .iter()
            .filter(|c| c.name == DELETED_AT)
            .count();
        assert_eq!(stamps, 1);
        assert!(schema.soft_delete);
    }

    #[test]
    fn parses_on_delete_spellings() {
        assert_eq!(OnDelete::parse("cascade"), Some(OnDelete::Cascade));
        assert_eq!(OnDelete::parse("SET NULL"), Some(OnDelete::SetNull));
        assert_eq!(OnDelete::parse("set_null"), Some(OnDelete::SetNull));
        assert_eq!(OnDelete::parse("explode"), None);
        assert!(OnDelete::Cascade.cascades());
        assert!(!OnDelete::Restrict.cascades());
    }

    #[test]
    fn quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
