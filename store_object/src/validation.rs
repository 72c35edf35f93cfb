//! Identifier validation
//!
//! Table and column names end up inside generated SQL, so everything declared by a
//! model is checked here before a store is built.

use crate::lifecycle::is_lifecycle_column;
use crate::schema::TableSchema;
use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    /// Name is too long (PostgreSQL limit is 63 characters)
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    Empty,
    /// Name starts with invalid character (must start with letter or underscore)
    InvalidStartCharacter(String),
    ReservedKeyword(String),
    /// Name collides with one of the lifecycle columns managed by the store
    ReservedColumn(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => {
                write!(f, "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            ValidationError::Empty => write!(f, "Name cannot be empty"),
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
            ValidationError::ReservedKeyword(name) => {
                write!(f, "Name '{}' is a reserved SQL keyword", name)
            }
            ValidationError::ReservedColumn(name) => {
                write!(f, "Name '{}' is reserved for lifecycle tracking", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// PostgreSQL identifier length limit
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// A validated identifier that is safe to use in SQL queries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedIdentifier(String);

impl ValidatedIdentifier {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        validate_identifier(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Common validation logic for SQL identifiers
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let first_char = name.chars().next().ok_or(ValidationError::Empty)?;

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            name: name.to_string(),
            length: name.len(),
            max_length: MAX_IDENTIFIER_LENGTH,
        });
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidStartCharacter(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidCharacters(name.to_string()));
    }

    if is_reserved_keyword(name) {
        return Err(ValidationError::ReservedKeyword(name.to_string()));
    }

    Ok(())
}

/// Validate a user-declared column name. Lifecycle columns are owned by the store.
pub fn validate_column_name(name: &str) -> Result<(), ValidationError> {
    if is_lifecycle_column(&name.to_ascii_lowercase()) {
        return Err(ValidationError::ReservedColumn(name.to_string()));
    }
    validate_identifier(name)
}

/// Validate every identifier a schema will put into SQL
pub fn validate_schema(schema: &TableSchema) -> Result<(), ValidationError> {
    validate_identifier(&schema.name)?;

    for column in &schema.columns {
        if schema.soft_delete && is_lifecycle_column(&column.name) {
            continue;
        }
        validate_column_name(&column.name)?;
    }

    for foreign_key in &schema.foreign_keys {
        validate_identifier(&foreign_key.references)?;
        validate_identifier(&foreign_key.references_column)?;
    }

    Ok(())
}

fn is_reserved_keyword(name: &str) -> bool {
    const RESERVED_KEYWORDS: &[&str] = &[
        "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "INNER", "LEFT",
        "RIGHT", "FULL", "OUTER", "ON", "AS", "AND", "OR", "NOT", "NULL", "TRUE", "FALSE",
        "CASE", "WHEN", "THEN", "ELSE", "END", "IF", "EXISTS", "IN", "LIKE", "BETWEEN",
        "ORDER", "BY", "GROUP", "HAVING", "LIMIT", "OFFSET", "UNION", "ALL", "DISTINCT",
        "CREATE", "DROP", "ALTER", "TABLE", "INDEX", "VIEW", "DATABASE", "SCHEMA", "PRIMARY",
        "KEY", "FOREIGN", "REFERENCES", "UNIQUE", "CHECK", "DEFAULT", "CONSTRAINT", "COLUMN",
        "CASCADE", "RESTRICT", "RETURNING", "USER", "TO",
    ];

    RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ForeignKey, OnDelete};

    #[test]
    fn test_valid_identifiers() {
        let long = "a".repeat(63);
        let valid_names = ["users", "user_profiles", "UserProfiles", "_private", "t123", long.as_str()];

        for name in valid_names {
            assert!(
                ValidatedIdentifier::new(name).is_ok(),
                "Should accept valid name: {}",
                name
            );
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        let test_cases = [
            ("", ValidationError::Empty),
            (
                "123table",
                ValidationError::InvalidStartCharacter("123table".to_string()),
            ),
            (
                "user-name",
                ValidationError::InvalidCharacters("user-name".to_string()),
            ),
            (
                "a\"; DROP TABLE x; --",
                ValidationError::InvalidCharacters("a\"; DROP TABLE x; --".to_string()),
            ),
            ("select", ValidationError::ReservedKeyword("select".to_string())),
        ];

        for (name, expected_error) in test_cases {
            assert_eq!(validate_identifier(name), Err(expected_error), "{}", name);
        }
    }

    #[test]
    fn test_too_long_name() {
        match validate_identifier(&"a".repeat(64)) {
            Err(ValidationError::TooLong {
                length, max_length, ..
            }) => {
                assert_eq!(length, 64);
                assert_eq!(max_length, 63);
            }
            other => panic!("Expected TooLong error, got {:?}", other),
        }
    }

    #[test]
    fn test_lifecycle_columns_reserved_for_user_fields() {
        for field in ["__created_at__", "__updated_at__", "__DELETED_AT__"] {
            assert_eq!(
                validate_column_name(field),
                Err(ValidationError::ReservedColumn(field.to_string()))
            );
        }
    }

    #[test]
    fn test_schema_validation_skips_managed_lifecycle_columns() {
        let schema = TableSchema::new("children", "id")
            .column(ColumnDef::new("id", "UUID", false))
            .column(ColumnDef::new("parent_id", "UUID", false))
            .foreign_key(ForeignKey::new("parent_id", "parents", "id", OnDelete::Cascade))
            .with_lifecycle();

        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn test_schema_validation_rejects_bad_reference() {
        let schema = TableSchema::new("children", "id")
            .column(ColumnDef::new("id", "UUID", false))
            .foreign_key(ForeignKey::new("parent_id", "bad-table", "id", OnDelete::Cascade));

        assert!(matches!(
            validate_schema(&schema),
            Err(ValidationError::InvalidCharacters(_))
        ));
    }
}
