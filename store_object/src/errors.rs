use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error during {operation} on '{table}': {source}")]
    Database {
        table: String,
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Constraint '{constraint}' violated on '{table}': {message}")]
    ConstraintViolation {
        table: String,
        constraint: String,
        message: String,
    },

    #[error("Record not found in '{table}': {id}")]
    NotFound { table: String, id: String },

    #[error("Validation error on '{table}.{field}': {message}")]
    Validation {
        table: String,
        field: String,
        message: String,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction {operation} failed: {message}")]
    Transaction { operation: String, message: String },
}

impl StoreError {
    pub fn database_operation(table: &str, operation: &str, source: sqlx::Error) -> Self {
        Self::Database {
            table: table.to_string(),
            operation: operation.to_string(),
            source,
        }
    }

    pub fn validation(table: &str, field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            table: table.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn constraint(table: &str, constraint: &str, message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            table: table.to_string(),
            constraint: constraint.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(table: &str, id: impl std::fmt::Debug) -> Self {
        Self::NotFound {
            table: table.to_string(),
            id: format!("{:?}", id),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn transaction(operation: &str, message: impl std::fmt::Display) -> Self {
        Self::Transaction {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// True for uniqueness, foreign key and check failures from either backend.
    ///
    /// The storage error itself is passed through untouched; this only inspects it.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::ConstraintViolation { .. } => true,
            Self::Database {
                source: sqlx::Error::Database(db_err),
                ..
            } => {
                db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_constraint_errors_are_constraint_violations() {
        let err = StoreError::constraint("parents", "parents_name_key", "duplicate value");
        assert!(err.is_constraint_violation());
        assert!(err.to_string().contains("parents_name_key"));
    }

    #[test]
    fn other_errors_are_not_constraint_violations() {
        assert!(!StoreError::not_found("parents", 7).is_constraint_violation());
        assert!(!StoreError::database_operation("parents", "select", sqlx::Error::RowNotFound)
            .is_constraint_violation());
    }
}
