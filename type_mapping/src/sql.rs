//! SQL type conversion utilities
//!
//! This module handles conversion between Rust types
//! and their SQL equivalents.

/// Strip whitespace so `Option < Uuid >` and `Option<Uuid>` match the same arm
pub fn normalize_type(rust_type: &str) -> String {
    rust_type.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Map Rust type names to PostgreSQL types for DDL generation
pub fn rust_type_to_pg_type(rust_type: &str) -> &'static str {
    let normalized = normalize_type(rust_type);
    let inner = unwrap_option(&normalized);

    match inner {
        "Uuid" | "uuid::Uuid" => "UUID",
        "String" => "VARCHAR",
        "i8" | "i16" => "SMALLINT",
        "i32" | "u16" => "INTEGER",
        "i64" | "u32" => "BIGINT",
        "u64" => "NUMERIC(20,0)", // PostgreSQL doesn't have native u64
        "f32" => "REAL",
        "f64" => "DOUBLE PRECISION",
        "bool" => "BOOLEAN",
        "DateTime<Utc>"
        | "chrono::DateTime<Utc>"
        | "chrono::DateTime<chrono::Utc>"
        | "chrono::NaiveDateTime"
        | "NaiveDateTime" => "TIMESTAMP WITH TIME ZONE",
        "chrono::NaiveDate" | "NaiveDate" => "DATE",
        "serde_json::Value" | "Value" => "JSONB",
        "Vec<String>" => "TEXT[]",
        _ => "VARCHAR",
    }
}

/// Check if a Rust type is Optional (nullable in SQL)
pub fn is_optional_type(rust_type: &str) -> bool {
    let normalized = normalize_type(rust_type);
    normalized.starts_with("Option<") || normalized.starts_with("std::option::Option<")
}

fn unwrap_option(normalized: &str) -> &str {
    normalized
        .strip_prefix("std::option::Option<")
        .or_else(|| normalized.strip_prefix("Option<"))
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_types() {
        assert_eq!(rust_type_to_pg_type("Uuid"), "UUID");
        assert_eq!(rust_type_to_pg_type("String"), "VARCHAR");
        assert_eq!(rust_type_to_pg_type("i64"), "BIGINT");
        assert_eq!(rust_type_to_pg_type("bool"), "BOOLEAN");
        assert_eq!(
            rust_type_to_pg_type("chrono::DateTime<chrono::Utc>"),
            "TIMESTAMP WITH TIME ZONE"
        );
    }

    #[test]
    fn optional_types_map_to_inner_type() {
        assert_eq!(rust_type_to_pg_type("Option < Uuid >"), "UUID");
        assert_eq!(
            rust_type_to_pg_type("Option<DateTime<Utc>>"),
            "TIMESTAMP WITH TIME ZONE"
        );
        assert!(is_optional_type("Option < i32 >"));
        assert!(!is_optional_type("i32"));
    }

    #[test]
    fn unknown_types_fall_back_to_varchar() {
        assert_eq!(rust_type_to_pg_type("MyEnum"), "VARCHAR");
    }
}
