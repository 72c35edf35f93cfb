//! # Configuration Management for SoftHaus
//!
//! This crate provides the configuration structures shared by the SoftHaus crates:
//! database connection settings and soft-delete behaviour.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{CascadeScope, DatabaseConfig, SoftDeleteConfig};
//!
//! let db_config = DatabaseConfig::new(
//!     "localhost".to_string(), 5432, "myapp".to_string(),
//!     "postgres".to_string(), "password".to_string(),
//!     1, 10, 30, 600, 3600,
//! );
//!
//! let soft_delete = SoftDeleteConfig::new(CascadeScope::All, true, false);
//! assert_eq!(soft_delete.cascade_scope, CascadeScope::All);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! database = "myapp"
//! username = "postgres"
//! password = "password"
//! min_connections = 1
//! max_connections = 10
//! connection_timeout_seconds = 30
//! idle_timeout_seconds = 600
//! max_lifetime_seconds = 3600
//!
//! [soft_delete]
//! cascade_scope = "all"   # or "alive"
//! auto_migrate = true
//! recreate_tables = false
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from softhaus.toml (or the file named by SOFTHAUS_CONFIG)
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./softhaus.toml";
const CONFIG_PATH_ENV: &str = "SOFTHAUS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub soft_delete: SoftDeleteConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
}

/// Which dependents a cascading soft delete touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeScope {
    /// Every dependent row, including ones that are already dead (they get a fresh stamp)
    #[default]
    All,
    /// Only dependents that are still alive; existing deletion stamps are preserved
    Alive,
}

/// Soft delete behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftDeleteConfig {
    #[serde(default)]
    pub cascade_scope: CascadeScope,
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
    #[serde(default)]
    pub recreate_tables: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SoftDeleteConfig {
    fn default() -> Self {
        Self {
            cascade_scope: CascadeScope::All,
            auto_migrate: true,
            recreate_tables: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file specified in .env or defaults
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is fine, the variable may come from the real environment
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            Self::from_file(&config_path)
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        } else {
            Err(ConfigError::Invalid(format!(
                "Config path must be specified in .env file as {} or in {} file",
                CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH
            )))
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;

        if db.host.is_empty() {
            return Err(ConfigError::Invalid(
                "Database host cannot be empty".to_string(),
            ));
        }
        if db.port == 0 {
            return Err(ConfigError::Invalid(
                "Database port cannot be zero".to_string(),
            ));
        }
        if db.database.is_empty() {
            return Err(ConfigError::Invalid(
                "Database name cannot be empty".to_string(),
            ));
        }
        if db.username.is_empty() {
            return Err(ConfigError::Invalid(
                "Database username cannot be empty".to_string(),
            ));
        }
        if db.min_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database min_connections must be greater than 0".to_string(),
            ));
        }
        if db.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }
        if db.min_connections > db.max_connections {
            return Err(ConfigError::Invalid(
                "Database min_connections cannot be greater than max_connections".to_string(),
            ));
        }
        if db.connection_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Database connection_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.soft_delete.recreate_tables && !self.soft_delete.auto_migrate {
            return Err(ConfigError::Invalid(
                "soft_delete.recreate_tables requires soft_delete.auto_migrate".to_string(),
            ));
        }

        Ok(())
    }
}

impl SoftDeleteConfig {
    /// Create a new soft delete configuration
    pub fn new(cascade_scope: CascadeScope, auto_migrate: bool, recreate_tables: bool) -> Self {
        Self {
            cascade_scope,
            auto_migrate,
            recreate_tables,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
        min_connections: u32,
        max_connections: u32,
        connection_timeout_seconds: u64,
        idle_timeout_seconds: u64,
        max_lifetime_seconds: u64,
    ) -> Self {
        Self {
            host,
            port,
            database,
            username,
            password,
            min_connections,
            max_connections,
            connection_timeout_seconds,
            idle_timeout_seconds,
            max_lifetime_seconds,
        }
    }

    /// Build connection string
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATABASE_SECTION: &str = r#"
[database]
host = "localhost"
port = 5432
database = "softhaus"
username = "postgres"
password = "password"
min_connections = 1
max_connections = 5
connection_timeout_seconds = 30
idle_timeout_seconds = 600
max_lifetime_seconds = 3600
"#;

    #[test]
    fn soft_delete_section_is_optional() {
        let config = AppConfig::from_toml_str(DATABASE_SECTION).unwrap();
        assert_eq!(config.soft_delete.cascade_scope, CascadeScope::All);
        assert!(config.soft_delete.auto_migrate);
        assert!(!config.soft_delete.recreate_tables);
    }

    #[test]
    fn parses_alive_cascade_scope() {
        let content = format!(
            "{}\n[soft_delete]\ncascade_scope = \"alive\"\n",
            DATABASE_SECTION
        );
        let config = AppConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.soft_delete.cascade_scope, CascadeScope::Alive);
        assert!(config.soft_delete.auto_migrate);
    }

    #[test]
    fn rejects_unknown_cascade_scope() {
        let content = format!(
            "{}\n[soft_delete]\ncascade_scope = \"transitive\"\n",
            DATABASE_SECTION
        );
        assert!(matches!(
            AppConfig::from_toml_str(&content),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn rejects_inverted_pool_bounds() {
        let content = DATABASE_SECTION.replace("min_connections = 1", "min_connections = 9");
        let err = AppConfig::from_toml_str(&content).unwrap_err();
        assert!(err.to_string().contains("min_connections"));
    }

    #[test]
    fn recreate_requires_auto_migrate() {
        let content = format!(
            "{}\n[soft_delete]\nauto_migrate = false\nrecreate_tables = true\n",
            DATABASE_SECTION
        );
        assert!(matches!(
            AppConfig::from_toml_str(&content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn builds_connection_string() {
        let db = DatabaseConfig::new(
            "db".to_string(),
            6543,
            "app".to_string(),
            "me".to_string(),
            "secret".to_string(),
            1,
            2,
            3,
            4,
            5,
        );
        assert_eq!(db.connection_string(), "postgresql://me:secret@db:6543/app");
    }
}
