mod database;
mod logging;
mod migrations;

pub use database::DatabaseConfig;
pub use logging::LoggingConfig;
pub use migrations::MigrationsConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MigrateError, Result};

/// Root configuration for tidemark.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TidemarkConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Catalogue and ledger configuration.
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TidemarkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MigrateError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content);

        let config: Self = toml::from_str(&content)
            .map_err(|e| MigrateError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.migrations.ledger_table()?;
        if self.migrations.extension.is_empty() || self.migrations.extension.contains('.') {
            return Err(MigrateError::Config(format!(
                "Invalid migration file extension '{}'",
                self.migrations.extension
            )));
        }
        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let Ok(re) = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") else {
        return result;
    };

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
