use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use tracing::debug;

use tidemark_core::config::DatabaseConfig;
use tidemark_core::error::{MigrateError, Result};

/// Database connection wrapper providing connection pooling.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    config: DatabaseConfig,
}

impl Database {
    /// Connect and verify the connection with a ping.
    ///
    /// Any failure is reported as `ConnectionFailed`.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let options = Self::connect_options(config)?;

        debug!("Connecting to {}", config.describe());
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size.max(1))
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| {
                MigrateError::ConnectionFailed(format!("{}: {}", config.describe(), e))
            })?;

        let db = Self {
            pool,
            config: config.clone(),
        };
        db.ping().await?;
        Ok(db)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            config: DatabaseConfig::default(),
        }
    }

    /// Build connect options from the URL, or from the individual fields.
    pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
        if !config.is_configured() {
            return Err(MigrateError::Config(
                "No database configured: set database.url, DATABASE_URL or PSQL_HOST".into(),
            ));
        }

        let mut options = if config.url.is_empty() {
            PgConnectOptions::new()
        } else {
            PgConnectOptions::from_str(&config.url)
                .map_err(|e| MigrateError::Config(format!("Invalid database URL: {}", e)))?
        };

        if let Some(host) = &config.host {
            options = options.host(host);
        }
        if let Some(port) = config.port {
            options = options.port(port);
        }
        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        if let Some(dbname) = &config.dbname {
            options = options.database(dbname);
        }
        if let Some(sslmode) = &config.sslmode {
            let mode = PgSslMode::from_str(sslmode)
                .map_err(|e| MigrateError::Config(format!("Invalid sslmode '{}': {}", sslmode, e)))?;
            options = options.ssl_mode(mode);
        }
        if let Some(secs) = config.statement_timeout_secs {
            options = options.options([("statement_timeout", format!("{}s", secs))]);
        }

        Ok(options)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Check database connectivity.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| MigrateError::ConnectionFailed(format!("Ping failed: {}", e)))?;
        Ok(())
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
