mod migrate;
mod status;

pub use migrate::MigrateCommand;
pub use status::StatusCommand;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing::info;

use tidemark_core::config::TidemarkConfig;
use tidemark_core::migration::OrderingKind;
use tidemark_core::MigrateError;
use tidemark_runtime::{Database, MigrationRunner};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "tidemark.toml";

/// tidemark - versioned PostgreSQL schema migrations
#[derive(Parser)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to ./tidemark.toml when present).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Bring the database to a target version (latest by default).
    Migrate(MigrateCommand),

    /// Show applied, pending and unknown migrations.
    Status(StatusCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        // Load .env if present
        dotenvy::dotenv().ok();

        let config = load_config(self.config.as_deref(), Path::new(DEFAULT_CONFIG_FILE))?;
        crate::logging::init(&config.logging, self.verbose);

        match self.command {
            Commands::Migrate(cmd) => cmd.execute(config).await,
            Commands::Status(cmd) => cmd.execute(config).await,
        }
    }
}

/// Connection and catalogue flags shared by every command.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Directory holding the migration files.
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// PostgreSQL connection URL. Falls back to PSQL_* variables when unset.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Ledger table name, optionally schema-qualified.
    #[arg(long)]
    pub table: Option<String>,

    /// Identifier ordering: lexicographic or numeric_prefix.
    #[arg(long)]
    pub ordering: Option<OrderingKind>,
}

impl ConnectionArgs {
    /// Apply command-line overrides on top of the file configuration.
    pub fn apply(&self, config: &mut TidemarkConfig) -> Result<()> {
        if let Some(dir) = &self.dir {
            config.migrations.dir = dir.clone();
        }
        if let Some(url) = self.database_url.as_ref().filter(|u| !u.is_empty()) {
            config.database.url = url.clone();
        }
        if let Some(table) = &self.table {
            config.migrations.table = table.clone();
        }
        if let Some(ordering) = self.ordering {
            config.migrations.ordering = ordering;
        }

        if config.database.url.is_empty() {
            config.database = std::mem::take(&mut config.database).with_psql_env();
        }
        config.validate()?;
        Ok(())
    }
}

/// Read the explicit config file, else `fallback` when it exists, else
/// defaults.
pub fn load_config(explicit: Option<&Path>, fallback: &Path) -> Result<TidemarkConfig> {
    match explicit {
        Some(path) => TidemarkConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display())),
        None if fallback.exists() => TidemarkConfig::from_file(fallback)
            .with_context(|| format!("Failed to load {}", fallback.display())),
        None => Ok(TidemarkConfig::default()),
    }
}

/// Connect to the database and build a runner over the configured catalogue.
async fn connect(config: &TidemarkConfig) -> Result<(Database, MigrationRunner)> {
    if !config.database.is_configured() {
        anyhow::bail!(
            "No database configured.\nSet DATABASE_URL, pass --database-url, or export PSQL_HOST / PSQL_DBNAME."
        );
    }

    println!(
        "  {} Connecting to {}",
        style("→").dim(),
        config.database.describe()
    );
    let db = Database::from_config(&config.database).await?;
    info!("Connected to {}", config.database.describe());

    let runner = MigrationRunner::new(db.pool().clone(), &config.migrations)?;
    Ok((db, runner))
}

/// Notice for an error that ends the command successfully, `None` when the
/// error is fatal.
fn benign_notice(err: &MigrateError) -> Option<String> {
    if err.is_fatal() {
        return None;
    }
    Some(match err {
        MigrateError::DirectoryNotFound(dir) => format!(
            "No migration directory found at {}, assuming no migrations required yet",
            dir.display()
        ),
        other => other.to_string(),
    })
}

fn banner() {
    println!();
    println!(
        "  {}  {} v{}",
        style("≋").bold(),
        style("TIDEMARK").bold().cyan(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parse_migrate() {
        let cli = Cli::try_parse_from(["tidemark", "migrate"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_migrate_with_version() {
        let cli = Cli::try_parse_from([
            "tidemark",
            "migrate",
            "--dir",
            "db/migrations",
            "--version",
            "002_add_col",
            "--dry-run",
        ])
        .unwrap();

        let Commands::Migrate(cmd) = cli.command else {
            panic!("expected migrate");
        };
        assert_eq!(cmd.version.as_deref(), Some("002_add_col"));
        assert_eq!(cmd.connection.dir, Some(PathBuf::from("db/migrations")));
        assert!(cmd.dry_run);
    }

    #[test]
    fn test_cli_parse_status_json() {
        let cli = Cli::try_parse_from(["tidemark", "--verbose", "status", "--json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status(ref s) if s.json));
    }

    #[test]
    fn test_cli_rejects_unknown_ordering() {
        let cli = Cli::try_parse_from(["tidemark", "migrate", "--ordering", "random"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = TidemarkConfig::default();
        let args = ConnectionArgs {
            dir: Some(PathBuf::from("/srv/migrations")),
            database_url: Some("postgres://localhost/app".into()),
            table: Some("ops.schema_ledger".into()),
            ordering: Some(OrderingKind::NumericPrefix),
        };

        args.apply(&mut config).unwrap();
        assert_eq!(config.migrations.dir, PathBuf::from("/srv/migrations"));
        assert_eq!(config.database.url, "postgres://localhost/app");
        assert_eq!(config.migrations.table, "ops.schema_ledger");
        assert_eq!(config.migrations.ordering, OrderingKind::NumericPrefix);
    }

    #[test]
    fn test_overrides_validate_table() {
        let mut config = TidemarkConfig::default();
        let args = ConnectionArgs {
            database_url: Some("postgres://localhost/app".into()),
            table: Some("bad table; drop".into()),
            ..Default::default()
        };
        assert!(args.apply(&mut config).is_err());
    }

    #[test]
    fn test_missing_directory_is_benign() {
        let err = MigrateError::DirectoryNotFound(PathBuf::from("./migrations"));
        let notice = benign_notice(&err).unwrap();
        assert!(notice.contains("./migrations"));
        assert!(notice.contains("assuming no migrations required yet"));
    }

    #[test]
    fn test_fatal_errors_have_no_notice() {
        assert!(benign_notice(&MigrateError::ConnectionFailed("refused".into())).is_none());
        assert!(benign_notice(&MigrateError::UnknownTarget("999_missing".into())).is_none());
    }

    #[test]
    fn test_load_config_prefers_explicit_path() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("custom.toml");
        std::fs::write(&explicit, "[migrations]\ntable = \"custom_ledger\"\n").unwrap();

        let config = load_config(Some(&explicit), &dir.path().join("tidemark.toml")).unwrap();
        assert_eq!(config.migrations.table, "custom_ledger");
    }

    #[test]
    fn test_load_config_missing_explicit_path_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing), &missing).is_err());
    }

    #[test]
    fn test_load_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(None, &dir.path().join("tidemark.toml")).unwrap();
        assert_eq!(config.migrations.table, "migrations");
        assert_eq!(config.migrations.dir, PathBuf::from("./migrations"));
    }

    #[test]
    fn test_load_config_reads_fallback_when_present() {
        let dir = TempDir::new().unwrap();
        let fallback = dir.path().join("tidemark.toml");
        std::fs::write(&fallback, "[migrations]\ndir = \"sql\"\n").unwrap();

        let config = load_config(None, &fallback).unwrap();
        assert_eq!(config.migrations.dir, PathBuf::from("sql"));
    }
}
