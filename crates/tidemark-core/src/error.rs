use std::path::PathBuf;

use thiserror::Error;

use crate::migration::{Direction, MigrationId};

/// Core error type for migration runs.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Migration directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read migration directory {}: {source}", .path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to query migration ledger: {0}")]
    LedgerQueryFailed(String),

    #[error("Target version '{0}' does not match any migration in the catalogue")]
    UnknownTarget(String),

    #[error("Migration {unit} failed ({direction}) after {} completed step(s): {source}", .completed.len())]
    StepFailed {
        unit: MigrationId,
        direction: Direction,
        /// Units stepped successfully in this pass before the failure, in order.
        completed: Vec<MigrationId>,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("Duplicate migration identifier: {0}")]
    DuplicateMigration(String),

    #[error("Invalid migration script {unit}: {reason}")]
    InvalidScript { unit: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl MigrateError {
    /// Whether the error must terminate the run.
    ///
    /// A missing migration directory only means there is nothing to do yet.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MigrateError::DirectoryNotFound(_))
    }

    /// The unit whose step failed, if this is a step failure.
    pub fn failed_unit(&self) -> Option<&MigrationId> {
        match self {
            MigrateError::StepFailed { unit, .. } => Some(unit),
            _ => None,
        }
    }
}

/// Result type alias using MigrateError.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_not_fatal() {
        let err = MigrateError::DirectoryNotFound(PathBuf::from("./migrations"));
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Migration directory not found: ./migrations"
        );
    }

    #[test]
    fn test_step_failure_reports_unit_and_progress() {
        let err = MigrateError::StepFailed {
            unit: MigrationId::new("003_index"),
            direction: Direction::Up,
            completed: vec![MigrationId::new("001_init"), MigrationId::new("002_add_col")],
            source: Box::new(MigrateError::Database("syntax error".into())),
        };

        assert!(err.is_fatal());
        assert_eq!(err.failed_unit().map(|u| u.as_str()), Some("003_index"));
        let message = err.to_string();
        assert!(message.contains("003_index"));
        assert!(message.contains("2 completed"));
        assert!(message.contains("syntax error"));
    }
}
