//! End-to-end runs against a real PostgreSQL.
//!
//! Set TEST_DATABASE_URL to run these; without it every test returns early.
//! Each test uses its own ledger table and table-name prefix.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;
use tidemark_core::config::{DatabaseConfig, MigrationsConfig};
use tidemark_core::migration::Target;
use tidemark_core::MigrateError;
use tidemark_runtime::{Database, MigrationRunner};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

struct Fixture {
    db: Database,
    dir: TempDir,
    prefix: String,
}

impl Fixture {
    async fn new() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let db = Database::from_config(&DatabaseConfig {
            url,
            ..Default::default()
        })
        .await
        .expect("TEST_DATABASE_URL is set but unreachable");

        let prefix = format!(
            "tm_{}_{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        );
        Some(Self {
            db,
            dir: TempDir::new().unwrap(),
            prefix,
        })
    }

    fn write(&self, id: &str, up: &str, down: &str) {
        let up = up.replace("{p}", &self.prefix);
        let down = down.replace("{p}", &self.prefix);
        fs::write(
            self.dir.path().join(format!("{}.sql", id)),
            format!("-- +migrate Up\n{}\n\n-- +migrate Down\n{}\n", up, down),
        )
        .unwrap();
    }

    fn write_raw(&self, id: &str, content: &str) {
        fs::write(
            self.dir.path().join(format!("{}.sql", id)),
            content.replace("{p}", &self.prefix),
        )
        .unwrap();
    }

    async fn index_exists(&self, name: &str) -> bool {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pg_indexes WHERE indexname = $1)",
        )
        .bind(format!("{}_{}", self.prefix, name))
        .fetch_one(self.db.pool())
        .await
        .unwrap()
    }

    fn write_three(&self) {
        self.write(
            "001_init",
            "CREATE TABLE {p}_users (id SERIAL PRIMARY KEY);",
            "DROP TABLE {p}_users;",
        );
        self.write(
            "002_add_col",
            "ALTER TABLE {p}_users ADD COLUMN email TEXT;",
            "ALTER TABLE {p}_users DROP COLUMN email;",
        );
        self.write(
            "003_index",
            "CREATE INDEX {p}_users_email ON {p}_users (email);",
            "DROP INDEX {p}_users_email;",
        );
    }

    fn runner(&self) -> MigrationRunner {
        self.runner_for(self.dir.path())
    }

    fn runner_for(&self, dir: &Path) -> MigrationRunner {
        let config = MigrationsConfig {
            dir: dir.to_path_buf(),
            table: format!("{}_ledger", self.prefix),
            ..Default::default()
        };
        MigrationRunner::new(self.db.pool().clone(), &config).unwrap()
    }

    async fn ledger(&self) -> Vec<String> {
        sqlx::query_scalar(&format!(
            "SELECT id FROM \"{}_ledger\" ORDER BY id",
            self.prefix
        ))
        .fetch_all(self.db.pool())
        .await
        .unwrap()
    }

    async fn cleanup(self) {
        for stmt in [
            format!("DROP TABLE IF EXISTS {}_users CASCADE", self.prefix),
            format!("DROP TABLE IF EXISTS \"{}_ledger\"", self.prefix),
        ] {
            sqlx::query(&stmt).execute(self.db.pool()).await.unwrap();
        }
        self.db.close().await;
    }
}

#[tokio::test]
async fn test_upgrade_downgrade_round_trip() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    fx.write_three();
    let runner = fx.runner();

    let report = runner.run(&Target::Latest).await.unwrap();
    assert_eq!(report.applied().count(), 3);
    assert_eq!(fx.ledger().await, ["001_init", "002_add_col", "003_index"]);

    let again = runner.run(&Target::Latest).await.unwrap();
    assert!(again.is_noop());

    let report = runner
        .run(&Target::from_arg(Some("001_init")))
        .await
        .unwrap();
    assert_eq!(report.reverted().count(), 2);
    assert_eq!(fx.ledger().await, ["001_init"]);

    runner.run(&Target::Latest).await.unwrap();
    assert_eq!(fx.ledger().await, ["001_init", "002_add_col", "003_index"]);

    fx.cleanup().await;
}

#[tokio::test]
async fn test_failed_step_leaves_earlier_steps_applied() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    fx.write_three();
    fx.write(
        "004_broken",
        "ALTER TABLE {p}_users ADD COLUMN nope NOT_A_TYPE;",
        "SELECT 1;",
    );
    fx.write(
        "005_after",
        "ALTER TABLE {p}_users ADD COLUMN later TEXT;",
        "ALTER TABLE {p}_users DROP COLUMN later;",
    );

    let err = fx.runner().run(&Target::Latest).await.unwrap_err();
    match &err {
        MigrateError::StepFailed {
            unit, completed, ..
        } => {
            assert_eq!(unit, "004_broken");
            assert_eq!(completed.len(), 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fx.ledger().await, ["001_init", "002_add_col", "003_index"]);

    fx.cleanup().await;
}

#[tokio::test]
async fn test_status_and_plan() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    fx.write_three();
    let runner = fx.runner();

    runner
        .run(&Target::from_arg(Some("002_add_col")))
        .await
        .unwrap();

    let status = runner.status().await.unwrap();
    assert_eq!(status.applied.len(), 2);
    assert_eq!(status.pending.len(), 1);
    assert!(status.applied.iter().all(|e| e.applied_at.is_some()));

    let plan = runner.plan(&Target::Latest).await.unwrap();
    assert!(!plan.is_noop());
    assert_eq!(fx.ledger().await.len(), 2);

    fx.cleanup().await;
}

#[tokio::test]
async fn test_missing_directory_is_benign() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    let runner = fx.runner_for(&fx.dir.path().join("absent"));

    let err = runner.run(&Target::Latest).await.unwrap_err();
    assert!(matches!(err, MigrateError::DirectoryNotFound(_)));
    assert!(!err.is_fatal());

    fx.cleanup().await;
}

#[tokio::test]
async fn test_unknown_target_changes_nothing() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    fx.write_three();
    let runner = fx.runner();

    let err = runner
        .run(&Target::from_arg(Some("999_missing")))
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::UnknownTarget(_)));
    assert!(fx.ledger().await.is_empty());

    fx.cleanup().await;
}

#[tokio::test]
async fn test_notransaction_unit_runs_outside_transaction() {
    let Some(fx) = Fixture::new().await else {
        return;
    };
    fx.write(
        "001_init",
        "CREATE TABLE {p}_users (id SERIAL PRIMARY KEY, email TEXT);",
        "DROP TABLE {p}_users;",
    );
    // CREATE INDEX CONCURRENTLY is rejected inside a transaction block.
    fx.write_raw(
        "002_concurrent_index",
        "-- +migrate Up notransaction\n\
         CREATE INDEX CONCURRENTLY {p}_users_email ON {p}_users (email);\n\
         \n\
         -- +migrate Down notransaction\n\
         DROP INDEX CONCURRENTLY {p}_users_email;\n",
    );
    let runner = fx.runner();

    let report = runner.run(&Target::Latest).await.unwrap();
    assert_eq!(report.applied().count(), 2);
    assert!(fx.index_exists("users_email").await);
    assert_eq!(fx.ledger().await, ["001_init", "002_concurrent_index"]);

    runner
        .run(&Target::from_arg(Some("001_init")))
        .await
        .unwrap();
    assert!(!fx.index_exists("users_email").await);
    assert_eq!(fx.ledger().await, ["001_init"]);

    fx.cleanup().await;
}
