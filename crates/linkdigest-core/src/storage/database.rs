use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

use crate::config::AppConfig;
use crate::Result;

/// SQLite connection pool with the bookmark and job schema
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open the database named in the config, creating it if needed
    pub async fn new(config: &AppConfig) -> Result<Self> {
        Self::open(&config.database_path()).await
    }

    /// Open (or create) a database file and run migrations
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!("Connecting to database: {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(10))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// A private in-memory database (one connection, so one schema)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        tracing::debug!("Running database migrations");

        for migration in [MIGRATION_001_BOOKMARKS, MIGRATION_002_SUMMARY_JOBS] {
            sqlx::query(migration).execute(&self.pool).await?;
        }
        for index in MIGRATION_INDEXES {
            sqlx::query(index).execute(&self.pool).await?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

const MIGRATION_001_BOOKMARKS: &str = r#"
CREATE TABLE IF NOT EXISTS bookmarks (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    title TEXT,
    folder TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    short_summary TEXT,
    long_summary TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    category TEXT,
    provider TEXT,
    quality_score REAL,
    quality_issues TEXT NOT NULL DEFAULT '[]',
    extracted_content TEXT,
    extraction_method TEXT,
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

const MIGRATION_002_SUMMARY_JOBS: &str = r#"
CREATE TABLE IF NOT EXISTS summary_jobs (
    id TEXT PRIMARY KEY,
    bookmark_id TEXT NOT NULL REFERENCES bookmarks(id) ON DELETE CASCADE,
    provider TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    priority INTEGER NOT NULL DEFAULT 0,
    attempts INTEGER NOT NULL DEFAULT 0,
    max_attempts INTEGER NOT NULL DEFAULT 3,
    error TEXT,
    retry_at DATETIME,
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    started_at DATETIME,
    completed_at DATETIME
)
"#;

const MIGRATION_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_bookmarks_status ON bookmarks(status)",
    "CREATE INDEX IF NOT EXISTS idx_summary_jobs_bookmark ON summary_jobs(bookmark_id)",
    "CREATE INDEX IF NOT EXISTS idx_summary_jobs_status ON summary_jobs(status)",
];
