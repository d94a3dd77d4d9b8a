// src/core/database.rs
//! SQLite connection management and table setup

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::core::FsOps;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file and run migrations
    pub async fn open(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            FsOps::ensure_dir_exists(parent).await?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let options = SqliteConnectOptions::from_str(&database_url)
            .context("Invalid database URL")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to database: {}", database_path.display())
            })?;

        info!(
            "Database connection established: {}",
            database_path.display()
        );

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs.
    /// A single connection that never idles out keeps the data alive.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get pool reference for custom operations
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn into_pool(self) -> SqlitePool {
        self.pool
    }

    /// Create tables and indexes if they are missing
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_type TEXT NOT NULL DEFAULT 'OTHER',
                title TEXT NOT NULL DEFAULT '',
                file_path TEXT,
                external_url TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                original_name TEXT NOT NULL DEFAULT '',
                size_bytes INTEGER NOT NULL DEFAULT 0,
                uploaded_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_type_uploaded ON documents(doc_type, uploaded_at);",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role TEXT NOT NULL COLLATE NOCASE,
                location TEXT NOT NULL COLLATE NOCASE,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_job_queries_lookup ON job_queries(role, location, created_at);",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_postings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query_id INTEGER NOT NULL REFERENCES job_queries(id) ON DELETE CASCADE,
                job_id TEXT NOT NULL,
                title TEXT NOT NULL,
                company TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL,
                via TEXT NOT NULL DEFAULT 'linkedin',
                created_at TEXT NOT NULL,
                UNIQUE (query_id, job_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_job_postings_job_id ON job_postings(job_id);")
            .execute(&self.pool)
            .await?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        ping(&self.pool).await
    }
}

/// Round-trip a trivial statement through the pool
pub async fn ping(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// Startup wiring: where the database lives and the pool once opened.
#[derive(Debug)]
pub struct DatabaseConfig {
    pub database_path: PathBuf,
    pub pool: Option<SqlitePool>,
}

impl DatabaseConfig {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database_path,
            pool: None,
        }
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            database_path: PathBuf::from(":memory:"),
            pool: Some(pool),
        }
    }

    /// Initialize the database connection pool
    pub async fn init_pool(&mut self) -> Result<()> {
        let db = Database::open(&self.database_path).await?;
        self.pool = Some(db.into_pool());
        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> Result<&SqlitePool> {
        self.pool.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Database pool not initialized. Call init_pool() first.")
        })
    }
}
