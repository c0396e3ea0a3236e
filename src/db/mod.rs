//! Database connection and repositories
//!
//! SQLite via sqlx. Each table gets a small repository created on demand from
//! the shared pool.

pub mod authors;
pub mod books;
pub mod schema;
pub mod seed;
pub mod sqlite_helpers;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub use authors::{AuthorRecord, AuthorsRepository};
pub use books::{BookFilter, BookRecord, BooksRepository, CreateBook, NewBook};
pub use schema::sync_schema;
pub use seed::{SeedResult, seed_sample_data};
pub use users::{CreateUser, UserRecord, UsersRepository};

/// Default pool size when DATABASE_MAX_CONNECTIONS is not set
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Database wrapper providing connection pool access
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database, creating the file if needed.
    ///
    /// File databases run in WAL mode; writers queue on the busy timeout
    /// instead of failing. In-memory databases are pinned to a single
    /// long-lived connection, since every SQLite connection to `:memory:` is a
    /// separate database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {}", url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        if !in_memory
            && let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections.max(1) })
            .acquire_timeout(Duration::from_secs(10));
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database at {}", url))?;

        Ok(Self { pool })
    }

    /// Fresh in-memory database with the schema applied
    pub async fn in_memory() -> Result<Self> {
        let db = Self::connect("sqlite::memory:", DEFAULT_MAX_CONNECTIONS).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Create missing tables
    pub async fn migrate(&self) -> Result<Vec<String>> {
        sync_schema(&self.pool).await
    }

    /// Check that the database answers queries
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get a books repository
    pub fn books(&self) -> BooksRepository {
        BooksRepository::new(self.pool.clone())
    }

    /// Get an authors repository
    pub fn authors(&self) -> AuthorsRepository {
        AuthorsRepository::new(self.pool.clone())
    }

    /// Get a users repository
    pub fn users(&self) -> UsersRepository {
        UsersRepository::new(self.pool.clone())
    }
}

/// Whether an error chain bottoms out in a UNIQUE constraint violation
pub fn is_unique_violation(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<sqlx::Error>())
        .any(|e| matches!(e, sqlx::Error::Database(db) if db.is_unique_violation()))
}
