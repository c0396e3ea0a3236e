//! Table bootstrap
//!
//! Creates any missing table at startup. Existing tables are left alone; there
//! is no support for column changes.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Table definitions in creation order (books reference authors)
const TABLES: &[(&str, &str)] = &[
    (
        "authors",
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            born INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "books",
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL UNIQUE,
            published INTEGER NOT NULL,
            author_id TEXT NOT NULL REFERENCES authors(id),
            genres TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            favorite_genre TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    ),
];

/// Check if a table exists in the database
async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool, sqlx::Error> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Create every missing table, returning the names of the tables created
pub async fn sync_schema(pool: &SqlitePool) -> Result<Vec<String>> {
    let mut created = Vec::new();

    for (name, sql) in TABLES {
        if table_exists(pool, name).await? {
            debug!(table = name, "Table already present");
            continue;
        }

        sqlx::query(sql.trim())
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create table {}", name))?;
        info!(table = name, "Created table");
        created.push(name.to_string());
    }

    Ok(created)
}
