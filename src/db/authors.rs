//! Authors repository

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::sqlite_helpers::now_iso8601;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub id: String,
    pub name: String,
    pub born: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

type AuthorRow = (String, String, Option<i32>, String, String);

const SELECT_AUTHOR: &str = "SELECT id, name, born, created_at, updated_at FROM authors";

fn row_to_record(r: AuthorRow) -> AuthorRecord {
    AuthorRecord {
        id: r.0,
        name: r.1,
        born: r.2,
        created_at: r.3,
        updated_at: r.4,
    }
}

pub struct AuthorsRepository {
    pool: SqlitePool,
}

impl AuthorsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new author
    pub async fn create(&self, name: &str, born: Option<i32>) -> Result<AuthorRecord> {
        let id = Uuid::new_v4().to_string();
        let now = now_iso8601();

        sqlx::query(
            "INSERT INTO authors (id, name, born, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(born)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create author"))
    }

    /// Get author by ID
    pub async fn get_by_id(&self, id: &str) -> Result<Option<AuthorRecord>> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!("{} WHERE id = ?", SELECT_AUTHOR))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_record))
    }

    /// Get author by exact name
    pub async fn get_by_name(&self, name: &str) -> Result<Option<AuthorRecord>> {
        let row = sqlx::query_as::<_, AuthorRow>(&format!("{} WHERE name = ?", SELECT_AUTHOR))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_record))
    }

    /// Find an author by name, creating it when missing.
    /// The flag is true when a new author was inserted.
    pub async fn get_or_create(&self, name: &str) -> Result<(AuthorRecord, bool)> {
        let mut conn = self.pool.acquire().await?;
        upsert_by_name(&mut conn, name).await
    }

    /// List all authors in insertion order
    pub async fn list(&self) -> Result<Vec<AuthorRecord>> {
        let rows = sqlx::query_as::<_, AuthorRow>(&format!(
            "{} ORDER BY rowid",
            SELECT_AUTHOR
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Count authors
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Set an author's birth year. Returns None when no author has that name.
    pub async fn set_born(&self, name: &str, born: i32) -> Result<Option<AuthorRecord>> {
        let result = sqlx::query("UPDATE authors SET born = ?, updated_at = ? WHERE name = ?")
            .bind(born)
            .bind(now_iso8601())
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_name(name).await
    }
}

/// Insert an author unless one with that name exists, then load it.
///
/// Concurrent callers racing on the same new name all end up with the same
/// row; exactly one of them sees `true`.
pub(crate) async fn upsert_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<(AuthorRecord, bool)> {
    let now = now_iso8601();
    let result = sqlx::query(
        r#"
        INSERT INTO authors (id, name, born, created_at, updated_at)
        VALUES (?, ?, NULL, ?, ?)
        ON CONFLICT(name) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query_as::<_, AuthorRow>(&format!("{} WHERE name = ?", SELECT_AUTHOR))
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

    Ok((row_to_record(row), result.rows_affected() == 1))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::db::Database;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::in_memory().await.unwrap();
        let authors = db.authors();

        let created = authors.create("Robert Martin", Some(1952)).await.unwrap();
        assert_eq!(created.born, Some(1952));

        let by_name = authors.get_by_name("Robert Martin").await.unwrap().unwrap();
        assert_eq!(by_name, created);
        assert!(authors.get_by_name("robert martin").await.unwrap().is_none());
        assert_eq!(authors.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_or_create() {
        let db = Database::in_memory().await.unwrap();
        let authors = db.authors();

        let (first, created) = authors.get_or_create("Sandi Metz").await.unwrap();
        assert!(created);
        assert_eq!(first.born, None);

        let (second, created) = authors.get_or_create("Sandi Metz").await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_set_born() {
        let db = Database::in_memory().await.unwrap();
        let authors = db.authors();
        authors.create("Joshua Kerievsky", None).await.unwrap();

        let updated = authors.set_born("Joshua Kerievsky", 1970).await.unwrap().unwrap();
        assert_eq!(updated.born, Some(1970));

        assert!(authors.set_born("Nobody", 1900).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let db = Database::in_memory().await.unwrap();
        let authors = db.authors();
        for name in ["Martin Fowler", "Fyodor Dostoevsky", "Robert Martin"] {
            authors.create(name, None).await.unwrap();
        }

        let names: Vec<String> = authors.list().await.unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["Martin Fowler", "Fyodor Dostoevsky", "Robert Martin"]);
    }
}
