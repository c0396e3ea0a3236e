//! Users repository

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::sqlite_helpers::now_iso8601;

/// Shortest username accepted by [`UsersRepository::create`]
pub const MIN_USERNAME_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub favorite_genre: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub favorite_genre: String,
}

type UserRow = (String, String, String, String);

const SELECT_USER: &str = "SELECT id, username, favorite_genre, created_at FROM users";

fn row_to_record(r: UserRow) -> UserRecord {
    UserRecord {
        id: r.0,
        username: r.1,
        favorite_genre: r.2,
        created_at: r.3,
    }
}

pub struct UsersRepository {
    pool: SqlitePool,
}

impl UsersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, user: CreateUser) -> Result<UserRecord> {
        let username = user.username.trim();
        if username.chars().count() < MIN_USERNAME_LENGTH {
            anyhow::bail!(
                "Username must be at least {} characters",
                MIN_USERNAME_LENGTH
            );
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, username, favorite_genre, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(&user.favorite_genre)
        .bind(now_iso8601())
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create user"))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_record))
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE username = ?", SELECT_USER))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_record))
    }

    /// Count users
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
