//! Books repository
//!
//! Genres are stored as a JSON array in a TEXT column.

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::authors::{AuthorRecord, upsert_by_name};
use super::sqlite_helpers::{json_array_contains_sql, json_to_vec, now_iso8601, vec_to_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub published: i32,
    pub author_id: String,
    pub genres: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CreateBook {
    pub title: String,
    pub published: i32,
    pub author_id: String,
    pub genres: Vec<String>,
}

/// A book whose author is given by name
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub published: i32,
    pub author: String,
    pub genres: Vec<String>,
}

/// Optional filters for listing books
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Exact author name
    pub author: Option<String>,
    /// Genre the book must be tagged with
    pub genre: Option<String>,
}

type BookRow = (String, String, i32, String, String, String);

const SELECT_BOOK: &str =
    "SELECT b.id, b.title, b.published, b.author_id, b.genres, b.created_at FROM books b";

fn row_to_record(r: BookRow) -> BookRecord {
    BookRecord {
        id: r.0,
        title: r.1,
        published: r.2,
        author_id: r.3,
        genres: json_to_vec(&r.4),
        created_at: r.5,
    }
}

pub struct BooksRepository {
    pool: SqlitePool,
}

impl BooksRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new book
    pub async fn create(&self, book: CreateBook) -> Result<BookRecord> {
        let mut conn = self.pool.acquire().await?;
        insert_book(&mut conn, book).await
    }

    /// Insert a book together with its author, creating the author when
    /// missing. Both writes commit or neither does.
    ///
    /// Returns the book, its author and whether the author was created.
    pub async fn create_with_author(
        &self,
        book: NewBook,
    ) -> Result<(BookRecord, AuthorRecord, bool)> {
        let mut tx = self.pool.begin().await?;

        let (author, created) = upsert_by_name(&mut tx, &book.author).await?;
        let record = insert_book(
            &mut tx,
            CreateBook {
                title: book.title,
                published: book.published,
                author_id: author.id.clone(),
                genres: book.genres,
            },
        )
        .await?;

        tx.commit().await?;
        Ok((record, author, created))
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: &str) -> Result<Option<BookRecord>> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{} WHERE b.id = ?", SELECT_BOOK))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_record))
    }

    /// Get book by exact title
    pub async fn get_by_title(&self, title: &str) -> Result<Option<BookRecord>> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{} WHERE b.title = ?", SELECT_BOOK))
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_record))
    }

    /// List books matching the filter, in insertion order
    pub async fn list(&self, filter: &BookFilter) -> Result<Vec<BookRecord>> {
        let mut sql = format!(
            "{} JOIN authors a ON a.id = b.author_id WHERE 1=1",
            SELECT_BOOK
        );
        if filter.author.is_some() {
            sql.push_str(" AND a.name = ?");
        }
        if filter.genre.is_some() {
            sql.push_str(" AND ");
            sql.push_str(&json_array_contains_sql("b.genres"));
        }
        sql.push_str(" ORDER BY b.rowid");

        let mut query = sqlx::query_as::<_, BookRow>(&sql);
        if let Some(author) = &filter.author {
            query = query.bind(author);
        }
        if let Some(genre) = &filter.genre {
            query = query.bind(genre);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Count all books
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Book counts grouped by author ID. Authors without books are absent.
    pub async fn count_by_author(&self) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT author_id, COUNT(*) FROM books GROUP BY author_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Number of books written by one author
    pub async fn count_for_author(&self, author_id: &str) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM books WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

async fn insert_book(conn: &mut SqliteConnection, book: CreateBook) -> Result<BookRecord> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO books (id, title, published, author_id, genres, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&book.title)
    .bind(book.published)
    .bind(&book.author_id)
    .bind(vec_to_json(&book.genres))
    .bind(now_iso8601())
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query_as::<_, BookRow>(&format!("{} WHERE b.id = ?", SELECT_BOOK))
        .bind(&id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row_to_record(row))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::{Database, is_unique_violation};

    async fn add(db: &Database, title: &str, author: &str, genres: &[&str]) -> BookRecord {
        let (author, _) = db.authors().get_or_create(author).await.unwrap();
        db.books()
            .create(CreateBook {
                title: title.to_string(),
                published: 2008,
                author_id: author.id,
                genres: genres.iter().map(|g| g.to_string()).collect(),
            })
            .await
            .unwrap()
    }

    fn titles(books: Vec<BookRecord>) -> Vec<String> {
        books.into_iter().map(|b| b.title).collect()
    }

    #[tokio::test]
    async fn test_create_round_trips_genres() {
        let db = Database::in_memory().await.unwrap();
        let book = add(&db, "Clean Code", "Robert Martin", &["refactoring"]).await;

        let loaded = db.books().get_by_title("Clean Code").await.unwrap().unwrap();
        assert_eq!(loaded, book);
        assert_eq!(loaded.genres, vec!["refactoring"]);
    }

    #[tokio::test]
    async fn test_duplicate_title_is_unique_violation() {
        let db = Database::in_memory().await.unwrap();
        let book = add(&db, "Demons", "Fyodor Dostoevsky", &["classic"]).await;

        let err = db
            .books()
            .create(CreateBook {
                title: "Demons".to_string(),
                published: 1872,
                author_id: book.author_id,
                genres: vec![],
            })
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = Database::in_memory().await.unwrap();
        add(&db, "Clean Code", "Robert Martin", &["refactoring"]).await;
        add(&db, "Agile software development", "Robert Martin", &["agile", "patterns"]).await;
        add(&db, "Refactoring to patterns", "Joshua Kerievsky", &["refactoring", "patterns"]).await;
        let books = db.books();

        let all = books.list(&BookFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let by_author = BookFilter {
            author: Some("Robert Martin".to_string()),
            genre: None,
        };
        assert_eq!(
            titles(books.list(&by_author).await.unwrap()),
            vec!["Clean Code", "Agile software development"]
        );

        let by_genre = BookFilter {
            author: None,
            genre: Some("patterns".to_string()),
        };
        assert_eq!(
            titles(books.list(&by_genre).await.unwrap()),
            vec!["Agile software development", "Refactoring to patterns"]
        );

        let both = BookFilter {
            author: Some("Robert Martin".to_string()),
            genre: Some("refactoring".to_string()),
        };
        assert_eq!(titles(books.list(&both).await.unwrap()), vec!["Clean Code"]);

        let no_match = BookFilter {
            author: Some("Nobody".to_string()),
            genre: None,
        };
        assert!(books.list(&no_match).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counts() {
        let db = Database::in_memory().await.unwrap();
        let clean = add(&db, "Clean Code", "Robert Martin", &[]).await;
        add(&db, "Agile software development", "Robert Martin", &[]).await;
        let demons = add(&db, "Demons", "Fyodor Dostoevsky", &[]).await;
        let (metz, _) = db.authors().get_or_create("Sandi Metz").await.unwrap();
        let books = db.books();

        assert_eq!(books.count().await.unwrap(), 3);

        let grouped = books.count_by_author().await.unwrap();
        assert_eq!(grouped.get(&clean.author_id), Some(&2));
        assert_eq!(grouped.get(&demons.author_id), Some(&1));
        assert_eq!(grouped.get(&metz.id), None);

        assert_eq!(books.count_for_author(&metz.id).await.unwrap(), 0);
        assert_eq!(books.count_for_author(&clean.author_id).await.unwrap(), 2);
    }

    fn new_book(title: &str, author: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            published: 2008,
            author: author.to_string(),
            genres: vec!["refactoring".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_with_author() {
        let db = Database::in_memory().await.unwrap();

        let (book, author, created) = db
            .books()
            .create_with_author(new_book("Clean Code", "Robert Martin"))
            .await
            .unwrap();
        assert!(created);
        assert_eq!(book.author_id, author.id);

        let (_, again, created) = db
            .books()
            .create_with_author(new_book("Clean Coder", "Robert Martin"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, author.id);
        assert_eq!(db.authors().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_book_insert_rolls_back_new_author() {
        let db = Database::in_memory().await.unwrap();
        add(&db, "Demons", "Fyodor Dostoevsky", &["classic"]).await;

        let err = db
            .books()
            .create_with_author(new_book("Demons", "Someone Else"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(db.authors().get_by_name("Someone Else").await.unwrap().is_none());
        assert_eq!(db.authors().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_books_share_new_author() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("library.db").display());
        let db = Database::connect(&url, 5).await.unwrap();
        db.migrate().await.unwrap();

        for round in 0..10 {
            let author = format!("Author {}", round);
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let db = db.clone();
                    let book = new_book(&format!("Book {}-{}", round, i), &author);
                    tokio::spawn(async move { db.books().create_with_author(book).await })
                })
                .collect();

            let mut author_ids = Vec::new();
            let mut created = 0;
            for handle in handles {
                let (_, author, was_created) = handle.await.unwrap().unwrap();
                author_ids.push(author.id);
                created += usize::from(was_created);
            }
            assert_eq!(created, 1, "round {}", round);
            author_ids.dedup();
            assert_eq!(author_ids.len(), 1, "round {}", round);
        }

        assert_eq!(db.authors().count().await.unwrap(), 10);
        assert_eq!(db.books().count().await.unwrap(), 40);
        db.close().await;
    }
}
