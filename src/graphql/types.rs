//! GraphQL type definitions
//!
//! These mirror the database records but are decorated with async-graphql
//! attributes. Relations are resolved lazily through the `Database` in the
//! request context.

use async_graphql::{ComplexObject, Context, ID, Result, ResultExt, SimpleObject};

use crate::db::{AuthorRecord, BookRecord, Database, UserRecord};
use crate::graphql::errors::ApiError;

/// A book in the catalogue
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct Book {
    pub id: ID,
    pub title: String,
    pub published: i32,
    pub genres: Vec<String>,
    #[graphql(skip)]
    pub author_id: String,
}

#[ComplexObject]
impl Book {
    /// The book's author
    async fn author(&self, ctx: &Context<'_>) -> Result<Author> {
        let db = ctx.data::<Database>()?;
        let record = db
            .authors()
            .get_by_id(&self.author_id)
            .await
            .map_err(ApiError::from)
            .extend()?
            .ok_or_else(|| ApiError::internal(format!("Author {} missing", self.author_id)))
            .extend()?;

        Author::load_count(db, record).await
    }
}

impl From<BookRecord> for Book {
    fn from(r: BookRecord) -> Self {
        Self {
            id: ID(r.id),
            title: r.title,
            published: r.published,
            genres: r.genres,
            author_id: r.author_id,
        }
    }
}

/// A book author
#[derive(Debug, Clone, SimpleObject)]
pub struct Author {
    pub id: ID,
    pub name: String,
    pub born: Option<i32>,
    /// Number of books by this author
    pub book_count: i32,
}

impl Author {
    pub fn from_record(r: AuthorRecord, book_count: i64) -> Self {
        Self {
            id: ID(r.id),
            name: r.name,
            born: r.born,
            book_count: book_count as i32,
        }
    }

    /// Build an author, counting its books with a single query
    pub(crate) async fn load_count(db: &Database, r: AuthorRecord) -> Result<Self> {
        let count = db
            .books()
            .count_for_author(&r.id)
            .await
            .map_err(ApiError::from)
            .extend()?;
        Ok(Self::from_record(r, count))
    }
}

/// A registered user
#[derive(Debug, Clone, SimpleObject)]
pub struct User {
    pub id: ID,
    pub username: String,
    pub favorite_genre: String,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        Self {
            id: ID(r.id),
            username: r.username,
            favorite_genre: r.favorite_genre,
        }
    }
}

/// Signed login token
#[derive(Debug, Clone, SimpleObject)]
pub struct Token {
    pub value: String,
}
