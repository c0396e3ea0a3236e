use super::prelude::*;

#[derive(Default)]
pub struct BookQueries;

#[Object]
impl BookQueries {
    /// Total number of books
    async fn book_count(&self, ctx: &Context<'_>) -> Result<i32> {
        let db = ctx.data::<Database>()?;
        let count = db.books().count().await.map_err(ApiError::from).extend()?;
        Ok(count as i32)
    }

    /// Books, optionally filtered by author name and genre
    async fn all_books(
        &self,
        ctx: &Context<'_>,
        author: Option<String>,
        genre: Option<String>,
    ) -> Result<Vec<Book>> {
        let db = ctx.data::<Database>()?;
        let filter = BookFilter { author, genre };
        let records = db.books().list(&filter).await.map_err(ApiError::from).extend()?;

        Ok(records.into_iter().map(Book::from).collect())
    }
}
