use super::prelude::*;

#[derive(Default)]
pub struct AuthorQueries;

#[Object]
impl AuthorQueries {
    /// Total number of authors
    async fn author_count(&self, ctx: &Context<'_>) -> Result<i32> {
        let db = ctx.data::<Database>()?;
        let count = db.authors().count().await.map_err(ApiError::from).extend()?;
        Ok(count as i32)
    }

    /// All authors with their book counts
    async fn all_authors(&self, ctx: &Context<'_>) -> Result<Vec<Author>> {
        let db = ctx.data::<Database>()?;
        let authors = db.authors().list().await.map_err(ApiError::from).extend()?;
        let counts = db
            .books()
            .count_by_author()
            .await
            .map_err(ApiError::from)
            .extend()?;

        Ok(authors
            .into_iter()
            .map(|a| {
                let count = counts.get(&a.id).copied().unwrap_or(0);
                Author::from_record(a, count)
            })
            .collect())
    }
}
