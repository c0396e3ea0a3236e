use super::prelude::*;

#[derive(Default)]
pub struct AuthorMutations;

#[Object]
impl AuthorMutations {
    /// Set an author's birth year. Returns null when no author has that name.
    async fn edit_born(&self, ctx: &Context<'_>, name: String, born: i32) -> Result<Option<Author>> {
        let _user = ctx.current_user()?;
        let db = ctx.data::<Database>()?;

        let updated = db
            .authors()
            .set_born(&name, born)
            .await
            .map_err(ApiError::from)
            .extend()?;

        match updated {
            Some(record) => {
                info!(author_id = %record.id, born, "Author birth year updated");
                Ok(Some(Author::load_count(db, record).await?))
            }
            None => Ok(None),
        }
    }
}
