use super::prelude::*;

#[derive(Default)]
pub struct UserQueries;

#[Object]
impl UserQueries {
    /// The authenticated user, or null for anonymous requests
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        Ok(ctx.try_current_user().cloned().map(User::from))
    }
}
