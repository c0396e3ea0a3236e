use super::prelude::*;

#[derive(Default)]
pub struct UserMutations;

#[Object]
impl UserMutations {
    /// Register a user. Usernames are unique and at least four characters.
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        username: String,
        favorite_genre: String,
    ) -> Result<User> {
        let db = ctx.data::<Database>()?;
        let record = create_user(db, username, favorite_genre).await.extend()?;
        info!(user_id = %record.id, username = %record.username, "User created");

        Ok(User::from(record))
    }

    /// Exchange a username and the shared password for a token
    async fn login(&self, ctx: &Context<'_>, username: String, password: String) -> Result<Token> {
        let auth = ctx.data::<AuthService>()?;

        let value = auth
            .login(&username, &password)
            .await
            .map_err(|e| match ApiError::from(e) {
                ApiError::BadUserInput { message, .. } => ApiError::bad_input(message, &username),
                other => other,
            })
            .extend()?;

        Ok(Token { value })
    }
}

async fn create_user(db: &Database, username: String, favorite_genre: String) -> ApiResult<UserRecord> {
    let failed = || ApiError::bad_input("Creating the user failed", &username);

    if username.trim().chars().count() < crate::db::users::MIN_USERNAME_LENGTH {
        return Err(failed());
    }

    db.users()
        .create(CreateUser {
            username: username.clone(),
            favorite_genre,
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                failed()
            } else {
                ApiError::Internal(e)
            }
        })
}
