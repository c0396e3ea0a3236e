pub mod authors;
pub mod books;
pub mod users;

pub use authors::AuthorMutations;
pub use books::BookMutations;
pub use users::UserMutations;

pub(crate) mod prelude {
    pub(crate) use async_graphql::{Context, Object, Result, ResultExt};
    pub(crate) use tracing::info;

    pub(crate) use crate::db::*;
    pub(crate) use crate::events::{BOOK_ADDED, LibraryEvents};
    pub(crate) use crate::graphql::auth::AuthExt;
    pub(crate) use crate::graphql::errors::{ApiError, ApiResult};
    pub(crate) use crate::graphql::types::*;
    pub(crate) use crate::services::AuthService;
}
