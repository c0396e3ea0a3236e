pub mod authors;
pub mod books;
pub mod system;
pub mod user;

pub use authors::AuthorQueries;
pub use books::BookQueries;
pub use system::SystemQueries;
pub use user::UserQueries;

pub(crate) mod prelude {
    pub(crate) use async_graphql::{Context, Object, Result, ResultExt};

    pub(crate) use crate::db::*;
    pub(crate) use crate::graphql::auth::AuthExt;
    pub(crate) use crate::graphql::errors::ApiError;
    pub(crate) use crate::graphql::types::*;
}
