//! Request authentication for GraphQL operations
//!
//! The HTTP and WebSocket handlers resolve the bearer token to a user and bind
//! it into the request data as [`CurrentUser`]. Resolvers read it back through
//! [`AuthExt`].

use async_graphql::{Context, ErrorExtensions, Result};

use crate::db::UserRecord;
use crate::graphql::errors::ApiError;

/// The user a request was authenticated as
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

/// Extract the token from an `Authorization` header value.
///
/// Accepts `Bearer <token>` with any casing of the scheme.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extension trait to get the authenticated user from GraphQL context
pub trait AuthExt {
    /// Get the authenticated user, or an `UNAUTHENTICATED` error
    fn current_user(&self) -> Result<&UserRecord>;

    /// Get the authenticated user if present
    fn try_current_user(&self) -> Option<&UserRecord>;
}

impl<'a> AuthExt for Context<'a> {
    fn current_user(&self) -> Result<&UserRecord> {
        self.try_current_user()
            .ok_or_else(|| ApiError::Unauthenticated.extend())
    }

    fn try_current_user(&self) -> Option<&UserRecord> {
        self.data_opt::<CurrentUser>().map(|user| &user.0)
    }
}
