//! Error taxonomy surfaced to GraphQL clients
//!
//! Every resolver failure ends up as one of three codes in the error's
//! `extensions.code`: `BAD_USER_INPUT`, `UNAUTHENTICATED` or
//! `INTERNAL_SERVER_ERROR`. Internal details are logged, never returned.

use async_graphql::ErrorExtensions;
use thiserror::Error;
use tracing::error;

use crate::events::EventBusError;
use crate::services::AuthError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller sent something we refuse to store or act on
    #[error("{message}")]
    BadUserInput {
        message: String,
        /// The offending argument value
        invalid_args: Option<String>,
    },

    #[error("Not authenticated")]
    Unauthenticated,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_input(message: impl Into<String>, invalid_args: impl Into<String>) -> Self {
        Self::BadUserInput {
            message: message.into(),
            invalid_args: Some(invalid_args.into()),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadUserInput { .. } => "BAD_USER_INPUT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        match self {
            Self::BadUserInput {
                message,
                invalid_args,
            } => async_graphql::Error::new(message.clone()).extend_with(|_, e| {
                e.set("code", code);
                if let Some(args) = invalid_args {
                    e.set("invalidArgs", args.clone());
                }
            }),
            Self::Unauthenticated => {
                async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
            }
            Self::Internal(err) => {
                error!(error = ?err, "Resolver failed");
                async_graphql::Error::new("Internal server error")
                    .extend_with(|_, e| e.set("code", code))
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WrongCredentials => Self::BadUserInput {
                message: "Wrong credentials".to_string(),
                invalid_args: None,
            },
            AuthError::InvalidToken(_) => Self::Unauthenticated,
            AuthError::Database(e) => Self::Internal(e),
        }
    }
}

impl From<EventBusError> for ApiError {
    fn from(err: EventBusError) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}
