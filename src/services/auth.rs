//! Authentication service
//!
//! Provides:
//! - HS256 token issue and verification
//! - Login against the shared login password
//! - Resolving a bearer token back to a stored user

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::db::{Database, UserRecord};

/// Default token lifetime (one hour)
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("wrong credentials")]
    WrongCredentials,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

// ============================================================================
// Tokens
// ============================================================================

/// Claims carried by every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User ID (subject)
    pub sub: String,
    pub username: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Signs and verifies tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        let secret = secret.trim().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// Configured token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for a user, valid for `ttl` from now
    pub fn issue(&self, user: &UserRecord, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.id.clone(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        let data = decode::<TokenClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Auth Service
// ============================================================================

/// Login and token-to-user resolution
#[derive(Debug, Clone)]
pub struct AuthService {
    db: Database,
    tokens: TokenService,
    login_password: String,
}

impl AuthService {
    pub fn new(db: Database, tokens: TokenService, login_password: impl Into<String>) -> Self {
        Self {
            db,
            tokens,
            login_password: login_password.into(),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Login with username and the shared password, returning a signed token
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self.db.users().get_by_username(username).await?;

        let user = match user {
            Some(u) if password == self.login_password => u,
            _ => return Err(AuthError::WrongCredentials),
        };

        debug!(user_id = %user.id, "Login succeeded");
        self.tokens.issue(&user, self.tokens.ttl())
    }

    /// Resolve a token to the user it was issued for.
    ///
    /// Invalid or expired tokens, and tokens for users that no longer exist,
    /// yield `None`.
    pub async fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, AuthError> {
        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Rejected token");
                return Ok(None);
            }
        };

        Ok(self.db.users().get_by_id(&claims.sub).await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::db::CreateUser;

    fn tokens() -> TokenService {
        TokenService::new("test-secret", DEFAULT_TOKEN_TTL_SECONDS)
    }

    async fn setup() -> (AuthService, UserRecord) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .users()
            .create(CreateUser {
                username: "mluukkai".to_string(),
                favorite_genre: "refactoring".to_string(),
            })
            .await
            .unwrap();
        (AuthService::new(db, tokens(), "secret"), user)
    }

    fn user() -> UserRecord {
        UserRecord {
            id: "user-1".to_string(),
            username: "mluukkai".to_string(),
            favorite_genre: "design".to_string(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = tokens();
        let token = tokens.issue(&user(), tokens.ttl()).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "mluukkai");
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_TTL_SECONDS);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = tokens();
        let token = tokens.issue(&user(), Duration::seconds(-600)).unwrap();

        assert_matches!(tokens.verify(&token), Err(AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = tokens().issue(&user(), Duration::minutes(5)).unwrap();
        let other = TokenService::new("another-secret", DEFAULT_TOKEN_TTL_SECONDS);

        assert_matches!(other.verify(&token), Err(AuthError::InvalidToken(_)));
        assert_matches!(other.verify("not-a-token"), Err(AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_login_and_authenticate() {
        let (auth, user) = setup().await;

        let token = auth.login("mluukkai", "secret").await.unwrap();
        let resolved = auth.authenticate(&token).await.unwrap();
        assert_eq!(resolved, Some(user));
    }

    #[tokio::test]
    async fn test_login_wrong_credentials() {
        let (auth, _) = setup().await;

        assert_matches!(
            auth.login("mluukkai", "hunter2").await,
            Err(AuthError::WrongCredentials)
        );
        assert_matches!(
            auth.login("nobody", "secret").await,
            Err(AuthError::WrongCredentials)
        );
    }

    #[tokio::test]
    async fn test_authenticate_garbage_is_anonymous() {
        let (auth, _) = setup().await;

        assert_eq!(auth.authenticate("garbage").await.unwrap(), None);

        let stranger = auth.tokens().issue(&user(), Duration::minutes(5)).unwrap();
        assert_eq!(auth.authenticate(&stranger).await.unwrap(), None);
    }
}
