//! Bearer-token authentication.
//!
//! Extracts the token from the `Authorization` header, registers the hit in
//! the [`TokenCache`] and maps every refusal to an HTTP status.

use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::cache::{TokenCache, TokenError};
use crate::store::{StoreError, TokenStore};

const BEARER_PREFIX: &str = "Bearer ";

/// Reasons a request is refused by the authentication layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing_token")]
    MissingToken,

    #[error("invalid_bearer_format")]
    InvalidBearerFormat,

    #[error("empty_token")]
    EmptyToken,

    #[error("invalid_access_token")]
    InvalidToken,

    #[error("token_expired")]
    TokenExpired,

    #[error("rate_limit_exceeded")]
    RateLimitExceeded,

    #[error("internal_server_error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Response body returned to the client. Internal details are not exposed.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidBearerFormat => "invalid_bearer_format",
            AuthError::EmptyToken => "empty_token",
            AuthError::InvalidToken => "invalid_access_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::RateLimitExceeded => "rate_limit_exceeded",
            AuthError::Internal(_) => "internal_server_error",
        }
    }
}

impl From<TokenError<StoreError>> for AuthError {
    fn from(err: TokenError<StoreError>) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::RateLimitExceeded => AuthError::RateLimitExceeded,
            TokenError::Lookup(StoreError::NotFound) => AuthError::InvalidToken,
            TokenError::Lookup(StoreError::Unavailable(msg)) => AuthError::Internal(msg),
        }
    }
}

/// Pull the bearer token out of an `Authorization` header value.
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = match header {
        Some(header) if !header.is_empty() => header,
        _ => return Err(AuthError::MissingToken),
    };

    match header.strip_prefix(BEARER_PREFIX) {
        Some("") => Err(AuthError::EmptyToken),
        Some(token) => Ok(token),
        None => Err(AuthError::InvalidBearerFormat),
    }
}

/// Validates bearer tokens against the cache, falling back to the store for
/// tokens the cache has not seen yet.
#[derive(Clone)]
pub struct Authenticator {
    cache: Arc<TokenCache>,
    store: Arc<dyn TokenStore>,
}

impl Authenticator {
    pub fn new(cache: Arc<TokenCache>, store: Arc<dyn TokenStore>) -> Self {
        Self { cache, store }
    }

    /// Authenticate a request given its `Authorization` header, returning the
    /// token on success.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<String, AuthError> {
        let token = extract_bearer_token(authorization).map_err(|err| {
            debug!(reason = %err, "token_extraction_failed");
            err
        })?;

        let store = Arc::clone(&self.store);
        self.cache
            .register_hit_for_token(token, |token| {
                let token = token.to_string();
                async move { store.created_at(&token).await }
            })
            .await
            .map_err(|err| {
                warn!(error = %err, "token_validation_failed");
                AuthError::from(err)
            })?;

        Ok(token.to_string())
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }
}
