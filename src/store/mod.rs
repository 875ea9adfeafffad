//! Access-token storage.
//!
//! The cache only needs to know when a token was created. The store is the
//! collaborator that answers that question and issues new tokens.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryTokenStore;

/// An issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    /// Whether this token may be used to create new tokens.
    #[serde(default)]
    pub can_generate_access_tokens: bool,
}

/// Errors returned by a [`TokenStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The token does not exist.
    #[error("no_results")]
    NotFound,

    /// The backing store could not be queried.
    #[error("failed_to_query_store: {0}")]
    Unavailable(String),
}

/// Backing store for access tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Full record of `token`.
    async fn find(&self, token: &str) -> Result<AccessToken, StoreError>;

    /// Creation time of `token`.
    async fn created_at(&self, token: &str) -> Result<DateTime<Utc>, StoreError> {
        self.find(token).await.map(|access| access.created_at)
    }

    /// Issue a new token for `email`. Issued tokens cannot create tokens.
    async fn issue(&self, email: &str) -> Result<AccessToken, StoreError>;
}
