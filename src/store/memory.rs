//! In-memory token store, optionally seeded from a YAML file.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{AccessToken, StoreError, TokenStore};
use crate::error::{GatewayError, Result};

/// On-disk seed format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenSeed {
    #[serde(default)]
    tokens: Vec<AccessToken>,
}

/// A [`TokenStore`] that keeps every token in process memory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load seed tokens from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading token seed file");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load seed tokens from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let seed: TokenSeed = serde_yaml::from_str(yaml)
            .map_err(|e| GatewayError::Config(format!("Failed to parse token seed: {}", e)))?;

        let store = Self::new();
        for token in seed.tokens {
            store.insert(token);
        }
        info!(count = store.len(), "Token store seeded");
        Ok(store)
    }

    /// Insert or replace a token.
    pub fn insert(&self, token: AccessToken) {
        self.tokens.write().insert(token.token.clone(), token);
    }

    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn find(&self, token: &str) -> std::result::Result<AccessToken, StoreError> {
        self.tokens
            .read()
            .get(token)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn issue(&self, email: &str) -> std::result::Result<AccessToken, StoreError> {
        let token = AccessToken {
            token: Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
            can_generate_access_tokens: false,
        };
        self.insert(token.clone());

        debug!(email = %email, "Access token issued");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_seed() {
        let yaml = r#"
tokens:
  - token: "abc"
    email: "ops@example.com"
    created_at: "2026-09-01T00:00:00Z"
  - token: "def"
    email: "dev@example.com"
    created_at: "2026-10-01T12:30:00Z"
    can_generate_access_tokens: true
"#;
        let store = MemoryTokenStore::from_yaml(yaml).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_permission_defaults_to_false() {
        let yaml = r#"
tokens:
  - token: "abc"
    email: "ops@example.com"
    created_at: "2026-09-01T00:00:00Z"
  - token: "def"
    email: "admin@example.com"
    created_at: "2026-09-01T00:00:00Z"
    can_generate_access_tokens: true
"#;
        let store = MemoryTokenStore::from_yaml(yaml).unwrap();

        assert!(!store.find("abc").await.unwrap().can_generate_access_tokens);
        assert!(store.find("def").await.unwrap().can_generate_access_tokens);
        assert_eq!(store.find("missing").await, Err(StoreError::NotFound));
    }

    #[test]
    fn test_empty_seed() {
        let store = MemoryTokenStore::from_yaml("{}").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_seed_is_config_error() {
        let result = MemoryTokenStore::from_yaml("tokens: [ { token: 1 } ]");
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[tokio::test]
    async fn test_created_at_lookup() {
        let yaml = r#"
tokens:
  - token: "abc"
    email: "ops@example.com"
    created_at: "2026-09-01T00:00:00Z"
"#;
        let store = MemoryTokenStore::from_yaml(yaml).unwrap();

        assert_eq!(
            store.created_at("abc").await,
            Ok(Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(store.created_at("missing").await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_issue_creates_unique_tokens() {
        let store = MemoryTokenStore::new();

        let first = store.issue("ops@example.com").await.unwrap();
        let second = store.issue("ops@example.com").await.unwrap();

        assert_ne!(first.token, second.token);
        assert_eq!(first.email, "ops@example.com");
        assert!(!first.can_generate_access_tokens);
        assert_eq!(store.len(), 2);
        assert_eq!(store.created_at(&first.token).await, Ok(first.created_at));
    }
}
