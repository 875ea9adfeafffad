//! Configuration management for Tokengate.

use std::net::SocketAddr;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Prefix for environment overrides, e.g. `TOKENGATE_SERVER__HTTP_ADDR`.
pub const ENV_PREFIX: &str = "TOKENGATE";

/// Main configuration for the Tokengate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Token store and issuance configuration
    #[serde(default)]
    pub tokens: TokensConfig,

    /// Token cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Token store and issuance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensConfig {
    /// YAML file with tokens to load at startup
    #[serde(default)]
    pub seed_path: Option<String>,

    /// Minimum time between two token creations, in milliseconds
    #[serde(default = "default_creation_interval")]
    pub creation_interval_ms: u64,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            creation_interval_ms: default_creation_interval(),
        }
    }
}

fn default_creation_interval() -> u64 {
    2000
}

/// Token cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Interval for dropping expired tokens from the cache, in seconds.
    /// Expired tokens are kept forever when unset.
    #[serde(default)]
    pub purge_interval_secs: Option<u64>,
}

impl GatewayConfig {
    /// Load configuration from an optional YAML file, then apply
    /// `TOKENGATE_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, without environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.tokens.creation_interval_ms, 2000);
        assert!(config.tokens.seed_path.is_none());
        assert!(config.cache.purge_interval_secs.is_none());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
server:
  http_addr: "127.0.0.1:9000"
cache:
  purge_interval_secs: 3600
"#;
        let config = GatewayConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.cache.purge_interval_secs, Some(3600));
        assert_eq!(config.tokens.creation_interval_ms, 2000);
    }

    #[test]
    fn test_load_applies_env_overrides() {
        let path = std::env::temp_dir().join(format!("tokengate-{}.yaml", std::process::id()));
        let yaml = r#"
server:
  http_addr: "127.0.0.1:9000"
tokens:
  creation_interval_ms: 500
"#;
        std::fs::write(&path, yaml).unwrap();

        std::env::set_var("TOKENGATE_SERVER__HTTP_ADDR", "127.0.0.1:9100");
        let config = GatewayConfig::load(Some(&path));
        std::env::remove_var("TOKENGATE_SERVER__HTTP_ADDR");
        std::fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
        assert_eq!(config.tokens.creation_interval_ms, 500);
        assert!(config.cache.purge_interval_secs.is_none());
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let yaml = r#"
server:
  http_addr: "not an address"
"#;
        assert!(GatewayConfig::from_yaml(yaml).is_err());
    }
}
