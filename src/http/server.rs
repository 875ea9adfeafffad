//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::routes::{router, AppState};
use crate::auth::Authenticator;
use crate::cache::TokenCache;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::limiter::IntervalLimiter;
use crate::store::{MemoryTokenStore, TokenStore};

/// HTTP server for the token gateway.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Shared handler state
    state: AppState,
    /// Token cache, owned for the lifetime of the server
    cache: Arc<TokenCache>,
    purge_interval: Option<Duration>,
}

impl HttpServer {
    /// Create a server around an existing store and cache.
    pub fn new(
        addr: SocketAddr,
        store: Arc<dyn TokenStore>,
        cache: Arc<TokenCache>,
        creation_interval: Duration,
    ) -> Self {
        let state = AppState {
            authenticator: Authenticator::new(Arc::clone(&cache), Arc::clone(&store)),
            store,
            creation_limiter: Arc::new(IntervalLimiter::new(creation_interval)),
        };

        Self {
            addr,
            state,
            cache,
            purge_interval: None,
        }
    }

    /// Build the server, its token store and its cache from configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let store = match &config.tokens.seed_path {
            Some(path) => MemoryTokenStore::from_file(path)?,
            None => MemoryTokenStore::new(),
        };

        let mut server = Self::new(
            config.server.http_addr,
            Arc::new(store),
            Arc::new(TokenCache::new()),
            Duration::from_millis(config.tokens.creation_interval_ms),
        );
        server.purge_interval = config
            .cache
            .purge_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Ok(server)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Starting HTTP server");

        let purge_task = self
            .purge_interval
            .map(|interval| spawn_purge_task(Arc::clone(&self.cache), interval));

        let result = axum::serve(listener, router(self.state))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                GatewayError::Io(e)
            });

        if let Some(task) = purge_task {
            task.abort();
        }
        result
    }
}

/// Periodically drop expired tokens from the cache.
fn spawn_purge_task(cache: Arc<TokenCache>, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Expired token purge enabled");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.purge_expired(Utc::now());
        }
    })
}
