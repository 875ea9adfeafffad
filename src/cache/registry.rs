//! Process-wide token registry with fill-on-miss.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use super::lifetime::{TokenLifetime, TOKEN_LIFETIME};
use super::record::TokenRecord;
use super::window::SlidingWindow;
use super::TokenError;

/// A registry entry. Empty while the first lookup for the token is in flight.
type Slot = Arc<OnceCell<TokenRecord>>;

/// Registry of every token seen by this process.
///
/// Lookups happen at most once per token: concurrent first-time callers for
/// the same token share a single in-flight lookup, and once a record is
/// published it is never looked up again. No map lock is held while a
/// lookup runs, so a slow lookup only delays callers presenting that token.
#[derive(Debug)]
pub struct TokenCache {
    records: DashMap<String, Slot>,
    lifetime: TokenLifetime,
}

impl TokenCache {
    /// Create an empty cache using the default token lifetime.
    pub fn new() -> Self {
        Self::with_lifetime(TOKEN_LIFETIME)
    }

    pub fn with_lifetime(lifetime: TokenLifetime) -> Self {
        Self {
            records: DashMap::new(),
            lifetime,
        }
    }

    /// Register a hit for `token`, resolving its creation time with `lookup`
    /// if the token has not been seen before.
    ///
    /// Lookup errors are returned unmodified as [`TokenError::Lookup`] and
    /// are never cached, nor is a token that is already expired when it is
    /// looked up.
    pub async fn register_hit_for_token<F, Fut, E>(
        &self,
        token: &str,
        lookup: F,
    ) -> Result<(), TokenError<E>>
    where
        F: FnOnce(&str) -> Fut,
        Fut: Future<Output = Result<DateTime<Utc>, E>>,
    {
        // Read-locked check. The map guard is released before anything else runs.
        let existing = self.records.get(token).map(|entry| Arc::clone(entry.value()));
        if let Some(record) = existing.as_ref().and_then(|slot| slot.get()) {
            trace!("token_cache_hit");
            return Ok(record.register_hit(Utc::now())?);
        }

        let slot = match existing {
            Some(slot) => slot,
            None => Arc::clone(self.records.entry(token.to_string()).or_default().value()),
        };
        let pending = PendingSlot {
            slot,
            _release: ReleaseOnDrop { cache: self, token },
        };

        let record = pending
            .slot
            .get_or_try_init(|| async {
                debug!("token_cache_miss");
                let created_at = lookup(token).await.map_err(TokenError::Lookup)?;

                if self.lifetime.is_expired(created_at, Utc::now()) {
                    debug!(created_at = %created_at, "token_expired_on_lookup");
                    return Err(TokenError::Expired);
                }

                debug!(created_at = %created_at, "token_record_created");
                Ok(TokenRecord::with_window(
                    created_at,
                    self.lifetime,
                    SlidingWindow::new(),
                ))
            })
            .await?;

        Ok(record.register_hit(Utc::now())?)
    }

    /// Number of tokens with a published record.
    pub fn len(&self) -> usize {
        self.records
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a record has been published for `token`.
    pub fn contains(&self, token: &str) -> bool {
        self.records
            .get(token)
            .map(|entry| entry.value().initialized())
            .unwrap_or(false)
    }

    /// Remove every published record whose token is expired at `now`.
    ///
    /// Returns the number of records removed. A purged token that shows up
    /// again is looked up afresh and rejected without being re-inserted.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.records.retain(|_, slot| match slot.get() {
            Some(record) if record.is_expired(now) => {
                removed += 1;
                false
            }
            _ => true,
        });

        if removed > 0 {
            debug!(removed = removed, "expired_tokens_purged");
        }
        removed
    }

    /// Drop the slot for `token` if it is still empty and nobody holds it.
    fn release_pending(&self, token: &str) {
        // Callers clone slots only under a shard lock, so a count of one
        // cannot race with a new waiter.
        self.records.remove_if(token, |_, slot| {
            !slot.initialized() && Arc::strong_count(slot) == 1
        });
    }
}

/// A registry slot held while its lookup runs.
///
/// Fields drop in declaration order: the slot reference goes first, then the
/// release check runs. This covers failed lookups and callers that are
/// cancelled mid-lookup alike.
struct PendingSlot<'a> {
    slot: Slot,
    _release: ReleaseOnDrop<'a>,
}

struct ReleaseOnDrop<'a> {
    cache: &'a TokenCache,
    token: &'a str,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.cache.release_pending(self.token);
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
