//! Per-token validation state.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::lifetime::{TokenLifetime, TOKEN_LIFETIME};
use super::window::SlidingWindow;
use super::HitError;

/// Creation time and recent hit history of a single token.
///
/// Hits on the same token are serialized by the record's own lock; records
/// for different tokens never contend.
#[derive(Debug)]
pub struct TokenRecord {
    created_at: DateTime<Utc>,
    lifetime: TokenLifetime,
    window: Mutex<SlidingWindow>,
}

impl TokenRecord {
    /// Create a record with an empty hit history and the default lifetime.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self::with_window(created_at, TOKEN_LIFETIME, SlidingWindow::new())
    }

    pub fn with_window(
        created_at: DateTime<Utc>,
        lifetime: TokenLifetime,
        window: SlidingWindow,
    ) -> Self {
        Self {
            created_at,
            lifetime,
            window: Mutex::new(window),
        }
    }

    /// Register a hit at `now`.
    ///
    /// Expiry is checked before the rate limit; a refused hit leaves the
    /// history untouched.
    pub fn register_hit(&self, now: DateTime<Utc>) -> Result<(), HitError> {
        let mut window = self.window.lock();

        if self.lifetime.is_expired(self.created_at, now) {
            return Err(HitError::Expired);
        }

        window.register_hit(now)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.lifetime.is_expired(self.created_at, now)
    }

    /// Number of accepted hits visible in the window ending at `now`.
    pub fn hits_in_window(&self, now: DateTime<Utc>) -> usize {
        self.window.lock().hits_in_window(now)
    }
}
