//! Access-token validation cache.
//!
//! Every authenticated request registers a hit for its bearer token. The
//! cache looks a token up in the backing store the first time it is seen,
//! remembers its creation time, and from then on enforces expiry and a
//! per-token sliding-window rate limit without touching the store again.

mod lifetime;
mod record;
mod registry;
mod window;

use thiserror::Error;

pub use lifetime::{TokenLifetime, TOKEN_LIFETIME};
pub use record::TokenRecord;
pub use registry::TokenCache;
pub use window::{SlidingWindow, MAX_HITS_PER_WINDOW, WINDOW_DURATION};

/// Reasons a single hit on a known token is refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitError {
    #[error("token_expired")]
    Expired,

    #[error("rate_limit_exceeded")]
    RateLimitExceeded,
}

/// Outcome of registering a hit through the cache.
///
/// `E` is the error type of the lookup used to resolve unseen tokens. It is
/// passed through unmodified.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError<E> {
    #[error("token_expired")]
    Expired,

    #[error("rate_limit_exceeded")]
    RateLimitExceeded,

    #[error("{0}")]
    Lookup(E),
}

impl<E> From<HitError> for TokenError<E> {
    fn from(err: HitError) -> Self {
        match err {
            HitError::Expired => TokenError::Expired,
            HitError::RateLimitExceeded => TokenError::RateLimitExceeded,
        }
    }
}
