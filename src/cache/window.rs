//! Sliding-window hit counter.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};

use super::HitError;

/// Length of the trailing window hits are counted in.
pub const WINDOW_DURATION: TimeDelta = TimeDelta::seconds(1);
/// Maximum number of accepted hits visible inside one window.
pub const MAX_HITS_PER_WINDOW: usize = 10;

/// A true sliding window over accepted hit timestamps.
///
/// Timestamps are kept in insertion order, so stale entries are always at the
/// front and trimming is amortized linear.
#[derive(Debug)]
pub struct SlidingWindow {
    hits: VecDeque<DateTime<Utc>>,
    duration: TimeDelta,
    max_hits: usize,
}

impl SlidingWindow {
    /// Create a window with the default duration and limit.
    pub fn new() -> Self {
        Self::with_limit(WINDOW_DURATION, MAX_HITS_PER_WINDOW)
    }

    /// Create a window with an explicit duration and limit.
    pub fn with_limit(duration: TimeDelta, max_hits: usize) -> Self {
        Self {
            hits: VecDeque::with_capacity(max_hits),
            duration,
            max_hits,
        }
    }

    /// Record a hit at `now` if the window still has room.
    ///
    /// A rejected hit is not recorded.
    pub fn register_hit(&mut self, now: DateTime<Utc>) -> Result<(), HitError> {
        self.trim(now);

        if self.hits.len() >= self.max_hits {
            return Err(HitError::RateLimitExceeded);
        }

        // Callers read the clock before taking the record lock, so `now` can
        // trail the newest entry by a few microseconds. Keep history ascending.
        let at = match self.hits.back() {
            Some(last) if *last > now => *last,
            _ => now,
        };
        self.hits.push_back(at);
        Ok(())
    }

    /// Number of hits visible in the window ending at `now`.
    pub fn hits_in_window(&self, now: DateTime<Utc>) -> usize {
        self.hits
            .iter()
            .filter(|hit| now - **hit <= self.duration)
            .count()
    }

    /// Number of timestamps currently held, stale or not.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Drop hits whose age strictly exceeds the window. Ages equal to the
    /// window are kept.
    fn trim(&mut self, now: DateTime<Utc>) {
        while let Some(oldest) = self.hits.front() {
            if now - *oldest > self.duration {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new()
    }
}
