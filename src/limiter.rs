//! Process-wide minimum-interval limiter.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Allows at most one action per interval across the whole process.
///
/// Used to throttle token creation regardless of who asks for it.
#[derive(Debug)]
pub struct IntervalLimiter {
    /// When the last allowed action happened
    last_allowed: Mutex<Option<Instant>>,
    interval: Duration,
}

impl IntervalLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_allowed: Mutex::new(None),
            interval,
        }
    }

    /// Check whether an action may proceed now, recording it if so.
    pub fn is_allowed(&self) -> bool {
        self.is_allowed_at(Instant::now())
    }

    /// Check whether an action may proceed at `now`, recording it if so.
    pub fn is_allowed_at(&self, now: Instant) -> bool {
        let mut last_allowed = self.last_allowed.lock();

        match *last_allowed {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                *last_allowed = Some(now);
                true
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_call_is_allowed() {
        let limiter = IntervalLimiter::new(Duration::from_secs(2));
        assert!(limiter.is_allowed());
    }

    #[test]
    fn test_call_within_interval_is_denied() {
        let limiter = IntervalLimiter::new(Duration::from_secs(2));
        let start = Instant::now();

        assert!(limiter.is_allowed_at(start));
        assert!(!limiter.is_allowed_at(start + Duration::from_millis(1999)));
        assert!(limiter.is_allowed_at(start + Duration::from_secs(2)));
    }

    #[test]
    fn test_denied_calls_do_not_extend_interval() {
        let limiter = IntervalLimiter::new(Duration::from_secs(2));
        let start = Instant::now();

        assert!(limiter.is_allowed_at(start));
        assert!(!limiter.is_allowed_at(start + Duration::from_secs(1)));
        assert!(limiter.is_allowed_at(start + Duration::from_millis(2001)));
    }

    #[test]
    fn test_concurrent_callers_get_one_slot() {
        let limiter = Arc::new(IntervalLimiter::new(Duration::from_secs(60)));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.is_allowed())
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(allowed, 1);
    }
}
