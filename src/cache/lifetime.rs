//! Calendar-based token lifetime.

use chrono::{DateTime, Days, Months, Utc};

/// Lifetime applied to every access token.
pub const TOKEN_LIFETIME: TokenLifetime = TokenLifetime::new(0, 3, 0);

/// A calendar offset measured in years, months and days.
///
/// Adding a lifetime respects variable month lengths: a token created on
/// the 30th of November with a three month lifetime expires at the end of
/// February, not after a fixed number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetime {
    pub years: u32,
    pub months: u32,
    pub days: u64,
}

impl TokenLifetime {
    pub const fn new(years: u32, months: u32, days: u64) -> Self {
        Self {
            years,
            months,
            days,
        }
    }

    /// The instant a token created at `created_at` stops being valid.
    ///
    /// Returns `None` if the date would fall outside the representable range.
    pub fn expires_at(&self, created_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = self.years.checked_mul(12)?.checked_add(self.months)?;
        created_at
            .checked_add_months(Months::new(months))?
            .checked_add_days(Days::new(self.days))
    }

    /// Whether a token created at `created_at` is expired at `now`.
    ///
    /// A token whose expiry instant equals `now` is still valid.
    pub fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.expires_at(created_at) {
            Some(expires_at) => expires_at < now,
            None => false,
        }
    }
}

impl Default for TokenLifetime {
    fn default() -> Self {
        TOKEN_LIFETIME
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Shift `now` by a signed calendar offset.
    pub(crate) fn offset(now: DateTime<Utc>, years: i32, months: i32, days: i64) -> DateTime<Utc> {
        let total_months = years * 12 + months;
        let shifted = if total_months >= 0 {
            now.checked_add_months(Months::new(total_months as u32))
        } else {
            now.checked_sub_months(Months::new(total_months.unsigned_abs()))
        }
        .unwrap();

        if days >= 0 {
            shifted.checked_add_days(Days::new(days as u64)).unwrap()
        } else {
            shifted.checked_sub_days(Days::new(days.unsigned_abs())).unwrap()
        }
    }

    fn reference_nows() -> Vec<DateTime<Utc>> {
        vec![
            Utc.with_ymd_and_hms(2026, 5, 31, 10, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap(),
        ]
    }

    #[test]
    fn test_expired_offsets() {
        let expired = [(0, -3, -1), (0, -4, 0), (-1, 0, 0)];

        for now in reference_nows() {
            for (y, m, d) in expired {
                let created_at = offset(now, y, m, d);
                assert!(
                    TOKEN_LIFETIME.is_expired(created_at, now),
                    "failed to detect expired token: now {} Y{} M{} D{}",
                    now, y, m, d
                );
            }
        }
    }

    #[test]
    fn test_valid_offsets() {
        let valid = [(0, -3, 1), (0, 0, 0), (0, -1, -3), (0, -2, -29)];

        for now in reference_nows() {
            for (y, m, d) in valid {
                let created_at = offset(now, y, m, d);
                assert!(
                    !TOKEN_LIFETIME.is_expired(created_at, now),
                    "valid token evaluated as expired: now {} Y{} M{} D{}",
                    now, y, m, d
                );
            }
        }
    }

    #[test]
    fn test_expiry_instant_is_still_valid() {
        let created_at = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
        let expires_at = TOKEN_LIFETIME.expires_at(created_at).unwrap();

        assert_eq!(expires_at, Utc.with_ymd_and_hms(2026, 4, 15, 9, 0, 0).unwrap());
        assert!(!TOKEN_LIFETIME.is_expired(created_at, expires_at));
        assert!(TOKEN_LIFETIME.is_expired(created_at, expires_at + chrono::TimeDelta::seconds(1)));
    }

    #[test]
    fn test_month_length_is_respected() {
        let lifetime = TokenLifetime::new(0, 1, 0);
        let created_at = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();

        assert_eq!(
            lifetime.expires_at(created_at),
            Some(Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_years_and_days_combine() {
        let lifetime = TokenLifetime::new(1, 2, 3);
        let created_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(
            lifetime.expires_at(created_at),
            Some(Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unrepresentable_expiry_never_expires() {
        let lifetime = TokenLifetime::new(u32::MAX, 0, 0);
        let now = Utc::now();
        assert!(lifetime.expires_at(now).is_none());
        assert!(!lifetime.is_expired(now, now));
    }
}
