//! Shared identifiers and constants

use chrono::{DateTime, Duration, Utc};

/// Actor identifier (agent or human operator), e.g. `"sentinel"`
pub type ActorId = String;

/// Archive record identifier
pub type ArchiveId = String;

/// Seconds in one retention/grant day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// `start + days·86400s`
///
/// Saturates at the maximum representable timestamp instead of overflowing.
pub fn add_days(start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    start
        .checked_add_signed(Duration::seconds(i64::from(days) * SECONDS_PER_DAY))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_add_days() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = add_days(start, 90);
        assert_eq!((end - start).num_seconds(), 90 * SECONDS_PER_DAY);
    }

    proptest! {
        #[test]
        fn prop_add_days_is_exact(days in 0u32..36_500) {
            let start = Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 0).unwrap();
            let end = add_days(start, days);
            prop_assert_eq!((end - start).num_seconds(), i64::from(days) * SECONDS_PER_DAY);
        }
    }
}
