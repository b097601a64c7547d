//! Time and timestamp helpers.
//!
//! Queue priorities and log times are UTC. Scene schedules are expressed in
//! hub-local wall-clock time, carried as a fixed-offset timestamp.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, TimeDelta, Utc};

/// UTC timestamp used for queue priorities and log records.
pub type Timestamp = DateTime<Utc>;

/// Hub-local timestamp used for "today", weekday and time-of-day decisions.
pub type LocalTimestamp = DateTime<FixedOffset>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// ISO weekday number of `ts` (1 = Monday … 7 = Sunday).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn iso_weekday(ts: &LocalTimestamp) -> u8 {
    // number_from_monday is always within 1..=7
    ts.weekday().number_from_monday() as u8
}

/// The instant at `time` on the calendar day of `day`, in the same offset.
#[must_use]
pub fn on_same_day(day: &LocalTimestamp, time: NaiveTime) -> LocalTimestamp {
    let offset = *day.offset();
    let naive = day.date_naive().and_time(time) - TimeDelta::seconds(offset.local_minus_utc().into());
    DateTime::from_naive_utc_and_offset(naive, offset)
}

/// Shift `ts` by a whole number of days.
#[must_use]
pub fn add_days(ts: &LocalTimestamp, days: i64) -> LocalTimestamp {
    *ts + TimeDelta::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(h: u32, m: u32) -> LocalTimestamp {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 6, h, m, 0)
            .unwrap()
    }

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_number_monday_as_one() {
        // 2024-05-06 is a Monday
        assert_eq!(iso_weekday(&local(10, 0)), 1);
        assert_eq!(iso_weekday(&add_days(&local(10, 0), 6)), 7);
    }

    #[test]
    fn should_map_time_onto_same_local_day() {
        let base = local(23, 30);
        let at = on_same_day(&base, NaiveTime::from_hms_opt(7, 15, 0).unwrap());
        assert_eq!(at, local(7, 15));
        assert_eq!(at.offset(), base.offset());
    }

    #[test]
    fn should_keep_local_day_when_utc_day_differs() {
        // 01:00 at +02:00 is still the previous day in UTC
        let base = local(1, 0);
        let at = on_same_day(&base, NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert_eq!(at, local(22, 0));
    }
}
