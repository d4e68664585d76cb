//! UTC calendar helpers over millisecond timestamps.
//!
//! Every timestamp in the engine is an `i64` count of milliseconds since the
//! Unix epoch, UTC. These helpers bridge between that representation and
//! chrono's civil-date types for the calendar walks. Conversions are total:
//! inputs are clamped to chrono's representable range first, so no lookup
//! can fail on a data-dependent path.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

pub(crate) const MS_PER_DAY: i64 = 86_400_000;
pub(crate) const LAST_MS_OF_DAY: i64 = MS_PER_DAY - 1;
pub(crate) const MS_PER_HOUR: i64 = 3_600_000;
pub(crate) const MS_PER_MINUTE: i64 = 60_000;
pub(crate) const MS_PER_SECOND: i64 = 1_000;

// Conservative bounds inside chrono's ±262,000-year range (about ±253,000
// years in milliseconds). Timestamps beyond these clamp before conversion.
const CLAMP_MIN_MS: i64 = -8_000_000_000_000_000;
const CLAMP_MAX_MS: i64 = 8_000_000_000_000_000;

/// UTC day index (days since epoch, floor) of a millisecond timestamp.
pub(crate) fn day_index(ms: i64) -> i64 {
    ms.div_euclid(MS_PER_DAY)
}

/// First millisecond of a UTC day index.
pub(crate) fn day_start(day_idx: i64) -> i64 {
    day_idx * MS_PER_DAY
}

/// Milliseconds elapsed since UTC midnight of the timestamp's day.
pub(crate) fn ms_of_day(ms: i64) -> i64 {
    ms.rem_euclid(MS_PER_DAY)
}

/// Civil UTC date of a millisecond timestamp.
pub(crate) fn utc_date(ms: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(ms.clamp(CLAMP_MIN_MS, CLAMP_MAX_MS))
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

/// Millisecond timestamp of UTC midnight on a civil date, if the date exists.
pub(crate) fn ymd_start_ms(year: i32, month: u32, day: u32) -> Option<i64> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
}

/// Linear month index (`year * 12 + month0`) of a millisecond timestamp.
/// Spans year boundaries cleanly: December 2023 is followed by January 2024.
pub(crate) fn month_index(ms: i64) -> i64 {
    let date = utc_date(ms);
    i64::from(chrono::Datelike::year(&date)) * 12 + i64::from(chrono::Datelike::month0(&date))
}

/// First millisecond of a linear month index.
pub(crate) fn month_index_start_ms(month_idx: i64) -> i64 {
    let year = month_idx.div_euclid(12);
    let month0 = month_idx.rem_euclid(12);
    // Valid by construction: month indices come from `month_index`, whose
    // year stays inside chrono's range.
    ymd_start_ms(year as i32, month0 as u32 + 1, 1).unwrap_or(i64::MAX)
}

/// First millisecond of a UTC calendar year.
pub(crate) fn year_start_ms(year: i32) -> i64 {
    ymd_start_ms(year.clamp(-262_000, 262_000), 1, 1).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn day_index_floors_toward_negative_infinity() {
        assert_eq!(day_index(0), 0);
        assert_eq!(day_index(MS_PER_DAY - 1), 0);
        assert_eq!(day_index(MS_PER_DAY), 1);
        assert_eq!(day_index(-1), -1);
        assert_eq!(day_index(-MS_PER_DAY), -1);
        assert_eq!(day_index(-MS_PER_DAY - 1), -2);
    }

    #[test]
    fn ms_of_day_is_nonnegative_for_pre_epoch_timestamps() {
        assert_eq!(ms_of_day(-1), MS_PER_DAY - 1);
        assert_eq!(ms_of_day(MS_PER_DAY + 5), 5);
    }

    #[test]
    fn utc_date_decomposes_known_timestamp() {
        // 2024-01-01T00:00:00Z
        let date = utc_date(1_704_067_200_000);
        assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 1));
    }

    #[test]
    fn month_index_spans_year_boundary() {
        let dec = ymd_start_ms(2023, 12, 15).unwrap();
        let jan = ymd_start_ms(2024, 1, 15).unwrap();
        assert_eq!(month_index(dec) + 1, month_index(jan));
    }

    #[test]
    fn month_index_start_roundtrips() {
        let ms = ymd_start_ms(2024, 7, 1).unwrap();
        assert_eq!(month_index_start_ms(month_index(ms)), ms);
    }

    #[test]
    fn ymd_start_rejects_nonexistent_dates() {
        assert!(ymd_start_ms(2023, 2, 29).is_none());
        assert!(ymd_start_ms(2024, 2, 29).is_some());
    }
}
