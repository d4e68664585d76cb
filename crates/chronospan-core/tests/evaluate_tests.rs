//! End-to-end evaluation scenarios over concrete UTC domains.

use chronospan_core::{parse, Interval, Schedule};
use chrono::{TimeZone, Utc};

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 86_400_000;

/// UTC timestamp in milliseconds.
fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .unwrap()
        .timestamp_millis()
}

fn day_start(year: i32, month: u32, day: u32) -> i64 {
    utc(year, month, day, 0, 0, 0)
}

fn day_end(year: i32, month: u32, day: u32) -> i64 {
    utc(year, month, day, 23, 59, 59) + 999
}

fn eval(expression: &str, start: i64, end: i64) -> Vec<Interval> {
    parse(expression)
        .unwrap()
        .evaluate(start, end, None, true)
        .unwrap()
}

#[test]
fn business_hours_one_interval_per_weekday() {
    // 2024-01-01 is a Monday; the domain is the whole ISO week.
    let out = eval(
        "T[9:00..17:00] AND WD[1..5]",
        day_start(2024, 1, 1),
        day_end(2024, 1, 7),
    );
    assert_eq!(out.len(), 5, "expected one interval per weekday");
    for (i, iv) in out.iter().enumerate() {
        let day = day_start(2024, 1, 1) + i as i64 * MS_PER_DAY;
        assert_eq!(*iv, Interval::new(day + 9 * MS_PER_HOUR, day + 17 * MS_PER_HOUR));
    }
}

#[test]
fn padded_times_evaluate_to_padded_endpoints() {
    let out = eval("T[9>..17>]", day_start(2024, 1, 1), day_end(2024, 1, 1));
    assert_eq!(
        out,
        vec![Interval::new(
            utc(2024, 1, 1, 9, 59, 59) + 999,
            utc(2024, 1, 1, 17, 59, 59) + 999
        )]
    );
}

#[test]
fn holiday_exclusion_through_the_registry() {
    let mut schedule = Schedule::new();
    schedule
        .set(
            "businesshours",
            "Business hours",
            parse("T[9:00..17:00] AND WD[1..5]").unwrap(),
            true,
        )
        .unwrap();
    schedule
        .set("holidays", "Holidays", parse("D[2024-01-01]").unwrap(), true)
        .unwrap();

    let block = parse("REF[businesshours] AND NOT REF[holidays]").unwrap();
    let out = block
        .evaluate(
            day_start(2024, 1, 1),
            day_end(2024, 1, 2),
            Some(&schedule),
            true,
        )
        .unwrap();
    assert_eq!(
        out,
        vec![Interval::new(
            utc(2024, 1, 2, 9, 0, 0),
            utc(2024, 1, 2, 17, 0, 0)
        )],
        "only the non-holiday Tuesday should remain"
    );
}

#[test]
fn merge_off_keeps_single_day_intervals() {
    let out = eval("#WD[1..5]", day_start(2024, 1, 1), day_end(2024, 1, 7));
    assert_eq!(out.len(), 5, "merge-off weekdays must not fuse");
    for (i, iv) in out.iter().enumerate() {
        let day = day_start(2024, 1, 1) + i as i64 * MS_PER_DAY;
        assert_eq!(*iv, Interval::new(day, day + MS_PER_DAY - 1));
    }
}

#[test]
fn merged_weekdays_fuse_into_one_run() {
    let out = eval("WD[1..5]", day_start(2024, 1, 1), day_end(2024, 1, 7));
    assert_eq!(
        out,
        vec![Interval::new(day_start(2024, 1, 1), day_end(2024, 1, 5))]
    );
}

#[test]
fn algebraic_weekdays_match_odd_iso_days() {
    // 2n+1 over [1, 7]: Monday, Wednesday, Friday, Sunday.
    let out = eval("WD[2n+1]", day_start(2024, 1, 1), day_end(2024, 1, 7));
    assert_eq!(out.len(), 4);
    for (iv, day) in out.iter().zip([1, 3, 5, 7]) {
        assert_eq!(iv.start, day_start(2024, 1, day));
        assert_eq!(iv.end, day_end(2024, 1, day));
    }
}

#[test]
fn month_day_29_skips_short_februaries() {
    let out_2023 = eval("MD[29]", day_start(2023, 1, 1), day_end(2023, 12, 31));
    assert_eq!(out_2023.len(), 11, "2023 has no February 29");

    let out_2024 = eval("MD[29]", day_start(2024, 1, 1), day_end(2024, 12, 31));
    assert_eq!(out_2024.len(), 12, "2024 is a leap year");
    assert!(out_2024
        .iter()
        .any(|iv| iv.start == day_start(2024, 2, 29)));
}

#[test]
fn months_fuse_across_the_year_boundary() {
    let out = eval("M[1,12]", day_start(2023, 12, 1), day_end(2024, 1, 31));
    assert_eq!(
        out,
        vec![Interval::new(day_start(2023, 12, 1), day_end(2024, 1, 31))],
        "December and January are adjacent months"
    );
}

#[test]
fn sunday_is_weekday_seven() {
    let out = eval("WD[7]", day_start(2024, 1, 1), day_end(2024, 1, 7));
    assert_eq!(
        out,
        vec![Interval::new(day_start(2024, 1, 7), day_end(2024, 1, 7))]
    );
}

#[test]
fn year_field_clips_to_the_domain() {
    let out = eval("Y[2024]", day_start(2023, 6, 1), day_end(2024, 6, 30));
    assert_eq!(
        out,
        vec![Interval::new(day_start(2024, 1, 1), day_end(2024, 6, 30))]
    );
}

#[test]
fn date_field_slices_to_the_domain() {
    let out = eval(
        "D[2024-01-01..2024-01-10]",
        utc(2024, 1, 5, 12, 0, 0),
        day_end(2024, 2, 1),
    );
    assert_eq!(
        out,
        vec![Interval::new(utc(2024, 1, 5, 12, 0, 0), day_end(2024, 1, 10))]
    );
}

#[test]
fn unmerged_nested_datetime_spans_keep_the_covering_span() {
    // The one-hour span nested inside the two-day span leaves ends out of
    // start order; merge-off evaluation must still report the cover.
    let expression = "#DT[2024-01-01T0..2024-01-03T0,2024-01-02T0..2024-01-02T1]";
    let t = utc(2024, 1, 2, 12, 0, 0);
    let out = eval(expression, t, day_end(2024, 1, 4));
    assert_eq!(out, vec![Interval::new(t, utc(2024, 1, 3, 0, 0, 0))]);
    assert!(parse(expression)
        .unwrap()
        .evaluate_timestamp(t, None)
        .unwrap());
}

#[test]
fn unmerged_nested_date_spans_keep_the_covering_span() {
    let expression = "#D[2024-01-01..2024-01-05,2024-01-03]";
    let out = eval(expression, day_start(2024, 1, 4), day_end(2024, 1, 6));
    assert_eq!(
        out,
        vec![Interval::new(day_start(2024, 1, 4), day_end(2024, 1, 5))]
    );
    assert!(parse(expression)
        .unwrap()
        .evaluate_timestamp(utc(2024, 1, 4, 12, 0, 0), None)
        .unwrap());
}

#[test]
fn empty_fields_evaluate_to_nothing() {
    for expression in ["T[]", "WD[]", "M[]", "MD[]", "Y[]", "D[]", "DT[]"] {
        assert!(
            eval(expression, day_start(2024, 1, 1), day_end(2024, 1, 7)).is_empty(),
            "{expression} should be empty"
        );
    }
}

#[test]
fn inverted_domain_evaluates_to_nothing() {
    let block = parse("WD[1..7]").unwrap();
    let out = block
        .evaluate(day_end(2024, 1, 7), day_start(2024, 1, 1), None, true)
        .unwrap();
    assert!(out.is_empty());
}

#[test]
fn timestamp_evaluation_matches_interval_membership() {
    let block = parse("T[9:00..17:00] AND WD[1..5]").unwrap();
    // Tuesday 10:00 — inside.
    assert!(block
        .evaluate_timestamp(utc(2024, 1, 2, 10, 0, 0), None)
        .unwrap());
    // Boundaries are inclusive.
    assert!(block
        .evaluate_timestamp(utc(2024, 1, 2, 9, 0, 0), None)
        .unwrap());
    assert!(block
        .evaluate_timestamp(utc(2024, 1, 2, 17, 0, 0), None)
        .unwrap());
    assert!(!block
        .evaluate_timestamp(utc(2024, 1, 2, 17, 0, 0) + 1, None)
        .unwrap());
    // Saturday 10:00 — outside.
    assert!(!block
        .evaluate_timestamp(utc(2024, 1, 6, 10, 0, 0), None)
        .unwrap());
}

#[test]
fn full_weekday_bitmap_covers_the_domain_in_one_interval() {
    let start = utc(2024, 1, 1, 7, 30, 0);
    let end = utc(2024, 3, 15, 22, 0, 0);
    assert_eq!(eval("WD[1..7]", start, end), vec![Interval::new(start, end)]);
}

#[test]
fn pre_epoch_domains_walk_correctly() {
    // 1969-12-29 was a Monday.
    let out = eval("WD[1]", day_start(1969, 12, 28), day_end(1970, 1, 3));
    assert_eq!(
        out,
        vec![Interval::new(day_start(1969, 12, 29), day_end(1969, 12, 29))]
    );
}
