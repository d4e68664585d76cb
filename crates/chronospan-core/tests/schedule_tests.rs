//! Registry behavior: CRUD, reference resolution, cycle detection, and the
//! evaluation cache.

use chronospan_core::{parse, CacheOptions, Interval, Schedule, SpanError};
use chrono::{TimeZone, Utc};

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

fn schedule_with(entries: &[(&str, &str)]) -> Schedule {
    let mut schedule = Schedule::new();
    for (id, expression) in entries {
        schedule
            .set(id, id, parse(expression).unwrap(), true)
            .unwrap();
    }
    schedule
}

// ---------------------------------------------------------------------------
// Registry CRUD
// ---------------------------------------------------------------------------

#[test]
fn set_get_remove_roundtrip() {
    let mut schedule = Schedule::new();
    schedule
        .set("hours", "Business hours", parse("WD[1..5]").unwrap(), true)
        .unwrap();
    assert_eq!(schedule.len(), 1);

    let entry = schedule.get("hours").expect("entry should exist");
    assert_eq!(entry.name, "Business hours");

    assert!(schedule.remove("hours"));
    assert!(!schedule.remove("hours"));
    assert!(schedule.get("hours").is_none());
    assert!(schedule.is_empty());
}

#[test]
fn overwrite_control() {
    let mut schedule = Schedule::new();
    schedule
        .set("x", "first", parse("WD[1]").unwrap(), true)
        .unwrap();
    let err = schedule
        .set("x", "second", parse("WD[2]").unwrap(), false)
        .unwrap_err();
    assert!(matches!(err, SpanError::Validation { .. }));

    schedule
        .set("x", "second", parse("WD[2]").unwrap(), true)
        .unwrap();
    assert_eq!(schedule.get("x").unwrap().name, "second");
}

#[test]
fn non_alphanumeric_ids_are_rejected() {
    let mut schedule = Schedule::new();
    for id in ["", "my-id", "a b", "ref!"] {
        let err = schedule
            .set(id, "bad", parse("WD[1]").unwrap(), true)
            .unwrap_err();
        assert!(matches!(err, SpanError::InvalidId { .. }), "id {id:?}");
    }
}

#[test]
fn evaluating_an_unknown_id_fails() {
    let schedule = Schedule::new();
    let err = schedule
        .evaluate("ghost", 0, 1_000, true)
        .unwrap_err();
    assert!(matches!(err, SpanError::Reference { .. }));
    let err = schedule.evaluate_timestamp("ghost", 0).unwrap_err();
    assert!(matches!(err, SpanError::Reference { .. }));
}

// ---------------------------------------------------------------------------
// Reference resolution
// ---------------------------------------------------------------------------

#[test]
fn nested_references_resolve_through_the_registry() {
    let schedule = schedule_with(&[
        ("weekdays", "WD[1..5]"),
        ("hours", "T[9..17] AND REF[weekdays]"),
    ]);
    let out = schedule
        .evaluate("hours", day_start(2024, 1, 1), day_end(2024, 1, 7), true)
        .unwrap();
    assert_eq!(out.len(), 5);
}

#[test]
fn diamond_references_are_not_cycles() {
    let schedule = schedule_with(&[
        ("base", "WD[1..5]"),
        ("both", "REF[base] AND REF[base]"),
    ]);
    let out = schedule
        .evaluate("both", day_start(2024, 1, 1), day_end(2024, 1, 7), true)
        .unwrap();
    assert_eq!(
        out,
        vec![Interval::new(day_start(2024, 1, 1), day_end(2024, 1, 5))]
    );
}

#[test]
fn mutual_reference_cycle_is_detected() {
    let schedule = schedule_with(&[("a", "REF[b]"), ("b", "REF[a]")]);
    let err = schedule
        .evaluate("a", day_start(2024, 1, 1), day_end(2024, 1, 7), true)
        .unwrap_err();
    match err {
        SpanError::Reference { message, .. } => {
            assert!(message.contains("cyclic"), "unexpected message: {message}")
        }
        other => panic!("expected reference error, got {other:?}"),
    }
}

#[test]
fn self_reference_cycle_is_detected() {
    let schedule = schedule_with(&[("loop1", "REF[loop1]")]);
    assert!(schedule
        .evaluate("loop1", day_start(2024, 1, 1), day_end(2024, 1, 1), true)
        .is_err());
    assert!(schedule
        .evaluate_timestamp("loop1", day_start(2024, 1, 1))
        .is_err());
}

#[test]
fn reference_merge_override_from_the_referenced_block() {
    // The referenced block's own merge-off wins over the caller's merged
    // evaluation.
    let schedule = schedule_with(&[("split", "#WD[1..5]")]);
    let block = parse("REF[split]").unwrap();
    let out = block
        .evaluate(
            day_start(2024, 1, 1),
            day_end(2024, 1, 7),
            Some(&schedule),
            true,
        )
        .unwrap();
    assert_eq!(out.len(), 5);
}

#[test]
fn reference_annotation_propagates_to_a_default_target() {
    // #REF[plain] pushes merge-off into a target with no explicit state.
    let schedule = schedule_with(&[("plain", "WD[1..5]")]);
    let block = parse("#REF[plain]").unwrap();
    let out = block
        .evaluate(
            day_start(2024, 1, 1),
            day_end(2024, 1, 7),
            Some(&schedule),
            true,
        )
        .unwrap();
    assert_eq!(out.len(), 5);
}

#[test]
fn registry_timestamp_evaluation_delegates() {
    let schedule = schedule_with(&[("hours", "T[9..17] AND WD[1..5]")]);
    assert!(schedule
        .evaluate_timestamp("hours", utc(2024, 1, 2, 10, 0, 0))
        .unwrap());
    assert!(!schedule
        .evaluate_timestamp("hours", utc(2024, 1, 6, 10, 0, 0))
        .unwrap());
}

// ---------------------------------------------------------------------------
// Evaluation cache
// ---------------------------------------------------------------------------

#[test]
fn repeated_evaluation_hits_the_cache() {
    let schedule = schedule_with(&[("hours", "T[9..17] AND WD[1..5]")]);
    let domain = (day_start(2024, 1, 1), day_end(2024, 1, 7));

    let first = schedule.evaluate("hours", domain.0, domain.1, true).unwrap();
    assert_eq!(schedule.cache_len(), 1);
    let second = schedule.evaluate("hours", domain.0, domain.1, true).unwrap();
    assert_eq!(first, second);
    assert_eq!(schedule.cache_len(), 1, "a cache hit must not add entries");
}

#[test]
fn narrower_domains_reuse_wider_cached_results() {
    let schedule = schedule_with(&[("hours", "T[9..17] AND WD[1..5]")]);
    let wide = (day_start(2024, 1, 1), day_end(2024, 1, 14));
    let narrow = (day_start(2024, 1, 3), day_end(2024, 1, 5));

    schedule.evaluate("hours", wide.0, wide.1, true).unwrap();
    assert_eq!(schedule.cache_len(), 1);

    let cached = schedule.evaluate("hours", narrow.0, narrow.1, true).unwrap();
    assert_eq!(schedule.cache_len(), 1, "subset reads must not add entries");

    // The extracted subset equals a direct evaluation.
    let direct = parse("T[9..17] AND WD[1..5]")
        .unwrap()
        .evaluate(narrow.0, narrow.1, None, true)
        .unwrap();
    assert_eq!(cached, direct);
}

#[test]
fn cache_after_false_skips_storage() {
    let schedule = schedule_with(&[("hours", "WD[1..5]")]);
    schedule
        .evaluate("hours", day_start(2024, 1, 1), day_end(2024, 1, 7), false)
        .unwrap();
    assert_eq!(schedule.cache_len(), 0);
}

#[test]
fn oversized_results_bypass_the_cache() {
    let mut schedule = Schedule::with_options(CacheOptions {
        max_ranges_per_entry: 3,
        ..CacheOptions::default()
    });
    schedule
        .set("split", "split weekdays", parse("#WD[1..5]").unwrap(), true)
        .unwrap();
    let out = schedule
        .evaluate("split", day_start(2024, 1, 1), day_end(2024, 1, 7), true)
        .unwrap();
    assert_eq!(out.len(), 5, "the result itself is still returned");
    assert_eq!(schedule.cache_len(), 0, "five intervals exceed the cap of 3");
}

#[test]
fn cache_evicts_least_recently_used_entry() {
    let mut schedule = Schedule::with_options(CacheOptions {
        max_size: 2,
        ..CacheOptions::default()
    });
    for (id, expression) in [("a", "WD[1]"), ("b", "WD[2]"), ("c", "WD[3]")] {
        schedule
            .set(id, id, parse(expression).unwrap(), true)
            .unwrap();
    }
    let domain = (day_start(2024, 1, 1), day_end(2024, 1, 7));
    schedule.evaluate("a", domain.0, domain.1, true).unwrap();
    schedule.evaluate("b", domain.0, domain.1, true).unwrap();
    schedule.evaluate("c", domain.0, domain.1, true).unwrap();
    assert_eq!(schedule.cache_len(), 2);
}

#[test]
fn clear_cache_drops_stored_results() {
    let schedule = schedule_with(&[("hours", "WD[1..5]")]);
    schedule
        .evaluate("hours", day_start(2024, 1, 1), day_end(2024, 1, 7), true)
        .unwrap();
    assert_eq!(schedule.cache_len(), 1);
    schedule.clear_cache();
    assert_eq!(schedule.cache_len(), 0);
}
