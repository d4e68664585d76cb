//! Date and date-time fields: explicit millisecond spans on the UTC axis.
//!
//! Both kinds store a list of absolute intervals. `Date` values are whole
//! days (midnight through 23:59:59.999); `DateTime` values are arbitrary
//! `start <= end` pairs. Merged evaluation coalesces, then binary-searches
//! the slice intersecting the domain and clips it; unmerged evaluation
//! clips each span directly (nested values leave ends unsorted, which the
//! binary search cannot tolerate).

use std::cell::Cell;
use std::fmt;
use std::hash::Hasher;

use chrono::Datelike;
use rustc_hash::FxHasher;

use crate::block::time::fmt_time_of_day;
use crate::block::MergeState;
use crate::calendar::{self, LAST_MS_OF_DAY, MS_PER_DAY};
use crate::error::{Result, SpanError};
use crate::interval::{self, Interval};

/// Which span flavor a [`SpanField`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Whole-day spans: start at UTC midnight, end at 23:59:59.999.
    Date,
    /// Arbitrary millisecond spans.
    DateTime,
}

impl SpanKind {
    pub fn tag(self) -> &'static str {
        match self {
            SpanKind::Date => "D",
            SpanKind::DateTime => "DT",
        }
    }
}

/// A field block of absolute UTC millisecond spans.
#[derive(Debug, Clone)]
pub struct SpanField {
    kind: SpanKind,
    values: Vec<Interval>,
    merge: MergeState,
    hash: Cell<Option<u64>>,
}

fn validate_span(kind: SpanKind, value: &Interval) -> Result<()> {
    if value.start > value.end {
        return Err(SpanError::Validation {
            message: format!("span start {} after end {}", value.start, value.end),
        });
    }
    if kind == SpanKind::Date {
        if value.start.rem_euclid(MS_PER_DAY) != 0 {
            return Err(SpanError::Validation {
                message: format!("date span start {} is not UTC midnight", value.start),
            });
        }
        if value.end.rem_euclid(MS_PER_DAY) != LAST_MS_OF_DAY {
            return Err(SpanError::Validation {
                message: format!("date span end {} is not 23:59:59.999 UTC", value.end),
            });
        }
    }
    Ok(())
}

impl SpanField {
    pub fn new(kind: SpanKind, values: Vec<Interval>) -> Result<Self> {
        for value in &values {
            validate_span(kind, value)?;
        }
        Ok(Self {
            kind,
            values,
            merge: MergeState::Default,
            hash: Cell::new(None),
        })
    }

    pub fn kind(&self) -> SpanKind {
        self.kind
    }

    pub fn values(&self) -> &[Interval] {
        &self.values
    }

    pub fn merge_state(&self) -> MergeState {
        self.merge
    }

    pub fn set_merge_state(&mut self, state: MergeState) {
        self.merge = state;
        self.hash.set(None);
    }

    pub fn add_value(&mut self, value: Interval) -> Result<()> {
        validate_span(self.kind, &value)?;
        self.values.push(value);
        self.hash.set(None);
        Ok(())
    }

    pub fn insert_value(&mut self, value: Interval, index: usize) -> Result<()> {
        if index > self.values.len() {
            return Err(SpanError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            });
        }
        validate_span(self.kind, &value)?;
        self.values.insert(index, value);
        self.hash.set(None);
        Ok(())
    }

    pub fn get_value(&self, index: usize) -> Result<Interval> {
        self.values
            .get(index)
            .copied()
            .ok_or(SpanError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            })
    }

    pub fn remove_value(&mut self, index: usize) -> Result<Interval> {
        if index >= self.values.len() {
            return Err(SpanError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            });
        }
        let removed = self.values.remove(index);
        self.hash.set(None);
        Ok(removed)
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        if let Some(hash) = self.hash.get() {
            return hash;
        }
        let mut hasher = FxHasher::default();
        hasher.write_u8(3);
        std::hash::Hash::hash(&self.kind, &mut hasher);
        std::hash::Hash::hash(&self.merge, &mut hasher);
        std::hash::Hash::hash(&self.values, &mut hasher);
        let hash = hasher.finish();
        self.hash.set(Some(hash));
        hash
    }

    pub(crate) fn evaluate(&self, start: i64, end: i64, merge: bool) -> Vec<Interval> {
        if self.values.is_empty() {
            return Vec::new();
        }
        let mut spans = self.values.clone();
        spans.sort_by_key(|iv| (iv.start, iv.end));
        if merge {
            interval::coalesce(&mut spans);
            return interval::clip_sorted(&spans, start, end);
        }
        // Unmerged values may nest, leaving ends out of order; the binary
        // search in clip_sorted needs canonical input, so clip linearly.
        interval::clip_all(&spans, start, end)
    }

    pub(crate) fn matches_timestamp(&self, t: i64) -> bool {
        self.values.iter().any(|iv| iv.contains(t))
    }
}

impl PartialEq for SpanField {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.values == other.values && self.merge == other.merge
    }
}

/// Print a civil UTC date as `YYYY-MM-DD` (sign-prefixed outside 0..9999).
fn fmt_civil_date(f: &mut fmt::Formatter<'_>, ms: i64) -> fmt::Result {
    let date = calendar::utc_date(ms);
    let year = date.year();
    if year < 0 {
        write!(f, "-{:04}-{:02}-{:02}", -year, date.month(), date.day())
    } else {
        write!(f, "{:04}-{:02}-{:02}", year, date.month(), date.day())
    }
}

impl fmt::Display for SpanField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.kind.tag())?;
        for (i, span) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match self.kind {
                SpanKind::Date => {
                    fmt_civil_date(f, span.start)?;
                    // A span covering exactly one day prints as that day.
                    if span.end - span.start != LAST_MS_OF_DAY {
                        write!(f, "..")?;
                        fmt_civil_date(f, span.end)?;
                    }
                }
                SpanKind::DateTime => {
                    fmt_civil_date(f, span.start)?;
                    write!(f, "T")?;
                    fmt_time_of_day(f, calendar::ms_of_day(span.start))?;
                    write!(f, "..")?;
                    fmt_civil_date(f, span.end)?;
                    write!(f, "T")?;
                    fmt_time_of_day(f, calendar::ms_of_day(span.end))?;
                }
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-01 at UTC midnight.
    const JAN_1_2024: i64 = 1_704_067_200_000;

    fn whole_day(offset_days: i64) -> Interval {
        let start = JAN_1_2024 + offset_days * MS_PER_DAY;
        Interval::new(start, start + LAST_MS_OF_DAY)
    }

    #[test]
    fn date_field_requires_midnight_alignment() {
        assert!(SpanField::new(SpanKind::Date, vec![whole_day(0)]).is_ok());
        let misaligned = Interval::new(JAN_1_2024 + 1, JAN_1_2024 + LAST_MS_OF_DAY);
        assert!(SpanField::new(SpanKind::Date, vec![misaligned]).is_err());
        let short = Interval::new(JAN_1_2024, JAN_1_2024 + LAST_MS_OF_DAY - 1);
        assert!(SpanField::new(SpanKind::Date, vec![short]).is_err());
    }

    #[test]
    fn datetime_field_accepts_any_ordered_span() {
        let span = Interval::new(JAN_1_2024 + 5, JAN_1_2024 + 6);
        assert!(SpanField::new(SpanKind::DateTime, vec![span]).is_ok());
        let inverted = Interval {
            start: JAN_1_2024 + 6,
            end: JAN_1_2024 + 5,
        };
        assert!(SpanField::new(SpanKind::DateTime, vec![inverted]).is_err());
    }

    #[test]
    fn evaluate_slices_and_clips_to_domain() {
        let field = SpanField::new(
            SpanKind::Date,
            vec![whole_day(0), whole_day(2), whole_day(4)],
        )
        .unwrap();
        let out = field.evaluate(JAN_1_2024 + 2 * MS_PER_DAY + 100, JAN_1_2024 + 5 * MS_PER_DAY, true);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].start, JAN_1_2024 + 2 * MS_PER_DAY + 100);
        assert_eq!(out[1], whole_day(4));
    }

    #[test]
    fn merged_evaluation_coalesces_touching_days() {
        let field = SpanField::new(SpanKind::Date, vec![whole_day(0), whole_day(1)]).unwrap();
        let domain_end = JAN_1_2024 + 10 * MS_PER_DAY;
        let merged = field.evaluate(JAN_1_2024, domain_end, true);
        assert_eq!(
            merged,
            vec![Interval::new(JAN_1_2024, JAN_1_2024 + 2 * MS_PER_DAY - 1)]
        );
        let split = field.evaluate(JAN_1_2024, domain_end, false);
        assert_eq!(split.len(), 2);
    }

    #[test]
    fn unmerged_nested_spans_keep_the_covering_span() {
        // A single day nested inside a five-day span leaves ends out of
        // start order; the unmerged path must still report the cover.
        let field = SpanField::new(
            SpanKind::Date,
            vec![
                Interval::new(JAN_1_2024, JAN_1_2024 + 5 * MS_PER_DAY - 1),
                whole_day(2),
            ],
        )
        .unwrap();
        let out = field.evaluate(
            JAN_1_2024 + 3 * MS_PER_DAY,
            JAN_1_2024 + 6 * MS_PER_DAY - 1,
            false,
        );
        assert_eq!(
            out,
            vec![Interval::new(
                JAN_1_2024 + 3 * MS_PER_DAY,
                JAN_1_2024 + 5 * MS_PER_DAY - 1
            )]
        );
        assert!(field.matches_timestamp(JAN_1_2024 + 3 * MS_PER_DAY));
    }

    #[test]
    fn timestamp_membership() {
        let field = SpanField::new(SpanKind::Date, vec![whole_day(1)]).unwrap();
        assert!(field.matches_timestamp(JAN_1_2024 + MS_PER_DAY));
        assert!(!field.matches_timestamp(JAN_1_2024));
    }
}
