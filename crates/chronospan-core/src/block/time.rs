//! Time-of-day field: millisecond ranges from UTC midnight, applied to
//! every day the domain touches.

use std::cell::Cell;
use std::fmt;
use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::block::MergeState;
use crate::calendar::{self, LAST_MS_OF_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};
use crate::error::{Result, SpanError};
use crate::interval::{self, Interval};

/// A field block of time-of-day ranges in `[0, 86_399_999]` milliseconds
/// from midnight, with `start < end` per range.
#[derive(Debug, Clone)]
pub struct TimeField {
    values: Vec<Interval>,
    merge: MergeState,
    hash: Cell<Option<u64>>,
}

fn validate_time_range(range: &Interval) -> Result<()> {
    if range.start < 0 || range.start > LAST_MS_OF_DAY {
        return Err(SpanError::out_of_bounds(
            "time range start",
            range.start,
            0,
            LAST_MS_OF_DAY,
        ));
    }
    if range.end < 0 || range.end > LAST_MS_OF_DAY {
        return Err(SpanError::out_of_bounds(
            "time range end",
            range.end,
            0,
            LAST_MS_OF_DAY,
        ));
    }
    if range.start >= range.end {
        return Err(SpanError::Validation {
            message: format!(
                "time range start {} not before end {}",
                range.start, range.end
            ),
        });
    }
    Ok(())
}

impl TimeField {
    pub fn new(values: Vec<Interval>) -> Result<Self> {
        for value in &values {
            validate_time_range(value)?;
        }
        Ok(Self {
            values,
            merge: MergeState::Default,
            hash: Cell::new(None),
        })
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
        validate_time_range(&value)?;
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
        validate_time_range(&value)?;
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
        hasher.write_u8(1);
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
        let mut ranges = self.values.clone();
        ranges.sort_by_key(|r| (r.start, r.end));
        if merge {
            interval::coalesce(&mut ranges);
        }
        // Fast path: one range covering the whole day.
        if ranges.len() == 1 && ranges[0].start == 0 && ranges[0].end == LAST_MS_OF_DAY {
            return vec![Interval::new(start, end)];
        }

        let first = calendar::day_index(start);
        let last = calendar::day_index(end);
        let mut out = Vec::new();
        for idx in first..=last {
            let day_start = calendar::day_start(idx);
            for range in &ranges {
                let Some(clipped) =
                    Interval::new(day_start + range.start, day_start + range.end).clip(start, end)
                else {
                    continue;
                };
                interval::push_interval(&mut out, clipped, merge);
            }
        }
        out
    }

    /// Membership test against the raw (not pre-merged) value list.
    pub(crate) fn matches_timestamp(&self, t: i64) -> bool {
        let time_of_day = calendar::ms_of_day(t);
        self.values.iter().any(|r| r.contains(time_of_day))
    }
}

impl PartialEq for TimeField {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.merge == other.merge
    }
}

/// Print a ms-from-midnight instant in the shortest surface form that
/// parses back to the same value (`9`, `9:30`, `9:30:15`, `9:30:15.250`).
pub(crate) fn fmt_time_of_day(f: &mut fmt::Formatter<'_>, ms: i64) -> fmt::Result {
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms / MS_PER_MINUTE) % 60;
    let seconds = (ms / MS_PER_SECOND) % 60;
    let millis = ms % MS_PER_SECOND;
    if millis != 0 {
        write!(f, "{hours}:{minutes:02}:{seconds:02}.{millis}")
    } else if seconds != 0 {
        write!(f, "{hours}:{minutes:02}:{seconds:02}")
    } else if minutes != 0 {
        write!(f, "{hours}:{minutes:02}")
    } else {
        write!(f, "{hours}")
    }
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T[")?;
        for (i, range) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            fmt_time_of_day(f, range.start)?;
            write!(f, "..")?;
            fmt_time_of_day(f, range.end)?;
        }
        write!(f, "]")
    }
}
