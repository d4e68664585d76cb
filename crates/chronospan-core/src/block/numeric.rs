//! Numeric calendar fields: week-day, month, month-day, and year.
//!
//! All four share one template: the constraint list compiles into a dense
//! bitmap at construction, evaluation walks the field's calendar unit across
//! the domain testing the bitmap, and a fully-set bitmap short-circuits to
//! the whole domain. Only the unit walk differs per kind.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate};
use rustc_hash::FxHasher;

use crate::bitmap::Bitmap;
use crate::block::MergeState;
use crate::calendar::{self, LAST_MS_OF_DAY};
use crate::error::{Result, SpanError};
use crate::interval::Interval;
use crate::value::NumericConstraint;

/// Which calendar unit a [`NumericField`] constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    /// ISO week-day: 1 = Monday .. 7 = Sunday.
    WeekDay,
    /// Calendar month: 1 = January .. 12 = December.
    Month,
    /// Day of month, 1..31. Days absent from a month simply never match.
    MonthDay,
    /// Calendar year, -9999..9999.
    Year,
}

impl NumericKind {
    /// Inclusive value bounds of the field's domain.
    pub fn bounds(self) -> (i64, i64) {
        match self {
            NumericKind::WeekDay => (1, 7),
            NumericKind::Month => (1, 12),
            NumericKind::MonthDay => (1, 31),
            NumericKind::Year => (-9_999, 9_999),
        }
    }

    /// Surface-syntax field tag.
    pub fn tag(self) -> &'static str {
        match self {
            NumericKind::WeekDay => "WD",
            NumericKind::Month => "M",
            NumericKind::MonthDay => "MD",
            NumericKind::Year => "Y",
        }
    }
}

/// A field block constraining one numeric calendar unit.
#[derive(Debug, Clone)]
pub struct NumericField {
    kind: NumericKind,
    values: Vec<NumericConstraint>,
    merge: MergeState,
    bitmap: Bitmap,
    hash: Cell<Option<u64>>,
}

impl NumericField {
    pub fn new(kind: NumericKind, values: Vec<NumericConstraint>) -> Result<Self> {
        let (min, max) = kind.bounds();
        for value in &values {
            value.validate(min, max)?;
        }
        let bitmap = Bitmap::populate(min, max, &values);
        Ok(Self {
            kind,
            values,
            merge: MergeState::Default,
            bitmap,
            hash: Cell::new(None),
        })
    }

    pub fn kind(&self) -> NumericKind {
        self.kind
    }

    pub fn values(&self) -> &[NumericConstraint] {
        &self.values
    }

    pub fn merge_state(&self) -> MergeState {
        self.merge
    }

    pub fn set_merge_state(&mut self, state: MergeState) {
        self.merge = state;
        self.hash.set(None);
    }

    /// Append a constraint to the value list.
    pub fn add_value(&mut self, value: NumericConstraint) -> Result<()> {
        let (min, max) = self.kind.bounds();
        value.validate(min, max)?;
        self.values.push(value);
        self.rebuild();
        Ok(())
    }

    /// Insert a constraint at `index` (existing values shift right).
    pub fn insert_value(&mut self, value: NumericConstraint, index: usize) -> Result<()> {
        if index > self.values.len() {
            return Err(SpanError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            });
        }
        let (min, max) = self.kind.bounds();
        value.validate(min, max)?;
        self.values.insert(index, value);
        self.rebuild();
        Ok(())
    }

    pub fn get_value(&self, index: usize) -> Result<NumericConstraint> {
        self.values
            .get(index)
            .copied()
            .ok_or(SpanError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            })
    }

    pub fn remove_value(&mut self, index: usize) -> Result<NumericConstraint> {
        if index >= self.values.len() {
            return Err(SpanError::IndexOutOfBounds {
                index,
                len: self.values.len(),
            });
        }
        let removed = self.values.remove(index);
        self.rebuild();
        Ok(removed)
    }

    fn rebuild(&mut self) {
        let (min, max) = self.kind.bounds();
        self.bitmap = Bitmap::populate(min, max, &self.values);
        self.hash.set(None);
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        if let Some(hash) = self.hash.get() {
            return hash;
        }
        let mut hasher = FxHasher::default();
        hasher.write_u8(2);
        self.kind.hash(&mut hasher);
        self.merge.hash(&mut hasher);
        self.values.hash(&mut hasher);
        let hash = hasher.finish();
        self.hash.set(Some(hash));
        hash
    }

    pub(crate) fn evaluate(&self, start: i64, end: i64, merge: bool) -> Vec<Interval> {
        if self.values.is_empty() {
            return Vec::new();
        }
        if self.bitmap.is_full() {
            return vec![Interval::new(start, end)];
        }
        match self.kind {
            NumericKind::WeekDay => self.walk_days(start, end, merge, |date| {
                i64::from(date.weekday().number_from_monday())
            }),
            NumericKind::MonthDay => {
                self.walk_days(start, end, merge, |date| i64::from(date.day()))
            }
            NumericKind::Month => self.walk_months(start, end, merge),
            NumericKind::Year => self.walk_years(start, end, merge),
        }
    }

    pub(crate) fn matches_timestamp(&self, t: i64) -> bool {
        let date = calendar::utc_date(t);
        let value = match self.kind {
            NumericKind::WeekDay => i64::from(date.weekday().number_from_monday()),
            NumericKind::Month => i64::from(date.month()),
            NumericKind::MonthDay => i64::from(date.day()),
            NumericKind::Year => i64::from(date.year()),
        };
        self.bitmap.contains(value)
    }

    /// Walk UTC days across the domain, emitting matching days as clipped
    /// unit intervals. With merge on, consecutive matching days extend one
    /// open run; a miss flushes it.
    fn walk_days<F>(&self, start: i64, end: i64, merge: bool, value_of: F) -> Vec<Interval>
    where
        F: Fn(NaiveDate) -> i64,
    {
        let first = calendar::day_index(start);
        let last = calendar::day_index(end);
        let mut out = Vec::new();
        let mut run: Option<Interval> = None;
        for idx in first..=last {
            let unit_start = calendar::day_start(idx);
            if !self.bitmap.contains(value_of(calendar::utc_date(unit_start))) {
                if let Some(r) = run.take() {
                    out.push(r);
                }
                continue;
            }
            let unit = Interval::new(
                unit_start.max(start),
                (unit_start + LAST_MS_OF_DAY).min(end),
            );
            self.emit(&mut out, &mut run, unit, merge);
        }
        if let Some(r) = run {
            out.push(r);
        }
        out
    }

    fn walk_months(&self, start: i64, end: i64, merge: bool) -> Vec<Interval> {
        let first = calendar::month_index(start);
        let last = calendar::month_index(end);
        let mut out = Vec::new();
        let mut run: Option<Interval> = None;
        for idx in first..=last {
            let month_value = idx.rem_euclid(12) + 1;
            if !self.bitmap.contains(month_value) {
                if let Some(r) = run.take() {
                    out.push(r);
                }
                continue;
            }
            let unit_start = calendar::month_index_start_ms(idx);
            let unit_end = calendar::month_index_start_ms(idx + 1) - 1;
            let unit = Interval::new(unit_start.max(start), unit_end.min(end));
            self.emit(&mut out, &mut run, unit, merge);
        }
        if let Some(r) = run {
            out.push(r);
        }
        out
    }

    fn walk_years(&self, start: i64, end: i64, merge: bool) -> Vec<Interval> {
        let first = calendar::utc_date(start).year();
        let last = calendar::utc_date(end).year();
        let mut out = Vec::new();
        let mut run: Option<Interval> = None;
        for year in first..=last {
            if !self.bitmap.contains(i64::from(year)) {
                if let Some(r) = run.take() {
                    out.push(r);
                }
                continue;
            }
            let unit_start = calendar::year_start_ms(year);
            let unit_end = calendar::year_start_ms(year + 1) - 1;
            let unit = Interval::new(unit_start.max(start), unit_end.min(end));
            self.emit(&mut out, &mut run, unit, merge);
        }
        if let Some(r) = run {
            out.push(r);
        }
        out
    }

    fn emit(&self, out: &mut Vec<Interval>, run: &mut Option<Interval>, unit: Interval, merge: bool) {
        match run {
            // Units arrive in calendar order, so an open run is always
            // adjacent to the next matching unit.
            Some(r) if merge => r.end = unit.end,
            _ => {
                if let Some(r) = run.take() {
                    out.push(r);
                }
                *run = Some(unit);
            }
        }
    }
}

impl PartialEq for NumericField {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.values == other.values && self.merge == other.merge
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.kind.tag())?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}
