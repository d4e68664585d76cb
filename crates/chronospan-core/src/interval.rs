//! Inclusive millisecond intervals and sweep-line set operations.
//!
//! Every evaluation result is a list of [`Interval`]s sorted ascending by
//! start. The set operations here combine such lists: union and intersection
//! run an open/close event sweep, complement walks the gaps against a domain.
//! Start events order before end events at equal timestamps so zero-width
//! boundary touches are included.

use serde::{Deserialize, Serialize};

/// An inclusive `[start, end]` pair of UTC milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Self {
        debug_assert!(start <= end, "interval start {start} after end {end}");
        Self { start, end }
    }

    /// Whether `t` lies inside the interval (endpoints inclusive).
    pub fn contains(&self, t: i64) -> bool {
        self.start <= t && t <= self.end
    }

    /// The part of the interval inside `[start, end]`, if any.
    pub fn clip(&self, start: i64, end: i64) -> Option<Interval> {
        if self.end < start || self.start > end {
            return None;
        }
        Some(Interval::new(self.start.max(start), self.end.min(end)))
    }
}

/// Append `iv` to `out`, coalescing with the last interval when `merge` is
/// on and the two touch or overlap (`iv.start <= last.end + 1`).
pub(crate) fn push_interval(out: &mut Vec<Interval>, iv: Interval, merge: bool) {
    if merge {
        if let Some(last) = out.last_mut() {
            if iv.start <= last.end.saturating_add(1) {
                if iv.end > last.end {
                    last.end = iv.end;
                }
                return;
            }
        }
    }
    out.push(iv);
}

/// Sort and coalesce touching or overlapping intervals in place.
pub(crate) fn coalesce(intervals: &mut Vec<Interval>) {
    if intervals.len() < 2 {
        return;
    }
    intervals.sort_by_key(|iv| (iv.start, iv.end));
    let mut write = 0;
    for read in 1..intervals.len() {
        let iv = intervals[read];
        if iv.start <= intervals[write].end.saturating_add(1) {
            if iv.end > intervals[write].end {
                intervals[write].end = iv.end;
            }
        } else {
            write += 1;
            intervals[write] = iv;
        }
    }
    intervals.truncate(write + 1);
}

/// Union of several interval lists.
///
/// A single active count opens an output interval when it rises from zero
/// and closes it when it returns to zero. Overlap always fuses; adjacency
/// fuses only when `merge` is on.
pub(crate) fn union(lists: &[Vec<Interval>], merge: bool) -> Vec<Interval> {
    let total: usize = lists.iter().map(Vec::len).sum();
    if total == 0 {
        return Vec::new();
    }
    // (time, is_end) — sorting puts starts before ends at equal times.
    let mut events: Vec<(i64, bool)> = Vec::with_capacity(total * 2);
    for list in lists {
        for iv in list {
            events.push((iv.start, false));
            events.push((iv.end, true));
        }
    }
    events.sort_unstable();

    let mut out = Vec::new();
    let mut active = 0i64;
    let mut open = 0i64;
    for (t, is_end) in events {
        if !is_end {
            if active == 0 {
                open = t;
            }
            active += 1;
        } else {
            active -= 1;
            if active == 0 {
                push_interval(&mut out, Interval::new(open, t), merge);
            }
        }
    }
    out
}

/// Intersection of several interval lists.
///
/// Keeps a per-list active count; an output interval is open exactly while
/// every list has at least one interval active. Returns `[]` when any list
/// is empty.
pub(crate) fn intersection(lists: &[Vec<Interval>], merge: bool) -> Vec<Interval> {
    let n = lists.len();
    if n == 0 || lists.iter().any(Vec::is_empty) {
        return Vec::new();
    }
    // (time, is_end, list index)
    let mut events: Vec<(i64, bool, usize)> = Vec::new();
    for (idx, list) in lists.iter().enumerate() {
        for iv in list {
            events.push((iv.start, false, idx));
            events.push((iv.end, true, idx));
        }
    }
    events.sort_unstable_by_key(|&(t, is_end, _)| (t, is_end));

    let mut out = Vec::new();
    let mut counts = vec![0i64; n];
    let mut active_lists = 0usize;
    let mut open = 0i64;
    for (t, is_end, idx) in events {
        if !is_end {
            if counts[idx] == 0 {
                active_lists += 1;
                if active_lists == n {
                    open = t;
                }
            }
            counts[idx] += 1;
        } else {
            counts[idx] -= 1;
            if counts[idx] == 0 {
                if active_lists == n {
                    push_interval(&mut out, Interval::new(open, t), merge);
                }
                active_lists -= 1;
            }
        }
    }
    out
}

/// Complement of an interval list against `[domain_start, domain_end]`.
///
/// Emits the gaps, with `end + 1` / `start - 1` adjustments because the
/// intervals are inclusive.
pub(crate) fn complement(
    intervals: &[Interval],
    domain_start: i64,
    domain_end: i64,
    merge: bool,
) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|iv| (iv.start, iv.end));

    let mut out = Vec::new();
    let mut cursor = domain_start;
    for iv in sorted {
        if iv.start > domain_end {
            break;
        }
        if iv.end < cursor {
            continue;
        }
        if iv.start > cursor {
            push_interval(&mut out, Interval::new(cursor, iv.start - 1), merge);
        }
        cursor = iv.end.saturating_add(1);
        if cursor > domain_end {
            return out;
        }
    }
    if cursor <= domain_end {
        push_interval(&mut out, Interval::new(cursor, domain_end), merge);
    }
    out
}

/// Clip every interval to `[start, end]`, preserving order.
///
/// Linear, and safe for non-canonical input (overlapping or nested
/// intervals with ends out of order), which `clip_sorted` is not.
pub(crate) fn clip_all(intervals: &[Interval], start: i64, end: i64) -> Vec<Interval> {
    intervals
        .iter()
        .filter_map(|iv| iv.clip(start, end))
        .collect()
}

/// Clip a sorted interval list to `[start, end]` via predicate binary search
/// plus per-element clipping.
///
/// Assumes canonical input: sorted by start with non-decreasing ends (true
/// for every coalesced list and for calendar-walk output).
pub(crate) fn clip_sorted(intervals: &[Interval], start: i64, end: i64) -> Vec<Interval> {
    let lo = intervals.partition_point(|iv| iv.end < start);
    let hi = intervals.partition_point(|iv| iv.start <= end);
    if lo >= hi {
        return Vec::new();
    }
    intervals[lo..hi]
        .iter()
        .filter_map(|iv| iv.clip(start, end))
        .collect()
}
