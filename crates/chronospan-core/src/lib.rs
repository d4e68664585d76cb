//! # chronospan-core
//!
//! Parser and evaluator for the chronospan schedule-expression language.
//!
//! A chronospan expression combines calendrical field predicates —
//! time-of-day (`T[9:00..17:00]`), ISO week-days (`WD[1..5]`), months,
//! month-days, years, dates, date-times, and named references — with
//! boolean `AND`/`OR`/`NOT` composition and `#`/`~` merge-control
//! annotations. Evaluating an expression over an inclusive
//! `[start, end]` UTC-millisecond domain yields the exact, sorted set of
//! intervals during which the schedule is "on".
//!
//! ## Quick start
//!
//! ```rust
//! use chronospan_core::parse;
//!
//! // Business hours: 09:00-17:00 UTC on weekdays.
//! let block = parse("T[9:00..17:00] AND WD[1..5]").unwrap();
//!
//! // The first ISO week of 2024, as UTC milliseconds.
//! let start = 1_704_067_200_000; // 2024-01-01T00:00:00Z (a Monday)
//! let end = start + 7 * 86_400_000 - 1;
//!
//! let on = block.evaluate(start, end, None, true).unwrap();
//! assert_eq!(on.len(), 5); // one interval per weekday
//! ```
//!
//! Named, cross-referenced schedules go through a [`Schedule`] registry:
//!
//! ```rust
//! use chronospan_core::{parse, Schedule};
//!
//! let mut schedule = Schedule::new();
//! let hours = parse("T[9:00..17:00] AND WD[1..5]").unwrap();
//! schedule.set("businesshours", "Business hours", hours, true).unwrap();
//!
//! let working = parse("REF[businesshours] AND NOT D[2024-01-01]").unwrap();
//! let start = 1_704_067_200_000;
//! let on = working
//!     .evaluate(start, start + 2 * 86_400_000 - 1, Some(&schedule), true)
//!     .unwrap();
//! assert_eq!(on.len(), 1); // Jan 2 only — Jan 1 is excluded
//! ```
//!
//! ## Modules
//!
//! - [`parser`] — expression text → block tree
//! - [`block`] — the tree: field blocks, conditions, references
//! - [`interval`] — the interval type and sweep-line set operations
//! - [`schedule`] — named-schedule registry with cached evaluation
//! - [`cache`] — the `(hash, domain)`-keyed interval cache
//! - [`value`] — numeric constraint forms (`5`, `1..5`, `2n+1`)
//! - [`error`] — error types
//!
//! All timestamps are integer milliseconds since the Unix epoch, UTC, with
//! inclusive interval endpoints. Timezone conversion is out of scope — the
//! engine performs UTC calendar arithmetic throughout.

mod bitmap;
mod calendar;

pub mod block;
pub mod cache;
pub mod error;
pub mod interval;
pub mod parser;
pub mod schedule;
pub mod value;

pub use block::{
    AndBlock, Block, BlockGroup, MergeState, NotBlock, NumericField, NumericKind, OrBlock,
    ReferenceBlock, SpanField, SpanKind, TimeField,
};
pub use cache::{CacheOptions, IntervalCache};
pub use error::{Result, SpanError};
pub use interval::Interval;
pub use parser::parse;
pub use schedule::{Schedule, ScheduleEntry};
pub use value::{AlgebraicOp, NumericConstraint};
