//! The block tree: field and condition nodes with interval evaluation.
//!
//! A parsed expression lowers to a tree of [`Block`]s — a tagged sum over
//! the field kinds (time-of-day, the numeric calendar fields, date spans,
//! references) and the boolean conditions (AND/OR/NOT). Every node carries
//! a [`MergeState`] annotation and a memoized 64-bit structural hash.
//!
//! ## Merge resolution
//!
//! Each node resolves its effective merge flag from `(own_state,
//! caller_flag)`: `Default` inherits the caller, the explicit states
//! override. The node applies the *resolved* flag locally and passes that
//! same resolved flag down to its children, where explicit child states may
//! override again. The root caller defaults to merged.

pub mod condition;
pub mod numeric;
pub mod reference;
pub mod span;
pub mod time;

use std::fmt;

use rustc_hash::FxHashSet;

use crate::error::Result;
use crate::interval::Interval;
use crate::schedule::Schedule;

pub use condition::{AndBlock, NotBlock, OrBlock};
pub use numeric::{NumericField, NumericKind};
pub use reference::ReferenceBlock;
pub use span::{SpanField, SpanKind};
pub use time::TimeField;

/// Merge behavior annotation carried by every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergeState {
    /// Inherit the caller's merge flag.
    #[default]
    Default,
    /// Always coalesce adjacent output intervals (the `~` prefix).
    On,
    /// Never coalesce (the `#` prefix).
    Off,
}

impl MergeState {
    /// Effective merge flag for a node given the caller's flag.
    pub fn resolve(self, caller: bool) -> bool {
        match self {
            MergeState::Default => caller,
            MergeState::On => true,
            MergeState::Off => false,
        }
    }
}

/// Coarse evaluation-order class. Conditions evaluate children in
/// Field → Condition → Reference order so cheap predicates run first and
/// AND can short-circuit before touching the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockGroup {
    Field,
    Condition,
    Reference,
}

/// Shared state threaded through one evaluation: the registry for reference
/// resolution plus the set of reference IDs on the active resolution path
/// (cycle detection).
pub(crate) struct EvalCtx<'a> {
    pub(crate) schedule: Option<&'a Schedule>,
    pub(crate) visiting: FxHashSet<String>,
}

impl<'a> EvalCtx<'a> {
    pub(crate) fn new(schedule: Option<&'a Schedule>) -> Self {
        Self {
            schedule,
            visiting: FxHashSet::default(),
        }
    }
}

/// A node in the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Time(TimeField),
    Numeric(NumericField),
    Span(SpanField),
    Reference(ReferenceBlock),
    And(AndBlock),
    Or(OrBlock),
    Not(NotBlock),
}

impl Block {
    /// Evaluate the block over the inclusive domain `[start, end]`,
    /// returning the sorted interval list during which it is "on".
    ///
    /// `schedule` supplies reference resolution; `merge` is the root merge
    /// flag (callers usually pass `true`). An inverted domain yields `[]`.
    pub fn evaluate(
        &self,
        start: i64,
        end: i64,
        schedule: Option<&Schedule>,
        merge: bool,
    ) -> Result<Vec<Interval>> {
        if start > end {
            return Ok(Vec::new());
        }
        let mut ctx = EvalCtx::new(schedule);
        self.eval(start, end, merge, &mut ctx)
    }

    /// Whether the block is "on" at the single timestamp `t`.
    pub fn evaluate_timestamp(&self, t: i64, schedule: Option<&Schedule>) -> Result<bool> {
        let mut ctx = EvalCtx::new(schedule);
        self.eval_timestamp(t, &mut ctx)
    }

    pub(crate) fn eval(
        &self,
        start: i64,
        end: i64,
        merge: bool,
        ctx: &mut EvalCtx<'_>,
    ) -> Result<Vec<Interval>> {
        match self {
            Block::Time(field) => Ok(field.evaluate(start, end, field.merge_state().resolve(merge))),
            Block::Numeric(field) => {
                Ok(field.evaluate(start, end, field.merge_state().resolve(merge)))
            }
            Block::Span(field) => Ok(field.evaluate(start, end, field.merge_state().resolve(merge))),
            Block::Reference(block) => block.eval(start, end, merge, ctx),
            Block::And(block) => block.eval(start, end, merge, ctx),
            Block::Or(block) => block.eval(start, end, merge, ctx),
            Block::Not(block) => block.eval(start, end, merge, ctx),
        }
    }

    pub(crate) fn eval_timestamp(&self, t: i64, ctx: &mut EvalCtx<'_>) -> Result<bool> {
        match self {
            Block::Time(field) => Ok(field.matches_timestamp(t)),
            Block::Numeric(field) => Ok(field.matches_timestamp(t)),
            Block::Span(field) => Ok(field.matches_timestamp(t)),
            Block::Reference(block) => block.eval_timestamp(t, ctx),
            Block::And(block) => block.eval_timestamp(t, ctx),
            Block::Or(block) => block.eval_timestamp(t, ctx),
            Block::Not(block) => block.eval_timestamp(t, ctx),
        }
    }

    /// Memoized 64-bit structural hash over kind, values, merge state, and
    /// (for conditions) child hashes. Equal trees hash equal; any mutation
    /// through the block's own mutators invalidates the memo.
    pub fn structural_hash(&self) -> u64 {
        match self {
            Block::Time(field) => field.structural_hash(),
            Block::Numeric(field) => field.structural_hash(),
            Block::Span(field) => field.structural_hash(),
            Block::Reference(block) => block.structural_hash(),
            Block::And(block) => block.structural_hash(),
            Block::Or(block) => block.structural_hash(),
            Block::Not(block) => block.structural_hash(),
        }
    }

    pub fn merge_state(&self) -> MergeState {
        match self {
            Block::Time(field) => field.merge_state(),
            Block::Numeric(field) => field.merge_state(),
            Block::Span(field) => field.merge_state(),
            Block::Reference(block) => block.merge_state(),
            Block::And(block) => block.merge_state(),
            Block::Or(block) => block.merge_state(),
            Block::Not(block) => block.merge_state(),
        }
    }

    pub fn set_merge_state(&mut self, state: MergeState) {
        match self {
            Block::Time(field) => field.set_merge_state(state),
            Block::Numeric(field) => field.set_merge_state(state),
            Block::Span(field) => field.set_merge_state(state),
            Block::Reference(block) => block.set_merge_state(state),
            Block::And(block) => block.set_merge_state(state),
            Block::Or(block) => block.set_merge_state(state),
            Block::Not(block) => block.set_merge_state(state),
        }
    }

    pub fn group(&self) -> BlockGroup {
        match self {
            Block::Time(_) | Block::Numeric(_) | Block::Span(_) => BlockGroup::Field,
            Block::And(_) | Block::Or(_) | Block::Not(_) => BlockGroup::Condition,
            Block::Reference(_) => BlockGroup::Reference,
        }
    }

    /// The `#`/`~` prefix for an explicit merge state, or `""`.
    fn merge_prefix(&self) -> &'static str {
        match self.merge_state() {
            MergeState::Default => "",
            MergeState::On => "~",
            MergeState::Off => "#",
        }
    }

    /// Write the block as an operand: AND/OR children parenthesize so the
    /// printed form reparses with the same structure.
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let is_bare_condition = matches!(self, Block::And(_) | Block::Or(_))
            && self.merge_state() == MergeState::Default;
        if is_bare_condition {
            write!(f, "({self})")
        } else {
            // Prefixed conditions already parenthesize themselves.
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.merge_prefix();
        match self {
            Block::Time(field) => write!(f, "{prefix}{field}"),
            Block::Numeric(field) => write!(f, "{prefix}{field}"),
            Block::Span(field) => write!(f, "{prefix}{field}"),
            Block::Reference(block) => write!(f, "{prefix}{block}"),
            Block::And(block) => {
                write!(f, "{prefix}")?;
                if !prefix.is_empty() {
                    write!(f, "(")?;
                }
                for (i, child) in block.children().iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    child.fmt_operand(f)?;
                }
                if !prefix.is_empty() {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Block::Or(block) => {
                write!(f, "{prefix}")?;
                if !prefix.is_empty() {
                    write!(f, "(")?;
                }
                for (i, child) in block.children().iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    child.fmt_operand(f)?;
                }
                if !prefix.is_empty() {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Block::Not(block) => {
                write!(f, "{prefix}")?;
                if !prefix.is_empty() {
                    write!(f, "(")?;
                }
                match block.child() {
                    Some(child) => {
                        write!(f, "NOT ")?;
                        // The grammar only reaches a nested NOT through
                        // parentheses.
                        if matches!(child, Block::Not(_))
                            && child.merge_state() == MergeState::Default
                        {
                            write!(f, "({child})")?;
                        } else {
                            child.fmt_operand(f)?;
                        }
                    }
                    None => write!(f, "NOT ()")?,
                }
                if !prefix.is_empty() {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}
