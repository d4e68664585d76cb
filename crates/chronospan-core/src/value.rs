//! Numeric constraint forms shared by the parser and the numeric fields.

use std::fmt;

use crate::error::{Result, SpanError};

/// Bounds on the coefficients of an algebraic constraint, independent of the
/// field the constraint is attached to.
pub const ALGEBRAIC_A_MAX: i64 = 9_998;
pub const ALGEBRAIC_B_MAX: i64 = 9_998;

/// Sign of the offset in an algebraic `a·n ± b` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgebraicOp {
    Plus,
    Minus,
}

/// A single numeric predicate over a field's `[min, max]` domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericConstraint {
    /// Matches exactly the given value.
    Single(i64),
    /// Matches any value in the inclusive range.
    Range(i64, i64),
    /// Matches `a*n + b` (or `a*n - b`) for integer `n >= 0`, enumerated
    /// within the field's bounds.
    Algebraic { a: i64, op: AlgebraicOp, b: i64 },
}

impl NumericConstraint {
    /// Check the constraint against a field's `[min, max]` domain.
    pub fn validate(&self, min: i64, max: i64) -> Result<()> {
        match *self {
            NumericConstraint::Single(v) => {
                if v < min || v > max {
                    return Err(SpanError::out_of_bounds("value", v, min, max));
                }
            }
            NumericConstraint::Range(s, e) => {
                if s < min || s > max {
                    return Err(SpanError::out_of_bounds("range start", s, min, max));
                }
                if e < min || e > max {
                    return Err(SpanError::out_of_bounds("range end", e, min, max));
                }
                if s > e {
                    return Err(SpanError::Validation {
                        message: format!("range start {s} after range end {e}"),
                    });
                }
            }
            NumericConstraint::Algebraic { a, b, .. } => {
                if a < 1 || a > ALGEBRAIC_A_MAX {
                    return Err(SpanError::out_of_bounds(
                        "algebraic coefficient",
                        a,
                        1,
                        ALGEBRAIC_A_MAX,
                    ));
                }
                if b < 0 || b > ALGEBRAIC_B_MAX {
                    return Err(SpanError::out_of_bounds(
                        "algebraic offset",
                        b,
                        0,
                        ALGEBRAIC_B_MAX,
                    ));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for NumericConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NumericConstraint::Single(v) => write!(f, "{v}"),
            NumericConstraint::Range(s, e) => write!(f, "{s}..{e}"),
            NumericConstraint::Algebraic { a, op, b } => {
                let sign = match op {
                    AlgebraicOp::Plus => '+',
                    AlgebraicOp::Minus => '-',
                };
                write!(f, "{a}n{sign}{b}")
            }
        }
    }
}
