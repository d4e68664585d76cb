//! Recursive-descent parser for the schedule-expression surface language.
//!
//! Grammar (precedence highest-first; same level is left-associative):
//!
//! ```text
//! Expr     := Or
//! Or       := And ( ('OR' | ',')  And )*
//! And      := Not ( ('AND' | '.') Not )*
//! Not      := ('NOT' | '!') Unary | Unary
//! Unary    := ('#' | '~') Unary | Atom
//! Atom     := '(' Expr ')' | Field
//! Field    := T'[' TimeList ']' | WD'[' ValList ']' | D'[' DateList ']'
//!           | M'[' ValList ']' | MD'[' ValList ']' | Y'[' ValList ']'
//!           | DT'[' DTList ']' | REF'[' AlphaNum+ ']'
//! ```
//!
//! Time literals come in four precisions (`H`, `H:M`, `H:M:S`, `H:M:S.mmm`)
//! with a trailing `>` padding the unspecified lower components to their
//! maxima. Date literals are `YYYY-MM-DD`; date-time literals are
//! `YYYY-MM-DD'T'Time`. Consecutive same-operator conditions flatten into a
//! single multi-child block; the `#`/`~` prefixes set the explicit merge
//! state on their operand (descending through NOT to its inner operand).
//! A childless NOT prints as `NOT ()` and reparses to the same block.
//! Whitespace is permitted between tokens.

use crate::block::{
    AndBlock, Block, MergeState, NotBlock, NumericField, NumericKind, OrBlock, ReferenceBlock,
    SpanField, SpanKind, TimeField,
};
use crate::calendar::{self, LAST_MS_OF_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};
use crate::error::{Result, SpanError};
use crate::interval::Interval;
use crate::value::{AlgebraicOp, NumericConstraint};

/// Parse an expression into its block tree.
pub fn parse(expression: &str) -> Result<Block> {
    let mut parser = Parser::new(expression);
    parser.skip_ws();
    let block = parser.parse_or()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(block)
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> SpanError {
        SpanError::Parse {
            expression: self.src.to_string(),
            message: format!("{} at offset {}", message.into(), self.pos),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, token: &str) -> bool {
        if self.src[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}", byte as char)))
        }
    }

    fn expect_str(&mut self, token: &str) -> Result<()> {
        if self.eat_str(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {token:?}")))
        }
    }

    // ---- expression levels -------------------------------------------------

    fn parse_or(&mut self) -> Result<Block> {
        let first = self.parse_and()?;
        let mut children = vec![first];
        loop {
            self.skip_ws();
            if self.eat(b',') || self.eat_str("OR") {
                self.skip_ws();
                children.push(self.parse_and()?);
            } else {
                break;
            }
        }
        if children.len() == 1 {
            Ok(children.remove(0))
        } else {
            Ok(Block::Or(OrBlock::new(children)))
        }
    }

    fn parse_and(&mut self) -> Result<Block> {
        let first = self.parse_not()?;
        let mut children = vec![first];
        loop {
            self.skip_ws();
            if self.eat(b'.') || self.eat_str("AND") {
                self.skip_ws();
                children.push(self.parse_not()?);
            } else {
                break;
            }
        }
        if children.len() == 1 {
            Ok(children.remove(0))
        } else {
            Ok(Block::And(AndBlock::new(children)))
        }
    }

    fn parse_not(&mut self) -> Result<Block> {
        self.skip_ws();
        if self.eat(b'!') || self.eat_str("NOT") {
            self.skip_ws();
            // `NOT ()` is the printed form of a childless NOT (the whole
            // domain is on); accept the empty parens back.
            let checkpoint = self.pos;
            if self.eat(b'(') {
                self.skip_ws();
                if self.eat(b')') {
                    return Ok(Block::Not(NotBlock::new(None)));
                }
                self.pos = checkpoint;
            }
            let operand = self.parse_unary()?;
            Ok(Block::Not(NotBlock::new(Some(operand))))
        } else {
            self.parse_unary()
        }
    }

    fn parse_unary(&mut self) -> Result<Block> {
        self.skip_ws();
        if self.eat(b'#') {
            let mut operand = self.parse_unary()?;
            apply_merge(&mut operand, MergeState::Off);
            Ok(operand)
        } else if self.eat(b'~') {
            let mut operand = self.parse_unary()?;
            apply_merge(&mut operand, MergeState::On);
            Ok(operand)
        } else {
            self.parse_atom()
        }
    }

    fn parse_atom(&mut self) -> Result<Block> {
        self.skip_ws();
        if self.eat(b'(') {
            let block = self.parse_or()?;
            self.skip_ws();
            self.expect(b')')?;
            return Ok(block);
        }
        // Longest tag first: MD/DT/WD/REF before M/D/T.
        if self.eat_str("REF[") {
            return self.parse_reference();
        }
        if self.eat_str("WD[") {
            return self.parse_numeric(NumericKind::WeekDay);
        }
        if self.eat_str("MD[") {
            return self.parse_numeric(NumericKind::MonthDay);
        }
        if self.eat_str("DT[") {
            return self.parse_span(SpanKind::DateTime);
        }
        if self.eat_str("T[") {
            return self.parse_time_field();
        }
        if self.eat_str("M[") {
            return self.parse_numeric(NumericKind::Month);
        }
        if self.eat_str("D[") {
            return self.parse_span(SpanKind::Date);
        }
        if self.eat_str("Y[") {
            return self.parse_numeric(NumericKind::Year);
        }
        Err(self.error("expected '(' or a field"))
    }

    // ---- fields ------------------------------------------------------------

    fn parse_numeric(&mut self, kind: NumericKind) -> Result<Block> {
        let mut values = Vec::new();
        self.skip_ws();
        if !self.eat(b']') {
            loop {
                values.push(self.parse_constraint()?);
                self.skip_ws();
                if self.eat(b',') {
                    self.skip_ws();
                    continue;
                }
                self.expect(b']')?;
                break;
            }
        }
        Ok(Block::Numeric(NumericField::new(kind, values)?))
    }

    fn parse_constraint(&mut self) -> Result<NumericConstraint> {
        let first = self.parse_signed_number()?;
        self.skip_ws();
        if self.eat(b'n') {
            self.skip_ws();
            let op = if self.eat(b'+') {
                AlgebraicOp::Plus
            } else if self.eat(b'-') {
                AlgebraicOp::Minus
            } else {
                return Err(self.error("expected '+' or '-' after 'n'"));
            };
            self.skip_ws();
            let offset = self.parse_number()?;
            Ok(NumericConstraint::Algebraic {
                a: first,
                op,
                b: offset,
            })
        } else if self.eat_str("..") {
            self.skip_ws();
            let end = self.parse_signed_number()?;
            Ok(NumericConstraint::Range(first, end))
        } else {
            Ok(NumericConstraint::Single(first))
        }
    }

    fn parse_time_field(&mut self) -> Result<Block> {
        let mut values = Vec::new();
        self.skip_ws();
        if !self.eat(b']') {
            loop {
                let start = self.parse_time()?;
                self.skip_ws();
                self.expect_str("..")?;
                self.skip_ws();
                let end = self.parse_time()?;
                values.push(Interval { start, end });
                self.skip_ws();
                if self.eat(b',') {
                    self.skip_ws();
                    continue;
                }
                self.expect(b']')?;
                break;
            }
        }
        Ok(Block::Time(TimeField::new(values)?))
    }

    fn parse_span(&mut self, kind: SpanKind) -> Result<Block> {
        let mut values = Vec::new();
        self.skip_ws();
        if !self.eat(b']') {
            loop {
                let value = match kind {
                    SpanKind::Date => {
                        let first = self.parse_date()?;
                        self.skip_ws();
                        let last = if self.eat_str("..") {
                            self.skip_ws();
                            self.parse_date()?
                        } else {
                            first
                        };
                        Interval {
                            start: first,
                            end: last + LAST_MS_OF_DAY,
                        }
                    }
                    SpanKind::DateTime => {
                        let start = self.parse_datetime()?;
                        self.skip_ws();
                        self.expect_str("..")?;
                        self.skip_ws();
                        let end = self.parse_datetime()?;
                        Interval { start, end }
                    }
                };
                values.push(value);
                self.skip_ws();
                if self.eat(b',') {
                    self.skip_ws();
                    continue;
                }
                self.expect(b']')?;
                break;
            }
        }
        Ok(Block::Span(SpanField::new(kind, values)?))
    }

    fn parse_reference(&mut self) -> Result<Block> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a schedule id"));
        }
        let id = &self.src[start..self.pos];
        self.skip_ws();
        self.expect(b']')?;
        Ok(Block::Reference(ReferenceBlock::new(id)?))
    }

    // ---- literals ----------------------------------------------------------

    /// Time of day in milliseconds from midnight. A trailing `>` pads the
    /// components below the written precision to their maxima.
    fn parse_time(&mut self) -> Result<i64> {
        let hour = self.parse_digits(2, "hour")?;
        check_component("hour", hour, 23)?;
        let mut minute = 0;
        let mut second = 0;
        let mut milli = 0;
        // 0 = H, 1 = H:M, 2 = H:M:S, 3 = H:M:S.mmm
        let mut precision = 0;
        if self.eat(b':') {
            minute = self.parse_digits(2, "minute")?;
            check_component("minute", minute, 59)?;
            precision = 1;
            if self.eat(b':') {
                second = self.parse_digits(2, "second")?;
                check_component("second", second, 59)?;
                precision = 2;
                // A lone '.' here starts the '..' range separator; only a
                // digit after it begins a millisecond component.
                if self.peek() == Some(b'.')
                    && self.bytes.get(self.pos + 1).is_some_and(|b| b.is_ascii_digit())
                {
                    self.pos += 1;
                    // 1-3 digits, not right-padded: ".5" is 5 ms.
                    milli = self.parse_digits(3, "millisecond")?;
                    precision = 3;
                }
            }
        }
        let mut ms =
            hour * MS_PER_HOUR + minute * MS_PER_MINUTE + second * MS_PER_SECOND + milli;
        if self.eat(b'>') {
            ms += match precision {
                0 => 59 * MS_PER_MINUTE + 59 * MS_PER_SECOND + 999,
                1 => 59 * MS_PER_SECOND + 999,
                2 => 999,
                _ => 0,
            };
        }
        Ok(ms)
    }

    /// `YYYY-MM-DD` (optionally sign-prefixed year) as UTC-midnight
    /// milliseconds. Rejects dates absent from the calendar.
    fn parse_date(&mut self) -> Result<i64> {
        let negative = self.eat(b'-');
        let year_start = self.pos;
        let year = self.parse_digits(4, "year")?;
        if self.pos - year_start != 4 {
            return Err(self.error("expected a 4-digit year"));
        }
        let year = if negative { -year } else { year };
        self.expect(b'-')?;
        let month = self.parse_digits(2, "month")?;
        check_component("month", month, 12)?;
        self.expect(b'-')?;
        let day = self.parse_digits(2, "day")?;
        check_component("day", day, 31)?;
        calendar::ymd_start_ms(year as i32, month as u32, day as u32).ok_or_else(|| {
            SpanError::Validation {
                message: format!("no such calendar date {year:04}-{month:02}-{day:02}"),
            }
        })
    }

    fn parse_datetime(&mut self) -> Result<i64> {
        let date = self.parse_date()?;
        self.expect(b'T')?;
        let time = self.parse_time()?;
        Ok(date + time)
    }

    // ---- numbers -----------------------------------------------------------

    /// Up to `max_digits` consecutive digits, at least one.
    fn parse_digits(&mut self, max_digits: usize, what: &str) -> Result<i64> {
        let start = self.pos;
        while self.pos - start < max_digits
            && matches!(self.peek(), Some(b) if b.is_ascii_digit())
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error(format!("expected a {what}")));
        }
        // At most 4 digits, so this cannot overflow.
        Ok(self.src[start..self.pos]
            .parse::<i64>()
            .unwrap_or_default())
    }

    /// An unsigned integer of arbitrary written length.
    fn parse_number(&mut self) -> Result<i64> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a number"));
        }
        self.src[start..self.pos]
            .parse::<i64>()
            .map_err(|_| self.error("number too large"))
    }

    fn parse_signed_number(&mut self) -> Result<i64> {
        let negative = self.eat(b'-');
        let value = self.parse_number()?;
        Ok(if negative { -value } else { value })
    }
}

/// Set an explicit merge state on a prefix operand. A NOT is annotated on
/// its inner operand, not on the NOT itself.
fn apply_merge(block: &mut Block, state: MergeState) {
    match block {
        Block::Not(not) => match not.child_mut() {
            Some(child) => apply_merge(child, state),
            None => not.set_merge_state(state),
        },
        other => other.set_merge_state(state),
    }
}

fn check_component(what: &str, value: i64, max: i64) -> Result<()> {
    if value > max {
        return Err(SpanError::out_of_bounds(what, value, 0, max));
    }
    Ok(())
}
