//! Restricted arithmetic evaluation.
//!
//! After reconciliation every dice group has been replaced by an integer
//! subtotal, leaving plain arithmetic. Evaluation is deliberately narrow:
//! any character outside digits, `+ - * / ( ) .` and whitespace is
//! stripped before parsing, and failures are reported as values for the
//! caller to degrade on — a malformed roll totals zero, it never aborts.

use thiserror::Error;

/// Errors from evaluating a residual arithmetic expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    /// The expression ended where a number or parenthesis was expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// An operator or digit was expected at the given byte offset.
    #[error("unexpected character {found:?} at offset {at}")]
    UnexpectedChar {
        /// The offending character.
        found: char,
        /// Byte offset into the sanitized expression.
        at: usize,
    },

    /// A numeric literal failed to parse (e.g. `1.2.3`).
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
}

/// Keep only the characters the restricted grammar knows about.
fn sanitize(expr: &str) -> String {
    expr.chars()
        .filter(|c| c.is_ascii_digit() || "+-*/(). \t".contains(*c))
        .collect()
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.input.len()
            && (self.input[self.pos] == b' ' || self.input[self.pos] == b'\t')
        {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.input.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            if op == b'+' {
                value += rhs;
            } else {
                value -= rhs;
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                value *= rhs;
            } else {
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, EvalError> {
        // Unary signs: negative stats substitute as e.g. `1d20+-2`.
        let mut sign = 1.0;
        while let Some(b @ (b'+' | b'-')) = self.peek() {
            if b == b'-' {
                sign = -sign;
            }
            self.pos += 1;
        }
        Ok(sign * self.primary()?)
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        match self.peek() {
            None => Err(EvalError::UnexpectedEnd),
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                match self.peek() {
                    Some(b')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(found) => Err(EvalError::UnexpectedChar {
                        found: found as char,
                        at: self.pos,
                    }),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(b) if b.is_ascii_digit() || b == b'.' => self.number(),
            Some(found) => Err(EvalError::UnexpectedChar {
                found: found as char,
                at: self.pos,
            }),
        }
    }

    fn number(&mut self) -> Result<f64, EvalError> {
        let start = self.pos;
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_digit() || self.input[self.pos] == b'.')
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default();
        text.parse()
            .map_err(|_| EvalError::InvalidNumber(text.to_owned()))
    }
}

/// Evaluate a sanitized arithmetic expression.
///
/// Supports `+ - * /`, parentheses, decimal literals, and unary signs.
/// Characters outside the restricted alphabet are stripped first.
pub fn evaluate(expr: &str) -> Result<f64, EvalError> {
    let sanitized = sanitize(expr);
    let mut parser = Parser {
        input: sanitized.as_bytes(),
        pos: 0,
    };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(found) => Err(EvalError::UnexpectedChar {
            found: found as char,
            at: parser.pos,
        }),
    }
}
