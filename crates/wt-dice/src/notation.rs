//! Dice-notation scanning.
//!
//! Notation is free-form arithmetic with embedded dice groups:
//!
//! ```text
//! <expr>      ::= (<term> | <diceGroup>) (('+'|'-'|'*'|'/') (<term> | <diceGroup>))*
//! <diceGroup> ::= <count> 'd' <faces> [ 'k' ('h'|'l') <keepCount> ]
//! ```
//!
//! The scanner only extracts dice groups (with their byte spans); the
//! surrounding arithmetic is left untouched and evaluated later, after
//! each group has been replaced by its subtotal. Anything the lexer cannot
//! tokenize is skipped here — malformation surfaces at evaluation time,
//! where the roll degrades to a zero total instead of failing.

use logos::Logos;
use serde::{Deserialize, Serialize};

use crate::die::Die;

/// Which end of the sorted roll a keep modifier retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeepMode {
    /// Keep the highest values (`kh`).
    High,
    /// Keep the lowest values (`kl`).
    Low,
}

/// A keep modifier on a dice group, e.g. the `kh1` in `2d20kh1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keep {
    /// Whether the highest or lowest values are kept.
    pub mode: KeepMode,
    /// How many values are kept.
    pub count: u32,
}

/// A dice group scanned out of a notation string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceGroup {
    /// Byte span of the group within the notation string.
    pub span: std::ops::Range<usize>,
    /// Number of dice to roll.
    pub count: u32,
    /// The die type rolled.
    pub die: Die,
    /// Optional keep-high/keep-low modifier.
    pub keep: Option<Keep>,
}

/// A request for `count` dice of one type, as handed to the roll oracle.
///
/// One request per dice group in order of appearance; repeated groups of
/// the same die type are deliberately not coalesced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRequest {
    /// The die type requested.
    pub die: Die,
    /// How many dice of this type.
    pub count: u32,
}

/// Raw lexer for notation strings. Dice groups are single tokens so that
/// `2d20kh1` never splits into a number and a word.
#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[regex(r"[0-9]+[dD][0-9]+(k[hl][0-9]+)?", priority = 10)]
    DiceGroup,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,
}

/// Parse the inside of a dice-group token, e.g. `2d20kh1`.
///
/// Returns `None` for degenerate face counts (below two sides), which are
/// then treated as plain text rather than dice.
fn parse_group(text: &str) -> Option<(u32, Die, Option<Keep>)> {
    let lower = text.to_ascii_lowercase();
    let (count_str, rest) = lower.split_once('d')?;
    let count = count_str.parse().ok()?;
    let (faces_str, keep) = match rest.split_once('k') {
        Some((faces_str, keep_str)) => {
            let mode = match keep_str.as_bytes().first()? {
                b'h' => KeepMode::High,
                b'l' => KeepMode::Low,
                _ => return None,
            };
            let keep_count = keep_str[1..].parse().ok()?;
            (
                faces_str,
                Some(Keep {
                    mode,
                    count: keep_count,
                }),
            )
        }
        None => (rest, None),
    };
    let die = Die::from_faces(faces_str.parse().ok()?)?;
    Some((count, die, keep))
}

/// Scan a notation string for all dice groups, in order of appearance.
pub fn scan(notation: &str) -> Vec<DiceGroup> {
    let mut groups = Vec::new();
    let mut lexer = RawToken::lexer(notation);
    while let Some(result) = lexer.next() {
        if let Ok(RawToken::DiceGroup) = result {
            let span = lexer.span();
            if let Some((count, die, keep)) = parse_group(lexer.slice()) {
                groups.push(DiceGroup {
                    span,
                    count,
                    die,
                    keep,
                });
            }
        }
        // Other tokens and lex errors are passed through untouched.
    }
    groups
}

/// Flatten a notation's dice groups into oracle requests.
///
/// Keep modifiers are ignored here — keep selection happens during
/// reconciliation, which re-scans the notation independently.
pub fn dice_requests(notation: &str) -> Vec<DiceRequest> {
    scan(notation)
        .into_iter()
        .filter(|g| g.count > 0)
        .map(|g| DiceRequest {
            die: g.die,
            count: g.count,
        })
        .collect()
}
