//! Character statistics and notation substitution.
//!
//! Stat names embedded in a notation (`1d20 + FOR`) are replaced by their
//! numeric value before any dice are parsed. Matching is case-insensitive
//! and whole-word, longest name first, so a stat named `Defense` is never
//! partially shadowed by a shorter stat that happens to be a substring.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{DiceError, DiceResult};

/// Stat names that mark a notation as characteristic-dependent.
///
/// If one of these appears in a notation but no stat block was supplied,
/// the roll is rejected instead of silently substituting zero.
pub const STAT_KEYWORDS: [&str; 11] = [
    "FOR", "DEX", "CON", "SAG", "INT", "CHA", "Defense", "Contact", "Distance", "Magie", "INIT",
];

/// A single character statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatValue {
    /// The raw score, e.g. 14.
    pub raw: i32,
    /// Whether substitution uses the ability-modifier transform
    /// `floor((raw - 10) / 2)` instead of the raw score.
    pub use_ability_modifier: bool,
}

impl StatValue {
    /// The value substituted into notation for this stat.
    pub fn effective(self) -> i32 {
        if self.use_ability_modifier {
            (self.raw - 10).div_euclid(2)
        } else {
            self.raw
        }
    }
}

/// A character's named statistics, keyed case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatBlock {
    stats: HashMap<String, StatValue>,
}

impl StatBlock {
    /// Create an empty stat block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a stat by name. Names are stored uppercased.
    pub fn set(&mut self, name: &str, value: StatValue) {
        self.stats.insert(name.to_uppercase(), value);
    }

    /// Look up a stat by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<StatValue> {
        self.stats.get(&name.to_uppercase()).copied()
    }

    /// Whether the block holds no stats at all.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Iterate over the (uppercased) stat names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stats.keys().map(String::as_str)
    }
}

/// Try to match `word` at byte offset `at` in `haystack`, whole-word and
/// ASCII-case-insensitively.
fn word_at(haystack: &[u8], at: usize, word: &[u8]) -> bool {
    if at + word.len() > haystack.len() {
        return false;
    }
    if !haystack[at..at + word.len()].eq_ignore_ascii_case(word) {
        return false;
    }
    let boundary = |b: u8| !(b.is_ascii_alphanumeric() || b == b'_');
    let before_ok = at == 0 || boundary(haystack[at - 1]);
    let after_ok = at + word.len() == haystack.len() || boundary(haystack[at + word.len()]);
    before_ok && after_ok
}

/// Replace every whole-word, case-insensitive occurrence of `word`.
fn replace_word_ci(haystack: &str, word: &str, replacement: &str) -> String {
    let bytes = haystack.as_bytes();
    let word_bytes = word.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if word_at(bytes, i, word_bytes) {
            out.extend_from_slice(replacement.as_bytes());
            i += word_bytes.len();
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    // Matches are exact byte sequences of a valid UTF-8 word, so splices
    // stay on char boundaries; the fallback never fires for valid input.
    String::from_utf8(out).unwrap_or_else(|_| haystack.to_owned())
}

/// Whether `haystack` contains `word` as a whole word, case-insensitively.
fn contains_word_ci(haystack: &str, word: &str) -> bool {
    let bytes = haystack.as_bytes();
    (0..bytes.len()).any(|i| word_at(bytes, i, word.as_bytes()))
}

/// Whether a notation references any of the fixed characteristic keywords.
pub fn references_characteristic(notation: &str) -> bool {
    STAT_KEYWORDS.iter().any(|k| contains_word_ci(notation, k))
}

/// Substitute stat names in a notation with their numeric values.
///
/// Returns [`DiceError::EmptyNotation`] for blank input, and
/// [`DiceError::CharacteristicsNotFound`] when the notation names a
/// characteristic but the stat block is empty. Unknown tokens are left
/// untouched.
pub fn substitute(notation: &str, stats: &StatBlock) -> DiceResult<String> {
    if notation.trim().is_empty() {
        return Err(DiceError::EmptyNotation);
    }
    if stats.is_empty() {
        if references_characteristic(notation) {
            return Err(DiceError::CharacteristicsNotFound);
        }
        return Ok(notation.to_owned());
    }

    let mut names: Vec<&str> = stats.names().collect();
    // Longest first so a stat name is never clipped by a shorter one that
    // is also its substring.
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut out = notation.to_owned();
    for name in names {
        let Some(value) = stats.get(name) else {
            continue;
        };
        out = replace_word_ci(&out, name, &value.effective().to_string());
    }
    Ok(out)
}
