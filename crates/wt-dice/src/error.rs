//! Error types for the dice core.

use thiserror::Error;

/// Convenience result type for dice operations.
pub type DiceResult<T> = Result<T, DiceError>;

/// Input errors that block a roll before any die is thrown.
///
/// Everything downstream of input validation (oracle timeouts, malformed
/// arithmetic, exhausted result pools) degrades to a best-effort result
/// instead of erroring; only these two conditions are surfaced to the
/// caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    /// The notation was empty or whitespace-only.
    #[error("empty dice notation")]
    EmptyNotation,

    /// The notation references a character statistic but no statistics
    /// were supplied for the roller.
    #[error("characteristics not found")]
    CharacteristicsNotFound,
}
