//! Error types for the table runtime.

use thiserror::Error;

/// Convenience result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Errors that reach the caller of the table runtime.
///
/// Only input errors propagate; oracle timeouts, evaluation failures,
/// persistence failures, and audio failures are recovered internally.
#[derive(Debug, Error)]
pub enum TableError {
    /// The notation was rejected before any die was thrown.
    #[error("{0}")]
    Dice(#[from] wt_dice::DiceError),
}
