//! Dice-notation core for Würfelturm.
//!
//! Parses free-form dice notation (`2d20kh1 + FOR`), substitutes named
//! character statistics, and reconciles asynchronously resolved physical
//! die results back into a numeric total with a re-derivable textual
//! breakdown. This crate is pure logic: no IO, no async, no clock. The
//! table runtime (`wt-table`) drives it.

pub mod die;
pub mod error;
pub mod eval;
pub mod notation;
pub mod reconcile;
pub mod stats;

pub use die::Die;
pub use error::{DiceError, DiceResult};
pub use eval::evaluate;
pub use notation::{DiceGroup, DiceRequest, Keep, KeepMode, dice_requests, scan};
pub use reconcile::{GroupResult, PhysicalResult, RollOutcome, reconcile};
pub use stats::{StatBlock, StatValue, substitute};
