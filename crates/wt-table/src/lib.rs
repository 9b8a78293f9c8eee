//! Table runtime for Würfelturm.
//!
//! Orchestrates a roll from notation to persisted record: characteristic
//! substitution, partitioning dice between the physical 3D oracle and
//! instant local resolution, waiting on the oracle with a hard timeout
//! and fallback synthesis, reconciling results, and appending the roll
//! record to the room's append-only log. A roll, once requested, always
//! completes with a numeric result — every failure path degrades and
//! logs instead of blocking the table.

pub mod audio;
pub mod config;
pub mod error;
pub mod oracle;
pub mod record;
pub mod roller;

pub use audio::{AudioCue, AudioError, NoAudio};
pub use config::TableConfig;
pub use error::{TableError, TableResult};
pub use oracle::{InstantOracle, OracleLink, OracleRequest, OracleResolver, RollId};
pub use record::{RollLog, RollRecord, RollSink, RollStats, SinkError};
pub use roller::{RollPhase, RollRequest, RollResolution, Roller};
