//! Roll records and the per-room append-only log.
//!
//! The record shape (camelCase JSON) is a compatibility contract with
//! history and statistics consumers; fields must not be renamed or
//! repurposed.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A persistence failure. Logged by the roller, never retried.
#[derive(Debug, Error)]
#[error("roll sink failure: {0}")]
pub struct SinkError(
    /// Backend-specific description of the failure.
    pub String,
);

/// One persisted roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRecord {
    /// The notation that was rolled (after stat substitution).
    pub notation: String,
    /// The full breakdown string.
    pub output: String,
    /// Floored numeric total.
    pub total: i64,
    /// How many individual dice were thrown.
    pub dice_count: u32,
    /// Face count of the first dice group, 0 for pure arithmetic.
    pub dice_faces: u32,
    /// Every individual face value, in group order.
    pub results: Vec<u32>,
    /// Whether the roll is private to the roller and privileged observers.
    pub is_private: bool,
    /// Whether the result is withheld from the roller's own view.
    pub is_blind: bool,
    /// When the roll completed.
    pub timestamp: DateTime<Utc>,
    /// Display name of the roller.
    pub user_name: String,
}

/// Where completed rolls are appended, one log per room.
///
/// Appends are fire-and-forget from the roller's perspective: an error
/// is logged and the in-memory result stays authoritative.
pub trait RollSink: Send + Sync {
    /// Append a record to the given room's log.
    fn append(&self, room: &str, record: RollRecord) -> Result<(), SinkError>;
}

/// Aggregate statistics over one room's log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollStats {
    /// Number of rolls recorded.
    pub rolls: usize,
    /// Number of individual dice thrown across all rolls.
    pub dice_thrown: usize,
    /// Sum of all roll totals.
    pub total_sum: i64,
}

/// In-memory reference sink: per-room, time-ordered, append-only.
#[derive(Debug, Default)]
pub struct RollLog {
    rooms: Mutex<HashMap<String, Vec<RollRecord>>>,
}

impl RollLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_rooms<T>(&self, f: impl FnOnce(&mut HashMap<String, Vec<RollRecord>>) -> T) -> T {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rooms)
    }

    /// All records for a room, oldest first.
    pub fn records(&self, room: &str) -> Vec<RollRecord> {
        self.with_rooms(|rooms| rooms.get(room).cloned().unwrap_or_default())
    }

    /// Number of records in a room's log.
    pub fn len(&self, room: &str) -> usize {
        self.with_rooms(|rooms| rooms.get(room).map_or(0, Vec::len))
    }

    /// Whether a room's log is empty.
    pub fn is_empty(&self, room: &str) -> bool {
        self.len(room) == 0
    }

    /// Aggregate statistics for a room.
    pub fn stats(&self, room: &str) -> RollStats {
        self.with_rooms(|rooms| {
            let records = rooms.get(room).map(Vec::as_slice).unwrap_or_default();
            RollStats {
                rolls: records.len(),
                dice_thrown: records.iter().map(|r| r.results.len()).sum(),
                total_sum: records.iter().map(|r| r.total).sum(),
            }
        })
    }

    /// Face-value frequency for rolls of a given die size (e.g. 20 for
    /// the d20 distribution view).
    pub fn face_counts(&self, room: &str, faces: u32) -> HashMap<u32, usize> {
        self.with_rooms(|rooms| {
            let mut counts = HashMap::new();
            for record in rooms.get(room).map(Vec::as_slice).unwrap_or_default() {
                if record.dice_faces == faces {
                    for &value in &record.results {
                        *counts.entry(value).or_insert(0) += 1;
                    }
                }
            }
            counts
        })
    }
}

impl RollSink for RollLog {
    fn append(&self, room: &str, record: RollRecord) -> Result<(), SinkError> {
        self.with_rooms(|rooms| rooms.entry(room.to_owned()).or_default().push(record));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: i64, results: Vec<u32>) -> RollRecord {
        RollRecord {
            notation: "1d20".to_owned(),
            output: format!("1d20 = [{total}] = {total}"),
            total,
            dice_count: results.len() as u32,
            dice_faces: 20,
            results,
            is_private: false,
            is_blind: false,
            timestamp: Utc::now(),
            user_name: "Mira".to_owned(),
        }
    }

    #[test]
    fn append_and_query() {
        let log = RollLog::new();
        assert!(log.is_empty("den"));
        log.append("den", record(15, vec![15])).expect("append");
        log.append("den", record(3, vec![3])).expect("append");
        assert_eq!(log.len("den"), 2);
        assert_eq!(log.records("den")[0].total, 15);
        assert!(log.is_empty("other"));
    }

    #[test]
    fn rooms_are_isolated() {
        let log = RollLog::new();
        log.append("a", record(1, vec![1])).expect("append");
        log.append("b", record(2, vec![2])).expect("append");
        assert_eq!(log.len("a"), 1);
        assert_eq!(log.len("b"), 1);
    }

    #[test]
    fn stats_aggregate() {
        let log = RollLog::new();
        log.append("den", record(15, vec![15])).expect("append");
        log.append("den", record(9, vec![4, 5])).expect("append");
        assert_eq!(
            log.stats("den"),
            RollStats {
                rolls: 2,
                dice_thrown: 3,
                total_sum: 24,
            }
        );
        assert_eq!(log.stats("empty"), RollStats::default());
    }

    #[test]
    fn face_counts_filter_by_die_size() {
        let log = RollLog::new();
        log.append("den", record(15, vec![15])).expect("append");
        log.append("den", record(15, vec![15])).expect("append");
        let mut six_sided = record(4, vec![4]);
        six_sided.dice_faces = 6;
        log.append("den", six_sided).expect("append");

        let counts = log.face_counts("den", 20);
        assert_eq!(counts.get(&15), Some(&2));
        assert_eq!(counts.get(&4), None);
    }

    #[test]
    fn record_json_shape_is_stable() {
        let json = serde_json::to_value(record(15, vec![15])).expect("serialize");
        let object = json.as_object().expect("object");
        for key in [
            "notation",
            "output",
            "total",
            "diceCount",
            "diceFaces",
            "results",
            "isPrivate",
            "isBlind",
            "timestamp",
            "userName",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        let back: RollRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.total, 15);
    }
}
