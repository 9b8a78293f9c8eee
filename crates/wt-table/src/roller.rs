//! Roll orchestration.
//!
//! A roll moves through a strict phase sequence: substitution, waiting
//! for physical results, reconciliation, completion. Each roll carries
//! its own correlation id, so two rolls in flight never exchange oracle
//! results. Blind rolls are fully computed and persisted, but the
//! roller's own view of the result is withheld.

use std::sync::Arc;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

use wt_dice::{PhysicalResult, RollOutcome, StatBlock, dice_requests, reconcile, substitute};

use crate::audio::{self, AudioCue, NoAudio};
use crate::config::TableConfig;
use crate::error::TableResult;
use crate::oracle::{OracleLink, RollId, synthesize_results};
use crate::record::{RollRecord, RollSink};

/// Where a roll stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollPhase {
    /// Not started.
    Idle,
    /// Stat names are being substituted into the notation.
    Substituting,
    /// Waiting on the physical roll oracle.
    AwaitingOracle,
    /// Matching resolved values back to the notation.
    Reconciling,
    /// Done. Blind completions withhold the result from the roller.
    Complete {
        /// Whether the result is hidden from the roller's own view.
        blind: bool,
    },
}

impl RollPhase {
    /// Advance to the next phase. `Complete` is terminal.
    pub fn next(self, blind: bool) -> Self {
        match self {
            Self::Idle => Self::Substituting,
            Self::Substituting => Self::AwaitingOracle,
            Self::AwaitingOracle => Self::Reconciling,
            Self::Reconciling | Self::Complete { .. } => Self::Complete { blind },
        }
    }
}

impl std::fmt::Display for RollPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Substituting => write!(f, "substituting"),
            Self::AwaitingOracle => write!(f, "awaiting-oracle"),
            Self::Reconciling => write!(f, "reconciling"),
            Self::Complete { blind: false } => write!(f, "complete"),
            Self::Complete { blind: true } => write!(f, "complete-blind"),
        }
    }
}

/// One roll as submitted by a player.
#[derive(Debug, Clone)]
pub struct RollRequest {
    /// The user-authored notation, possibly with stat names.
    pub notation: String,
    /// Display name of the roller.
    pub user_name: String,
    /// Room whose log receives the record.
    pub room: String,
    /// Withhold the result from the roller's own view.
    pub blind: bool,
    /// Mark the record private in the log.
    pub private: bool,
    /// Forced face values for server-authoritative replays.
    pub targets: Vec<PhysicalResult>,
}

impl RollRequest {
    /// A plain public roll of `notation`.
    pub fn new(notation: impl Into<String>) -> Self {
        Self {
            notation: notation.into(),
            user_name: "Player".to_owned(),
            room: "table".to_owned(),
            blind: false,
            private: false,
            targets: Vec::new(),
        }
    }

    /// Set the roller's display name.
    pub fn with_user(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self
    }

    /// Set the target room.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    /// Make the roll blind.
    pub fn blind(mut self) -> Self {
        self.blind = true;
        self
    }

    /// Mark the roll private.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Force specific face values (replay mode).
    pub fn with_targets(mut self, targets: Vec<PhysicalResult>) -> Self {
        self.targets = targets;
        self
    }
}

/// A completed roll.
#[derive(Debug, Clone)]
pub struct RollResolution {
    /// Correlation id the roll carried through the oracle.
    pub id: RollId,
    /// The reconciled outcome. Always populated, even for blind rolls.
    pub outcome: RollOutcome,
    /// The record as appended to the room log.
    pub record: RollRecord,
    /// Whether the roller's own view is withheld.
    pub blind: bool,
}

impl RollResolution {
    /// The total, unless this roll is blind for the viewer.
    pub fn visible_total(&self) -> Option<i64> {
        (!self.blind).then_some(self.outcome.total)
    }

    /// The breakdown, unless this roll is blind for the viewer.
    pub fn visible_breakdown(&self) -> Option<&str> {
        (!self.blind).then_some(self.outcome.breakdown.as_str())
    }
}

/// Drives rolls from notation to persisted record.
pub struct Roller {
    link: OracleLink,
    config: TableConfig,
    rng: StdRng,
    audio: Arc<dyn AudioCue>,
    sink: Arc<dyn RollSink>,
}

impl Roller {
    /// Create a roller over an oracle link and a persistence sink.
    pub fn new(link: OracleLink, config: TableConfig, sink: Arc<dyn RollSink>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            link,
            config,
            rng,
            audio: Arc::new(NoAudio),
            sink,
        }
    }

    /// Attach an audio backend for the dice-throw cue.
    pub fn with_audio(mut self, audio: Arc<dyn AudioCue>) -> Self {
        self.audio = audio;
        self
    }

    /// Roll a notation for the given character stats.
    ///
    /// Returns an error only for rejected input (empty notation,
    /// unresolvable characteristics). Every other failure degrades to a
    /// best-effort result: the roll always completes and is always
    /// offered to the sink.
    pub async fn roll(
        &mut self,
        request: RollRequest,
        stats: &StatBlock,
    ) -> TableResult<RollResolution> {
        let id = Uuid::new_v4();
        let mut phase = RollPhase::Idle.next(request.blind);
        tracing::debug!(%id, phase = %phase, notation = %request.notation, "roll started");
        let substituted = substitute(&request.notation, stats)?;

        phase = phase.next(request.blind);
        tracing::trace!(%id, phase = %phase, substituted = %substituted, "notation substituted");
        let requests = dice_requests(&substituted);
        let (physical, instant): (Vec<_>, Vec<_>) = requests
            .into_iter()
            .partition(|r| r.die.is_physical());

        // Dice with no 3D representation resolve on the spot.
        let mut pool = synthesize_results(&instant, &[], &mut self.rng);

        if !physical.is_empty() {
            if self.config.animation_enabled && !request.blind {
                audio::schedule(Arc::clone(&self.audio), self.config.audio_delay);
                let resolved = self
                    .link
                    .request(
                        id,
                        physical.clone(),
                        request.targets.clone(),
                        self.config.oracle_timeout,
                    )
                    .await;
                match resolved {
                    Some(results) => pool.extend(results),
                    None => {
                        pool.extend(synthesize_results(
                            &physical,
                            &request.targets,
                            &mut self.rng,
                        ));
                    }
                }
            } else {
                // Animation off or blind roll: bypass the oracle entirely.
                pool.extend(synthesize_results(
                    &physical,
                    &request.targets,
                    &mut self.rng,
                ));
            }
        }

        phase = phase.next(request.blind);
        tracing::trace!(%id, phase = %phase, resolved = pool.len(), "reconciling results");
        let outcome = reconcile(&substituted, &pool, &mut self.rng);

        let record = RollRecord {
            notation: substituted,
            output: outcome.breakdown.clone(),
            total: outcome.total,
            dice_count: outcome
                .groups
                .iter()
                .map(|group| group.rolls.len() as u32)
                .sum(),
            dice_faces: outcome
                .groups
                .first()
                .map_or(0, |group| group.die.sides()),
            results: outcome
                .groups
                .iter()
                .flat_map(|group| group.rolls.iter().copied())
                .collect(),
            is_private: request.private,
            is_blind: request.blind,
            timestamp: Utc::now(),
            user_name: request.user_name.clone(),
        };
        if let Err(e) = self.sink.append(&request.room, record.clone()) {
            tracing::error!(error = %e, room = %request.room, "failed to persist roll record");
        }

        phase = phase.next(request.blind);
        tracing::debug!(%id, phase = %phase, total = outcome.total, "roll complete");
        Ok(RollResolution {
            id,
            outcome,
            record,
            blind: request.blind,
        })
    }
}
