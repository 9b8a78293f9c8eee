//! Audio cue for physical dice throws.
//!
//! The table schedules a one-shot rolling-dice sound shortly after
//! physical dice are sent to the oracle. Playback is best-effort: a
//! failing backend is logged and forgotten.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Audio playback failure. Never fatal.
#[derive(Debug, Error)]
#[error("audio playback failed: {0}")]
pub struct AudioError(
    /// Backend-specific description of the failure.
    pub String,
);

/// A backend that can play the dice-throw cue.
pub trait AudioCue: Send + Sync {
    /// Play the cue once.
    fn play(&self) -> Result<(), AudioError>;
}

/// Silent backend used when no audio output is wired up.
#[derive(Debug, Default)]
pub struct NoAudio;

impl AudioCue for NoAudio {
    fn play(&self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Schedule the cue on the runtime after `delay`.
pub(crate) fn schedule(audio: Arc<dyn AudioCue>, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = audio.play() {
            tracing::warn!(error = %e, "dice audio cue failed");
        }
    });
}
