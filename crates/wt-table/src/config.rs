//! Configuration for a table session.

use std::time::Duration;

/// Configuration for the roll orchestrator.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Upper bound on waiting for the physical roll oracle.
    pub oracle_timeout: Duration,
    /// Whether physical dice go through the 3D oracle at all. When
    /// disabled, every die resolves instantly from the local RNG.
    pub animation_enabled: bool,
    /// Delay before the one-shot dice audio cue plays.
    pub audio_delay: Duration,
    /// RNG seed for reproducible rolls. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            oracle_timeout: Duration::from_secs(10),
            animation_enabled: true,
            audio_delay: Duration::from_millis(300),
            seed: None,
        }
    }
}

impl TableConfig {
    /// Set the oracle timeout.
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// Enable or disable the 3D oracle path.
    pub fn with_animation(mut self, enabled: bool) -> Self {
        self.animation_enabled = enabled;
        self
    }

    /// Set the audio cue delay.
    pub fn with_audio_delay(mut self, delay: Duration) -> Self {
        self.audio_delay = delay;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = TableConfig::default();
        assert_eq!(cfg.oracle_timeout, Duration::from_secs(10));
        assert!(cfg.animation_enabled);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn builder_methods() {
        let cfg = TableConfig::default()
            .with_seed(7)
            .with_animation(false)
            .with_oracle_timeout(Duration::from_secs(2))
            .with_audio_delay(Duration::from_millis(50));
        assert_eq!(cfg.seed, Some(7));
        assert!(!cfg.animation_enabled);
        assert_eq!(cfg.oracle_timeout, Duration::from_secs(2));
        assert_eq!(cfg.audio_delay, Duration::from_millis(50));
    }
}
