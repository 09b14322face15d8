//! Engine tuning, loaded from RON.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// What happens when a pending decision is cancelled or times out.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Fill in the side's default choice and keep going.
    #[default]
    SubstituteDefault,
    /// End the battle; the cancelled side forfeits.
    Abort,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Nested firings deeper than this abort the turn.
    pub max_event_depth: usize,
    pub max_log_events_per_turn: usize,
    pub decision_timeout_ms: u64,
    /// Rejected choices tolerated per request before the cancel policy applies.
    pub max_choice_attempts: usize,
    pub on_cancel: CancelPolicy,
    /// Seed for the battle RNG; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_event_depth: 8,
            max_log_events_per_turn: 1000,
            decision_timeout_ms: 30_000,
            max_choice_attempts: 3,
            on_cancel: CancelPolicy::SubstituteDefault,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_ron_str(&text)
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_event_depth == 0 {
            return Err(ConfigError::Invalid("max_event_depth must be at least 1".to_string()));
        }
        if self.max_choice_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_choice_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
