use crate::browser::ConnectionOptions;
use crate::dom::UiSelectors;
use crate::error::{Result, StageError};
use crate::selector::ScoringWeights;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Poll intervals and wait budgets for the page-level steps (milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timing {
    pub readiness_poll: u64,
    pub attachment_poll: u64,

    /// Lower bound for the attachment deadline; the effective deadline is
    /// the larger of this and half the overall timeout
    pub attachment_min_wait: u64,

    /// Wall-clock budget for one model or reasoning-level selection
    pub selection_budget: u64,

    /// How long to wait for the menu toggle itself to render
    pub control_wait: u64,

    /// Pause after opening a menu or clicking an entry
    pub menu_settle: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            readiness_poll: 300,
            attachment_poll: 250,
            attachment_min_wait: 20_000,
            selection_budget: 20_000,
            control_wait: 5_000,
            menu_settle: 150,
        }
    }
}

impl Timing {
    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll.max(1))
    }

    pub fn attachment_poll(&self) -> Duration {
        Duration::from_millis(self.attachment_poll.max(1))
    }

    pub fn menu_settle(&self) -> Duration {
        Duration::from_millis(self.menu_settle)
    }

    /// Attachment deadline for a run with the given overall timeout
    pub fn attachment_deadline(&self, overall: Duration) -> Duration {
        Duration::from_millis(self.attachment_min_wait).max(overall / 2)
    }
}

/// Attempt-level retry for transport failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,

    /// Delay before attempt `n + 1` is `backoff_step * n` (milliseconds)
    pub backoff_step: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff_step: 1_000 }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_step.saturating_mul(attempt as u64))
    }
}

/// Everything tunable about a staging run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StageConfig {
    pub connection: ConnectionOptions,
    pub timing: Timing,
    pub selectors: UiSelectors,
    pub weights: ScoringWeights,
    pub retry: RetryPolicy,
}

impl StageConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StageError::InvalidArgument(format!("Cannot read config {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| StageError::InvalidArgument(format!("Invalid config {}: {}", path.display(), e)))
    }
}
