//! Configuration for the gate executor

use crate::error::GateError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Gate configuration (`[gate]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Decisions consulted for the rolling pass rate
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Pass rate below which a PROMOTE is downgraded to RETRY
    #[serde(default = "default_pass_rate_floor")]
    pub pass_rate_floor: f64,

    /// Consecutive RETRYs allowed before escalating to ROLLBACK
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First RETRY backoff in milliseconds
    #[serde(default = "default_retry_backoff_base_ms")]
    pub retry_backoff_base_ms: u64,

    /// Cap on RETRY backoff in milliseconds
    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,

    /// Prefix of baseline tags
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,

    /// Age after which a gate lock is considered abandoned
    #[serde(default = "default_lock_stale_secs")]
    pub lock_stale_secs: u64,

    /// Working tree the version-control actions apply to
    #[serde(default = "default_repo")]
    pub repo: PathBuf,

    /// Executable run after a ROLLBACK
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_hook: Option<PathBuf>,

    /// Recovery hook time limit in seconds
    #[serde(default = "default_hook_timeout_secs")]
    pub hook_timeout_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            pass_rate_floor: default_pass_rate_floor(),
            max_retries: default_max_retries(),
            retry_backoff_base_ms: default_retry_backoff_base_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
            tag_prefix: default_tag_prefix(),
            lock_stale_secs: default_lock_stale_secs(),
            repo: default_repo(),
            recovery_hook: None,
            hook_timeout_secs: default_hook_timeout_secs(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<(), GateError> {
        if self.history_window == 0 {
            return Err(GateError::InvalidConfig("history_window must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.pass_rate_floor) {
            return Err(GateError::InvalidConfig(format!(
                "pass_rate_floor {} outside [0, 1]",
                self.pass_rate_floor
            )));
        }
        if self.tag_prefix.is_empty()
            || !self
                .tag_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
        {
            return Err(GateError::InvalidConfig(format!(
                "tag_prefix {:?} is not a valid tag name fragment",
                self.tag_prefix
            )));
        }
        if self.retry_backoff_max_ms < self.retry_backoff_base_ms {
            return Err(GateError::InvalidConfig(
                "retry_backoff_max_ms below retry_backoff_base_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.lock_stale_secs)
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_secs(self.hook_timeout_secs)
    }
}

fn default_history_window() -> usize {
    10
}

fn default_pass_rate_floor() -> f64 {
    0.97
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_base_ms() -> u64 {
    30_000
}

fn default_retry_backoff_max_ms() -> u64 {
    15 * 60 * 1000
}

fn default_tag_prefix() -> String {
    "evogate-stable".into()
}

fn default_lock_stale_secs() -> u64 {
    600
}

fn default_repo() -> PathBuf {
    PathBuf::from(".")
}

fn default_hook_timeout_secs() -> u64 {
    60
}
