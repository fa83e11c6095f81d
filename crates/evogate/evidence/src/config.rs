//! Configuration for the evidence store

use crate::backoff::Backoff;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Evidence store configuration (`[store]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding bundle subdirectories
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Anchor manifest (hash-list of version-controlled files) to copy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_manifest: Option<PathBuf>,

    /// State manifest (hash-list of runtime-significant files) to copy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_manifest: Option<PathBuf>,

    /// Session metrics vector to copy into each bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_source: Option<PathBuf>,

    /// Structured JSON-lines event log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log: Option<PathBuf>,

    /// Number of event log lines extracted per bundle
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,

    /// Extra attempts for transient write failures
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,

    /// Bound on the asynchronous evaluation path
    #[serde(default)]
    pub adaptive_timeout: AdaptiveTimeoutConfig,

    /// How long a cycle waits for another to finish sealing
    #[serde(default = "default_seal_wait")]
    pub seal_wait: Backoff,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            anchor_manifest: None,
            state_manifest: None,
            metrics_source: None,
            event_log: None,
            tail_lines: default_tail_lines(),
            write_retries: default_write_retries(),
            adaptive_timeout: AdaptiveTimeoutConfig::default(),
            seal_wait: default_seal_wait(),
        }
    }
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn with_anchor_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.anchor_manifest = Some(path.into());
        self
    }

    pub fn with_state_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_manifest = Some(path.into());
        self
    }

    pub fn with_metrics_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.metrics_source = Some(path.into());
        self
    }

    pub fn with_event_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.event_log = Some(path.into());
        self
    }

    pub fn with_tail_lines(mut self, n: usize) -> Self {
        self.tail_lines = n;
        self
    }

    pub fn with_seal_wait(mut self, backoff: Backoff) -> Self {
        self.seal_wait = backoff;
        self
    }

    pub fn with_adaptive_timeout(mut self, timeout: AdaptiveTimeoutConfig) -> Self {
        self.adaptive_timeout = timeout;
        self
    }
}

/// Timeout = clamp(p95(recent runtimes) × factor, min, max).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveTimeoutConfig {
    #[serde(default = "default_factor")]
    pub factor: f64,

    #[serde(default = "default_min_ms")]
    pub min_ms: u64,

    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Runtimes remembered in `eval_latency.json`
    #[serde(default = "default_history")]
    pub history: usize,
}

impl Default for AdaptiveTimeoutConfig {
    fn default() -> Self {
        Self {
            factor: default_factor(),
            min_ms: default_min_ms(),
            max_ms: default_max_ms(),
            history: default_history(),
        }
    }
}

impl AdaptiveTimeoutConfig {
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms.max(self.min_ms))
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("evidence")
}

fn default_tail_lines() -> usize {
    500
}

fn default_write_retries() -> u32 {
    3
}

fn default_seal_wait() -> Backoff {
    Backoff {
        initial_delay_ms: 5,
        max_delay_ms: 100,
        multiplier: 2.0,
        max_wait_ms: 10_000,
    }
}

fn default_factor() -> f64 {
    2.0
}

fn default_min_ms() -> u64 {
    250
}

fn default_max_ms() -> u64 {
    30_000
}

fn default_history() -> usize {
    50
}
