//! Recent evaluation runtimes, used to size the async timeout.

use crate::config::AdaptiveTimeoutConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyHistory {
    /// Runtimes in milliseconds, oldest first.
    runtimes_ms: VecDeque<u64>,
}

impl LatencyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, runtime: Duration, cap: usize) {
        self.runtimes_ms.push_back(runtime.as_millis() as u64);
        while self.runtimes_ms.len() > cap.max(1) {
            self.runtimes_ms.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.runtimes_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes_ms.is_empty()
    }

    /// Nearest-rank 95th percentile.
    pub fn p95(&self) -> Option<Duration> {
        if self.runtimes_ms.is_empty() {
            return None;
        }
        let mut sorted: Vec<u64> = self.runtimes_ms.iter().copied().collect();
        sorted.sort_unstable();
        let rank = ((sorted.len() as f64) * 0.95).ceil() as usize;
        Some(Duration::from_millis(sorted[rank.clamp(1, sorted.len()) - 1]))
    }

    /// Timeout for the next async evaluation. No history means the maximum.
    pub fn timeout(&self, config: &AdaptiveTimeoutConfig) -> Duration {
        match self.p95() {
            None => config.max(),
            Some(p95) => p95.mul_f64(config.factor.max(0.0)).clamp(config.min(), config.max()),
        }
    }
}
