//! Exponential backoff with a cap.
//!
//! Used by consumers polling for a bundle's evaluation artifact, by the
//! store's write retries, and by the gate to size RETRY waits.

use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    /// Initial backoff delay (milliseconds)
    pub initial_delay_ms: u64,

    /// Maximum single delay (milliseconds)
    pub max_delay_ms: u64,

    /// Backoff multiplier
    pub multiplier: f64,

    /// Total wait budget across all delays (milliseconds)
    pub max_wait_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::polling()
    }
}

impl Backoff {
    /// Tens of milliseconds growing to a cap, a few seconds in total.
    pub fn polling() -> Self {
        Self {
            initial_delay_ms: 20,
            max_delay_ms: 500,
            multiplier: 2.0,
            max_wait_ms: 3_000,
        }
    }

    /// Delay before attempt `n` (1-based): `initial × multiplier^(n−1)`, capped.
    pub fn delay_for_attempt(&self, n: u32) -> Duration {
        let exp = n.saturating_sub(1).min(63) as i32;
        let raw = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(exp);
        let capped = if raw.is_finite() {
            raw.min(self.max_delay_ms as f64)
        } else {
            self.max_delay_ms as f64
        };
        Duration::from_millis(capped as u64)
    }

    /// Successive delays until the total wait budget is spent.
    ///
    /// The last delay is shortened so the sum never exceeds `max_wait_ms`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let budget = Duration::from_millis(self.max_wait_ms);
        let mut spent = Duration::ZERO;
        let mut attempt = 0u32;
        std::iter::from_fn(move || {
            if spent >= budget {
                return None;
            }
            attempt += 1;
            let delay = self.delay_for_attempt(attempt).min(budget - spent);
            if delay.is_zero() {
                return None;
            }
            spent += delay;
            Some(delay)
        })
    }

    /// Run `op` until it yields `Some`, sleeping between attempts.
    ///
    /// Returns `None` once the wait budget is exhausted.
    pub fn retry<T>(&self, mut op: impl FnMut() -> Option<T>) -> Option<T> {
        if let Some(v) = op() {
            return Some(v);
        }
        for delay in self.delays() {
            thread::sleep(delay);
            if let Some(v) = op() {
                return Some(v);
            }
        }
        None
    }
}
