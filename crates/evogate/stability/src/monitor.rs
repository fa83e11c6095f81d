use crate::error::StabilityError;
use crate::types::{OperationalSample, StabilityAdvice, StabilityConfig, StabilityWeights};
use evogate_types::StabilityReport;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Instability value of one window:
///
/// ```text
/// V = w_up·(1 − uptime)² + w_alert·alert_rate + w_mttr·mttr_minutes
///   + w_dr·(1 − dr_success) + w_tp·max(0, (target − throughput) / target)
/// ```
///
/// 0 for a perfectly healthy window; grows with every deficit.
pub fn instability(sample: &OperationalSample, weights: &StabilityWeights) -> f64 {
    let uptime_deficit = (1.0 - sample.uptime_ratio).max(0.0);
    let dr_deficit = (1.0 - sample.dr_success_ratio).max(0.0);
    let throughput_deficit = if sample.throughput_target > 0.0 {
        ((sample.throughput_target - sample.throughput) / sample.throughput_target).max(0.0)
    } else {
        0.0
    };
    weights.uptime * uptime_deficit.powi(2)
        + weights.alert * sample.alert_rate
        + weights.mttr * sample.mttr_minutes
        + weights.dr * dr_deficit
        + weights.throughput * throughput_deficit
}

/// Least-squares slope of `values` against their index.
pub fn slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / nf;
    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    num / den
}

/// Persisted V history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilityHistory {
    pub values: VecDeque<f64>,
}

/// Tracks V over the last few evaluation windows.
#[derive(Clone, Debug)]
pub struct StabilityMonitor {
    config: StabilityConfig,
    history: StabilityHistory,
}

impl StabilityMonitor {
    pub fn new(config: StabilityConfig) -> Self {
        Self::with_history(config, StabilityHistory::default())
    }

    pub fn with_history(config: StabilityConfig, mut history: StabilityHistory) -> Self {
        history.values.retain(|v| v.is_finite());
        let mut monitor = Self { config, history };
        monitor.trim();
        monitor
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    pub fn history(&self) -> &StabilityHistory {
        &self.history
    }

    fn trim(&mut self) {
        let cap = self.config.window.max(1);
        while self.history.values.len() > cap {
            self.history.values.pop_front();
        }
    }

    /// Record one window and report the trend including it.
    pub fn observe(&mut self, sample: &OperationalSample) -> Result<StabilityReport, StabilityError> {
        sample.validate()?;
        let v = instability(sample, &self.config.weights);
        self.history.values.push_back(v);
        self.trim();
        let report = self.report().unwrap_or(StabilityReport {
            v,
            slope: 0.0,
            rising: false,
            window: 1,
        });
        debug!(v = report.v, slope = report.slope, rising = report.rising, "stability observed");
        Ok(report)
    }

    /// Trend over the retained history; `None` before the first sample.
    pub fn report(&self) -> Option<StabilityReport> {
        let v = *self.history.values.back()?;
        let values: Vec<f64> = self.history.values.iter().copied().collect();
        let s = slope(&values);
        Some(StabilityReport {
            v,
            slope: s,
            rising: values.len() >= 3 && s > self.config.trend_epsilon,
            window: values.len(),
        })
    }

    /// Throttle for the gate. Neutral unless V is rising; never a veto.
    pub fn advice(&self, report: Option<&StabilityReport>) -> StabilityAdvice {
        match report {
            Some(r) if r.rising => StabilityAdvice {
                threshold_delta: self.config.threshold_tightening.max(0.0),
                backoff_multiplier: self.config.backoff_multiplier.max(1.0),
            },
            _ => StabilityAdvice::neutral(),
        }
    }
}
