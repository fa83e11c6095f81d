use crate::error::StabilityError;
use serde::{Deserialize, Serialize};

/// Rolling operational indicators for one evaluation window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationalSample {
    /// Fraction of the window the service was up, in [0, 1].
    pub uptime_ratio: f64,
    /// Alerts per hour.
    pub alert_rate: f64,
    /// Mean time to recovery, minutes.
    pub mttr_minutes: f64,
    /// Fraction of disaster-recovery drills that succeeded, in [0, 1].
    pub dr_success_ratio: f64,
    /// Observed throughput.
    pub throughput: f64,
    /// Throughput the service is expected to sustain.
    pub throughput_target: f64,
}

impl OperationalSample {
    /// A perfectly healthy window.
    pub fn healthy() -> Self {
        Self {
            uptime_ratio: 1.0,
            alert_rate: 0.0,
            mttr_minutes: 0.0,
            dr_success_ratio: 1.0,
            throughput: 1.0,
            throughput_target: 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), StabilityError> {
        let fields = [
            ("uptime_ratio", self.uptime_ratio),
            ("alert_rate", self.alert_rate),
            ("mttr_minutes", self.mttr_minutes),
            ("dr_success_ratio", self.dr_success_ratio),
            ("throughput", self.throughput),
            ("throughput_target", self.throughput_target),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(StabilityError::InvalidSample(format!("{} = {}", name, value)));
            }
        }
        for (name, value) in [
            ("uptime_ratio", self.uptime_ratio),
            ("dr_success_ratio", self.dr_success_ratio),
        ] {
            if value > 1.0 {
                return Err(StabilityError::InvalidSample(format!("{} = {} > 1", name, value)));
            }
        }
        Ok(())
    }
}

/// Weights of the instability function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityWeights {
    pub uptime: f64,
    pub alert: f64,
    pub mttr: f64,
    pub dr: f64,
    pub throughput: f64,
}

impl Default for StabilityWeights {
    fn default() -> Self {
        Self {
            uptime: 4.0,
            alert: 0.5,
            mttr: 0.02,
            dr: 2.0,
            throughput: 1.0,
        }
    }
}

/// How the gate should throttle promotion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StabilityAdvice {
    /// Added to the PROMOTE score threshold.
    pub threshold_delta: f64,
    /// Applied to the RETRY backoff.
    pub backoff_multiplier: f64,
}

impl StabilityAdvice {
    pub fn neutral() -> Self {
        Self {
            threshold_delta: 0.0,
            backoff_multiplier: 1.0,
        }
    }
}

impl Default for StabilityAdvice {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Stability configuration (`[stability]` section).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub weights: StabilityWeights,
    /// V values retained for the trend fit
    pub window: usize,
    /// Minimum slope counted as rising
    pub trend_epsilon: f64,
    /// Score threshold increase while V is rising
    pub threshold_tightening: f64,
    /// Retry backoff multiplier while V is rising
    pub backoff_multiplier: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            weights: StabilityWeights::default(),
            window: 8,
            trend_epsilon: 1e-3,
            threshold_tightening: 0.05,
            backoff_multiplier: 2.0,
        }
    }
}
