use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Weights of the linear fitness score (`[scorer.weights]`).
///
/// All weights are non-negative; the sign each signal enters with is fixed
/// by the score formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub accuracy: f64,
    pub hallucination: f64,
    pub regression: f64,
    pub latency: f64,
    pub cost: f64,
    pub recall: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            accuracy: 0.35,
            hallucination: 0.25,
            regression: 0.20,
            latency: 0.05,
            cost: 0.05,
            recall: 0.10,
        }
    }
}

impl ScoreWeights {
    fn named(&self) -> [(&'static str, f64); 6] {
        [
            ("accuracy", self.accuracy),
            ("hallucination", self.hallucination),
            ("regression", self.regression),
            ("latency", self.latency),
            ("cost", self.cost),
            ("recall", self.recall),
        ]
    }
}

/// Hard limits checked independently of the score (`[scorer.thresholds]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreThresholds {
    /// Minimum weighted score for a pass
    pub min_score: f64,
    pub max_hallucination_rate: f64,
    pub max_regression_rate: f64,
    pub max_latency_z: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_recall: Option<f64>,
    /// Ceiling on the canary p-value KS distance, when the metrics carry one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_canary_ks: Option<f64>,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            min_score: 0.70,
            max_hallucination_rate: 0.08,
            max_regression_rate: 0.05,
            max_latency_z: 3.0,
            min_accuracy: None,
            min_recall: None,
            max_canary_ks: None,
        }
    }
}

impl ScoreThresholds {
    /// Copy with the score threshold raised by `delta`.
    pub fn tightened(&self, delta: f64) -> Self {
        Self {
            min_score: self.min_score + delta.max(0.0),
            ..self.clone()
        }
    }
}

/// Full scorer configuration (`[scorer]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    #[serde(default)]
    pub weights: ScoreWeights,
    #[serde(default)]
    pub thresholds: ScoreThresholds,
}

impl ScorerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.weights.named() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        let t = &self.thresholds;
        if !t.min_score.is_finite() {
            return Err(ConfigError::InvalidThreshold {
                name: "min_score",
                value: t.min_score,
            });
        }
        let ceilings = [
            ("max_hallucination_rate", Some(t.max_hallucination_rate)),
            ("max_regression_rate", Some(t.max_regression_rate)),
            ("max_latency_z", Some(t.max_latency_z)),
            ("max_canary_ks", t.max_canary_ks),
        ];
        for (name, value) in ceilings {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ConfigError::InvalidThreshold { name, value });
                }
            }
        }
        for (name, value) in [("min_accuracy", t.min_accuracy), ("min_recall", t.min_recall)] {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(ConfigError::InvalidThreshold { name, value });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ScorerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_ceiling_rejected() {
        let mut c = ScorerConfig::default();
        c.thresholds.max_regression_rate = 0.0;
        assert_eq!(
            c.validate(),
            Err(ConfigError::InvalidThreshold {
                name: "max_regression_rate",
                value: 0.0
            })
        );
    }

    #[test]
    fn negative_weight_rejected() {
        let mut c = ScorerConfig::default();
        c.weights.latency = -0.05;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidWeight { name: "latency", .. })
        ));
    }

    #[test]
    fn tightened_only_raises() {
        let t = ScoreThresholds::default();
        assert!((t.tightened(0.05).min_score - 0.75).abs() < 1e-12);
        assert_eq!(t.tightened(-1.0).min_score, t.min_score);
    }
}
