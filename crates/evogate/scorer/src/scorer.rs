use crate::config::{ScoreThresholds, ScoreWeights, ScorerConfig};
use crate::error::ConfigError;
use evogate_types::MetricsVector;
use serde::{Deserialize, Serialize};

/// Which side of a limit was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Ceiling,
    Floor,
}

/// One violated hard limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub metric: String,
    pub value: f64,
    pub limit: f64,
    pub kind: LimitKind,
}

impl Violation {
    fn ceiling(metric: &str, value: f64, limit: f64) -> Self {
        Self {
            metric: metric.to_string(),
            value,
            limit,
            kind: LimitKind::Ceiling,
        }
    }

    fn floor(metric: &str, value: f64, limit: f64) -> Self {
        Self {
            metric: metric.to_string(),
            value,
            limit,
            kind: LimitKind::Floor,
        }
    }

    pub fn reason(&self) -> String {
        match self.kind {
            LimitKind::Ceiling => format!(
                "{} {:.4} exceeds ceiling {:.4}",
                self.metric, self.value, self.limit
            ),
            LimitKind::Floor => format!(
                "{} {:.4} below floor {:.4}",
                self.metric, self.value, self.limit
            ),
        }
    }
}

/// Verdict of one scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: f64,
    pub passed: bool,
    /// Every failed check, in a fixed order.
    pub reasons: Vec<String>,
    pub violations: Vec<Violation>,
    /// Score threshold that was applied.
    pub threshold: f64,
}

/// Weighted fitness score with independent hard limits.
///
/// ```text
/// score = w_acc·accuracy
///       + w_hal·(1 − hallucination_rate / max_hallucination_rate)
///       + w_reg·(1 − regression_rate / max_regression_rate)
///       − w_lat·latency_z
///       + w_cost·cost_efficiency
///       + w_rec·recall
/// ```
///
/// Error-type rates enter as headroom against their own ceiling. A pass
/// needs the score at or above the threshold *and* every hard limit to
/// hold; a high score never masks a violated limit.
///
/// A non-finite input is itself a failure and scores 0.
pub fn score(metrics: &MetricsVector, weights: &ScoreWeights, thresholds: &ScoreThresholds) -> ScoreCard {
    let mut reasons = Vec::new();

    let non_finite: Vec<&str> = metrics
        .named_fields()
        .iter()
        .filter(|(_, v)| !v.is_finite())
        .map(|(name, _)| *name)
        .collect();
    for name in &non_finite {
        reasons.push(format!("{} is not a finite number", name));
    }

    let raw = weights.accuracy * metrics.accuracy
        + weights.hallucination * (1.0 - metrics.hallucination_rate / thresholds.max_hallucination_rate)
        + weights.regression * (1.0 - metrics.regression_rate / thresholds.max_regression_rate)
        - weights.latency * metrics.latency_z
        + weights.cost * metrics.cost_efficiency
        + weights.recall * metrics.recall;
    let score = if non_finite.is_empty() && raw.is_finite() {
        raw
    } else {
        0.0
    };

    let mut violations = Vec::new();
    let mut ceiling = |metric: &str, value: f64, limit: f64| {
        if value.is_finite() && value > limit {
            violations.push(Violation::ceiling(metric, value, limit));
        }
    };
    ceiling(
        "hallucination_rate",
        metrics.hallucination_rate,
        thresholds.max_hallucination_rate,
    );
    ceiling(
        "regression_rate",
        metrics.regression_rate,
        thresholds.max_regression_rate,
    );
    ceiling("latency_z", metrics.latency_z, thresholds.max_latency_z);
    if let Some(min) = thresholds.min_accuracy {
        if metrics.accuracy.is_finite() && metrics.accuracy < min {
            violations.push(Violation::floor("accuracy", metrics.accuracy, min));
        }
    }
    if let Some(min) = thresholds.min_recall {
        if metrics.recall.is_finite() && metrics.recall < min {
            violations.push(Violation::floor("recall", metrics.recall, min));
        }
    }
    if let (Some(max), Some(ks)) = (thresholds.max_canary_ks, metrics.canary_ks) {
        if !ks.is_finite() {
            reasons.push("canary_ks is not a finite number".to_string());
        } else if ks > max {
            violations.push(Violation::ceiling("canary_ks", ks, max));
        }
    }
    reasons.extend(violations.iter().map(Violation::reason));

    if score < thresholds.min_score {
        reasons.push(format!(
            "score {:.4} below threshold {:.4}",
            score, thresholds.min_score
        ));
    }

    ScoreCard {
        score,
        passed: reasons.is_empty(),
        reasons,
        violations,
        threshold: thresholds.min_score,
    }
}

/// Configured scorer.
#[derive(Debug, Clone)]
pub struct PromotionScorer {
    config: ScorerConfig,
}

impl PromotionScorer {
    pub fn new(config: ScorerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn score(&self, metrics: &MetricsVector) -> ScoreCard {
        score(metrics, &self.config.weights, &self.config.thresholds)
    }

    /// Score against a threshold raised by `delta` (stability throttle).
    pub fn score_tightened(&self, metrics: &MetricsVector, delta: f64) -> ScoreCard {
        score(
            metrics,
            &self.config.weights,
            &self.config.thresholds.tightened(delta),
        )
    }
}

impl Default for PromotionScorer {
    fn default() -> Self {
        Self {
            config: ScorerConfig::default(),
        }
    }
}
