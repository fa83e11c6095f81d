use crate::error::EvaluationError;
use serde::{Deserialize, Serialize};

/// Evaluator configuration (`[evaluation]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// `kind` value of the structured events that carry A/B samples
    #[serde(default = "default_sample_kind")]
    pub sample_kind: String,

    /// Fewer complete pairs than this yields `insufficient_samples`
    #[serde(default = "default_min_pairs")]
    pub min_pairs: usize,

    /// Random sign assignments drawn by the randomization test
    #[serde(default = "default_resamples")]
    pub resamples: usize,

    /// Prior bundles whose p-values feed the uniformity diagnostic
    #[serde(default = "default_uniformity_window")]
    pub uniformity_window: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            sample_kind: default_sample_kind(),
            min_pairs: default_min_pairs(),
            resamples: default_resamples(),
            uniformity_window: default_uniformity_window(),
        }
    }
}

impl EvaluatorConfig {
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if self.sample_kind.is_empty() {
            return Err(EvaluationError::InvalidConfig("sample_kind is empty".into()));
        }
        if self.min_pairs == 0 {
            return Err(EvaluationError::InvalidConfig("min_pairs must be at least 1".into()));
        }
        if self.resamples == 0 {
            return Err(EvaluationError::InvalidConfig("resamples must be positive".into()));
        }
        Ok(())
    }
}

fn default_sample_kind() -> String {
    "ab_sample".into()
}

fn default_min_pairs() -> usize {
    8
}

fn default_resamples() -> usize {
    2000
}

fn default_uniformity_window() -> usize {
    20
}
