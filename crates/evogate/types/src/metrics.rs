use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quality summary of one session, the scorer's input.
///
/// Named, typed fields for everything the scorer reads; anything else the
/// pipeline wants to carry goes in `metadata`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsVector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Accuracy-like quality score in [0, 1].
    pub accuracy: f64,
    /// Fraction of outputs flagged as hallucinated.
    pub hallucination_rate: f64,
    /// Fraction of previously passing cases that now fail.
    pub regression_rate: f64,
    /// Latency deviation from baseline, in standard deviations.
    pub latency_z: f64,
    /// Cost efficiency in [0, 1], higher is cheaper.
    pub cost_efficiency: f64,
    /// Recall against the held-out oracle set.
    pub recall: f64,
    /// KS distance of recent canary p-values from uniform, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canary_ks: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl MetricsVector {
    pub fn with_canary_ks(mut self, ks: Option<f64>) -> Self {
        self.canary_ks = ks;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Named scalar fields, in scoring order.
    pub fn named_fields(&self) -> [(&'static str, f64); 6] {
        [
            ("accuracy", self.accuracy),
            ("hallucination_rate", self.hallucination_rate),
            ("regression_rate", self.regression_rate),
            ("latency_z", self.latency_z),
            ("cost_efficiency", self.cost_efficiency),
            ("recall", self.recall),
        ]
    }
}
