use crate::bundle_id::BundleId;
use crate::error::TypesError;
use crate::exposition::{self, ExpositionWriter, Sample};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const METRIC_SAMPLE_COUNT: &str = "evogate_eval_sample_count";
pub const METRIC_P_VALUE: &str = "evogate_eval_p_value";
pub const METRIC_EFFECT: &str = "evogate_eval_effect";
pub const METRIC_EVENTS: &str = "evogate_eval_events";
pub const METRIC_PVALUE_KS: &str = "evogate_eval_pvalue_uniformity_ks";
pub const METRIC_PVALUE_VARIANCE: &str = "evogate_eval_pvalue_variance";
pub const METRIC_INFO: &str = "evogate_eval_info";

/// Name of the hypothesis test carried in the `test` label.
pub const TEST_NAME: &str = "paired_sign_flip";

/// Outcome class of one evaluation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Ok,
    InsufficientSamples,
    EvaluatorError,
    Timeout,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::InsufficientSamples => "insufficient_samples",
            Self::EvaluatorError => "evaluator_error",
            Self::Timeout => "timeout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(Self::Ok),
            "insufficient_samples" => Some(Self::InsufficientSamples),
            "evaluator_error" => Some(Self::EvaluatorError),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters explaining why the sample set has the size it has.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingDiagnostics {
    /// Event lines seen in the tail window.
    pub seen: u64,
    /// Lines that were not JSON objects.
    pub malformed: u64,
    /// Structured events of a different kind.
    pub filtered: u64,
    /// Sample events with missing/invalid fields or a duplicated side.
    pub pairing_failed: u64,
    /// Decision points that only saw variant A.
    pub unpaired_a: u64,
    /// Decision points that only saw variant B.
    pub unpaired_b: u64,
    /// Complete A/B pairs.
    pub paired: u64,
}

impl PairingDiagnostics {
    fn classes(&self) -> [(&'static str, u64); 7] {
        [
            ("seen", self.seen),
            ("malformed", self.malformed),
            ("filtered", self.filtered),
            ("pairing_failed", self.pairing_failed),
            ("unpaired_a", self.unpaired_a),
            ("unpaired_b", self.unpaired_b),
            ("paired", self.paired),
        ]
    }

    fn set(&mut self, class: &str, value: u64) -> bool {
        let slot = match class {
            "seen" => &mut self.seen,
            "malformed" => &mut self.malformed,
            "filtered" => &mut self.filtered,
            "pairing_failed" => &mut self.pairing_failed,
            "unpaired_a" => &mut self.unpaired_a,
            "unpaired_b" => &mut self.unpaired_b,
            "paired" => &mut self.paired,
            _ => return false,
        };
        *slot = value;
        true
    }
}

/// Uniformity diagnostic over p-values of earlier bundles.
///
/// Under the null hypothesis p-values are U(0,1): KS distance near 0 and
/// variance near 1/12. `None` statistics mean fewer than two prior values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Uniformity {
    pub samples: u64,
    pub ks_statistic: Option<f64>,
    pub variance: Option<f64>,
}

/// The statistical-evaluation record of one bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationArtifact {
    pub bundle_id: BundleId,
    pub status: EvaluationStatus,
    /// Paired samples the test statistic was computed over; 0 unless `Ok`.
    pub sample_count: u64,
    /// Test statistic in (0, 1]; present only when `Ok`.
    pub p_value: Option<f64>,
    /// Mean paired difference B - A; present only when `Ok`.
    pub effect: Option<f64>,
    pub diagnostics: PairingDiagnostics,
    pub uniformity: Uniformity,
    pub error: Option<String>,
}

impl EvaluationArtifact {
    pub fn completed(
        bundle_id: BundleId,
        sample_count: u64,
        p_value: f64,
        effect: f64,
        diagnostics: PairingDiagnostics,
        uniformity: Uniformity,
    ) -> Self {
        Self {
            bundle_id,
            status: EvaluationStatus::Ok,
            sample_count,
            p_value: Some(p_value.clamp(0.0, 1.0)),
            effect: Some(effect),
            diagnostics,
            uniformity,
            error: None,
        }
    }

    /// Zero-sample record: no statistic, counters kept so the gap is explained.
    pub fn shortfall(
        bundle_id: BundleId,
        status: EvaluationStatus,
        diagnostics: PairingDiagnostics,
        uniformity: Uniformity,
        error: Option<String>,
    ) -> Self {
        Self {
            bundle_id,
            status,
            sample_count: 0,
            p_value: None,
            effect: None,
            diagnostics,
            uniformity,
            error,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.status == EvaluationStatus::Ok && self.sample_count > 0 && self.p_value.is_some()
    }

    /// Render as exposition text.
    ///
    /// Every family is emitted exactly once per label combination with the
    /// full label set, in every status; absent statistics are `NaN`.
    pub fn to_exposition(&self) -> String {
        let bundle = self.bundle_id.as_str();
        let status = self.status.as_str();
        let base = [("bundle", bundle), ("status", status)];
        let window = self.uniformity.samples.to_string();
        let mut w = ExpositionWriter::new();

        w.gauge(METRIC_SAMPLE_COUNT, "Paired samples used by the hypothesis test.")
            .sample(METRIC_SAMPLE_COUNT, &base, self.sample_count as f64);

        w.gauge(METRIC_P_VALUE, "Two-sample test p-value; NaN when no test ran.")
            .sample(
                METRIC_P_VALUE,
                &[base[0], base[1], ("test", TEST_NAME)],
                self.p_value.unwrap_or(f64::NAN),
            );

        w.gauge(METRIC_EFFECT, "Mean paired difference (B - A); NaN when no test ran.")
            .sample(METRIC_EFFECT, &base, self.effect.unwrap_or(f64::NAN));

        w.gauge(METRIC_EVENTS, "Event classification counters for the tail window.");
        for (class, value) in self.diagnostics.classes() {
            w.sample(
                METRIC_EVENTS,
                &[base[0], base[1], ("class", class)],
                value as f64,
            );
        }

        w.gauge(METRIC_PVALUE_KS, "KS distance of prior p-values from U(0,1).")
            .sample(
                METRIC_PVALUE_KS,
                &[base[0], base[1], ("window", window.as_str())],
                self.uniformity.ks_statistic.unwrap_or(f64::NAN),
            );

        w.gauge(METRIC_PVALUE_VARIANCE, "Variance of prior p-values (uniform: 1/12).")
            .sample(
                METRIC_PVALUE_VARIANCE,
                &[base[0], base[1], ("window", window.as_str())],
                self.uniformity.variance.unwrap_or(f64::NAN),
            );

        w.gauge(METRIC_INFO, "Evaluation outcome detail.").sample(
            METRIC_INFO,
            &[base[0], base[1], ("error", self.error.as_deref().unwrap_or(""))],
            1.0,
        );

        w.finish()
    }

    /// Parse the exposition text written by [`Self::to_exposition`].
    pub fn parse(text: &str) -> Result<Self, TypesError> {
        let samples = exposition::parse(text)?;
        let find = |name: &str| -> Result<&Sample, TypesError> {
            samples
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| TypesError::Exposition(format!("missing series {}", name)))
        };

        let count = find(METRIC_SAMPLE_COUNT)?;
        let bundle = count
            .label("bundle")
            .ok_or_else(|| TypesError::Exposition("missing bundle label".into()))?;
        let bundle_id = BundleId::parse(bundle)?;
        let status = count
            .label("status")
            .and_then(EvaluationStatus::parse)
            .ok_or_else(|| TypesError::Exposition("missing or unknown status label".into()))?;

        for s in &samples {
            if s.label("bundle") != Some(bundle) || s.label("status") != Some(status.as_str()) {
                return Err(TypesError::Exposition(format!(
                    "series {} does not carry the bundle/status label set",
                    s.name
                )));
            }
        }

        let finite = |v: f64| if v.is_nan() { None } else { Some(v) };

        let mut diagnostics = PairingDiagnostics::default();
        for s in samples.iter().filter(|s| s.name == METRIC_EVENTS) {
            let class = s
                .label("class")
                .ok_or_else(|| TypesError::Exposition("events series without class".into()))?;
            if !diagnostics.set(class, s.value as u64) {
                return Err(TypesError::Exposition(format!("unknown event class {}", class)));
            }
        }

        let ks = find(METRIC_PVALUE_KS)?;
        let window = ks
            .label("window")
            .and_then(|w| w.parse::<u64>().ok())
            .ok_or_else(|| TypesError::Exposition("missing window label".into()))?;
        let uniformity = Uniformity {
            samples: window,
            ks_statistic: finite(ks.value),
            variance: finite(find(METRIC_PVALUE_VARIANCE)?.value),
        };

        let error = find(METRIC_INFO)?
            .label("error")
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        Ok(Self {
            bundle_id,
            status,
            sample_count: count.value as u64,
            p_value: finite(find(METRIC_P_VALUE)?.value),
            effect: finite(find(METRIC_EFFECT)?.value),
            diagnostics,
            uniformity,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id() -> BundleId {
        BundleId::from_parts(chrono::Utc.timestamp_opt(1_760_000_000, 0).unwrap(), 0xabcd)
    }

    fn diag() -> PairingDiagnostics {
        PairingDiagnostics {
            seen: 40,
            malformed: 1,
            filtered: 5,
            pairing_failed: 2,
            unpaired_a: 1,
            unpaired_b: 3,
            paired: 12,
        }
    }

    #[test]
    fn completed_artifact_parses_back() {
        let a = EvaluationArtifact::completed(
            id(),
            12,
            0.031,
            0.4,
            diag(),
            Uniformity {
                samples: 9,
                ks_statistic: Some(0.21),
                variance: Some(0.08),
            },
        );
        let parsed = EvaluationArtifact::parse(&a.to_exposition()).unwrap();
        assert_eq!(parsed, a);
        assert!(parsed.is_usable());
    }

    #[test]
    fn shortfall_has_no_statistic_but_full_labels() {
        let a = EvaluationArtifact::shortfall(
            id(),
            EvaluationStatus::InsufficientSamples,
            diag(),
            Uniformity::default(),
            Some("3 pairs < 8 required".into()),
        );
        let text = a.to_exposition();
        for line in text.lines().filter(|l| !l.starts_with('#')) {
            assert!(line.contains("bundle=\""), "unlabeled line: {}", line);
            assert!(line.contains("status=\"insufficient_samples\""));
        }
        assert_eq!(
            text.lines().filter(|l| l.starts_with(METRIC_P_VALUE)).count(),
            1
        );
        let parsed = EvaluationArtifact::parse(&text).unwrap();
        assert_eq!(parsed.sample_count, 0);
        assert!(parsed.p_value.is_none());
        assert!(!parsed.is_usable());
        assert_eq!(parsed.error.as_deref(), Some("3 pairs < 8 required"));
    }

    #[test]
    fn p_value_is_clamped() {
        let a = EvaluationArtifact::completed(id(), 1, 1.5, 0.0, diag(), Uniformity::default());
        assert_eq!(a.p_value, Some(1.0));
    }

    #[test]
    fn mixed_label_sets_rejected() {
        let a = EvaluationArtifact::shortfall(
            id(),
            EvaluationStatus::Timeout,
            PairingDiagnostics::default(),
            Uniformity::default(),
            None,
        );
        let text = a.to_exposition().replacen("status=\"timeout\"", "status=\"ok\"", 1);
        assert!(EvaluationArtifact::parse(&text).is_err());
    }
}
