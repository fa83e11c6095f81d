use crate::config::EvaluatorConfig;
use crate::error::EvaluationError;
use crate::pairing::pair_events;
use crate::sign_flip::SignFlipTest;
use crate::uniformity::uniformity;
use evogate_evidence::{BundleEvaluator, EvaluationInput, EvaluatorFailure};
use evogate_types::{EvaluationArtifact, EvaluationStatus};
use tracing::debug;

/// Paired A/B evaluator run inside bundle creation.
pub struct StatisticalEvaluator {
    config: EvaluatorConfig,
}

impl StatisticalEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(EvaluatorConfig::default())
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Compute the artifact for one bundle's input.
    ///
    /// A shortfall (too few pairs) is an `Ok` artifact with zero samples;
    /// only configuration or numeric failures are errors.
    pub fn run(&self, input: &EvaluationInput) -> Result<EvaluationArtifact, EvaluationError> {
        self.config.validate()?;
        let paired = pair_events(&input.events, &self.config.sample_kind);
        let uniformity = uniformity(&input.prior_p_values);
        let pairs = paired.differences.len();

        if pairs < self.config.min_pairs {
            debug!(bundle = %input.bundle_id, pairs, required = self.config.min_pairs, "insufficient samples");
            return Ok(EvaluationArtifact::shortfall(
                input.bundle_id.clone(),
                EvaluationStatus::InsufficientSamples,
                paired.diagnostics,
                uniformity,
                Some(format!(
                    "{} complete pairs, {} required",
                    pairs, self.config.min_pairs
                )),
            ));
        }

        let outcome = SignFlipTest::new(self.config.resamples)
            .run(&paired.differences, input.bundle_id.seed())
            .ok_or_else(|| EvaluationError::NonFinite("empty sample".into()))?;
        if !outcome.p_value.is_finite() || !outcome.effect.is_finite() {
            return Err(EvaluationError::NonFinite(format!(
                "p={} effect={}",
                outcome.p_value, outcome.effect
            )));
        }
        debug!(
            bundle = %input.bundle_id,
            pairs,
            p_value = outcome.p_value,
            effect = outcome.effect,
            "sign-flip test complete"
        );

        Ok(EvaluationArtifact::completed(
            input.bundle_id.clone(),
            pairs as u64,
            outcome.p_value,
            outcome.effect,
            paired.diagnostics,
            uniformity,
        ))
    }
}

impl Default for StatisticalEvaluator {
    fn default() -> Self {
        Self::with_default_config()
    }
}

impl BundleEvaluator for StatisticalEvaluator {
    fn evaluate(&self, input: &EvaluationInput) -> Result<EvaluationArtifact, EvaluatorFailure> {
        Ok(self.run(input)?)
    }

    fn uniformity_window(&self) -> usize {
        self.config.uniformity_window
    }
}
