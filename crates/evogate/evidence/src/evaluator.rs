use evogate_types::{
    BundleId, EvaluationArtifact, EvaluationStatus, PairingDiagnostics, Uniformity,
};
use std::time::Duration;

/// Everything an evaluator may read about one bundle.
#[derive(Debug, Clone)]
pub struct EvaluationInput {
    pub bundle_id: BundleId,
    /// `events.jsonl` lines of the bundle, oldest first.
    pub events: Vec<String>,
    /// p-values of earlier sealed bundles, oldest first.
    pub prior_p_values: Vec<f64>,
}

pub type EvaluatorFailure = Box<dyn std::error::Error + Send + Sync>;

/// Trait for the statistical evaluation step run inside bundle creation.
///
/// Implementations must be deterministic for a given input: any randomness
/// is seeded from [`BundleId::seed`].
pub trait BundleEvaluator: Send + Sync {
    fn evaluate(&self, input: &EvaluationInput) -> Result<EvaluationArtifact, EvaluatorFailure>;

    /// How many prior p-values the uniformity diagnostic wants.
    fn uniformity_window(&self) -> usize {
        20
    }
}

/// Scripted evaluator for tests (no statistics).
pub struct SimulatedEvaluator {
    behaviour: Behaviour,
    delay: Duration,
}

enum Behaviour {
    Complete { samples: u64, p_value: f64 },
    Shortfall,
    Fail(String),
    Panic,
}

impl SimulatedEvaluator {
    pub fn passing(samples: u64, p_value: f64) -> Self {
        Self {
            behaviour: Behaviour::Complete { samples, p_value },
            delay: Duration::ZERO,
        }
    }

    pub fn insufficient() -> Self {
        Self {
            behaviour: Behaviour::Shortfall,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            behaviour: Behaviour::Fail(msg.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn panicking() -> Self {
        Self {
            behaviour: Behaviour::Panic,
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl BundleEvaluator for SimulatedEvaluator {
    fn evaluate(&self, input: &EvaluationInput) -> Result<EvaluationArtifact, EvaluatorFailure> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let diagnostics = PairingDiagnostics {
            seen: input.events.len() as u64,
            ..Default::default()
        };
        match &self.behaviour {
            Behaviour::Complete { samples, p_value } => Ok(EvaluationArtifact::completed(
                input.bundle_id.clone(),
                *samples,
                *p_value,
                0.0,
                PairingDiagnostics {
                    paired: *samples,
                    ..diagnostics
                },
                Uniformity {
                    samples: input.prior_p_values.len() as u64,
                    ..Default::default()
                },
            )),
            Behaviour::Shortfall => Ok(EvaluationArtifact::shortfall(
                input.bundle_id.clone(),
                EvaluationStatus::InsufficientSamples,
                diagnostics,
                Uniformity::default(),
                Some("simulated shortfall".into()),
            )),
            Behaviour::Fail(msg) => Err(msg.clone().into()),
            Behaviour::Panic => panic!("simulated evaluator panic"),
        }
    }
}
