//! Paired sign-flip randomization test.
//!
//! Under the null hypothesis that variants A and B are exchangeable within
//! each pair, every difference `d = b - a` is equally likely to carry
//! either sign. The p-value is the share of random sign assignments whose
//! absolute mean is at least the observed absolute mean, with the usual
//! +1 correction so it is never zero.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    /// In (0, 1].
    pub p_value: f64,
    /// Mean of the observed differences.
    pub effect: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SignFlipTest {
    resamples: usize,
}

impl SignFlipTest {
    pub fn new(resamples: usize) -> Self {
        Self {
            resamples: resamples.max(1),
        }
    }

    /// Run the test with a generator seeded from `seed`.
    ///
    /// Returns `None` for an empty sample.
    pub fn run(&self, differences: &[f64], seed: u64) -> Option<TestOutcome> {
        if differences.is_empty() {
            return None;
        }
        let n = differences.len() as f64;
        let effect = differences.iter().sum::<f64>() / n;
        let observed = effect.abs();

        if differences.iter().all(|d| *d == 0.0) {
            return Some(TestOutcome {
                p_value: 1.0,
                effect,
            });
        }

        // Ties within rounding error count as "at least as extreme".
        let tolerance = observed * 1e-12;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut extreme = 0usize;
        for _ in 0..self.resamples {
            let mut sum = 0.0;
            for d in differences {
                if rng.gen::<bool>() {
                    sum += d;
                } else {
                    sum -= d;
                }
            }
            if (sum / n).abs() >= observed - tolerance {
                extreme += 1;
            }
        }

        Some(TestOutcome {
            p_value: (1 + extreme) as f64 / (1 + self.resamples) as f64,
            effect,
        })
    }
}
