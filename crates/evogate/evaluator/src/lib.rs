#![deny(unsafe_code)]
//! # evogate-evaluator
//!
//! Statistical Evaluator for the evolution gate.
//!
//! Pairs the A/B sample events of a bundle, runs a paired sign-flip
//! randomization test seeded from the bundle id, and computes a uniformity
//! diagnostic over p-values of earlier bundles.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod pairing;
pub mod sign_flip;
pub mod uniformity;

pub use config::EvaluatorConfig;
pub use error::EvaluationError;
pub use evaluator::StatisticalEvaluator;
pub use pairing::{pair_events, PairedSamples};
pub use sign_flip::{SignFlipTest, TestOutcome};
pub use uniformity::{ks_statistic, uniformity, variance};
