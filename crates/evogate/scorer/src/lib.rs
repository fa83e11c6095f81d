#![deny(unsafe_code)]
//! # evogate-scorer
//!
//! Promotion Scorer for the evolution gate: a pure function from a
//! [`MetricsVector`](evogate_types::MetricsVector) to a [`ScoreCard`].
//!
//! The score is a fixed weighted linear combination; `passed` is the AND
//! of the score threshold and every individual hard limit.

pub mod config;
pub mod error;
pub mod scorer;

pub use config::{ScoreThresholds, ScoreWeights, ScorerConfig};
pub use error::ConfigError;
pub use scorer::{score, LimitKind, PromotionScorer, ScoreCard, Violation};
