#![deny(unsafe_code)]
//! # evogate-stability
//!
//! Stability Monitor: a Lyapunov-style instability value `V` over rolling
//! operational indicators. A rising `V` throttles promotion (higher score
//! threshold, longer retry backoff) but never forces a rollback.

pub mod error;
pub mod monitor;
pub mod types;

pub use error::StabilityError;
pub use evogate_types::StabilityReport;
pub use monitor::{instability, slope, StabilityHistory, StabilityMonitor};
pub use types::{OperationalSample, StabilityAdvice, StabilityConfig, StabilityWeights};
