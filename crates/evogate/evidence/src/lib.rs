#![deny(unsafe_code)]
//! # evogate-evidence
//!
//! Evidence Store for the evolution gate.
//!
//! One sealed, content-addressed bundle per evaluation cycle. All writes go
//! through temp-file + fsync + rename; the self-manifest seals the bundle
//! and the `latest` pointer moves only after sealing.
//!
//! ## Key Types
//!
//! - [`EvidenceStore`]: bundle creation, sealing, verification, lookup
//! - [`BundleEvaluator`] / [`SimulatedEvaluator`]: evaluation seam
//! - [`FileLock`]: non-blocking exclusive lock file
//! - [`Backoff`]: capped exponential backoff for pollers

pub mod backoff;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod fsio;
pub mod latency;
pub mod lock;
pub mod store;
pub mod tail;

pub use backoff::Backoff;
pub use config::{AdaptiveTimeoutConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use evaluator::{BundleEvaluator, EvaluationInput, EvaluatorFailure, SimulatedEvaluator};
pub use latency::LatencyHistory;
pub use lock::{FileLock, LockAttempt, LockHolder};
pub use store::{BundleMeta, EvidenceStore, FAILURE_REPORT_FILE, MANIFEST_FILE, METRICS_FILE};
