#![deny(unsafe_code)]
//! # evogate-types
//!
//! Shared data model for the evolution gate.
//!
//! ## Key Types
//!
//! - [`BundleId`]: timestamp + random suffix identity of one evidence bundle
//! - [`Digest`] / [`Manifest`]: SHA-256 hash-lists in `sha256sum` form
//! - [`EvaluationArtifact`]: statistical record, rendered as labeled exposition text
//! - [`MetricsVector`]: typed session quality summary fed to the scorer
//! - [`GateDecision`]: immutable PROMOTE / ROLLBACK / RETRY record

pub mod artifact;
pub mod bundle_id;
pub mod decision;
pub mod digest;
pub mod error;
pub mod exposition;
pub mod manifest;
pub mod metrics;

pub use artifact::{EvaluationArtifact, EvaluationStatus, PairingDiagnostics, Uniformity};
pub use bundle_id::BundleId;
pub use decision::{DecisionKind, GateDecision, PromotionAudit, RetryCause, StabilityReport};
pub use digest::{Digest, DigestError};
pub use error::TypesError;
pub use manifest::{Drift, Manifest, ManifestEntry};
pub use metrics::MetricsVector;
