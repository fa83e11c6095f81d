#![deny(unsafe_code)]
//! # evogate-executor
//!
//! Gate Executor for the evolution gate. Each run is a single transition
//! from EVALUATING to exactly one of PROMOTE, ROLLBACK or RETRY(n), taken
//! under an exclusive lock and recorded in an append-only ledger.
//!
//! ## Key Types
//!
//! - [`GateExecutor`]: decision table, version-control actions, ledger
//! - [`VersionControl`]: tag / restore seam ([`GitVcs`], [`SimulatedVcs`])
//! - [`RecoveryHook`]: optional external process run after ROLLBACK
//! - [`DecisionLedger`]: one immutable JSON record per decision

pub mod config;
pub mod error;
pub mod gate;
pub mod hook;
pub mod ledger;
pub mod simulated;
pub mod vcs;

pub use config::GateConfig;
pub use error::{GateError, GateResult, VcsError};
pub use gate::{FailureReport, GateExecutor, GateInput, GateOutcome, GATE_LOCK, STABILITY_FILE};
pub use hook::{HookOutcome, RecoveryHook, ScriptHook};
pub use ledger::{DecisionLedger, DECISIONS_DIR};
pub use simulated::SimulatedVcs;
pub use vcs::{GitVcs, VersionControl};
