//! Gate Executor: one EVALUATING → {PROMOTE, ROLLBACK, RETRY(n)} transition
//! per run.

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};
use crate::hook::RecoveryHook;
use crate::ledger::DecisionLedger;
use crate::vcs::VersionControl;
use chrono::{DateTime, Utc};
use evogate_evidence::{
    fsio, Backoff, EvidenceStore, FileLock, LockAttempt, LockHolder, StoreError,
    FAILURE_REPORT_FILE,
};
use evogate_scorer::PromotionScorer;
use evogate_stability::{OperationalSample, StabilityConfig, StabilityHistory, StabilityMonitor};
use evogate_types::{
    BundleId, DecisionKind, EvaluationArtifact, GateDecision, MetricsVector, PromotionAudit,
    RetryCause,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const GATE_LOCK: &str = "gate.lock";
pub const STABILITY_FILE: &str = "stability.json";

const TAG_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";
const AUDIT_CHANGE_LIMIT: usize = 20;

/// Everything one gate cycle looks at.
#[derive(Debug, Clone, Default)]
pub struct GateInput {
    pub metrics: MetricsVector,
    /// Bundle whose evaluation artifact feeds the decision.
    pub bundle: Option<BundleId>,
    /// Operational indicators for the stability monitor.
    pub operational: Option<OperationalSample>,
}

impl GateInput {
    pub fn new(metrics: MetricsVector) -> Self {
        Self {
            metrics,
            ..Default::default()
        }
    }

    pub fn with_bundle(mut self, bundle: BundleId) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn with_operational(mut self, sample: OperationalSample) -> Self {
        self.operational = Some(sample);
        self
    }
}

#[derive(Debug, Clone)]
pub enum GateOutcome {
    Decided(GateDecision),
    /// Another run holds the gate lock; nothing was decided or recorded.
    Skipped { holder: Option<LockHolder> },
}

/// Structured record written into the bundle on ROLLBACK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub decision_id: Uuid,
    pub decided_at: DateTime<Utc>,
    pub kind: DecisionKind,
    pub score: f64,
    pub passed: bool,
    pub reasons: Vec<String>,
    pub metrics: MetricsVector,
    pub restored_tag: Option<String>,
    pub action_failed: Option<String>,
}

impl FailureReport {
    pub fn from_decision(decision: &GateDecision) -> Self {
        Self {
            decision_id: decision.id,
            decided_at: decision.decided_at,
            kind: decision.kind,
            score: decision.score,
            passed: decision.passed,
            reasons: decision.reasons.clone(),
            metrics: decision.metrics.clone(),
            restored_tag: decision.tag.clone(),
            action_failed: decision.action_failed.clone(),
        }
    }
}

pub struct GateExecutor {
    config: GateConfig,
    store: EvidenceStore,
    scorer: PromotionScorer,
    vcs: Box<dyn VersionControl>,
    stability: StabilityConfig,
    hook: Option<Box<dyn RecoveryHook>>,
    artifact_wait: Backoff,
    ledger: DecisionLedger,
}

impl GateExecutor {
    pub fn new(
        config: GateConfig,
        store: EvidenceStore,
        scorer: PromotionScorer,
        vcs: Box<dyn VersionControl>,
    ) -> GateResult<Self> {
        config.validate()?;
        let ledger = DecisionLedger::new(store.root());
        Ok(Self {
            config,
            store,
            scorer,
            vcs,
            stability: StabilityConfig::default(),
            hook: None,
            artifact_wait: Backoff::polling(),
            ledger,
        })
    }

    pub fn with_stability(mut self, stability: StabilityConfig) -> Self {
        self.stability = stability;
        self
    }

    pub fn with_recovery_hook(mut self, hook: Box<dyn RecoveryHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// How long to wait for an in-flight bundle's artifact.
    pub fn with_artifact_wait(mut self, backoff: Backoff) -> Self {
        self.artifact_wait = backoff;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn ledger(&self) -> &DecisionLedger {
        &self.ledger
    }

    /// Most recent decisions, oldest first.
    pub fn history(&self, limit: usize) -> GateResult<Vec<GateDecision>> {
        self.ledger.history(limit)
    }

    /// Decide and act under the gate lock.
    ///
    /// The decision is recorded even when its version-control action
    /// fails; that case returns [`GateError::ActionFailed`].
    pub fn run(&self, input: &GateInput) -> GateResult<GateOutcome> {
        let lock_path = self.store.root().join(GATE_LOCK);
        let _lock = match FileLock::try_acquire(&lock_path, "gate", self.config.lock_stale_after())? {
            LockAttempt::Acquired(lock) => lock,
            LockAttempt::Busy(holder) => {
                warn!(
                    holder_pid = holder.as_ref().map(|h| h.pid),
                    "gate lock held by another run, skipping cycle"
                );
                return Ok(GateOutcome::Skipped { holder });
            }
        };

        let mut monitor = self.load_monitor();
        let mut decision = self.decide(input, &mut monitor)?;

        match decision.kind {
            DecisionKind::Promote => self.promote(&mut decision),
            DecisionKind::Rollback => self.rollback(&mut decision),
            DecisionKind::Retry => {}
        }

        self.ledger.append(&decision)?;
        if input.operational.is_some() {
            if let Err(e) = self.save_monitor(&monitor) {
                warn!(error = %e, "failed to persist stability history");
            }
        }

        if let Some(reason) = decision.action_failed.clone() {
            error!(decision = %decision.summary(), %reason, "gate action failed");
            return Err(GateError::ActionFailed {
                decision: Box::new(decision),
                reason,
            });
        }
        info!(decision = %decision.summary(), "gate decision");
        Ok(GateOutcome::Decided(decision))
    }

    /// The decision `run` would make right now, with no side effects.
    pub fn dry_run(&self, input: &GateInput) -> GateResult<GateDecision> {
        let mut monitor = self.load_monitor();
        self.decide(input, &mut monitor)
    }

    fn decide(&self, input: &GateInput, monitor: &mut StabilityMonitor) -> GateResult<GateDecision> {
        let report = match &input.operational {
            Some(sample) => Some(monitor.observe(sample)?),
            None => monitor.report(),
        };
        let advice = monitor.advice(report.as_ref());

        let artifact = match &input.bundle {
            Some(id) => self.load_artifact(id)?,
            None => None,
        };
        let shortfall = match (&input.bundle, &artifact) {
            (_, Some(a)) if a.sample_count == 0 => Some(a.status.to_string()),
            (Some(_), None) => Some("artifact unavailable".to_string()),
            _ => None,
        };

        let mut metrics = input.metrics.clone();
        if metrics.canary_ks.is_none() {
            metrics.canary_ks = artifact.as_ref().and_then(|a| a.uniformity.ks_statistic);
        }

        let card = self.scorer.score(&metrics);
        let tightened = (advice.threshold_delta > 0.0)
            .then(|| self.scorer.score_tightened(&metrics, advice.threshold_delta));
        let pass_rate = self.ledger.pass_rate(self.config.history_window)?;

        let mut reasons = card.reasons.clone();
        let (mut kind, cause) = if let Some(status) = shortfall {
            reasons.push(format!("evaluation shortfall: {}", status));
            (DecisionKind::Retry, Some(RetryCause::Shortfall))
        } else if !card.passed {
            (DecisionKind::Rollback, None)
        } else if let Some(t) = tightened.as_ref().filter(|t| !t.passed) {
            reasons.push(format!(
                "instability rising: score {:.4} below tightened threshold {:.4}",
                t.score, t.threshold
            ));
            (DecisionKind::Retry, Some(RetryCause::Instability))
        } else if pass_rate < self.config.pass_rate_floor {
            reasons.push(format!(
                "pass rate {:.2} over last {} decisions below floor {:.2}",
                pass_rate, self.config.history_window, self.config.pass_rate_floor
            ));
            (DecisionKind::Retry, Some(RetryCause::PassRate))
        } else {
            (DecisionKind::Promote, None)
        };

        // Only a persistent evaluation shortfall escalates. Instability and
        // pass-rate retries keep backing off.
        let mut retry_count = None;
        let mut backoff_ms = None;
        if let Some(cause) = cause {
            let n = self.ledger.consecutive_retries()? + 1;
            let escalating = self.ledger.consecutive_escalating_retries()? + 1;
            if cause.escalates() && escalating > self.config.max_retries {
                reasons.push(format!(
                    "retry limit exceeded: {} consecutive evaluation shortfalls (max {})",
                    escalating, self.config.max_retries
                ));
                kind = DecisionKind::Rollback;
            } else {
                retry_count = Some(n);
                backoff_ms = Some(self.retry_backoff_ms(n, advice.backoff_multiplier));
            }
        }

        let mut decision = GateDecision::new(kind, card.score, card.passed, metrics);
        decision.reasons = reasons;
        decision.bundle_id = input.bundle.clone();
        decision.pass_rate = pass_rate;
        decision.stability = report;
        decision.retry_count = retry_count;
        decision.retry_cause = cause.filter(|_| kind == DecisionKind::Retry);
        decision.backoff_ms = backoff_ms;
        debug!(decision = %decision.summary(), "decided");
        Ok(decision)
    }

    /// `base × 2^(n−1)` capped at the configured maximum, then scaled.
    pub fn retry_backoff_ms(&self, n: u32, multiplier: f64) -> u64 {
        let exp = n.saturating_sub(1).min(32);
        let raw = self
            .config
            .retry_backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(self.config.retry_backoff_max_ms);
        (raw as f64 * multiplier.max(1.0)).round() as u64
    }

    fn load_artifact(&self, id: &BundleId) -> GateResult<Option<EvaluationArtifact>> {
        if !self.store.bundle_dir(id).is_dir() {
            return Err(StoreError::BundleNotFound(id.clone()).into());
        }
        match self.store.wait_for_artifact(id, &self.artifact_wait) {
            Ok(artifact) => Ok(Some(artifact)),
            Err(StoreError::ArtifactUnavailable(_)) => {
                warn!(bundle = %id, "evaluation artifact not available");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn promote(&self, decision: &mut GateDecision) {
        let previous = self.vcs.latest_tag(&self.config.tag_prefix).unwrap_or_else(|e| {
            warn!(error = %e, "could not resolve previous baseline");
            None
        });
        let tag = format!(
            "{}-{}",
            self.config.tag_prefix,
            decision.decided_at.format(TAG_TIME_FORMAT)
        );
        let message = format!(
            "evogate PROMOTE score={:.4} decision={}",
            decision.score, decision.id
        );
        if let Err(e) = self.vcs.create_tag(&tag, &message) {
            decision.action_failed = Some(format!("create tag {}: {}", tag, e));
            return;
        }
        info!(%tag, previous = ?previous, "new baseline tagged");
        decision.tag = Some(tag);
        decision.audit = Some(self.audit(previous));
    }

    fn audit(&self, previous: Option<String>) -> PromotionAudit {
        let diff_summary = self
            .vcs
            .diff_summary(previous.as_deref())
            .unwrap_or_else(|e| {
                warn!(error = %e, "diff summary unavailable");
                String::new()
            });
        let recent_changes = self
            .vcs
            .recent_changes(previous.as_deref(), AUDIT_CHANGE_LIMIT)
            .unwrap_or_else(|e| {
                warn!(error = %e, "change log unavailable");
                Vec::new()
            });
        PromotionAudit {
            previous_tag: previous,
            diff_summary,
            recent_changes,
        }
    }

    fn rollback(&self, decision: &mut GateDecision) {
        match self.vcs.latest_tag(&self.config.tag_prefix) {
            Ok(Some(tag)) => match self.vcs.checkout_tag(&tag) {
                Ok(()) => {
                    info!(%tag, "restored last promoted baseline");
                    decision.tag = Some(tag);
                }
                Err(e) => decision.action_failed = Some(format!("checkout {}: {}", tag, e)),
            },
            Ok(None) => decision.action_failed = Some("no promoted baseline".into()),
            Err(e) => decision.action_failed = Some(format!("resolve baseline: {}", e)),
        }

        if let Some(path) = self.write_failure_report(decision) {
            info!(path = %path.display(), "failure report written");
        }
        if let Some(hook) = &self.hook {
            let outcome = hook.invoke();
            debug!(?outcome, "recovery hook finished");
        }
    }

    fn write_failure_report(&self, decision: &GateDecision) -> Option<PathBuf> {
        let bundle = match &decision.bundle_id {
            Some(id) => Some(id.clone()),
            None => self.store.latest().unwrap_or_else(|e| {
                warn!(error = %e, "could not resolve latest bundle");
                None
            }),
        };
        let Some(bundle) = bundle else {
            warn!("no bundle to hold the failure report");
            return None;
        };
        let report = FailureReport::from_decision(decision);
        let written = serde_json::to_vec_pretty(&report)
            .map_err(StoreError::from)
            .and_then(|bytes| self.store.write_post_seal(&bundle, FAILURE_REPORT_FILE, &bytes));
        match written {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(bundle = %bundle, error = %e, "failure report not written");
                None
            }
        }
    }

    fn load_monitor(&self) -> StabilityMonitor {
        let path = self.store.root().join(STABILITY_FILE);
        let history = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "stability history corrupt, starting fresh");
                StabilityHistory::default()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => StabilityHistory::default(),
            Err(e) => {
                warn!(error = %e, "stability history unreadable, starting fresh");
                StabilityHistory::default()
            }
        };
        StabilityMonitor::with_history(self.stability.clone(), history)
    }

    fn save_monitor(&self, monitor: &StabilityMonitor) -> GateResult<()> {
        let bytes = serde_json::to_vec_pretty(monitor.history())?;
        fsio::write_atomic(&self.store.root().join(STABILITY_FILE), &bytes)?;
        Ok(())
    }
}
