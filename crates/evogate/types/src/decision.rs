use crate::bundle_id::BundleId;
use crate::metrics::MetricsVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Terminal action chosen for one gate cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionKind {
    Promote,
    Rollback,
    Retry,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Promote => "promote",
            Self::Rollback => "rollback",
            Self::Retry => "retry",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Promote => write!(f, "PROMOTE"),
            Self::Rollback => write!(f, "ROLLBACK"),
            Self::Retry => write!(f, "RETRY"),
        }
    }
}

/// Which rule of the decision table produced a RETRY.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryCause {
    /// No usable evaluation. The only cause that escalates to ROLLBACK.
    Shortfall,
    /// Score fails the threshold tightened by rising instability.
    Instability,
    /// Rolling pass rate below the floor.
    PassRate,
}

impl RetryCause {
    pub fn escalates(&self) -> bool {
        matches!(self, Self::Shortfall)
    }
}

/// Snapshot of the Lyapunov-style instability value at decision time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    /// Instability value V for the current window.
    pub v: f64,
    /// Least-squares slope of V across the retained windows.
    pub slope: f64,
    /// True when V is trending upward.
    pub rising: bool,
    /// Number of windows the slope was fitted over.
    pub window: usize,
}

/// Audit material captured alongside a PROMOTE.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromotionAudit {
    pub previous_tag: Option<String>,
    pub diff_summary: String,
    pub recent_changes: Vec<String>,
}

/// Immutable record of one gate evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub id: Uuid,
    pub decided_at: DateTime<Utc>,
    pub kind: DecisionKind,
    /// Consecutive retry number, present only for RETRY.
    pub retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_cause: Option<RetryCause>,
    pub score: f64,
    pub passed: bool,
    pub reasons: Vec<String>,
    pub bundle_id: Option<BundleId>,
    pub metrics: MetricsVector,
    /// Rolling pass rate of the prior decisions consulted.
    pub pass_rate: f64,
    pub stability: Option<StabilityReport>,
    /// Tag created on PROMOTE or restored on ROLLBACK.
    pub tag: Option<String>,
    pub audit: Option<PromotionAudit>,
    /// Suggested wait before the scheduler re-collects evidence.
    pub backoff_ms: Option<u64>,
    /// Set when the version-control action for this decision did not complete.
    pub action_failed: Option<String>,
}

impl GateDecision {
    pub fn new(kind: DecisionKind, score: f64, passed: bool, metrics: MetricsVector) -> Self {
        Self {
            id: Uuid::new_v4(),
            decided_at: Utc::now(),
            kind,
            retry_count: None,
            retry_cause: None,
            score,
            passed,
            reasons: Vec::new(),
            bundle_id: None,
            metrics,
            pass_rate: 1.0,
            stability: None,
            tag: None,
            audit: None,
            backoff_ms: None,
            action_failed: None,
        }
    }

    pub fn is_action_failed(&self) -> bool {
        self.action_failed.is_some()
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        let mut s = format!("{} score={:.4} passed={}", self.kind, self.score, self.passed);
        if let Some(n) = self.retry_count {
            s.push_str(&format!(" retry={}", n));
        }
        if let Some(tag) = &self.tag {
            s.push_str(&format!(" tag={}", tag));
        }
        if !self.reasons.is_empty() {
            s.push_str(&format!(" reasons=[{}]", self.reasons.join("; ")));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&DecisionKind::Rollback).unwrap(),
            "\"ROLLBACK\""
        );
        assert_eq!(format!("{}", DecisionKind::Promote), "PROMOTE");
    }

    #[test]
    fn summary_lists_reasons() {
        let mut d = GateDecision::new(DecisionKind::Retry, 0.5, true, MetricsVector::default());
        d.retry_count = Some(2);
        d.reasons.push("pass rate 0.60 below floor 0.97".into());
        let s = d.summary();
        assert!(s.starts_with("RETRY"));
        assert!(s.contains("retry=2"));
        assert!(s.contains("pass rate"));
    }

    #[test]
    fn retry_cause_is_optional_on_the_wire() {
        let mut d = GateDecision::new(DecisionKind::Retry, 0.7, true, MetricsVector::default());
        let bare = serde_json::to_value(&d).unwrap();
        assert!(bare.get("retry_cause").is_none());
        let restored: GateDecision = serde_json::from_value(bare).unwrap();
        assert_eq!(restored.retry_cause, None);

        d.retry_cause = Some(RetryCause::PassRate);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["retry_cause"], "pass_rate");
        assert!(RetryCause::Shortfall.escalates());
        assert!(!RetryCause::Instability.escalates());
    }

    #[test]
    fn decision_serde() {
        let d = GateDecision::new(DecisionKind::Promote, 0.76, true, MetricsVector::default());
        let json = serde_json::to_string(&d).unwrap();
        let restored: GateDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, d);
    }
}
