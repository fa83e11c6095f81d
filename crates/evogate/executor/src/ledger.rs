//! Append-only decision ledger.
//!
//! One JSON file per decision under `decisions/`, named
//! `<decided_at>-<kind>-<id>.json`. Files are created once and never edited;
//! name order is decision order.

use crate::error::GateResult;
use evogate_evidence::fsio;
use evogate_types::{DecisionKind, GateDecision};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DECISIONS_DIR: &str = "decisions";

#[derive(Debug, Clone)]
pub struct DecisionLedger {
    dir: PathBuf,
}

impl DecisionLedger {
    /// Ledger under `store_root`. The directory is created on first append.
    pub fn new(store_root: &Path) -> Self {
        Self {
            dir: store_root.join(DECISIONS_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(decision: &GateDecision) -> String {
        format!(
            "{}-{}-{}.json",
            decision.decided_at.format("%Y%m%dT%H%M%S%.6fZ"),
            decision.kind.as_str(),
            decision.id.simple()
        )
    }

    pub fn append(&self, decision: &GateDecision) -> GateResult<PathBuf> {
        let path = self.dir.join(Self::file_name(decision));
        let bytes = serde_json::to_vec_pretty(decision)?;
        fs::create_dir_all(&self.dir)?;
        fsio::write_new(&path, &bytes)?;
        debug!(path = %path.display(), "decision recorded");
        Ok(path)
    }

    fn names(&self) -> GateResult<Vec<String>> {
        let mut names = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") && !fsio::is_temp_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Up to `limit` most recent decisions, oldest first. Unreadable
    /// records are skipped with a warning.
    pub fn history(&self, limit: usize) -> GateResult<Vec<GateDecision>> {
        let names = self.names()?;
        let start = names.len().saturating_sub(limit);
        let mut out = Vec::with_capacity(names.len() - start);
        for name in &names[start..] {
            let path = self.dir.join(name);
            match fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|b| serde_json::from_slice::<GateDecision>(&b).map_err(|e| e.to_string()))
            {
                Ok(d) => out.push(d),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable decision"),
            }
        }
        Ok(out)
    }

    /// Fraction of the last `window` decisions whose scorer verdict passed.
    /// 1.0 with no history.
    pub fn pass_rate(&self, window: usize) -> GateResult<f64> {
        let recent = self.history(window)?;
        if recent.is_empty() {
            return Ok(1.0);
        }
        let passed = recent.iter().filter(|d| d.passed).count();
        Ok(passed as f64 / recent.len() as f64)
    }

    /// Length of the trailing run of RETRY decisions.
    pub fn consecutive_retries(&self) -> GateResult<u32> {
        let names = self.names()?;
        let suffix = format!("-{}-", DecisionKind::Retry.as_str());
        Ok(names
            .iter()
            .rev()
            .take_while(|n| n.contains(&suffix))
            .count() as u32)
    }

    /// Length of the trailing run of RETRY decisions whose cause escalates.
    ///
    /// The run ends at the first decision that is not such a RETRY, or at a
    /// record that cannot be read.
    pub fn consecutive_escalating_retries(&self) -> GateResult<u32> {
        let names = self.names()?;
        let suffix = format!("-{}-", DecisionKind::Retry.as_str());
        let mut count = 0;
        for name in names.iter().rev().take_while(|n| n.contains(&suffix)) {
            let path = self.dir.join(name);
            let decision = match fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|b| serde_json::from_slice::<GateDecision>(&b).map_err(|e| e.to_string()))
            {
                Ok(d) => d,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable decision ends retry run");
                    break;
                }
            };
            if !decision.retry_cause.is_some_and(|c| c.escalates()) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}
