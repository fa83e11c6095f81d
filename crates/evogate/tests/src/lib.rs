//! Shared fixtures for the evogate integration suites.

use evogate_evidence::{EvidenceStore, StoreConfig};
use evogate_executor::{GateConfig, GateExecutor, SimulatedVcs};
use evogate_scorer::PromotionScorer;
use evogate_types::MetricsVector;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A store root, a working tree under simulated version control, and a
/// scratch directory for pipeline inputs (event log, manifests).
pub struct Fixture {
    pub store_dir: TempDir,
    pub work_dir: TempDir,
    pub inputs_dir: TempDir,
    pub vcs: Arc<SimulatedVcs>,
}

impl Fixture {
    pub fn new() -> Self {
        let store_dir = tempfile::tempdir().expect("store dir");
        let work_dir = tempfile::tempdir().expect("work dir");
        let inputs_dir = tempfile::tempdir().expect("inputs dir");
        let vcs = Arc::new(SimulatedVcs::new(work_dir.path()));
        Self {
            store_dir,
            work_dir,
            inputs_dir,
            vcs,
        }
    }

    pub fn work(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn event_log(&self) -> PathBuf {
        self.inputs_dir.path().join("events.jsonl")
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.store_dir.path()).with_event_log(self.event_log())
    }

    pub fn store(&self) -> EvidenceStore {
        EvidenceStore::open(self.store_config()).expect("open store")
    }

    pub fn gate(&self, store: EvidenceStore, config: GateConfig) -> GateExecutor {
        GateExecutor::new(
            config,
            store,
            PromotionScorer::default(),
            Box::new(self.vcs.clone()),
        )
        .expect("gate config")
    }

    pub fn write_work_file(&self, rel: &str, body: &str) {
        let path = self.work().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, body).expect("write work file");
    }

    pub fn write_events(&self, lines: &[String]) {
        let mut body = lines.join("\n");
        body.push('\n');
        fs::write(self.event_log(), body).expect("write event log");
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// `pairs` A/B sample pairs where B exceeds A by about `shift`.
pub fn ab_events(pairs: usize, shift: f64) -> Vec<String> {
    let mut out = Vec::with_capacity(pairs * 2);
    for i in 0..pairs {
        let base = (i % 7) as f64 * 0.05;
        let jitter = if i % 2 == 0 { 0.01 } else { -0.01 };
        out.push(format!(
            r#"{{"kind":"ab_sample","pair_id":"s{}","variant":"a","value":{}}}"#,
            i, base
        ));
        out.push(format!(
            r#"{{"kind":"ab_sample","pair_id":"s{}","variant":"b","value":{}}}"#,
            i,
            base + shift + jitter
        ));
    }
    out
}

/// The reference session: scores about 0.76 and passes every limit.
pub fn healthy_metrics() -> MetricsVector {
    MetricsVector {
        accuracy: 0.80,
        hallucination_rate: 0.03,
        regression_rate: 0.0,
        latency_z: 0.1,
        cost_efficiency: 0.9,
        recall: 0.85,
        ..Default::default()
    }
}

/// Healthy except for a hallucination rate over its ceiling.
pub fn hallucinating_metrics() -> MetricsVector {
    MetricsVector {
        accuracy: 1.0,
        recall: 1.0,
        hallucination_rate: 0.12,
        ..healthy_metrics()
    }
}
