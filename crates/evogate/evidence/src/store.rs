//! On-disk evidence store.
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/
//!   <bundle-id>/            one directory per cycle, sealed by MANIFEST.sha256
//!   latest -> <bundle-id>   symlink to the newest sealed bundle
//!   eval_latency.json       recent evaluation runtimes
//! ```
//!
//! Other entries in the root (decision ledger, lock and state files) are
//! ignored because their names do not parse as bundle ids.

use crate::backoff::Backoff;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::evaluator::{BundleEvaluator, EvaluationInput};
use crate::fsio::{self, with_retries};
use crate::latency::LatencyHistory;
use crate::lock::{FileLock, LockAttempt};
use crate::tail::read_tail;
use chrono::{DateTime, Utc};
use evogate_types::{
    BundleId, Digest, Drift, EvaluationArtifact, EvaluationStatus, Manifest, MetricsVector,
    PairingDiagnostics, Uniformity,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const BUNDLE_META_FILE: &str = "bundle.json";
pub const ANCHOR_FILE: &str = "anchor.sha256";
pub const STATE_FILE: &str = "state.sha256";
pub const METRICS_FILE: &str = "metrics.json";
pub const EVENTS_FILE: &str = "events.jsonl";
pub const ARTIFACT_FILE: &str = "evaluation.prom";
pub const MANIFEST_FILE: &str = "MANIFEST.sha256";
pub const FAILURE_REPORT_FILE: &str = "failure_report.json";

const LATEST_LINK: &str = "latest";
#[cfg(not(unix))]
const LATEST_FILE: &str = "LATEST";
const LATENCY_FILE: &str = "eval_latency.json";
const STATE_LOCK: &str = "state.lock";
const STATE_LOCK_STALE: Duration = Duration::from_secs(60);
/// Held from sealing until `latest` has moved, so pointer order is seal order.
const SEAL_LOCK: &str = "seal.lock";
const SEAL_LOCK_STALE: Duration = Duration::from_secs(60);

/// Files that may be added to a bundle after it is sealed.
const POST_SEAL_FILES: &[&str] = &[FAILURE_REPORT_FILE];
/// Never part of the self-manifest.
const SEAL_EXCLUDES: &[&str] = &[MANIFEST_FILE, FAILURE_REPORT_FILE];
const ID_ATTEMPTS: u32 = 8;

/// `bundle.json`: what went into the bundle and from where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMeta {
    pub id: BundleId,
    pub created_at: DateTime<Utc>,
    pub anchor_source: Option<PathBuf>,
    pub anchor_copied: bool,
    pub state_source: Option<PathBuf>,
    pub state_copied: bool,
    pub metrics_source: Option<PathBuf>,
    pub metrics_copied: bool,
    pub event_log: Option<PathBuf>,
    pub events_extracted: usize,
    pub events_skipped: usize,
}

/// Evidence bundles on local disk.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    config: StoreConfig,
}

impl EvidenceStore {
    /// Open (creating if needed) the store root.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.root)?;
        Ok(Self { config })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn bundle_dir(&self, id: &BundleId) -> PathBuf {
        self.config.root.join(id.as_str())
    }

    pub fn is_sealed(&self, id: &BundleId) -> bool {
        self.bundle_dir(id).join(MANIFEST_FILE).is_file()
    }

    /// Create, evaluate, and seal one bundle, blocking on evaluation.
    pub fn create_bundle(&self, evaluator: &dyn BundleEvaluator) -> StoreResult<BundleId> {
        let input = self.prepare(evaluator.uniformity_window())?;
        let id = input.bundle_id.clone();

        let started = Instant::now();
        let artifact = run_evaluator(evaluator, &input);
        self.record_latency(started.elapsed());

        self.finish(&id, &artifact)?;
        Ok(id)
    }

    /// Like [`Self::create_bundle`], with evaluation bounded by the adaptive
    /// timeout.
    ///
    /// On timeout the bundle is sealed with a `timeout` artifact and the
    /// evaluation keeps running in the background; its result is logged
    /// and discarded because the bundle can no longer be written.
    pub async fn create_bundle_async(
        &self,
        evaluator: Arc<dyn BundleEvaluator>,
    ) -> StoreResult<BundleId> {
        let window = evaluator.uniformity_window();
        let store = self.clone();
        let input = tokio::task::spawn_blocking(move || store.prepare(window))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))??;
        let id = input.bundle_id.clone();
        let seen = input.events.len() as u64;

        let timeout = self.eval_timeout();
        let started = Instant::now();
        let eval = Arc::clone(&evaluator);
        let mut handle = tokio::task::spawn_blocking(move || run_evaluator(eval.as_ref(), &input));

        let artifact = match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(artifact)) => {
                let store = self.clone();
                let elapsed = started.elapsed();
                let _ = tokio::task::spawn_blocking(move || store.record_latency(elapsed)).await;
                artifact
            }
            Ok(Err(join)) => EvaluationArtifact::shortfall(
                id.clone(),
                EvaluationStatus::EvaluatorError,
                PairingDiagnostics {
                    seen,
                    ..Default::default()
                },
                Uniformity::default(),
                Some(format!("evaluation task failed: {}", join)),
            ),
            Err(_) => {
                warn!(
                    bundle = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    "evaluation timed out, sealing with timeout artifact"
                );
                let store = self.clone();
                let late_id = id.clone();
                tokio::spawn(async move {
                    let result = handle.await;
                    let elapsed = started.elapsed();
                    let _ =
                        tokio::task::spawn_blocking(move || store.record_latency(elapsed)).await;
                    match result {
                        Ok(late) => warn!(
                            bundle = %late_id,
                            status = %late.status,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "late evaluation result discarded, bundle already sealed"
                        ),
                        Err(e) => warn!(bundle = %late_id, error = %e, "late evaluation task failed"),
                    }
                });
                EvaluationArtifact::shortfall(
                    id.clone(),
                    EvaluationStatus::Timeout,
                    PairingDiagnostics {
                        seen,
                        ..Default::default()
                    },
                    Uniformity::default(),
                    Some(format!("evaluation exceeded {} ms", timeout.as_millis())),
                )
            }
        };

        let store = self.clone();
        let finish_id = id.clone();
        tokio::task::spawn_blocking(move || store.finish(&finish_id, &artifact))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))??;
        Ok(id)
    }

    /// Timeout the next async evaluation gets.
    pub fn eval_timeout(&self) -> Duration {
        self.load_latency().timeout(&self.config.adaptive_timeout)
    }

    /// Allocate the bundle and write every input file. Returns the input
    /// the evaluator runs on.
    fn prepare(&self, uniformity_window: usize) -> StoreResult<EvaluationInput> {
        let (id, dir) = self.allocate()?;
        let cfg = &self.config;

        let anchor_copied = self.copy_optional(cfg.anchor_manifest.as_deref(), &dir, ANCHOR_FILE)?;
        let state_copied = self.copy_optional(cfg.state_manifest.as_deref(), &dir, STATE_FILE)?;
        let metrics_copied = self.copy_metrics(&dir)?;

        let tail = match cfg.event_log.as_deref() {
            Some(path) => read_tail(path, cfg.tail_lines).unwrap_or_else(|e| {
                warn!(log = %path.display(), error = %e, "event log unreadable, extracting nothing");
                Default::default()
            }),
            None => Default::default(),
        };
        let mut events_body = tail.lines.join("\n");
        if !events_body.is_empty() {
            events_body.push('\n');
        }
        self.write_file(&dir, EVENTS_FILE, events_body.as_bytes())?;

        let meta = BundleMeta {
            id: id.clone(),
            created_at: id.created_at(),
            anchor_source: cfg.anchor_manifest.clone(),
            anchor_copied,
            state_source: cfg.state_manifest.clone(),
            state_copied,
            metrics_source: cfg.metrics_source.clone(),
            metrics_copied,
            event_log: cfg.event_log.clone(),
            events_extracted: tail.lines.len(),
            events_skipped: tail.skipped,
        };
        self.write_file(&dir, BUNDLE_META_FILE, &serde_json::to_vec_pretty(&meta)?)?;

        let prior_p_values = self.recent_p_values(uniformity_window, &id)?;
        debug!(bundle = %id, events = tail.lines.len(), prior = prior_p_values.len(), "bundle prepared");

        Ok(EvaluationInput {
            bundle_id: id,
            events: tail.lines,
            prior_p_values,
        })
    }

    /// Write the artifact, seal, and repoint `latest`.
    fn finish(&self, id: &BundleId, artifact: &EvaluationArtifact) -> StoreResult<()> {
        self.write_bundle_file(id, ARTIFACT_FILE, artifact.to_exposition().as_bytes())?;
        let _lock = self.acquire_seal_lock(id)?;
        let digest = self.seal(id)?;
        self.point_latest(id)?;
        info!(
            bundle = %id,
            status = %artifact.status,
            samples = artifact.sample_count,
            manifest = %digest,
            "evidence bundle sealed"
        );
        Ok(())
    }

    /// Wait for the seal lock, bounded by `seal_wait`.
    fn acquire_seal_lock(&self, id: &BundleId) -> StoreResult<FileLock> {
        let path = self.root().join(SEAL_LOCK);
        let attempt = || match FileLock::try_acquire(&path, "seal", SEAL_LOCK_STALE) {
            Ok(LockAttempt::Acquired(lock)) => Some(Ok(lock)),
            Ok(LockAttempt::Busy(_)) => None,
            Err(e) => Some(Err(e)),
        };
        match self.config.seal_wait.retry(attempt) {
            Some(lock) => Ok(lock?),
            None => {
                warn!(bundle = %id, "seal lock still busy, giving up");
                Err(StoreError::SealLockBusy(id.clone()))
            }
        }
    }

    fn allocate(&self) -> StoreResult<(BundleId, PathBuf)> {
        for _ in 0..ID_ATTEMPTS {
            let id = BundleId::generate(Utc::now());
            let dir = self.bundle_dir(&id);
            match with_retries(self.config.write_retries, "create bundle dir", || {
                fs::create_dir(&dir)
            }) {
                Ok(()) => {
                    fsio::sync_directory(self.root())?;
                    return Ok((id, dir));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(bundle = %id, "bundle id collision, redrawing");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::IdExhausted(ID_ATTEMPTS))
    }

    fn write_file(&self, dir: &Path, name: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = dir.join(name);
        with_retries(self.config.write_retries, name, || fsio::write_atomic(&path, bytes))?;
        Ok(())
    }

    /// Atomically write a file into an unsealed bundle.
    pub fn write_bundle_file(&self, id: &BundleId, name: &str, bytes: &[u8]) -> StoreResult<()> {
        let dir = self.bundle_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::BundleNotFound(id.clone()));
        }
        if self.is_sealed(id) {
            return Err(StoreError::Sealed(id.clone()));
        }
        self.write_file(&dir, name, bytes)
    }

    /// Best-effort copy; a missing or unreadable source is not an error.
    fn copy_optional(&self, source: Option<&Path>, dir: &Path, name: &str) -> StoreResult<bool> {
        let Some(source) = source else {
            return Ok(false);
        };
        let bytes = match fs::read(source) {
            Ok(b) => b,
            Err(e) => {
                if e.kind() == ErrorKind::NotFound {
                    info!(source = %source.display(), "manifest source missing, not copied");
                } else {
                    warn!(source = %source.display(), error = %e, "manifest source unreadable, not copied");
                }
                return Ok(false);
            }
        };
        if let Err(e) = Manifest::parse(&String::from_utf8_lossy(&bytes)) {
            warn!(source = %source.display(), error = %e, "copying manifest that does not parse");
        }
        self.write_file(dir, name, &bytes)?;
        Ok(true)
    }

    fn copy_metrics(&self, dir: &Path) -> StoreResult<bool> {
        let Some(source) = self.config.metrics_source.as_deref() else {
            return Ok(false);
        };
        let bytes = match fs::read(source) {
            Ok(b) => b,
            Err(e) => {
                debug!(source = %source.display(), error = %e, "metrics source not copied");
                return Ok(false);
            }
        };
        if let Err(e) = serde_json::from_slice::<MetricsVector>(&bytes) {
            warn!(source = %source.display(), error = %e, "metrics source is not a metrics vector, not copied");
            return Ok(false);
        }
        self.write_file(dir, METRICS_FILE, &bytes)?;
        Ok(true)
    }

    /// Write the self-manifest and make the bundle read-only.
    ///
    /// Idempotent: sealing an already sealed, untouched bundle changes
    /// nothing and returns the same digest. A sealed bundle whose files no
    /// longer match its manifest yields [`StoreError::Tampered`].
    pub fn seal(&self, id: &BundleId) -> StoreResult<Digest> {
        let dir = self.bundle_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::BundleNotFound(id.clone()));
        }
        let manifest_path = dir.join(MANIFEST_FILE);

        if !manifest_path.exists() {
            remove_temp_files(&dir)?;
        }
        let manifest = Manifest::from_dir(&dir, SEAL_EXCLUDES)?;
        let rendered = manifest.render();

        match fs::read_to_string(&manifest_path) {
            Ok(existing) => return self.compare_seal(id, &existing, &manifest),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        match with_retries(self.config.write_retries, MANIFEST_FILE, || {
            fsio::write_new(&manifest_path, rendered.as_bytes())
        }) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let existing = fs::read_to_string(&manifest_path)?;
                return self.compare_seal(id, &existing, &manifest);
            }
            Err(e) => return Err(e.into()),
        }

        for entry in manifest.entries() {
            fsio::make_read_only(&dir.join(&entry.path))?;
        }
        fsio::make_read_only(&manifest_path)?;
        fsio::sync_directory(&dir)?;
        Ok(manifest.digest())
    }

    fn compare_seal(&self, id: &BundleId, existing: &str, actual: &Manifest) -> StoreResult<Digest> {
        let recorded = Manifest::parse(existing)?;
        let drift = without_temp_files(recorded.diff(actual));
        if drift.is_empty() {
            debug!(bundle = %id, "bundle already sealed");
            Ok(recorded.digest())
        } else {
            Err(StoreError::Tampered {
                id: id.clone(),
                drift,
            })
        }
    }

    /// Recompute the self-manifest of a sealed bundle.
    pub fn verify(&self, id: &BundleId) -> StoreResult<Digest> {
        let dir = self.bundle_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::BundleNotFound(id.clone()));
        }
        let existing = match fs::read_to_string(dir.join(MANIFEST_FILE)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotSealed(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let actual = Manifest::from_dir(&dir, SEAL_EXCLUDES)?;
        self.compare_seal(id, &existing, &actual)
    }

    #[cfg(unix)]
    fn point_latest(&self, id: &BundleId) -> StoreResult<()> {
        let root = self.root();
        let tmp = root.join(format!(".{}.tmp.{}", LATEST_LINK, uuid::Uuid::new_v4().simple()));
        std::os::unix::fs::symlink(id.as_str(), &tmp)?;
        if let Err(e) = fs::rename(&tmp, root.join(LATEST_LINK)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        fsio::sync_directory(root)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn point_latest(&self, id: &BundleId) -> StoreResult<()> {
        fsio::write_atomic(&self.root().join(LATEST_FILE), id.as_str().as_bytes())?;
        Ok(())
    }

    /// Bundle the `latest` pointer references, if any.
    #[cfg(unix)]
    pub fn latest(&self) -> StoreResult<Option<BundleId>> {
        match fs::read_link(self.root().join(LATEST_LINK)) {
            Ok(target) => {
                let name = target
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(Some(BundleId::parse(&name)?))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(not(unix))]
    pub fn latest(&self) -> StoreResult<Option<BundleId>> {
        match fs::read_to_string(self.root().join(LATEST_FILE)) {
            Ok(text) => Ok(Some(BundleId::parse(text.trim())?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a CLI argument: a bundle id or the word `latest`.
    pub fn resolve(&self, reference: &str) -> StoreResult<BundleId> {
        if reference == LATEST_LINK {
            self.latest()?.ok_or(StoreError::NoBundles)
        } else {
            Ok(BundleId::parse(reference)?)
        }
    }

    /// Sealed bundles, oldest first.
    pub fn list(&self) -> StoreResult<Vec<BundleId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(self.root())? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            if let Ok(id) = BundleId::parse(&name.to_string_lossy()) {
                if self.is_sealed(&id) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn read_meta(&self, id: &BundleId) -> StoreResult<BundleMeta> {
        let bytes = self.read_bundle_file(id, BUNDLE_META_FILE)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// The metrics vector copied into the bundle, if one was.
    pub fn read_metrics(&self, id: &BundleId) -> StoreResult<Option<MetricsVector>> {
        match fs::read(self.bundle_dir(id).join(METRICS_FILE)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse the bundle's evaluation artifact.
    pub fn read_artifact(&self, id: &BundleId) -> StoreResult<EvaluationArtifact> {
        let dir = self.bundle_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::BundleNotFound(id.clone()));
        }
        let text = match fs::read_to_string(dir.join(ARTIFACT_FILE)) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::ArtifactUnavailable(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(EvaluationArtifact::parse(&text)?)
    }

    /// Rebuild the evaluator input of an existing bundle, for re-running
    /// evaluation without writing anything.
    pub fn evaluation_input(&self, id: &BundleId, window: usize) -> StoreResult<EvaluationInput> {
        let bytes = self.read_bundle_file(id, EVENTS_FILE)?;
        let events = String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        Ok(EvaluationInput {
            bundle_id: id.clone(),
            events,
            prior_p_values: self.recent_p_values(window, id)?,
        })
    }

    /// Poll for the artifact of a bundle that may still be in flight.
    pub fn wait_for_artifact(
        &self,
        id: &BundleId,
        backoff: &Backoff,
    ) -> StoreResult<EvaluationArtifact> {
        backoff
            .retry(|| self.read_artifact(id).ok())
            .ok_or_else(|| StoreError::ArtifactUnavailable(id.clone()))
    }

    /// p-values of up to `window` sealed bundles older than `before`,
    /// oldest first. Bundles without a usable statistic are skipped.
    pub fn recent_p_values(&self, window: usize, before: &BundleId) -> StoreResult<Vec<f64>> {
        if window == 0 {
            return Ok(Vec::new());
        }
        let ids: Vec<BundleId> = self.list()?.into_iter().filter(|id| id < before).collect();
        let mut values = Vec::new();
        for id in ids.iter().rev() {
            if values.len() >= window {
                break;
            }
            match self.read_artifact(id) {
                Ok(artifact) => {
                    if let (true, Some(p)) = (artifact.is_usable(), artifact.p_value) {
                        values.push(p);
                    }
                }
                Err(e) => debug!(bundle = %id, error = %e, "skipping unreadable artifact"),
            }
        }
        values.reverse();
        Ok(values)
    }

    /// Add a file to a sealed bundle without touching the sealed set.
    ///
    /// Only names reserved for post-seal records are accepted, and an
    /// existing file is never overwritten.
    pub fn write_post_seal(&self, id: &BundleId, name: &str, bytes: &[u8]) -> StoreResult<PathBuf> {
        if !POST_SEAL_FILES.contains(&name) {
            return Err(StoreError::InvalidFileName(name.to_string()));
        }
        let dir = self.bundle_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::BundleNotFound(id.clone()));
        }
        if !self.is_sealed(id) {
            return Err(StoreError::NotSealed(id.clone()));
        }
        let path = dir.join(name);
        with_retries(self.config.write_retries, name, || fsio::write_new(&path, bytes))?;
        fsio::make_read_only(&path)?;
        Ok(path)
    }

    fn read_bundle_file(&self, id: &BundleId, name: &str) -> StoreResult<Vec<u8>> {
        let dir = self.bundle_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::BundleNotFound(id.clone()));
        }
        Ok(fs::read(dir.join(name))?)
    }

    fn load_latency(&self) -> LatencyHistory {
        match fs::read(self.root().join(LATENCY_FILE)) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "latency history corrupt, starting fresh");
                LatencyHistory::new()
            }),
            Err(_) => LatencyHistory::new(),
        }
    }

    /// Append a runtime to the latency history. Skipped when another
    /// process holds the state lock; failures are logged only.
    fn record_latency(&self, runtime: Duration) {
        let lock_path = self.root().join(STATE_LOCK);
        let _lock = match FileLock::try_acquire(&lock_path, "latency", STATE_LOCK_STALE) {
            Ok(LockAttempt::Acquired(lock)) => lock,
            Ok(LockAttempt::Busy(_)) => {
                debug!("state lock busy, latency sample dropped");
                return;
            }
            Err(e) => {
                warn!(error = %e, "state lock unavailable, latency sample dropped");
                return;
            }
        };
        let mut history = self.load_latency();
        history.record(runtime, self.config.adaptive_timeout.history);
        let written = serde_json::to_vec(&history)
            .map_err(std::io::Error::other)
            .and_then(|body| fsio::write_atomic(&self.root().join(LATENCY_FILE), &body));
        if let Err(e) = written {
            warn!(error = %e, "failed to persist latency history");
        }
    }
}

/// Run the evaluator, turning errors and panics into an `evaluator_error`
/// artifact. Never fails.
fn run_evaluator(evaluator: &dyn BundleEvaluator, input: &EvaluationInput) -> EvaluationArtifact {
    let failure = |detail: String| {
        warn!(bundle = %input.bundle_id, error = %detail, "evaluation failed, recording zero-sample artifact");
        EvaluationArtifact::shortfall(
            input.bundle_id.clone(),
            EvaluationStatus::EvaluatorError,
            PairingDiagnostics {
                seen: input.events.len() as u64,
                ..Default::default()
            },
            Uniformity::default(),
            Some(detail),
        )
    };
    match panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(input))) {
        Ok(Ok(artifact)) if artifact.bundle_id == input.bundle_id => artifact,
        Ok(Ok(artifact)) => failure(format!(
            "evaluator answered for bundle {} instead",
            artifact.bundle_id
        )),
        Ok(Err(e)) => failure(e.to_string()),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            failure(format!("evaluator panicked: {}", msg))
        }
    }
}

fn remove_temp_files(dir: &Path) -> StoreResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if fsio::is_temp_name(&name.to_string_lossy()) {
            debug!(file = %entry.path().display(), "removing leftover temp file");
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn without_temp_files(drift: Vec<Drift>) -> Vec<Drift> {
    drift
        .into_iter()
        .filter(|d| !matches!(d, Drift::Unexpected(p) if fsio::is_temp_name(p)))
        .collect()
}
