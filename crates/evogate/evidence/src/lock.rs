//! Exclusive lock files.
//!
//! A lock is a file created with create-new semantics that records the
//! holder's pid and acquisition time. A process that finds the lock held
//! does not wait: it gets [`LockAttempt::Busy`] and treats the cycle as a
//! no-op. A lock older than the stale limit is reclaimed once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub purpose: String,
    pub acquired_at: DateTime<Utc>,
}

/// Outcome of a non-blocking acquisition.
#[derive(Debug)]
pub enum LockAttempt {
    Acquired(FileLock),
    /// Held by someone else; holder details when the lock file was readable.
    Busy(Option<LockHolder>),
}

/// Held lock; the file is removed on drop.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn try_acquire(path: &Path, purpose: &str, stale_after: Duration) -> io::Result<LockAttempt> {
        for attempt in 0..2 {
            let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    let holder = read_holder(path);
                    if attempt == 0 && is_stale(path, holder.as_ref(), stale_after) {
                        warn!(
                            lock = %path.display(),
                            holder_pid = holder.as_ref().map(|h| h.pid),
                            "reclaiming stale lock"
                        );
                        match fs::remove_file(path) {
                            Ok(()) => continue,
                            Err(e) if e.kind() == ErrorKind::NotFound => continue,
                            Err(e) => return Err(e),
                        }
                    }
                    return Ok(LockAttempt::Busy(holder));
                }
                Err(err) => return Err(err),
            };

            let holder = LockHolder {
                pid: std::process::id(),
                purpose: purpose.to_string(),
                acquired_at: Utc::now(),
            };
            let body = serde_json::to_vec(&holder).map_err(io::Error::other)?;
            let written = file.write_all(&body).and_then(|_| file.sync_all());
            if let Err(err) = written {
                let _ = fs::remove_file(path);
                return Err(err);
            }
            debug!(lock = %path.display(), purpose, "lock acquired");
            return Ok(LockAttempt::Acquired(FileLock {
                path: path.to_path_buf(),
            }));
        }
        Ok(LockAttempt::Busy(read_holder(path)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                warn!(lock = %self.path.display(), error = %err, "failed to release lock");
            }
        }
    }
}

fn read_holder(path: &Path) -> Option<LockHolder> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn is_stale(path: &Path, holder: Option<&LockHolder>, stale_after: Duration) -> bool {
    if stale_after.is_zero() {
        return false;
    }
    let age = match holder {
        Some(h) => (Utc::now() - h.acquired_at).to_std().unwrap_or(Duration::ZERO),
        // Unreadable body (e.g. writer died mid-write): fall back to mtime.
        None => fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.elapsed().ok())
            .unwrap_or(Duration::ZERO),
    };
    age >= stale_after
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn second_acquire_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.lock");
        let first = FileLock::try_acquire(&path, "gate", HOUR).unwrap();
        assert!(matches!(first, LockAttempt::Acquired(_)));
        match FileLock::try_acquire(&path, "gate", HOUR).unwrap() {
            LockAttempt::Busy(Some(holder)) => {
                assert_eq!(holder.pid, std::process::id());
                assert_eq!(holder.purpose, "gate");
            }
            other => panic!("expected busy, got {:?}", other),
        }
    }

    #[test]
    fn drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.lock");
        {
            let _held = FileLock::try_acquire(&path, "gate", HOUR).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
        assert!(matches!(
            FileLock::try_acquire(&path, "gate", HOUR).unwrap(),
            LockAttempt::Acquired(_)
        ));
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.lock");
        let old = LockHolder {
            pid: 1,
            purpose: "gate".into(),
            acquired_at: Utc::now() - chrono::Duration::hours(2),
        };
        fs::write(&path, serde_json::to_vec(&old).unwrap()).unwrap();
        match FileLock::try_acquire(&path, "gate", HOUR).unwrap() {
            LockAttempt::Acquired(lock) => {
                let holder = read_holder(lock.path()).unwrap();
                assert_eq!(holder.pid, std::process::id());
            }
            other => panic!("expected reclaim, got {:?}", other),
        }
    }

    #[test]
    fn fresh_foreign_lock_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.lock");
        fs::write(&path, b"garbage").unwrap();
        assert!(matches!(
            FileLock::try_acquire(&path, "gate", HOUR).unwrap(),
            LockAttempt::Busy(None)
        ));
        assert!(path.exists());
    }
}
