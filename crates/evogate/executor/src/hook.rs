//! Recovery hook run after a ROLLBACK.
//!
//! The hook's outcome is logged and recorded but never changes the
//! decision.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Exited(Option<i32>),
    TimedOut,
    SpawnFailed(String),
}

impl HookOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Exited(Some(0)))
    }
}

pub trait RecoveryHook: Send + Sync {
    fn invoke(&self) -> HookOutcome;
}

/// External executable run with no arguments.
#[derive(Debug, Clone)]
pub struct ScriptHook {
    path: PathBuf,
    timeout: Duration,
}

impl ScriptHook {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecoveryHook for ScriptHook {
    fn invoke(&self) -> HookOutcome {
        let mut child = match Command::new(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(hook = %self.path.display(), error = %e, "recovery hook failed to start");
                return HookOutcome::SpawnFailed(e.to_string());
            }
        };
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!(hook = %self.path.display(), code = ?status.code(), "recovery hook exited");
                    return HookOutcome::Exited(status.code());
                }
                Ok(None) if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!(hook = %self.path.display(), timeout_ms = self.timeout.as_millis() as u64, "recovery hook timed out");
                    return HookOutcome::TimedOut;
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    warn!(hook = %self.path.display(), error = %e, "lost track of recovery hook");
                    return HookOutcome::SpawnFailed(e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_spawn_failure() {
        let hook = ScriptHook::new("/nonexistent/evogate-hook", Duration::from_secs(1));
        assert!(matches!(hook.invoke(), HookOutcome::SpawnFailed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn exit_codes_and_timeout() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = |name: &str, body: &str| {
            let p = dir.path().join(name);
            std::fs::write(&p, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&p, std::fs::Permissions::from_mode(0o755)).unwrap();
            p
        };
        let ok = ScriptHook::new(script("ok.sh", "exit 0"), Duration::from_secs(5));
        assert!(ok.invoke().succeeded());
        let bad = ScriptHook::new(script("bad.sh", "exit 7"), Duration::from_secs(5));
        assert_eq!(bad.invoke(), HookOutcome::Exited(Some(7)));
        let slow = ScriptHook::new(script("slow.sh", "sleep 5"), Duration::from_millis(100));
        assert_eq!(slow.invoke(), HookOutcome::TimedOut);
    }
}
