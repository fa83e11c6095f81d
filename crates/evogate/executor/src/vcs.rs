//! Version-control seam.
//!
//! The gate needs four things from version control: create an immutable
//! baseline tag, find the newest baseline tag, restore the working tree to
//! a tag, and describe what changed since a tag for the audit trail.

use crate::error::VcsError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::debug;

pub trait VersionControl: Send + Sync {
    /// Create an annotated tag on the current state.
    fn create_tag(&self, name: &str, message: &str) -> Result<(), VcsError>;

    /// Newest tag whose name starts with `prefix`.
    fn latest_tag(&self, prefix: &str) -> Result<Option<String>, VcsError>;

    /// Restore the working tree to `name`.
    fn checkout_tag(&self, name: &str) -> Result<(), VcsError>;

    /// Short summary of changes since `since` (or of the current state).
    fn diff_summary(&self, since: Option<&str>) -> Result<String, VcsError>;

    /// One-line descriptions of recent changes, newest first.
    fn recent_changes(&self, since: Option<&str>, limit: usize) -> Result<Vec<String>, VcsError>;
}

impl<T: VersionControl + ?Sized> VersionControl for Arc<T> {
    fn create_tag(&self, name: &str, message: &str) -> Result<(), VcsError> {
        (**self).create_tag(name, message)
    }

    fn latest_tag(&self, prefix: &str) -> Result<Option<String>, VcsError> {
        (**self).latest_tag(prefix)
    }

    fn checkout_tag(&self, name: &str) -> Result<(), VcsError> {
        (**self).checkout_tag(name)
    }

    fn diff_summary(&self, since: Option<&str>) -> Result<String, VcsError> {
        (**self).diff_summary(since)
    }

    fn recent_changes(&self, since: Option<&str>, limit: usize) -> Result<Vec<String>, VcsError> {
        (**self).recent_changes(since, limit)
    }
}

/// `git` on the command line.
#[derive(Debug, Clone)]
pub struct GitVcs {
    repo: PathBuf,
}

impl GitVcs {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    fn git(&self, args: &[&str]) -> Result<String, VcsError> {
        let command = format!("git {}", args.join(" "));
        debug!(repo = %self.repo.display(), %command, "running git");
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .output()
            .map_err(|source| VcsError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for GitVcs {
    fn create_tag(&self, name: &str, message: &str) -> Result<(), VcsError> {
        if self.git(&["rev-parse", "-q", "--verify", &format!("refs/tags/{}", name)]).is_ok() {
            return Err(VcsError::TagExists(name.to_string()));
        }
        self.git(&["tag", "-a", name, "-m", message])?;
        Ok(())
    }

    fn latest_tag(&self, prefix: &str) -> Result<Option<String>, VcsError> {
        // Tag names embed a sortable UTC timestamp, so refname order is
        // creation order.
        let out = self.git(&[
            "tag",
            "--list",
            &format!("{}-*", prefix),
            "--sort=-refname",
        ])?;
        Ok(out.lines().map(str::trim).find(|l| !l.is_empty()).map(str::to_string))
    }

    fn checkout_tag(&self, name: &str) -> Result<(), VcsError> {
        let reference = format!("refs/tags/{}", name);
        if self.git(&["rev-parse", "-q", "--verify", &reference]).is_err() {
            return Err(VcsError::TagNotFound(name.to_string()));
        }
        self.git(&["checkout", "-f", name])?;
        Ok(())
    }

    fn diff_summary(&self, since: Option<&str>) -> Result<String, VcsError> {
        let out = match since {
            Some(tag) => self.git(&["diff", "--stat", tag, "HEAD"])?,
            None => self.git(&["show", "--stat", "--format=", "HEAD"])?,
        };
        Ok(out.trim().to_string())
    }

    fn recent_changes(&self, since: Option<&str>, limit: usize) -> Result<Vec<String>, VcsError> {
        let limit = format!("-n{}", limit.max(1));
        let out = match since {
            Some(tag) => self.git(&["log", "--oneline", &limit, &format!("{}..HEAD", tag)])?,
            None => self.git(&["log", "--oneline", &limit])?,
        };
        Ok(out.lines().map(str::to_string).collect())
    }
}
