use crate::error::VcsError;
use crate::vcs::VersionControl;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

type Snapshot = BTreeMap<String, Vec<u8>>;

/// In-memory version control over a plain directory (for tests and demos).
///
/// A tag is a full copy of every regular file under the working directory
/// (`.git` excluded). Checkout rewrites the tree to match the copy exactly.
pub struct SimulatedVcs {
    workdir: PathBuf,
    tags: Mutex<Vec<(String, Snapshot)>>,
    fail_tags: AtomicBool,
    fail_checkout: AtomicBool,
}

impl SimulatedVcs {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            tags: Mutex::new(Vec::new()),
            fail_tags: AtomicBool::new(false),
            fail_checkout: AtomicBool::new(false),
        }
    }

    /// Make every later `create_tag` fail.
    pub fn fail_tags(&self, fail: bool) {
        self.fail_tags.store(fail, Ordering::SeqCst);
    }

    /// Make every later `checkout_tag` fail.
    pub fn fail_checkout(&self, fail: bool) {
        self.fail_checkout.store(fail, Ordering::SeqCst);
    }

    pub fn tag_names(&self) -> Vec<String> {
        match self.tags.lock() {
            Ok(tags) => tags.iter().map(|(n, _)| n.clone()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn tags(&self) -> Result<std::sync::MutexGuard<'_, Vec<(String, Snapshot)>>, VcsError> {
        self.tags
            .lock()
            .map_err(|_| VcsError::Snapshot("tag table poisoned".into()))
    }

    fn snapshot(&self) -> Result<Snapshot, VcsError> {
        let mut snap = Snapshot::new();
        collect(&self.workdir, &self.workdir, &mut snap)?;
        Ok(snap)
    }
}

fn io_err(e: std::io::Error) -> VcsError {
    VcsError::Snapshot(e.to_string())
}

fn rel(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn collect(root: &Path, dir: &Path, out: &mut Snapshot) -> Result<(), VcsError> {
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let ft = entry.file_type().map_err(io_err)?;
        if ft.is_dir() {
            if entry.file_name() != ".git" {
                collect(root, &path, out)?;
            }
        } else if ft.is_file() {
            out.insert(rel(root, &path), fs::read(&path).map_err(io_err)?);
        }
    }
    Ok(())
}

impl VersionControl for SimulatedVcs {
    fn create_tag(&self, name: &str, _message: &str) -> Result<(), VcsError> {
        if self.fail_tags.load(Ordering::SeqCst) {
            return Err(VcsError::Injected(format!("create_tag {}", name)));
        }
        let snap = self.snapshot()?;
        let mut tags = self.tags()?;
        if tags.iter().any(|(n, _)| n == name) {
            return Err(VcsError::TagExists(name.to_string()));
        }
        tags.push((name.to_string(), snap));
        Ok(())
    }

    fn latest_tag(&self, prefix: &str) -> Result<Option<String>, VcsError> {
        let tags = self.tags()?;
        Ok(tags
            .iter()
            .rev()
            .find(|(n, _)| n.starts_with(prefix))
            .map(|(n, _)| n.clone()))
    }

    fn checkout_tag(&self, name: &str) -> Result<(), VcsError> {
        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(VcsError::Injected(format!("checkout {}", name)));
        }
        let target = {
            let tags = self.tags()?;
            tags.iter()
                .find(|(n, _)| n == name)
                .map(|(_, s)| s.clone())
                .ok_or_else(|| VcsError::TagNotFound(name.to_string()))?
        };
        let current = self.snapshot()?;
        for path in current.keys().filter(|p| !target.contains_key(*p)) {
            fs::remove_file(self.workdir.join(path)).map_err(io_err)?;
        }
        for (path, bytes) in &target {
            if current.get(path) != Some(bytes) {
                let full = self.workdir.join(path);
                if let Some(parent) = full.parent() {
                    fs::create_dir_all(parent).map_err(io_err)?;
                }
                fs::write(&full, bytes).map_err(io_err)?;
            }
        }
        Ok(())
    }

    fn diff_summary(&self, since: Option<&str>) -> Result<String, VcsError> {
        let current = self.snapshot()?;
        let Some(since) = since else {
            return Ok(format!("{} files (initial baseline)", current.len()));
        };
        let base = {
            let tags = self.tags()?;
            tags.iter()
                .find(|(n, _)| n == since)
                .map(|(_, s)| s.clone())
                .ok_or_else(|| VcsError::TagNotFound(since.to_string()))?
        };
        let changed = current
            .iter()
            .filter(|(p, b)| base.get(*p) != Some(*b))
            .count();
        let removed = base.keys().filter(|p| !current.contains_key(*p)).count();
        Ok(format!("{} files changed, {} removed", changed, removed))
    }

    fn recent_changes(&self, since: Option<&str>, limit: usize) -> Result<Vec<String>, VcsError> {
        let tags = self.tags()?;
        let start = match since {
            Some(s) => tags.iter().position(|(n, _)| n == s).map(|i| i + 1).unwrap_or(0),
            None => 0,
        };
        Ok(tags[start..]
            .iter()
            .rev()
            .take(limit)
            .map(|(n, _)| format!("tag {}", n))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_restores_exact_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a"), "1").unwrap();
        fs::write(dir.path().join("b"), "2").unwrap();
        let vcs = SimulatedVcs::new(dir.path());
        vcs.create_tag("t-1", "").unwrap();

        fs::write(dir.path().join("src/a"), "changed").unwrap();
        fs::remove_file(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("c"), "new").unwrap();

        vcs.checkout_tag("t-1").unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("src/a")).unwrap(), "1");
        assert_eq!(fs::read_to_string(dir.path().join("b")).unwrap(), "2");
        assert!(!dir.path().join("c").exists());
    }

    #[test]
    fn latest_tag_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = SimulatedVcs::new(dir.path());
        vcs.create_tag("stable-1", "").unwrap();
        vcs.create_tag("other-1", "").unwrap();
        vcs.create_tag("stable-2", "").unwrap();
        assert_eq!(vcs.latest_tag("stable").unwrap().as_deref(), Some("stable-2"));
        assert_eq!(vcs.latest_tag("none").unwrap(), None);
        assert!(matches!(vcs.create_tag("stable-2", ""), Err(VcsError::TagExists(_))));
    }

    #[test]
    fn injected_failures() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = SimulatedVcs::new(dir.path());
        vcs.fail_tags(true);
        assert!(vcs.create_tag("x", "").is_err());
        vcs.fail_tags(false);
        vcs.create_tag("x", "").unwrap();
        vcs.fail_checkout(true);
        assert!(vcs.checkout_tag("x").is_err());
    }

    #[test]
    fn audit_helpers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f"), "1").unwrap();
        let vcs = SimulatedVcs::new(dir.path());
        vcs.create_tag("t-1", "").unwrap();
        fs::write(dir.path().join("f"), "2").unwrap();
        assert_eq!(vcs.diff_summary(Some("t-1")).unwrap(), "1 files changed, 0 removed");
        vcs.create_tag("t-2", "").unwrap();
        assert_eq!(vcs.recent_changes(Some("t-1"), 10).unwrap(), vec!["tag t-2"]);
    }
}
