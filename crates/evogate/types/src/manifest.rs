//! Hash-list manifests in `sha256sum` text form.
//!
//! A manifest is the ordered list of `(relative path, digest)` pairs for a
//! set of files. Anchor and state manifests are produced by the pipeline;
//! the bundle self-manifest (`MANIFEST.sha256`) is produced at seal time.

use crate::digest::Digest;
use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory names never descended into when hashing a tree.
const SKIPPED_DIRS: &[&str] = &[".git"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Relative path with `/` separators.
    pub path: String,
    pub digest: Digest,
}

/// Difference between a manifest and the files on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Drift {
    /// Listed in the manifest, absent on disk.
    Missing(String),
    /// Present on both sides with different content.
    Modified {
        path: String,
        expected: Digest,
        actual: Digest,
    },
    /// On disk but not in the manifest.
    Unexpected(String),
}

impl Drift {
    pub fn path(&self) -> &str {
        match self {
            Self::Missing(p) | Self::Unexpected(p) => p,
            Self::Modified { path, .. } => path,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    entries: BTreeMap<String, Digest>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, digest: Digest) {
        self.entries.insert(path.into(), digest);
    }

    pub fn get(&self, path: &str) -> Option<&Digest> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = ManifestEntry> + '_ {
        self.entries.iter().map(|(path, digest)| ManifestEntry {
            path: path.clone(),
            digest: *digest,
        })
    }

    /// Render as `sha256sum` text: `<hex>  <path>\n`, sorted by path.
    ///
    /// Rendering is deterministic, so the same set of files always yields
    /// byte-identical output.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.entries.len() * 80);
        for (path, digest) in &self.entries {
            out.push_str(&digest.to_hex());
            out.push_str("  ");
            out.push_str(path);
            out.push('\n');
        }
        out
    }

    /// Parse `sha256sum` text. Blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, TypesError> {
        let mut manifest = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (hex, path) = line.split_once("  ").ok_or_else(|| {
                TypesError::Manifest(format!("line {}: expected '<digest>  <path>'", lineno + 1))
            })?;
            let digest = Digest::from_hex(hex)
                .map_err(|e| TypesError::Manifest(format!("line {}: {}", lineno + 1, e)))?;
            if path.is_empty() {
                return Err(TypesError::Manifest(format!("line {}: empty path", lineno + 1)));
            }
            manifest.insert(path, digest);
        }
        Ok(manifest)
    }

    /// Digest of the rendered manifest text.
    pub fn digest(&self) -> Digest {
        Digest::of(self.render().as_bytes())
    }

    /// Hash every regular file under `root`, skipping `.git` and any
    /// top-level entry whose name is in `exclude`. Symlinks are not followed.
    pub fn from_dir(root: &Path, exclude: &[&str]) -> Result<Self, TypesError> {
        let mut manifest = Self::new();
        let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                let name = entry.file_name();
                let name = name.to_string_lossy();
                let file_type = entry.file_type()?;
                if dir == root && exclude.iter().any(|e| *e == name) {
                    continue;
                }
                if file_type.is_dir() {
                    if !SKIPPED_DIRS.contains(&&*name) {
                        stack.push(path);
                    }
                } else if file_type.is_file() {
                    let bytes = fs::read(&path)?;
                    manifest.insert(relative_path(root, &path)?, Digest::of(&bytes));
                }
            }
        }
        Ok(manifest)
    }

    /// Compare this manifest against the tree under `root`.
    ///
    /// Returns one entry per drifting path, in path order. An empty result
    /// means the tree matches hash-for-hash.
    pub fn verify_dir(&self, root: &Path, exclude: &[&str]) -> Result<Vec<Drift>, TypesError> {
        let actual = Self::from_dir(root, exclude)?;
        Ok(self.diff(&actual))
    }

    /// Drift from `self` (expected) to `actual`.
    pub fn diff(&self, actual: &Manifest) -> Vec<Drift> {
        let mut drift = Vec::new();
        for (path, expected) in &self.entries {
            match actual.entries.get(path) {
                None => drift.push(Drift::Missing(path.clone())),
                Some(found) if found != expected => drift.push(Drift::Modified {
                    path: path.clone(),
                    expected: *expected,
                    actual: *found,
                }),
                Some(_) => {}
            }
        }
        for path in actual.entries.keys() {
            if !self.entries.contains_key(path) {
                drift.push(Drift::Unexpected(path.clone()));
            }
        }
        drift.sort_by(|a, b| a.path().cmp(b.path()));
        drift
    }
}

fn relative_path(root: &Path, path: &Path) -> Result<String, TypesError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| TypesError::Manifest(format!("{} escapes {}", path.display(), root.display())))?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
