//! Crash-safe file writes.
//!
//! Every write lands in a sibling `.<name>.tmp.<uuid>` file created with
//! create-new semantics, is fsynced, then renamed (or hard-linked) into
//! place, and the parent directory is fsynced. A concurrent reader sees
//! either the old file or the complete new one.

use crate::backoff::Backoff;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::warn;
use uuid::Uuid;

#[cfg(unix)]
pub fn sync_directory(path: &Path) -> io::Result<()> {
    File::open(path)?.sync_all()
}

#[cfg(not(unix))]
pub fn sync_directory(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// True for names produced by [`temp_sibling`].
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.contains(".tmp.")
}

fn temp_sibling(path: &Path) -> io::Result<PathBuf> {
    let parent = parent_of(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "path has no file name"))?;
    Ok(parent.join(format!(".{}.tmp.{}", name, Uuid::new_v4().simple())))
}

fn parent_of(path: &Path) -> io::Result<&Path> {
    path.parent()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "path parent missing"))
}

fn write_temp(tmp: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut f = OpenOptions::new().write(true).create_new(true).open(tmp)?;
    f.write_all(bytes)?;
    f.sync_all()
}

/// Replace `path` atomically with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_sibling(path)?;
    let result = write_temp(&tmp, bytes).and_then(|_| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result?;
    sync_directory(parent_of(path)?)
}

/// Create `path` with `bytes`, failing with `AlreadyExists` if it is present.
///
/// The content is staged in a temp file and hard-linked into place so the
/// target never exists in a partially written state.
pub fn write_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_sibling(path)?;
    let result = write_temp(&tmp, bytes).and_then(|_| fs::hard_link(&tmp, path));
    let _ = fs::remove_file(&tmp);
    result?;
    sync_directory(parent_of(path)?)
}

/// Clear the write bits on a file.
pub fn make_read_only(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    if !perms.readonly() {
        perms.set_readonly(true);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

fn is_transient(err: &io::Error) -> bool {
    !matches!(
        err.kind(),
        ErrorKind::AlreadyExists | ErrorKind::NotFound | ErrorKind::InvalidInput | ErrorKind::InvalidData
    )
}

/// Run a write, retrying transient failures up to `retries` extra times.
pub fn with_retries<T>(
    retries: u32,
    what: &str,
    mut op: impl FnMut() -> io::Result<T>,
) -> io::Result<T> {
    let backoff = Backoff {
        initial_delay_ms: 10,
        max_delay_ms: 200,
        multiplier: 2.0,
        max_wait_ms: u64::MAX,
    };
    let mut attempt = 0u32;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(err) if attempt < retries && is_transient(&err) => {
                attempt += 1;
                warn!(op = what, attempt, error = %err, "transient write failure, retrying");
                thread::sleep(backoff.delay_for_attempt(attempt));
            }
            Err(err) => return Err(err),
        }
    }
}
