//! Tail-window extraction from a JSON-lines event log.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

const BLOCK: u64 = 8 * 1024;

/// Result of reading the tail of an event log.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tail {
    /// Lines that parse as JSON objects, oldest first.
    pub lines: Vec<String>,
    /// Non-empty lines in the window that were not JSON objects.
    pub skipped: usize,
}

/// Read the last `n` complete lines of `path`, keeping only JSON objects.
///
/// Reads backwards in blocks so large logs are not loaded whole. A missing
/// file yields an empty tail. A trailing line without a newline is a write
/// in progress and is ignored.
pub fn read_tail(path: &Path, n: usize) -> io::Result<Tail> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Tail::default()),
        Err(e) => return Err(e),
    };
    if n == 0 {
        return Ok(Tail::default());
    }
    let len = file.metadata()?.len();
    let mut pos = len;
    let mut buf: Vec<u8> = Vec::new();
    // Stop once the buffer holds n + 1 newlines: n complete lines plus the
    // boundary of the line before them.
    while pos > 0 && buf.iter().filter(|b| **b == b'\n').count() <= n {
        let step = BLOCK.min(pos);
        pos -= step;
        file.seek(SeekFrom::Start(pos))?;
        let mut block = vec![0u8; step as usize];
        file.read_exact(&mut block)?;
        block.extend_from_slice(&buf);
        buf = block;
    }

    let text = String::from_utf8_lossy(&buf);
    let complete = match text.rfind('\n') {
        Some(idx) => &text[..idx],
        None => return Ok(Tail::default()),
    };
    let mut raw: Vec<&str> = complete.split('\n').collect();
    if pos > 0 && !raw.is_empty() {
        // First piece may be a partial line cut by the block boundary.
        raw.remove(0);
    }
    let start = raw.len().saturating_sub(n);

    let mut tail = Tail::default();
    for line in &raw[start..] {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(serde_json::Value::Object(_)) => tail.lines.push(line.to_string()),
            _ => tail.skipped += 1,
        }
    }
    Ok(tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tail = read_tail(&dir.path().join("nope.jsonl"), 10).unwrap();
        assert!(tail.lines.is_empty());
    }

    #[test]
    fn keeps_last_n_json_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut body = String::new();
        for i in 0..20 {
            body.push_str(&format!("{{\"i\":{}}}\n", i));
        }
        body.push_str("not json\n");
        body.push_str("{\"i\":20}\n");
        body.push_str("{\"partial\":"); // no newline
        fs::write(&path, body).unwrap();

        let tail = read_tail(&path, 3).unwrap();
        assert_eq!(tail.lines, vec!["{\"i\":19}", "{\"i\":20}"]);
        assert_eq!(tail.skipped, 1);
    }

    #[test]
    fn spans_block_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let pad = "x".repeat(3000);
        let mut body = String::new();
        for i in 0..40 {
            body.push_str(&format!("{{\"i\":{},\"pad\":\"{}\"}}\n", i, pad));
        }
        fs::write(&path, body).unwrap();

        let tail = read_tail(&path, 5).unwrap();
        assert_eq!(tail.lines.len(), 5);
        assert!(tail.lines[0].starts_with("{\"i\":35,"));
        assert!(tail.lines[4].starts_with("{\"i\":39,"));
        assert_eq!(tail.skipped, 0);
    }

    #[test]
    fn short_log_returns_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        fs::write(&path, "{\"a\":1}\n[1,2]\n{\"b\":2}\n").unwrap();
        let tail = read_tail(&path, 100).unwrap();
        assert_eq!(tail.lines.len(), 2);
        assert_eq!(tail.skipped, 1);
    }
}
