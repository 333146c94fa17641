//! Append-only diagnostic log of every client invocation.
//!
//! Each entry is a timestamped command line followed by one indented line
//! per returned record. Writes are best-effort: a failure is reported through
//! the logger and otherwise ignored.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use p4watch_core::Record;

#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    path: PathBuf,
}

impl DiagnosticLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a completed invocation and the records it produced.
    pub fn append(&self, command: &str, records: &[Record]) {
        let mut entry = header(command);
        for record in records {
            let _ = writeln!(entry, "  {record}");
        }
        self.write_entry(&entry);
    }

    /// Record an invocation that produced no usable records.
    pub fn append_failure(&self, command: &str, reason: &str) {
        let mut entry = header(command);
        let _ = writeln!(entry, "  failed: {reason}");
        self.write_entry(&entry);
    }

    fn write_entry(&self, entry: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(
                "could not write diagnostic log {}: {e}",
                self.path.display()
            );
        }
    }
}

fn header(command: &str) -> String {
    format!(
        "[{}] {command}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_entries_in_order() {
        let dir = TempDir::new().expect("tempdir");
        let log = DiagnosticLog::new(dir.path().join("p4.log"));
        let record: Record = [("change", "12")].into_iter().collect();

        log.append("p4 changes -m 1 //depot/...", &[record]);
        log.append_failure("p4 describe -s 12", "exited with status 1");

        let text = std::fs::read_to_string(log.path()).expect("read");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("] p4 changes -m 1 //depot/..."));
        assert_eq!(lines[1], r#"  {change: "12"}"#);
        assert!(lines[2].ends_with("] p4 describe -s 12"));
        assert_eq!(lines[3], "  failed: exited with status 1");
    }

    #[test]
    fn unwritable_path_is_ignored() {
        let dir = TempDir::new().expect("tempdir");
        let log = DiagnosticLog::new(dir.path().join("missing").join("p4.log"));
        log.append("p4 changes", &[]);
        assert!(!log.path().exists());
    }
}
