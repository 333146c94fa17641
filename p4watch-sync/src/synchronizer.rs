//! Workspace sync and the `p4 sync` line protocol.
//!
//! Lines of the form `//depot/path#<rev> - <action> ...` describe one file
//! materialized by the sync. Everything else (status lines, "up-to-date"
//! notices, anything on stderr) is skipped by [`Synchronizer::sync`];
//! [`Synchronizer::checkout`] forwards every line, stdout first.

use std::io::Write;
use std::sync::LazyLock;

use regex::Regex;

use p4watch_core::{record::DATA_FIELD, ChangeNumber, ChangesetEntry, P4Config, Record, Revision};

use crate::client::{Operation, P4Cli, RemoteClient};
use crate::SyncError;

static SYNC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(//.+)#\d+ - (\w+) .+$").expect("sync line pattern compiles")
});

/// Revision to sync the workspace to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncTarget {
    /// Whatever the server currently has.
    #[default]
    Head,
    Change(ChangeNumber),
}

impl From<ChangeNumber> for SyncTarget {
    fn from(n: ChangeNumber) -> Self {
        SyncTarget::Change(n)
    }
}

impl From<u64> for SyncTarget {
    fn from(n: u64) -> Self {
        SyncTarget::Change(ChangeNumber(n))
    }
}

impl From<&Revision> for SyncTarget {
    fn from(revision: &Revision) -> Self {
        SyncTarget::Change(revision.number)
    }
}

impl<T: Into<SyncTarget>> From<Option<T>> for SyncTarget {
    fn from(target: Option<T>) -> Self {
        target.map_or(SyncTarget::Head, Into::into)
    }
}

/// Materializes server revisions into the configured workspace.
#[derive(Debug, Clone)]
pub struct Synchronizer<C> {
    client: C,
    depot_path: String,
}

impl Synchronizer<P4Cli> {
    pub fn from_config(config: P4Config) -> Self {
        let depot_path = config.depot_path.clone();
        Self::new(P4Cli::new(config), depot_path)
    }
}

impl<C: RemoteClient> Synchronizer<C> {
    pub fn new(client: C, depot_path: impl Into<String>) -> Self {
        Self {
            client,
            depot_path: depot_path.into(),
        }
    }

    /// Sync to `target` and return the files touched, in server order.
    pub fn sync(&self, target: impl Into<SyncTarget>) -> Result<Vec<ChangesetEntry>, SyncError> {
        let records = self.run(target.into())?;
        let entries: Vec<ChangesetEntry> = records
            .iter()
            .filter(|record| !record.is_stderr())
            .filter_map(record_line)
            .filter_map(|line| parse_sync_line(&line))
            .collect();
        tracing::info!("synced {} file(s)", entries.len());
        Ok(entries)
    }

    /// Sync to `target`, writing every raw output line to `sink`.
    pub fn checkout<W: Write + ?Sized>(
        &self,
        target: impl Into<SyncTarget>,
        sink: &mut W,
    ) -> Result<(), SyncError> {
        for record in self.run(target.into())? {
            let line = record_line(&record).unwrap_or_else(|| record.to_string());
            writeln!(sink, "{line}").map_err(SyncError::Sink)?;
        }
        sink.flush().map_err(SyncError::Sink)
    }

    fn run(&self, target: SyncTarget) -> Result<Vec<Record>, SyncError> {
        let args = match target {
            SyncTarget::Head => String::new(),
            SyncTarget::Change(n) => format!("{}@{n}", self.depot_path),
        };
        tracing::debug!("sync {target:?}");
        self.client.execute(Operation::Sync, &args)
    }
}

/// Interpret one line of `p4 sync` output.
pub fn parse_sync_line(line: &str) -> Option<ChangesetEntry> {
    let caps = SYNC_LINE.captures(line)?;
    Some(ChangesetEntry::new(&caps[2], &caps[1]))
}

fn record_line(record: &Record) -> Option<String> {
    record.text(DATA_FIELD).map(|line| line.into_owned())
}
