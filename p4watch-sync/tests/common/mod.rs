//! Scripted in-memory server shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;

use p4watch_core::{record::decode_text, Record};
use p4watch_sync::{Operation, RemoteClient, SyncError};

pub const DEPOT: &str = "//proj/...";
pub const WORKSPACE: &str = "ci-ws";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fake server holding a linear history of changelists.
#[derive(Debug, Default)]
pub struct FakeDepot {
    /// Submitted change numbers, any order.
    pub changes: Vec<u64>,
    /// Latest change the workspace has synced.
    pub have: Option<u64>,
    /// Whether `@N,#head` includes `N` itself.
    pub inclusive_range: bool,
    /// Return every matching change regardless of `-m`.
    pub ignore_max: bool,
    /// Raw lines `sync` writes to stdout.
    pub sync_output: Vec<String>,
    /// Raw lines `sync` writes to stderr.
    pub sync_stderr: Vec<String>,
    /// Operation that fails with a remote error.
    pub fail_on: Option<Operation>,
    /// Change numbers whose describe record is missing `user`.
    pub broken_describe: Vec<u64>,
    pub calls: RefCell<Vec<(Operation, String)>>,
}

impl FakeDepot {
    pub fn with_changes(changes: impl IntoIterator<Item = u64>) -> Self {
        Self {
            changes: changes.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(Operation, String)> {
        self.calls.borrow().clone()
    }

    pub fn calls_of(&self, operation: Operation) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, args)| args.clone())
            .collect()
    }

    fn changes_for(&self, args: &str) -> Vec<Record> {
        let words: Vec<&str> = args.split_whitespace().collect();
        let max: usize = words[1].parse().expect("-m value");
        let scope = words[2];

        let mut matching: Vec<u64> = if let Some(_client) = scope.strip_prefix('@') {
            self.changes
                .iter()
                .copied()
                .filter(|n| self.have.is_some_and(|have| *n <= have))
                .collect()
        } else if let Some((_, range)) = scope.split_once('@') {
            let lower: u64 = range
                .trim_end_matches(",#head")
                .parse()
                .expect("range lower bound");
            self.changes
                .iter()
                .copied()
                .filter(|n| *n > lower || (self.inclusive_range && *n == lower))
                .collect()
        } else {
            self.changes.clone()
        };
        matching.sort_unstable_by(|a, b| b.cmp(a));
        if !self.ignore_max {
            matching.truncate(max);
        }

        matching
            .into_iter()
            .map(|n| {
                [
                    ("code", "stat".to_string()),
                    ("change", n.to_string()),
                    ("user", "alice".to_string()),
                    ("time", (1_000 + n).to_string()),
                ]
                .into_iter()
                .collect()
            })
            .collect()
    }

    fn describe_for(&self, args: &str) -> Vec<Record> {
        let n: u64 = args
            .trim_start_matches("-s ")
            .parse()
            .expect("describe change number");
        vec![describe_record(n, !self.broken_describe.contains(&n))]
    }
}

/// Describe record for change `n` touching two files, listed out of path order.
pub fn describe_record(n: u64, with_user: bool) -> Record {
    let mut record: Record = [
        ("code", "stat".to_string()),
        ("change", n.to_string()),
        ("time", (1_000 + n).to_string()),
        ("desc", format!("change {n}\n")),
        ("action0", "edit".to_string()),
        ("depotFile0", format!("//proj/z{n}.txt")),
        ("action1", "add".to_string()),
        ("depotFile1", format!("//proj/a{n}.txt")),
    ]
    .into_iter()
    .collect();
    if with_user {
        record.insert("user", "alice");
    }
    record
}

impl RemoteClient for FakeDepot {
    fn execute(&self, operation: Operation, args: &str) -> Result<Vec<Record>, SyncError> {
        self.calls.borrow_mut().push((operation, args.to_string()));
        if self.fail_on == Some(operation) {
            return Err(SyncError::RemoteExecution {
                command: format!("p4 {operation} {args}"),
                reason: "Connect to server failed; check $P4PORT.".to_string(),
            });
        }
        Ok(match operation {
            Operation::Changes => self.changes_for(args),
            Operation::Describe => self.describe_for(args),
            Operation::Sync => {
                decode_text(&self.sync_output.join("\n"), &self.sync_stderr.join("\n"))
            }
        })
    }
}
