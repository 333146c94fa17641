//! Polling and history diff against the tracked depot path.
//!
//! The tracker keeps no state between calls: every answer is re-derived from
//! the server plus the change number the caller last built. The workspace is
//! the source of truth for what has been synced, never this type.

use std::fmt;

use serde::Serialize;

use p4watch_core::{parse_revision, ChangeNumber, DecodeError, P4Config, Record, Revision};

use crate::client::{Operation, P4Cli, RemoteClient};
use crate::SyncError;

/// Upper bound on changelists fetched by [`RevisionTracker::revisions_since`].
///
/// Only the most recent changes are scanned backwards from `#head`; anything
/// older than this window is not reported.
pub const MAX_CHANGELISTS_TO_FETCH: usize = 25;

/// Why a workspace is considered out of date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StaleReason {
    /// The server has a newer head than the last known change.
    NewRevision { number: ChangeNumber },
    /// Changes submitted after the last known change, in server order.
    Intervening { revisions: Vec<Revision> },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::NewRevision { number } => write!(f, "New revision {number} detected"),
            StaleReason::Intervening { revisions } => {
                let numbers: Vec<String> = revisions.iter().map(|r| r.number.to_string()).collect();
                write!(
                    f,
                    "{} revision(s) since last build: {}",
                    revisions.len(),
                    numbers.join(", ")
                )
            }
        }
    }
}

/// Result of [`RevisionTracker::is_up_to_date`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpToDateCheck {
    pub up_to_date: bool,
    pub reasons: Vec<StaleReason>,
}

impl UpToDateCheck {
    fn current() -> Self {
        Self {
            up_to_date: true,
            reasons: Vec::new(),
        }
    }

    /// Intervening revisions listed in the reasons, if any.
    pub fn intervening(&self) -> &[Revision] {
        self.reasons
            .iter()
            .find_map(|reason| match reason {
                StaleReason::Intervening { revisions } => Some(revisions.as_slice()),
                StaleReason::NewRevision { .. } => None,
            })
            .unwrap_or(&[])
    }
}

/// Compares the server's history for a depot path with a known change.
#[derive(Debug, Clone)]
pub struct RevisionTracker<C> {
    client: C,
    depot_path: String,
    workspace: String,
}

impl RevisionTracker<P4Cli> {
    pub fn from_config(config: P4Config) -> Self {
        let depot_path = config.depot_path.clone();
        let workspace = config.client.clone();
        Self::new(P4Cli::new(config), depot_path, workspace)
    }
}

impl<C: RemoteClient> RevisionTracker<C> {
    pub fn new(client: C, depot_path: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            client,
            depot_path: depot_path.into(),
            workspace: workspace.into(),
        }
    }

    /// Most recent changelist submitted under the depot path.
    pub fn latest_remote_revision(&self) -> Result<Revision, SyncError> {
        self.latest_in(&self.depot_path)
    }

    /// Most recent changelist the workspace has synced.
    pub fn latest_local_revision(&self) -> Result<Revision, SyncError> {
        self.latest_in(&format!("@{}", self.workspace))
    }

    /// Compare the server head against `last_known`.
    ///
    /// A newer head yields `up_to_date == false` with the head number and the
    /// intervening revisions as reasons. Any failure is returned, never
    /// reported as up to date.
    pub fn is_up_to_date(
        &self,
        last_known: impl Into<ChangeNumber>,
    ) -> Result<UpToDateCheck, SyncError> {
        let last_known = last_known.into();
        let latest = self.latest_remote_revision()?;
        if latest.number <= last_known {
            tracing::debug!("{} up to date at {last_known}", self.depot_path);
            return Ok(UpToDateCheck::current());
        }

        tracing::info!(
            "{}: new revision {} (last known {last_known})",
            self.depot_path,
            latest.number
        );
        let revisions = self.revisions_since(last_known)?;
        Ok(UpToDateCheck {
            up_to_date: false,
            reasons: vec![
                StaleReason::NewRevision {
                    number: latest.number,
                },
                StaleReason::Intervening { revisions },
            ],
        })
    }

    /// [`is_up_to_date`](Self::is_up_to_date) against the workspace's own
    /// latest synced change.
    pub fn is_workspace_up_to_date(&self) -> Result<UpToDateCheck, SyncError> {
        let local = self.latest_local_revision()?;
        self.is_up_to_date(local.number)
    }

    /// Changelists submitted after `last_known`, newest first as reported.
    ///
    /// The range query may include `last_known` itself; it is removed. At
    /// most [`MAX_CHANGELISTS_TO_FETCH`] changes are scanned, so a longer gap
    /// silently loses its oldest changes.
    pub fn revisions_since(
        &self,
        last_known: impl Into<ChangeNumber>,
    ) -> Result<Vec<Revision>, SyncError> {
        let last_known = last_known.into();
        let args = format!(
            "-m {MAX_CHANGELISTS_TO_FETCH} {}@{last_known},#head",
            self.depot_path
        );
        let changes = self.client.execute(Operation::Changes, &args)?;

        let mut revisions = Vec::new();
        for change in changes.iter().take(MAX_CHANGELISTS_TO_FETCH) {
            let number = change_number(change)?;
            if number == last_known {
                continue;
            }
            revisions.push(self.describe(number)?);
        }
        Ok(revisions)
    }

    /// Full description of one changelist.
    pub fn describe(&self, number: ChangeNumber) -> Result<Revision, SyncError> {
        let records = self
            .client
            .execute(Operation::Describe, &format!("-s {number}"))?;
        let record = records.first().ok_or(DecodeError::Empty {
            operation: "describe",
        })?;
        Ok(parse_revision(record)?)
    }

    fn latest_in(&self, scope: &str) -> Result<Revision, SyncError> {
        let changes = self
            .client
            .execute(Operation::Changes, &format!("-m 1 {scope}"))?;
        let Some(head) = changes.first() else {
            return Err(SyncError::NoRevisionsFound {
                scope: scope.to_string(),
            });
        };
        self.describe(change_number(head)?)
    }
}

fn change_number(record: &Record) -> Result<ChangeNumber, SyncError> {
    let raw = record.text("change").ok_or_else(|| DecodeError::MissingField {
        operation: "changes",
        field: "change".to_string(),
    })?;
    raw.parse().map_err(|_| {
        SyncError::from(DecodeError::InvalidField {
            operation: "changes",
            field: "change".to_string(),
            value: raw.to_string(),
        })
    })
}
