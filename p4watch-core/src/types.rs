//! Domain types for tracked depot history.
//!
//! A [`Revision`] is one submitted changelist; its identity, equality and
//! ordering come from its [`ChangeNumber`] alone.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed changelist number as assigned by the server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChangeNumber(pub u64);

impl ChangeNumber {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChangeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for ChangeNumber {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl FromStr for ChangeNumber {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One file-level effect inside a changelist or a sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangesetEntry {
    operation: String,
    path: String,
}

impl ChangesetEntry {
    pub fn new(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            path: path.into(),
        }
    }

    /// Service-defined action word (`add`, `edit`, `delete`, `updating`, ...).
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Depot path of the affected file.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ChangesetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.path)
    }
}

/// A submitted changelist.
///
/// Two revisions with the same number compare equal even if the remaining
/// fields differ; ordering follows the number.
#[derive(Debug, Clone, Serialize)]
pub struct Revision {
    pub number: ChangeNumber,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    changeset: Vec<ChangesetEntry>,
}

impl Revision {
    /// Build a revision. The changeset is sorted by path (stable).
    pub fn new(
        number: impl Into<ChangeNumber>,
        author: impl Into<String>,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
        mut changeset: Vec<ChangesetEntry>,
    ) -> Self {
        changeset.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            number: number.into(),
            author: author.into(),
            timestamp,
            message: message.into(),
            changeset,
        }
    }

    pub fn changeset(&self) -> &[ChangesetEntry] {
        &self.changeset
    }
}

impl PartialEq for Revision {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Revision {}

impl Hash for Revision {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "change {} by {} on {}",
            self.number,
            self.author,
            self.timestamp.format("%Y/%m/%d %H:%M:%S")
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
