//! Decoding of `p4 describe -s` records.
//!
//! A describe record mixes scalar fields (`change`, `user`, `time`, `desc`)
//! with per-file fields whose names end in the file's position
//! (`depotFile0`, `action0`, `rev0`, ...). Decoding runs in two passes:
//! scalars first, then the indexed file slots, so field order in the record
//! never matters. Slot indices may be sparse.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::DecodeError;
use crate::record::{Record, Value};
use crate::types::{ChangeNumber, ChangesetEntry, Revision};

const OPERATION: &str = "describe";

/// Scalar description of one changelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescription {
    pub change: ChangeNumber,
    pub user: String,
    pub client: Option<String>,
    pub time: DateTime<Utc>,
    pub desc: String,
    pub status: Option<String>,
    pub change_type: Option<String>,
    /// Per-file effects keyed by their slot index.
    pub files: BTreeMap<usize, FileEffect>,
}

/// One populated file slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEffect {
    pub action: String,
    pub depot_file: String,
    pub rev: Option<u32>,
    pub file_type: Option<String>,
}

impl ChangeDescription {
    /// Decode a raw describe record.
    pub fn from_record(record: &Record) -> Result<Self, DecodeError> {
        let (scalars, slots) = partition(record);

        let change = required(&scalars, "change")?;
        let change = change.parse::<ChangeNumber>().map_err(|_| invalid("change", &change))?;
        let user = required(&scalars, "user")?;
        let time = required(&scalars, "time")?;
        let time = time
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| invalid("time", &time))?;

        let mut files = BTreeMap::new();
        for (index, fields) in slots {
            if let Some(effect) = FileEffect::from_slot(index, &fields)? {
                files.insert(index, effect);
            }
        }

        Ok(Self {
            change,
            user,
            client: scalars.get("client").cloned(),
            time,
            desc: scalars.get("desc").cloned().unwrap_or_default(),
            status: scalars.get("status").cloned(),
            change_type: scalars.get("changeType").cloned(),
            files,
        })
    }

    /// File effects as changeset entries, sorted by depot path.
    pub fn changeset(&self) -> Vec<ChangesetEntry> {
        let mut entries: Vec<ChangesetEntry> = self
            .files
            .values()
            .map(|f| ChangesetEntry::new(f.action.clone(), f.depot_file.clone()))
            .collect();
        entries.sort_by(|a, b| a.path().cmp(b.path()));
        entries
    }

    pub fn into_revision(self) -> Revision {
        let changeset = self.changeset();
        Revision::new(self.change, self.user, self.time, self.desc, changeset)
    }
}

impl FileEffect {
    /// Slots with neither `action` nor `depotFile` belong to other indexed
    /// lists (`job<n>`, `jobstat<n>`) and yield `None`.
    fn from_slot(
        index: usize,
        fields: &BTreeMap<String, String>,
    ) -> Result<Option<Self>, DecodeError> {
        if !fields.contains_key("action") && !fields.contains_key("depotFile") {
            return Ok(None);
        }
        let slot_field = |name: &str| {
            fields
                .get(name)
                .cloned()
                .ok_or_else(|| DecodeError::MissingField {
                    operation: OPERATION,
                    field: format!("{name}{index}"),
                })
        };
        Ok(Some(Self {
            action: slot_field("action")?,
            depot_file: slot_field("depotFile")?,
            rev: fields.get("rev").and_then(|r| r.trim().parse().ok()),
            file_type: fields.get("type").cloned(),
        }))
    }
}

/// Decode a raw describe record straight into a [`Revision`].
pub fn parse_revision(record: &Record) -> Result<Revision, DecodeError> {
    ChangeDescription::from_record(record).map(ChangeDescription::into_revision)
}

type Scalars = BTreeMap<String, String>;
type Slots = BTreeMap<usize, BTreeMap<String, String>>;

fn partition(record: &Record) -> (Scalars, Slots) {
    let mut scalars = Scalars::new();
    let mut slots = Slots::new();
    for (key, value) in record.iter() {
        // Nested records carry no scalar meaning for a description.
        let Some(text) = value_text(value) else {
            continue;
        };
        match split_indexed_key(key) {
            Some((prefix, index)) => {
                slots
                    .entry(index)
                    .or_default()
                    .insert(prefix.to_owned(), text);
            }
            None => {
                scalars.insert(key.to_owned(), text);
            }
        }
    }
    (scalars, slots)
}

fn value_text(value: &Value) -> Option<String> {
    value.as_text().map(|t| t.into_owned())
}

/// Split `depotFile12` into `("depotFile", 12)`.
///
/// Keys without a trailing number, or made only of digits, are scalars.
fn split_indexed_key(key: &str) -> Option<(&str, usize)> {
    let prefix = key.trim_end_matches(|c: char| c.is_ascii_digit());
    if prefix.is_empty() || prefix.len() == key.len() {
        return None;
    }
    let index = key[prefix.len()..].parse().ok()?;
    Some((prefix, index))
}

fn required(scalars: &Scalars, field: &str) -> Result<String, DecodeError> {
    scalars
        .get(field)
        .cloned()
        .ok_or_else(|| DecodeError::MissingField {
            operation: OPERATION,
            field: field.to_owned(),
        })
}

fn invalid(field: &str, value: &str) -> DecodeError {
    DecodeError::InvalidField {
        operation: OPERATION,
        field: field.to_owned(),
        value: value.to_owned(),
    }
}
