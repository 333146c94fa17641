//! Structured records returned by the server.
//!
//! Tagged commands (`p4 -G ...`) emit a stream of Python-marshal
//! dictionaries, one per record. Text commands emit plain lines; each line is
//! carried as a record with a single `data` field so both modes share one
//! shape.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{stream_err, DecodeError};

/// Field that carries the raw line of a text-mode record.
pub const DATA_FIELD: &str = "data";

/// Set to `"stderr"` on text-mode lines read from standard error.
pub const STREAM_FIELD: &str = "stream";

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Int(i64),
    Record(Record),
}

impl Value {
    /// Scalar rendering of the value; nested records have none.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Text(s) => Some(Cow::Borrowed(s)),
            Value::Int(i) => Some(Cow::Owned(i.to_string())),
            Value::Record(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Record(r) => r.fmt(f),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// One decoded unit of server output: field name → value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap one line of text-mode output.
    pub fn from_line(line: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.insert(DATA_FIELD, Value::Text(line.into()));
        record
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Scalar value of `key`, if present and not a nested record.
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).and_then(Value::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether this text-mode line was read from standard error.
    pub fn is_stderr(&self) -> bool {
        self.text(STREAM_FIELD).as_deref() == Some("stderr")
    }

}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

// ---------------------------------------------------------------------------
// Text mode
// ---------------------------------------------------------------------------

/// Split text-mode output into one `data` record per line.
pub fn decode_lines(output: &str) -> Vec<Record> {
    output
        .lines()
        .map(|line| Record::from_line(line.trim_end_matches('\r')))
        .collect()
}

/// Records for a text-mode command: stdout lines, then stderr lines.
///
/// The client writes status notices such as "file(s) up-to-date." and
/// "no such file(s)." to stderr even when it succeeds.
pub fn decode_text(stdout: &str, stderr: &str) -> Vec<Record> {
    let mut records = decode_lines(stdout);
    records.extend(decode_lines(stderr).into_iter().map(|mut record| {
        record.insert(STREAM_FIELD, "stderr");
        record
    }));
    records
}

// ---------------------------------------------------------------------------
// Tagged mode (Python marshal)
// ---------------------------------------------------------------------------

const FLAG_REF: u8 = 0x80;
const TYPE_NULL: u8 = b'0';
const TYPE_DICT: u8 = b'{';
const TYPE_STRING: u8 = b's';
const TYPE_UNICODE: u8 = b'u';
const TYPE_INTERNED: u8 = b't';
const TYPE_INT: u8 = b'i';
const TYPE_INT64: u8 = b'I';

/// Decode a complete `-G` output stream into records.
///
/// Every top-level value must be a dictionary; an empty stream yields no
/// records.
pub fn decode_tagged(bytes: &[u8]) -> Result<Vec<Record>, DecodeError> {
    let mut reader = MarshalReader { bytes, pos: 0 };
    let mut records = Vec::new();
    while !reader.at_end() {
        let offset = reader.pos;
        match reader.read_value()? {
            Some(Value::Record(record)) => records.push(record),
            Some(_) => return Err(stream_err(offset, "top-level value is not a dictionary")),
            None => return Err(stream_err(offset, "unexpected dictionary terminator")),
        }
    }
    Ok(records)
}

struct MarshalReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> MarshalReader<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let bytes = self.bytes;
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| stream_err(self.pos, format!("truncated: wanted {n} more byte(s)")))?;
        let slice = &bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let raw = self.take(4)?;
        Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let raw = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(i64::from_le_bytes(buf))
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let offset = self.pos;
        let len = self.read_i32()?;
        let len = usize::try_from(len)
            .map_err(|_| stream_err(offset, format!("negative string length {len}")))?;
        let raw = self.take(len)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    /// Read one value. `Ok(None)` is the dictionary terminator.
    fn read_value(&mut self) -> Result<Option<Value>, DecodeError> {
        let offset = self.pos;
        let code = self.take(1)?[0] & !FLAG_REF;
        let value = match code {
            TYPE_NULL => return Ok(None),
            TYPE_STRING | TYPE_UNICODE | TYPE_INTERNED => Value::Text(self.read_string()?),
            TYPE_INT => Value::Int(i64::from(self.read_i32()?)),
            TYPE_INT64 => Value::Int(self.read_i64()?),
            TYPE_DICT => Value::Record(self.read_dict()?),
            other => {
                return Err(stream_err(
                    offset,
                    format!("unsupported type code {:?}", other as char),
                ))
            }
        };
        Ok(Some(value))
    }

    fn read_dict(&mut self) -> Result<Record, DecodeError> {
        let mut record = Record::new();
        loop {
            let offset = self.pos;
            let key = match self.read_value()? {
                None => return Ok(record),
                Some(Value::Text(key)) => key,
                Some(Value::Int(i)) => i.to_string(),
                Some(Value::Record(_)) => {
                    return Err(stream_err(offset, "dictionary key is a dictionary"))
                }
            };
            let offset = self.pos;
            let value = self
                .read_value()?
                .ok_or_else(|| stream_err(offset, format!("key '{key}' has no value")))?;
            record.insert(key, value);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
