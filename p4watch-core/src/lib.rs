//! p4watch core library — changelist model, record decoding, settings.
//!
//! - [`types`] — [`ChangeNumber`], [`ChangesetEntry`], [`Revision`]
//! - [`record`] — server output records and `-G` stream decoding
//! - [`describe`] — `p4 describe` record → [`Revision`]
//! - [`config`] — [`P4Settings`] / [`P4Config`]
//! - [`error`] — [`ConfigError`], [`DecodeError`]

pub mod config;
pub mod describe;
pub mod error;
pub mod record;
pub mod types;

pub use config::{P4Config, P4Settings};
pub use describe::{parse_revision, ChangeDescription, FileEffect};
pub use error::{ConfigError, DecodeError};
pub use record::{Record, Value};
pub use types::{ChangeNumber, ChangesetEntry, Revision};
