//! # p4watch-sync
//!
//! Server polling, history diff and workspace sync over the `p4` client.
//!
//! Build a [`RevisionTracker`] to ask whether the depot path has moved past a
//! known change, and a [`Synchronizer`] to bring the workspace forward. Both
//! talk to the server only through a [`RemoteClient`]; [`P4Cli`] is the
//! subprocess implementation.

pub mod client;
pub mod diagnostic_log;
pub mod error;
pub mod synchronizer;
pub mod tracker;

pub use client::{Operation, OutputMode, P4Cli, RemoteClient};
pub use diagnostic_log::DiagnosticLog;
pub use error::SyncError;
pub use synchronizer::{parse_sync_line, SyncTarget, Synchronizer};
pub use tracker::{RevisionTracker, StaleReason, UpToDateCheck, MAX_CHANGELISTS_TO_FETCH};
