//! `p4watch changes --since <change>` — list changes after a known one.

use anyhow::{Context, Result};
use clap::Args;

use p4watch_core::{ChangeNumber, P4Config};
use p4watch_sync::{RevisionTracker, MAX_CHANGELISTS_TO_FETCH};

use super::revision::print_revision;

/// Arguments for `p4watch changes`.
#[derive(Args, Debug)]
pub struct ChangesArgs {
    /// Last change already built; only later changes are listed.
    #[arg(long, value_name = "CHANGE")]
    pub since: ChangeNumber,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ChangesArgs {
    pub fn run(self, config: P4Config) -> Result<()> {
        let revisions = RevisionTracker::from_config(config)
            .revisions_since(self.since)
            .with_context(|| format!("could not list changes since {}", self.since))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&revisions)?);
            return Ok(());
        }

        if revisions.is_empty() {
            println!("No changes since {}.", self.since);
            return Ok(());
        }
        for revision in &revisions {
            print_revision(revision);
        }
        if revisions.len() >= MAX_CHANGELISTS_TO_FETCH {
            println!("(showing the {MAX_CHANGELISTS_TO_FETCH} most recent changes; older ones omitted)");
        }
        Ok(())
    }
}
