//! `p4watch latest` / `p4watch local` — show one described change.

use anyhow::{Context, Result};
use clap::Args;

use p4watch_core::{P4Config, Revision};
use p4watch_sync::RevisionTracker;

/// Arguments for `p4watch latest` and `p4watch local`.
#[derive(Args, Debug)]
pub struct RevisionArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl RevisionArgs {
    pub fn run_latest(self, config: P4Config) -> Result<()> {
        let depot_path = config.depot_path.clone();
        let revision = RevisionTracker::from_config(config)
            .latest_remote_revision()
            .with_context(|| format!("could not read latest change under {depot_path}"))?;
        self.print(&revision)
    }

    pub fn run_local(self, config: P4Config) -> Result<()> {
        let client = config.client.clone();
        let revision = RevisionTracker::from_config(config)
            .latest_local_revision()
            .with_context(|| format!("could not read latest change synced to {client}"))?;
        self.print(&revision)
    }

    fn print(&self, revision: &Revision) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(revision)?);
        } else {
            print_revision(revision);
        }
        Ok(())
    }
}

/// Human-readable rendering shared by the listing commands.
pub fn print_revision(revision: &Revision) {
    println!("{revision}");
    for line in revision.message.lines() {
        println!("    {line}");
    }
    for entry in revision.changeset() {
        println!("  {:<10} {}", entry.operation(), entry.path());
    }
}
